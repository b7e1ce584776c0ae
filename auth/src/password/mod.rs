pub mod argon2;
pub mod credential;
pub mod errors;

pub use argon2::PasswordHasher;
pub use credential::PasswordCredential;
pub use errors::PasswordError;
