pub mod email;
pub mod federation;
pub mod repositories;
