pub mod dispatcher;
pub mod sender;

pub use dispatcher::DispatcherConfig;
pub use dispatcher::EmailDispatcher;
pub use sender::EmailSender;
pub use sender::LogEmailSender;
