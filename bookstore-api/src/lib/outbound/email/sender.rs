use anyhow::Result;
use async_trait::async_trait;

use crate::domain::auth::models::EmailMessage;
use crate::domain::auth::models::EmailTemplate;

/// Email delivery abstraction used by the background dispatcher.
#[async_trait]
pub trait EmailSender: Send + Sync + 'static {
    /// Deliver a message, or return an error so the dispatcher can retry.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Rendered subject and plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

pub fn render(message: &EmailMessage) -> RenderedEmail {
    match &message.template {
        EmailTemplate::UserWelcome {
            user_id,
            activation_token,
        } => RenderedEmail {
            subject: "Welcome to the Book Store!".to_string(),
            body: format!(
                "Thanks for signing up. Your user ID number is {user_id}.\n\n\
                 Please send a request to PUT /auth/activate with the following \
                 JSON body to activate your account:\n\n\
                 {{\"token\": \"{activation_token}\"}}\n\n\
                 This token is valid for 3 days and can only be used once."
            ),
        },
    }
}

/// Local dev sender that logs the rendered email instead of sending it.
#[derive(Clone, Debug)]
pub struct LogEmailSender {
    from: String,
}

impl LogEmailSender {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        // The body carries the activation token and stays out of the logs.
        let email = render(message);
        tracing::info!(
            from = %self.from,
            to = %message.recipient,
            template = message.template.name(),
            subject = %email.subject,
            body_bytes = email.body.len(),
            "Email send stub"
        );
        Ok(())
    }
}
