use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PlaintextPassword;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserName;

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserCommand {
    pub name: UserName,
    pub email: EmailAddress,
    pub password: PlaintextPassword,
}

/// Validated credential login input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCommand {
    pub email: EmailAddress,
    pub password: PlaintextPassword,
}

/// Consent redirect handed to the client, plus the state it must echo back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedLoginStart {
    pub url: String,
    pub state: String,
}

/// Query received on the federation callback.
///
/// `expected_state` is the value bound to the browser when the flow began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCallback {
    pub code: String,
    pub state: String,
    pub expected_state: Option<String>,
}

impl FederatedCallback {
    /// True when the echoed state matches the bound one.
    pub fn state_matches(&self) -> bool {
        match &self.expected_state {
            Some(expected) => !expected.is_empty() && *expected == self.state,
            None => false,
        }
    }
}

/// Profile asserted by the identity provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Templates the background mailer knows how to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailTemplate {
    UserWelcome {
        user_id: UserId,
        activation_token: String,
    },
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::UserWelcome { .. } => "user_welcome",
        }
    }
}

/// Message submitted to the background email queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipient: EmailAddress,
    pub template: EmailTemplate,
}
