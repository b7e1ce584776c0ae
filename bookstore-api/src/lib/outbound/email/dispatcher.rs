//! Background email delivery.
//!
//! Request handlers submit messages with [`EmailQueue::enqueue`], which only
//! pushes onto a bounded channel and never waits. A single worker drains the
//! channel and hands each message to an [`EmailSender`], retrying failed
//! attempts after a fixed backoff. Every attempt runs in its own task, so a
//! panicking sender costs one attempt and leaves the worker alive.
//!
//! The worker stops once every [`EmailDispatcher`] handle has been dropped
//! and the channel is empty.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use super::sender::EmailSender;
use crate::config::EmailConfig;
use crate::domain::auth::errors::EmailQueueError;
use crate::domain::auth::models::EmailMessage;
use crate::domain::auth::ports::EmailQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for DispatcherConfig {
    /// 100 queued messages, 3 attempts, 500ms between attempts.
    fn default() -> Self {
        Self {
            capacity: 100,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&EmailConfig> for DispatcherConfig {
    fn from(config: &EmailConfig) -> Self {
        Self {
            capacity: config.queue_capacity.max(1),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Submission handle for the email worker.
#[derive(Debug, Clone)]
pub struct EmailDispatcher {
    queue: mpsc::Sender<EmailMessage>,
}

impl EmailDispatcher {
    /// Start the worker.
    ///
    /// # Returns
    /// The submission handle and the worker task, which finishes after the
    /// last handle is dropped and the queue has drained.
    pub fn spawn(
        sender: Arc<dyn EmailSender>,
        config: DispatcherConfig,
    ) -> (Self, JoinHandle<()>) {
        let (queue, receiver) = mpsc::channel(config.capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, sender, config));
        (Self { queue }, worker)
    }
}

impl EmailQueue for EmailDispatcher {
    fn enqueue(&self, message: EmailMessage) -> Result<(), EmailQueueError> {
        self.queue.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => EmailQueueError::Full,
            TrySendError::Closed(_) => EmailQueueError::Closed,
        })
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<EmailMessage>,
    sender: Arc<dyn EmailSender>,
    config: DispatcherConfig,
) {
    tracing::info!(
        capacity = config.capacity,
        max_attempts = config.max_attempts,
        "Email worker started"
    );

    while let Some(message) = receiver.recv().await {
        deliver(&sender, message, &config).await;
    }

    tracing::info!("Email worker stopped");
}

async fn deliver(sender: &Arc<dyn EmailSender>, message: EmailMessage, config: &DispatcherConfig) {
    let template = message.template.name();

    for attempt in 1..=config.max_attempts {
        let task_sender = Arc::clone(sender);
        let task_message = message.clone();
        let outcome =
            tokio::spawn(async move { task_sender.send(&task_message).await }).await;

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(to = %message.recipient, template, attempt, "Email delivered");
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    to = %message.recipient,
                    template,
                    attempt,
                    error = %e,
                    "Email delivery failed"
                );
            }
            Err(e) => {
                tracing::error!(
                    to = %message.recipient,
                    template,
                    attempt,
                    error = %e,
                    "Email sender panicked"
                );
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.retry_backoff).await;
        }
    }

    tracing::error!(
        to = %message.recipient,
        template,
        attempts = config.max_attempts,
        "Giving up on email"
    );
}
