use log::debug;
use mockall::automock;
use thiserror::Error;

/// A notifier that sends a message to a Telegram chat.
pub mod telegram;

/// A custom error for describing the error cases for notifiers
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The endpoint answered with a non-success status code.
    #[error("the notification endpoint returned status code {0}")]
    UnexpectedStatus(u16),
    /// The request never completed, e.g. a network error or a timeout.
    #[error("the notification request failed: {0}")]
    FailedRequest(String),
}

/// A notifier delivers a single message about committed work.
///
/// Delivery is fire-and-forget: the pipeline never retries a failed
/// notification inside a run, it only refrains from arming the cooldown
/// so the next eligible run tries again.
#[automock]
pub trait Notifier {
    /// Send one message embedding the number of projects that were committed.
    fn notify(&self, committed_count: usize) -> Result<(), NotifyError>;
}

/// A notifier for runs without a configured endpoint: the pipeline still
/// commits and logs, the message is simply dropped.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, committed_count: usize) -> Result<(), NotifyError> {
        debug!("Notifications are not configured, dropping message about {committed_count} commit(s).");
        Ok(())
    }
}
