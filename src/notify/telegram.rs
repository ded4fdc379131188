use super::{Notifier, NotifyError};
use log::debug;
use std::time::Duration;
use ureq::{Agent, AgentBuilder};

const TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

/// Notifications should never stall a run for long.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// A notifier that sends a message to a Telegram chat through the Bot API.
///
/// One blocking `sendMessage` call per notification, with a short timeout.
/// The response body is ignored, only the status code matters.
pub struct TelegramNotifier {
    agent: Agent,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a new notifier for a bot token and a chat id.
    pub fn new(token: String, chat_id: String) -> Self {
        TelegramNotifier::new_with_base_url(String::from(TELEGRAM_BASE_URL), token, chat_id)
    }

    /// Create a new notifier against a custom endpoint, e.g. a local
    /// server in tests or a self-hosted Bot API relay.
    pub fn new_with_base_url(base_url: String, token: String, chat_id: String) -> Self {
        let agent = AgentBuilder::new().timeout(NOTIFY_TIMEOUT).build();

        TelegramNotifier {
            agent,
            base_url,
            token,
            chat_id,
        }
    }
}

impl Notifier for TelegramNotifier {
    /// Send one `sendMessage` request embedding the committed count.
    /// Any transport error or non-success status code is a failure.
    fn notify(&self, committed_count: usize) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let text = format!("Committed pending work in {committed_count} project(s).");

        debug!("Sending notification to chat {}.", self.chat_id);
        self.agent
            .post(&url)
            .send_form(&[("chat_id", self.chat_id.as_str()), ("text", &text)])
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => NotifyError::UnexpectedStatus(code),
                ureq::Error::Transport(transport) => NotifyError::FailedRequest(transport.to_string()),
            })?;

        Ok(())
    }
}
