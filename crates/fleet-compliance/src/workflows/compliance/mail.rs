use serde::Serialize;

use super::repository::NotifyError;
use crate::config::MailConfig;

/// Fully addressed reminder e-mail ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMail {
    /// Fails with [`NotifyError::NotConfigured`] while no mail API key is set.
    pub fn compose(
        config: &MailConfig,
        to: &str,
        subject: &str,
        message: &str,
    ) -> Result<Self, NotifyError> {
        if config.api_key.is_none() {
            return Err(NotifyError::NotConfigured);
        }

        let to = to.trim();
        if to.is_empty() {
            return Err(NotifyError::Transport("recipient address is empty".to_string()));
        }

        Ok(Self {
            from: config.sender.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: format!("<strong>{message}</strong>"),
        })
    }
}
