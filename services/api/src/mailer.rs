use fleet_compliance::config::MailConfig;
use fleet_compliance::workflows::compliance::{Notifier, NotifyError, OutgoingMail};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::info;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers reminder e-mails through an authenticated SMTP relay (SendGrid by default,
/// where the API key is the relay password).
#[derive(Clone)]
pub(crate) struct SmtpNotifier {
    config: MailConfig,
    transport: Option<SmtpTransport>,
}

impl SmtpNotifier {
    /// Without an API key the notifier is built but every send fails with
    /// [`NotifyError::NotConfigured`].
    pub(crate) fn new(config: MailConfig) -> Result<Self, NotifyError> {
        let transport = match config.api_key.as_deref() {
            Some(api_key) => Some(
                SmtpTransport::starttls_relay(&config.smtp_host)
                    .map_err(|err| NotifyError::Transport(format!("SMTP relay error: {err}")))?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(
                        config.smtp_username.clone(),
                        api_key.to_string(),
                    ))
                    .timeout(Some(SMTP_TIMEOUT))
                    .build(),
            ),
            None => None,
        };

        Ok(Self { config, transport })
    }

    #[cfg(test)]
    fn with_transport(config: MailConfig, transport: SmtpTransport) -> Self {
        Self {
            config,
            transport: Some(transport),
        }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mail = OutgoingMail::compose(&self.config, to, subject, body)?;
        let transport = self.transport.as_ref().ok_or(NotifyError::NotConfigured)?;
        let message = build_message(&mail)?;

        transport
            .send(&message)
            .map_err(|err| NotifyError::Transport(format!("SMTP send failed: {err}")))?;

        info!(to = %mail.to, subject = %mail.subject, "reminder e-mail sent");
        Ok(())
    }
}

fn build_message(mail: &OutgoingMail) -> Result<Message, NotifyError> {
    let from: Mailbox = mail
        .from
        .parse()
        .map_err(|err| NotifyError::Transport(format!("invalid sender address: {err}")))?;
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|err| NotifyError::Transport(format!("invalid recipient address: {err}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(mail.html_body.clone())
        .map_err(|err| NotifyError::Transport(format!("failed to build e-mail: {err}")))
}
