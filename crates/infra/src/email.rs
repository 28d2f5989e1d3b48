use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};

use memoir_domain::ports::BoxFuture;
use memoir_domain::ports::email::EmailSender;

use crate::config::AppConfig;

/// SMTP-backed sender. Failures are logged and collapsed to `false`; callers
/// treat delivery as fire-and-forget.
pub struct SmtpEmailSender {
    smtp: SmtpTransport,
    from: String,
}

impl SmtpEmailSender {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        );
        let tls_parameters = TlsParameters::new(config.smtp_host.clone())?;

        let smtp = SmtpTransport::relay(&config.smtp_host)?
            .credentials(creds)
            .port(config.smtp_port)
            .tls(Tls::Wrapper(tls_parameters))
            .build();

        Ok(Self {
            smtp,
            from: config.email_from.clone(),
        })
    }
}

impl EmailSender for SmtpEmailSender {
    fn send_message(&self, to: &str, html_message: &str) -> BoxFuture<'_, bool> {
        let to = to.to_string();
        let html_message = html_message.to_string();
        let from = self.from.clone();
        let smtp = self.smtp.clone();

        Box::pin(async move {
            let delivery = tokio::task::spawn_blocking(move || {
                let message = Message::builder()
                    .from(from.parse().map_err(|err| format!("bad from address: {err}"))?)
                    .to(to.parse().map_err(|err| format!("bad to address: {err}"))?)
                    .subject("Memoir reminder notifications")
                    .header(ContentType::TEXT_HTML)
                    .body(html_message)
                    .map_err(|err| format!("message build failed: {err}"))?;
                smtp.send(&message)
                    .map_err(|err| format!("smtp send failed: {err}"))
            })
            .await;

            match delivery {
                Ok(Ok(_)) => true,
                Ok(Err(reason)) => {
                    tracing::warn!(%reason, "confirmation email not delivered");
                    false
                }
                Err(err) => {
                    tracing::warn!(error = %err, "email delivery task panicked");
                    false
                }
            }
        })
    }
}

/// Stand-in used when email is disabled; reports success without delivering.
#[derive(Default)]
pub struct NoopEmailSender;

impl EmailSender for NoopEmailSender {
    fn send_message(&self, to: &str, _html_message: &str) -> BoxFuture<'_, bool> {
        let to = to.to_string();
        Box::pin(async move {
            tracing::debug!(%to, "email disabled; dropping confirmation message");
            true
        })
    }
}
