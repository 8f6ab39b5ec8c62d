//! SMTP mail transport.
//!
//! Wraps a STARTTLS relay behind the `MailTransport` trait. Connection and
//! authentication failures surface as errors from `send`; the notifier logs
//! them and keeps the pipeline running.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{MailTransport, MotionAlert};

pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    /// Build a STARTTLS transport for the given relay. The username is the
    /// sender address, per the usual app-password setup.
    pub fn new(server: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let transport = SmtpTransport::starttls_relay(server)
            .with_context(|| format!("invalid SMTP relay {}", server))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&mut self, alert: &MotionAlert) -> Result<()> {
        let from: Mailbox = alert.from.parse().context("invalid EMAIL_FROM address")?;
        let to: Mailbox = alert.to.parse().context("invalid EMAIL_TO address")?;
        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(alert.subject.clone());

        let message = match &alert.attachment {
            Some(att) => builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(alert.body.clone()))
                    .singlepart(
                        Attachment::new(att.filename.clone())
                            .body(att.jpeg.clone(), ContentType::parse("image/jpeg")?),
                    ),
            )?,
            None => builder.body(alert.body.clone())?,
        };

        self.transport
            .send(&message)
            .context("SMTP send failed")?;
        Ok(())
    }
}
