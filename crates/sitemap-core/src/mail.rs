//! Outbound email delivery over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{SmtpSecurity, SmtpSettings};
use crate::error::SitemapError;

/// A file carried by an [`OutgoingEmail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// A fully composed message, independent of the transport that sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachment: EmailAttachment,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SitemapError>;
}

/// [`MailSender`] speaking SMTP through `lettre`.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is attempted until the first send.
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, SitemapError> {
        let builder = match settings.security {
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.host.as_str())
            }
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|err| SitemapError::Mail(format!("invalid SMTP relay: {err}")))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|err| SitemapError::Mail(format!("invalid SMTP relay: {err}")))?,
        };

        let mut builder = builder.port(settings.port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SitemapError> {
        let message = build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| SitemapError::Mail(format!("SMTP send failed: {err}")))?;
        Ok(())
    }
}

/// Convert an [`OutgoingEmail`] into a MIME message: both bodies as alternatives plus the
/// attachment.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, SitemapError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|err| SitemapError::Mail(format!("invalid sender address {}: {err}", email.from)))?;

    let mut builder = Message::builder().from(from).subject(email.subject.as_str());
    for recipient in &email.to {
        let to: Mailbox = recipient.parse().map_err(|err| {
            SitemapError::Mail(format!("invalid recipient address {recipient}: {err}"))
        })?;
        builder = builder.to(to);
    }

    let content_type = ContentType::parse(&email.attachment.content_type).map_err(|err| {
        SitemapError::Mail(format!(
            "invalid attachment content type {}: {err}",
            email.attachment.content_type
        ))
    })?;

    builder
        .multipart(
            MultiPart::mixed()
                .multipart(
                    MultiPart::alternative()
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_PLAIN)
                                .body(email.text_body.clone()),
                        )
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_HTML)
                                .body(email.html_body.clone()),
                        ),
                )
                .singlepart(
                    Attachment::new(email.attachment.filename.clone())
                        .body(email.attachment.body.clone(), content_type),
                ),
        )
        .map_err(|err| SitemapError::Mail(format!("failed to build email message: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: Vec<&str>) -> OutgoingEmail {
        OutgoingEmail {
            from: "sitemap@example.com".to_string(),
            to: to.into_iter().map(String::from).collect(),
            subject: "MUSEMENT.COM sitemap for sitemap_it-IT.xml".to_string(),
            html_body: "<p>attached</p>".to_string(),
            text_body: "attached".to_string(),
            attachment: EmailAttachment {
                filename: "sitemap_it-IT.xml".to_string(),
                content_type: "application/xml".to_string(),
                body: b"<urlset/>".to_vec(),
            },
        }
    }

    #[test]
    fn message_carries_recipients_subject_and_attachment() {
        let message = build_message(&email(vec!["a@example.com", "b@example.com"])).expect("build");
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("Subject: MUSEMENT.COM sitemap for sitemap_it-IT.xml"));
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("filename=\"sitemap_it-IT.xml\""));
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn malformed_recipient_is_a_mail_error() {
        let err = build_message(&email(vec!["not an address"])).unwrap_err();
        assert!(matches!(err, SitemapError::Mail(_)));
    }

    #[test]
    fn no_recipients_is_a_mail_error() {
        let err = build_message(&email(Vec::new())).unwrap_err();
        assert!(matches!(err, SitemapError::Mail(_)));
    }

    #[tokio::test]
    async fn unreachable_relay_reports_failure() {
        let settings = SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..SmtpSettings::default()
        };
        let mailer = SmtpMailer::from_settings(&settings).expect("mailer");
        let err = mailer.send(&email(vec!["a@example.com"])).await.unwrap_err();
        assert!(err.to_string().contains("SMTP send failed"));
    }
}
