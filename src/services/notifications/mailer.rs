//! Delivery of rendered emails through one of the configured providers.
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lettre::{
    message::{header::ContentType, Attachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor,
};
use serde::Serialize;

use crate::constants::email as constants;

/// A PNG shown inline via `cid:` in the HTML body.
#[derive(Clone, Debug)]
pub struct InlineImage {
    pub content_id: String,
    pub filename: String,
    pub png: Vec<u8>,
}

/// A fully rendered email ready for delivery.
#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub inline_images: Vec<InlineImage>,
}

#[derive(Clone)]
pub enum Mailer {
    /// SMTP with STARTTLS.
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: String,
    },
    /// The Resend HTTPS API.
    Resend {
        http: reqwest::Client,
        api_key: Arc<str>,
        from: String,
    },
    /// Development mode: messages are logged, never sent.
    Log,
}

#[derive(Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
    content_type: &'static str,
    content_id: &'a str,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

impl<'a> ResendRequest<'a> {
    fn new(from: &'a str, email: &'a OutgoingEmail) -> Self {
        Self {
            from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            attachments: email
                .inline_images
                .iter()
                .map(|image| ResendAttachment {
                    filename: &image.filename,
                    content: STANDARD.encode(&image.png),
                    content_type: "image/png",
                    content_id: &image.content_id,
                })
                .collect(),
        }
    }
}

/// Assemble the MIME message: an HTML part with related inline images.
fn build_message(from: &str, email: &OutgoingEmail) -> Result<Message, errors::EmailError> {
    let mut related = MultiPart::related().singlepart(SinglePart::html(email.html.clone()));
    for image in &email.inline_images {
        related = related.singlepart(
            Attachment::new_inline(image.content_id.clone())
                .body(image.png.clone(), ContentType::parse("image/png")?),
        );
    }
    Ok(Message::builder()
        .from(
            from.parse()
                .map_err(|_| errors::EmailError::InvalidAddress(from.to_owned()))?,
        )
        .to(email
            .to
            .parse()
            .map_err(|_| errors::EmailError::InvalidAddress(email.to.clone()))?)
        .subject(email.subject.as_str())
        .multipart(related)?)
}

impl Mailer {
    /// Build the provider selected by `EMAIL_PROVIDER`.
    pub fn from_env(http: reqwest::Client) -> Result<Self, errors::MailerSetupError> {
        match constants::EMAIL_PROVIDER.as_str() {
            "smtp" => {
                let credentials = Credentials::new(
                    constants::SMTP_USERNAME.clone(),
                    constants::SMTP_PASSWORD.clone(),
                );
                let transport =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&constants::SMTP_HOST)?
                        .port(*constants::SMTP_PORT)
                        .credentials(credentials)
                        .build();
                Ok(Self::Smtp {
                    transport,
                    from: constants::EMAIL_FROM.clone(),
                })
            }
            "resend" => Ok(Self::Resend {
                http,
                api_key: Arc::from(constants::RESEND_API_KEY.as_str()),
                from: constants::EMAIL_FROM.clone(),
            }),
            "log" => Ok(Self::Log),
            other => Err(errors::MailerSetupError::UnknownProvider(other.to_owned())),
        }
    }

    pub const fn provider_name(&self) -> &'static str {
        match *self {
            Self::Smtp { .. } => "smtp",
            Self::Resend { .. } => "resend",
            Self::Log => "log",
        }
    }

    /// Deliver one email.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), errors::EmailError> {
        match *self {
            Self::Smtp {
                ref transport,
                ref from,
            } => {
                transport.send(build_message(from, email)?).await?;
            }
            Self::Resend {
                ref http,
                ref api_key,
                ref from,
            } => {
                http.post(constants::RESEND_API_URL)
                    .bearer_auth(api_key)
                    .json(&ResendRequest::new(from, email))
                    .send()
                    .await?
                    .error_for_status()?;
            }
            Self::Log => {
                tracing::info!(
                    to = %email.to,
                    subject = %email.subject,
                    inline_images = email.inline_images.len(),
                    "Email provider is log, message not sent"
                );
                return Ok(());
            }
        }
        tracing::info!(to = %email.to, subject = %email.subject, provider = self.provider_name(), "Email sent");
        Ok(())
    }
}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EmailError {
        #[error("SMTP error: {0}")]
        Smtp(#[from] lettre::transport::smtp::Error),
        #[error("Failed to build message: {0}")]
        MessageBuild(#[from] lettre::error::Error),
        #[error("Invalid content type: {0}")]
        ContentType(#[from] lettre::message::header::ContentTypeErr),
        #[error("Invalid email address: {0}")]
        InvalidAddress(String),
        #[error("Resend API error: {0}")]
        Resend(#[from] reqwest::Error),
    }

    #[derive(Debug, Error)]
    pub enum MailerSetupError {
        #[error("Unknown EMAIL_PROVIDER {0:?}, expected smtp, resend or log")]
        UnknownProvider(String),
        #[error(transparent)]
        Smtp(#[from] lettre::transport::smtp::Error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> OutgoingEmail {
        OutgoingEmail {
            to: String::from("ravi@example.com"),
            subject: String::from("TyreFusion Order Confirmation"),
            html: String::from("<p>Hello</p><img src=\"cid:upi_qr_code\"/>"),
            inline_images: vec![InlineImage {
                content_id: String::from("upi_qr_code"),
                filename: String::from("upi-qr.png"),
                png: vec![0x89, 0x50, 0x4e, 0x47],
            }],
        }
    }

    #[test]
    fn mime_message_builds_with_inline_image() {
        let message =
            build_message("TyreFusion <orders@tyrefusion.in>", &sample_email()).expect("builds");
        let raw = String::from_utf8(message.formatted()).expect("utf8");
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <upi_qr_code>"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let mut email = sample_email();
        email.to = String::from("not an address");
        assert!(matches!(
            build_message("orders@tyrefusion.in", &email),
            Err(errors::EmailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn resend_payload_base64_encodes_attachments() {
        let email = sample_email();
        let json = serde_json::to_value(ResendRequest::new("orders@tyrefusion.in", &email))
            .expect("serializes");
        assert_eq!(json["to"][0], "ravi@example.com");
        assert_eq!(json["attachments"][0]["content"], "iVBORw==");
        assert_eq!(json["attachments"][0]["content_id"], "upi_qr_code");
    }

    #[tokio::test]
    async fn log_provider_never_fails() {
        assert!(Mailer::Log.send(&sample_email()).await.is_ok());
    }
}
