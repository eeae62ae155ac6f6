//! SMTP mailer built on the `lettre` async transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::EmailConfig;

use super::{DeliveryError, Mailer, OutboundEmail};

/// SMTP implementation of [`Mailer`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create an SMTP mailer from configuration.
    ///
    /// With `tls` set the transport negotiates TLS against the relay;
    /// without it the connection is plaintext, which is what local SMTP
    /// servers like Mailpit expect.
    pub fn new(config: &EmailConfig) -> Result<Self, DeliveryError> {
        let from = mailbox(Some(config.from_name.clone()), &config.from_address)?;

        let mut builder = if config.smtp.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.host)
                .map_err(|e| DeliveryError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp.host)
        };
        builder = builder.port(config.smtp.port);

        if let (Some(user), Some(pass)) = (&config.smtp.username, &config.smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn mailbox(name: Option<String>, address: &str) -> Result<Mailbox, DeliveryError> {
    let parsed: Address =
        address
            .parse()
            .map_err(|e: lettre::address::AddressError| DeliveryError::InvalidAddress {
                address: address.to_string(),
                detail: e.to_string(),
            })?;
    Ok(Mailbox::new(name, parsed))
}

/// Pull a delivery ID out of an SMTP response line.
///
/// Most servers answer `250 2.0.0 Ok: queued as <id>`; the last token
/// is the closest thing to a provider message ID. Falls back to a fresh
/// UUID when the response carries nothing usable.
fn delivery_id_from(response: &str) -> String {
    match response.split_whitespace().last() {
        Some(token) => token.trim_matches(|c| c == '<' || c == '>').to_string(),
        None => Uuid::new_v4().to_string(),
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<String, DeliveryError> {
        let to = mailbox(email.to_name.clone(), &email.to_email)?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !response.is_positive() {
            return Err(DeliveryError::Provider(response.code().to_string()));
        }

        let line = response.message().collect::<Vec<_>>().join(" ");
        Ok(delivery_id_from(&line))
    }

    fn backend_name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailer>();
    }

    #[test]
    fn test_delivery_id_from_queued_response() {
        assert_eq!(delivery_id_from("2.0.0 Ok: queued as A1B2C3"), "A1B2C3");
        assert_eq!(
            delivery_id_from("2.0.0 Ok: queued as <4f2a@mail.local>"),
            "4f2a@mail.local"
        );
    }

    #[test]
    fn test_delivery_id_from_empty_response_falls_back_to_uuid() {
        let id = delivery_id_from("   ");
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_invalid_from_address_rejected() {
        let config = EmailConfig {
            from_address: "not an address".to_string(),
            ..EmailConfig::default()
        };
        let result = SmtpMailer::new(&config);
        assert!(matches!(
            result,
            Err(DeliveryError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipient_fails_before_transport() {
        let mailer = SmtpMailer::new(&EmailConfig::default()).unwrap();
        let result = mailer
            .send(OutboundEmail {
                to_email: "no at sign".to_string(),
                to_name: None,
                subject: "hello".to_string(),
                html: "<p>hi</p>".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DeliveryError::InvalidAddress { .. })));
    }
}
