//! Outbound email delivery.
//!
//! [`Mailer`] abstracts the email transport. Two backends exist: an
//! SMTP transport built on `lettre` and an in-memory capture used by
//! development and tests.

mod factory;
mod memory;
mod smtp;

pub use factory::create_mailer;
pub use memory::{MemoryMailer, SentEmail};
pub use smtp::SmtpMailer;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while sending an email.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The recipient or sender address could not be parsed
    #[error("Invalid address {address}: {detail}")]
    InvalidAddress { address: String, detail: String },

    /// The MIME message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),

    /// The provider accepted the connection but rejected the message
    #[error("Provider rejected message: {0}")]
    Provider(String),

    /// SMTP transport-level failure (connection, authentication, ...)
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A fully rendered email ready to hand to the transport.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
}

/// Outbound email transport.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (`Send + Sync`) as they will be
/// shared across concurrent recipient deliveries.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email.
    ///
    /// Returns the provider's delivery ID on success. A failure is
    /// final; the pipeline never retries a send.
    async fn send(&self, email: OutboundEmail) -> Result<String, DeliveryError>;

    /// Backend type identifier for logs and health reporting.
    fn backend_name(&self) -> &'static str;
}
