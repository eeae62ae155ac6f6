//! Mailer factory

use std::sync::Arc;

use crate::config::EmailConfig;

use super::memory::MemoryMailer;
use super::smtp::SmtpMailer;
use super::{DeliveryError, Mailer};

/// Create a mailer based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend`
/// setting:
/// - `"smtp"`: Returns an `SmtpMailer`; a bad from-address or relay
///   config is returned to the caller rather than silently falling back
/// - `"memory"` (default): Returns a capturing `MemoryMailer`
pub fn create_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>, DeliveryError> {
    match config.backend.as_str() {
        "smtp" => {
            tracing::info!(
                backend = "smtp",
                host = %config.smtp.host,
                port = config.smtp.port,
                tls = config.smtp.tls,
                "Creating SMTP mailer"
            );
            Ok(Arc::new(SmtpMailer::new(config)?))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory mailer");
            Ok(Arc::new(MemoryMailer::new()))
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown mailer backend, falling back to memory"
            );
            Ok(Arc::new(MemoryMailer::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_selected_by_default() {
        let mailer = create_mailer(&EmailConfig::default()).unwrap();
        assert_eq!(mailer.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_smtp_backend_selected() {
        let config = EmailConfig {
            backend: "smtp".to_string(),
            ..EmailConfig::default()
        };
        let mailer = create_mailer(&config).unwrap();
        assert_eq!(mailer.backend_name(), "smtp");
    }

    #[test]
    fn test_unknown_backend_falls_back_to_memory() {
        let config = EmailConfig {
            backend: "carrier-pigeon".to_string(),
            ..EmailConfig::default()
        };
        let mailer = create_mailer(&config).unwrap();
        assert_eq!(mailer.backend_name(), "memory");
    }
}
