mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, DigestConfig, EmailConfig, NotificationConfig, OtelConfig,
    ServerConfig, Settings, SmtpConfig, StoreConfig,
};
