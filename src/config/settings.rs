use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Document store backend: "memory" or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Mailer backend: "memory" or "smtp"
    #[serde(default = "default_email_backend")]
    pub backend: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Base URL for links embedded in outgoing emails
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Maximum number of recipient deliveries in flight at once
    #[serde(default = "default_fan_out_width")]
    pub fan_out_width: usize,
    /// Minimum percentage drop for a price alert
    #[serde(default = "default_min_percent")]
    pub price_drop_min_percent: i64,
    /// Minimum absolute drop (in dollars) for a price alert
    #[serde(default = "default_min_amount")]
    pub price_drop_min_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    /// Cron expression for the weekly digest (five fields)
    #[serde(default = "default_digest_schedule")]
    pub schedule: String,
    /// IANA timezone the schedule is evaluated in
    #[serde(default = "default_digest_timezone")]
    pub timezone: String,
    /// Maximum listings included per digest email
    #[serde(default = "default_listing_limit")]
    pub listing_limit: i64,
    /// Lookback window in days
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Run the in-process scheduler; off by default so an external
    /// scheduler can drive the job endpoint instead
    #[serde(default)]
    pub run_scheduler: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otlp_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/classifieds".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_email_backend() -> String {
    "memory".to_string()
}

fn default_from_name() -> String {
    "Canadian Classifieds".to_string()
}

fn default_from_address() -> String {
    "onboarding@resend.dev".to_string()
}

fn default_site_name() -> String {
    "Canadian AI Classifieds".to_string()
}

fn default_base_url() -> String {
    "https://canadian-ai-classifieds.web.app".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_fan_out_width() -> usize {
    16
}

fn default_min_percent() -> i64 {
    10
}

fn default_min_amount() -> f64 {
    50.0
}

fn default_digest_schedule() -> String {
    "0 9 * * MON".to_string()
}

fn default_digest_timezone() -> String {
    "America/Toronto".to_string()
}

fn default_listing_limit() -> i64 {
    10
}

fn default_window_days() -> i64 {
    7
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "classifieds-notification-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("store.backend", "memory")?
            .set_default("email.backend", "memory")?
            .set_default("digest.schedule", "0 9 * * MON")?
            .set_default("digest.timezone", "America/Toronto")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, API_KEY, STORE_BACKEND, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            backend: default_email_backend(),
            from_name: default_from_name(),
            from_address: default_from_address(),
            site_name: default_site_name(),
            base_url: default_base_url(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            tls: false,
            username: None,
            password: None,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            fan_out_width: default_fan_out_width(),
            price_drop_min_percent: default_min_percent(),
            price_drop_min_amount: default_min_amount(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            schedule: default_digest_schedule(),
            timezone: default_digest_timezone(),
            listing_limit: default_listing_limit(),
            window_days: default_window_days(),
            run_scheduler: false,
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
