// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer (business logic)
pub mod mailer;
pub mod notification;
pub mod schedule;
pub mod store;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod tasks;
pub mod telemetry;
