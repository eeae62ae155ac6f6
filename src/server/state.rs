use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::error::AppError;
use crate::mailer::{create_mailer, Mailer};
use crate::notification::{FanOutDispatcher, PriceDropRule, RecipientResolver};
use crate::store::{create_store, DocumentStore};
use crate::template::Branding;

/// Shared application state handed to every request handler.
///
/// All heavyweight pieces live behind `Arc`, so cloning the state per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub resolver: Arc<RecipientResolver>,
    pub dispatcher: Arc<FanOutDispatcher>,
    pub price_rule: PriceDropRule,
    pub start_time: Instant,
}

impl AppState {
    pub async fn new(settings: Settings) -> Result<Self, AppError> {
        let store = create_store(&settings.store).await?;
        let mailer = create_mailer(&settings.email)?;
        let resolver = Arc::new(RecipientResolver::new(store.clone()));
        let dispatcher = Arc::new(FanOutDispatcher::new(
            store.clone(),
            mailer.clone(),
            Branding::from_config(&settings.email),
            settings.notification.fan_out_width,
        ));
        let price_rule = PriceDropRule::from_config(&settings.notification);

        Ok(Self {
            settings: Arc::new(settings),
            store,
            mailer,
            resolver,
            dispatcher,
            price_rule,
            start_time: Instant::now(),
        })
    }
}
