use axum::{extract::State, Json};

use crate::error::Result;
use crate::metrics::TriggerMetrics;
use crate::notification::{
    FanOutDispatcher, JobPayload, NotificationJob, PriceChangeDecision, PriceDropPayload,
    PriceDropRule, RecipientCandidate, RecipientResolver,
};
use crate::server::AppState;

use super::{ListingUpdatedRequest, SkipReason, TriggerReport, TriggerResponse};

const TRIGGER: &str = "listing_updated";

/// Turn a listing update into price-drop alerts for everyone who
/// favorited the listing.
///
/// Only the before/after snapshots in the request are consulted. Updates
/// that are not a significant price drop are skips, as is a drop on a
/// listing nobody favorited.
pub async fn process_listing_updated(
    resolver: &RecipientResolver,
    dispatcher: &FanOutDispatcher,
    rule: PriceDropRule,
    request: ListingUpdatedRequest,
) -> Result<TriggerReport> {
    let (amount, percent) = match rule.evaluate(request.before.price, request.after.price) {
        PriceChangeDecision::NotDropped => {
            return Ok(TriggerReport::Skipped(SkipReason::PriceNotDropped));
        }
        PriceChangeDecision::BelowThreshold { amount, percent } => {
            tracing::debug!(
                listing_id = %request.listing_id,
                amount,
                percent,
                "Price drop below alert thresholds, skipping"
            );
            return Ok(TriggerReport::Skipped(SkipReason::DropBelowThreshold));
        }
        PriceChangeDecision::Qualifies { amount, percent } => (amount, percent),
    };

    let user_ids = resolver.favoriting_users(&request.listing_id).await?;
    if user_ids.is_empty() {
        tracing::debug!(
            listing_id = %request.listing_id,
            "Qualifying price drop but no favorites, skipping"
        );
        return Ok(TriggerReport::Skipped(SkipReason::NoFavorites));
    }

    tracing::info!(
        listing_id = %request.listing_id,
        old_price = request.before.price,
        new_price = request.after.price,
        percent,
        favorite_count = user_ids.len(),
        "Dispatching price-drop alerts"
    );

    let dedupe_key = format!(
        "price_drop:{}:{}:{}",
        request.listing_id, request.before.price, request.after.price
    );
    let payload = JobPayload::PriceDrop(PriceDropPayload {
        listing_id: request.listing_id,
        listing_title: request.after.title,
        image_url: request.after.images.first().cloned(),
        old_price: request.before.price,
        new_price: request.after.price,
        drop_amount: amount,
        drop_percent: percent,
    });

    let recipients = user_ids.into_iter().map(RecipientCandidate::by_id).collect();
    let job = NotificationJob::new(dedupe_key, payload, recipients);
    let report = dispatcher.dispatch(job).await;

    Ok(TriggerReport::Completed(vec![report]))
}

/// Handle a listing-updated trigger from the marketplace
#[tracing::instrument(
    name = "trigger.listing_updated",
    skip(state, request),
    fields(
        listing_id = %request.listing_id,
        old_price = request.before.price,
        new_price = request.after.price
    )
)]
pub async fn listing_updated(
    State(state): State<AppState>,
    Json(request): Json<ListingUpdatedRequest>,
) -> Result<Json<TriggerResponse>> {
    let report = match process_listing_updated(
        &state.resolver,
        &state.dispatcher,
        state.price_rule,
        request,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            TriggerMetrics::record_error(TRIGGER);
            return Err(e);
        }
    };

    match &report {
        TriggerReport::Skipped(_) => TriggerMetrics::record_skipped(TRIGGER),
        TriggerReport::Completed(_) => TriggerMetrics::record_completed(TRIGGER),
    }

    Ok(Json(TriggerResponse::from_report(TRIGGER, report)))
}
