use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};

use crate::config::DigestConfig;
use crate::error::Result;
use crate::metrics::{DigestMetrics, TriggerMetrics};
use crate::notification::{
    join_all_bounded, DigestListing, DigestPayload, FanOutDispatcher, JobKind, JobPayload,
    JobReport, NotificationJob, RecipientCandidate, RecipientResolver,
};
use crate::server::AppState;
use crate::store::UserProfile;

use super::{SkipReason, TriggerReport, TriggerResponse};

const TRIGGER: &str = "weekly_digest";

/// Build and send the weekly digest to every opted-in subscriber.
///
/// Subscribers are processed independently with bounded concurrency. A
/// subscriber whose window holds no listings gets nothing rather than an
/// empty email. Only a failure to enumerate the subscribers themselves
/// aborts the run.
pub async fn process_weekly_digest(
    resolver: &RecipientResolver,
    dispatcher: &FanOutDispatcher,
    config: &DigestConfig,
    fan_out_width: usize,
) -> Result<TriggerReport> {
    DigestMetrics::record_run();

    let subscribers = resolver.digest_subscribers().await?;
    if subscribers.is_empty() {
        tracing::info!("No digest subscribers, nothing to send");
        return Ok(TriggerReport::Skipped(SkipReason::NoDigestSubscribers));
    }

    let now = Utc::now();
    let since = now - Duration::days(config.window_days);
    let run_date = now.format("%Y-%m-%d").to_string();

    tracing::info!(
        subscriber_count = subscribers.len(),
        window_days = config.window_days,
        run_date = %run_date,
        "Building weekly digests"
    );

    let builds: Vec<_> = subscribers
        .into_iter()
        .map(|subscriber| {
            let run_date = run_date.clone();
            async move {
                digest_for_subscriber(resolver, dispatcher, config, subscriber, since, run_date)
                    .await
            }
        })
        .collect();

    let reports: Vec<JobReport> = join_all_bounded(fan_out_width, builds)
        .await
        .into_iter()
        .flatten()
        .collect();

    Ok(TriggerReport::Completed(reports))
}

/// Build one subscriber's digest job and dispatch it.
///
/// Returns `None` when the subscriber's window is empty and no email
/// should go out.
async fn digest_for_subscriber(
    resolver: &RecipientResolver,
    dispatcher: &FanOutDispatcher,
    config: &DigestConfig,
    subscriber: UserProfile,
    since: DateTime<Utc>,
    run_date: String,
) -> Option<JobReport> {
    let dedupe_key = format!("digest:{}:{}", subscriber.id, run_date);

    let listings = match resolver
        .listings_for_digest(since, config.listing_limit)
        .await
    {
        Ok(listings) => listings,
        Err(e) => {
            tracing::warn!(
                user_id = %subscriber.id,
                error = %e,
                "Failed to load listings for digest"
            );
            return Some(JobReport::resolution_failure(
                JobKind::Digest,
                dedupe_key,
                subscriber.id,
                e.to_string(),
            ));
        }
    };

    if listings.is_empty() {
        tracing::debug!(user_id = %subscriber.id, "No new listings in window, skipping digest");
        DigestMetrics::record_users_skipped(1);
        return None;
    }

    let items = listings
        .into_iter()
        .map(|listing| {
            let image_url = listing.images.first().cloned();
            DigestListing {
                id: listing.id,
                title: listing.title,
                price: listing.price,
                image_url,
                city: listing.city,
                province: listing.province,
            }
        })
        .collect();

    let job = NotificationJob::new(
        dedupe_key,
        JobPayload::Digest(DigestPayload { listings: items }),
        vec![RecipientCandidate::with_profile(subscriber)],
    );

    Some(dispatcher.dispatch(job).await)
}

/// Handle a weekly-digest run requested over HTTP
#[tracing::instrument(name = "trigger.weekly_digest", skip(state))]
pub async fn weekly_digest(State(state): State<AppState>) -> Result<Json<TriggerResponse>> {
    let report = match process_weekly_digest(
        &state.resolver,
        &state.dispatcher,
        &state.settings.digest,
        state.settings.notification.fan_out_width,
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
