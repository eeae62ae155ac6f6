use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::broadcast;

use crate::config::DigestConfig;
use crate::error::AppError;
use crate::metrics::TriggerMetrics;
use crate::notification::{FanOutDispatcher, RecipientResolver};
use crate::schedule::CronExpression;
use crate::triggers::{process_weekly_digest, TriggerReport};

/// How often the schedule is checked against the clock
const CHECK_INTERVAL_SECS: u64 = 30;

/// Background task that runs the weekly digest on its cron schedule.
///
/// The schedule is evaluated in the configured timezone, so "Monday 9am"
/// stays Monday 9am local time across daylight saving transitions.
pub struct DigestScheduleTask {
    config: DigestConfig,
    schedule: CronExpression,
    timezone: Tz,
    resolver: Arc<RecipientResolver>,
    dispatcher: Arc<FanOutDispatcher>,
    fan_out_width: usize,
    shutdown: broadcast::Receiver<()>,
}

impl DigestScheduleTask {
    /// Build the task, validating the configured schedule and timezone.
    ///
    /// Validation happens here even when the scheduler will not be
    /// spawned, so a bad schedule string fails at startup instead of on
    /// the first firing.
    pub fn new(
        config: DigestConfig,
        fan_out_width: usize,
        resolver: Arc<RecipientResolver>,
        dispatcher: Arc<FanOutDispatcher>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self, AppError> {
        let schedule = CronExpression::parse(&config.schedule)
            .map_err(|e| AppError::Validation(format!("digest schedule: {e}")))?;
        let timezone: Tz = config.timezone.parse().map_err(|_| {
            AppError::Validation(format!("invalid digest timezone: {}", config.timezone))
        })?;

        Ok(Self {
            config,
            schedule,
            timezone,
            resolver,
            dispatcher,
            fan_out_width,
            shutdown,
        })
    }

    /// Run the schedule loop until shutdown.
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(Duration::from_secs(CHECK_INTERVAL_SECS));

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            schedule = %self.config.schedule,
            timezone = %self.timezone,
            check_interval_secs = CHECK_INTERVAL_SECS,
            "Digest schedule task started"
        );

        // Minute slot of the last firing. The clock is checked more
        // often than once a minute, so a matching minute must fire once.
        let mut last_fired: Option<(NaiveDate, u32, u32)> = None;

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Digest schedule task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.check_and_fire(&mut last_fired).await;
                }
            }
        }

        tracing::info!("Digest schedule task stopped");
    }

    async fn check_and_fire(&self, last_fired: &mut Option<(NaiveDate, u32, u32)>) {
        let now = Utc::now().with_timezone(&self.timezone);
        if !self.schedule.matches(&now) {
            return;
        }

        let slot = (now.date_naive(), now.hour(), now.minute());
        if *last_fired == Some(slot) {
            return;
        }
        *last_fired = Some(slot);

        tracing::info!(fired_at = %now, "Digest schedule fired");

        match process_weekly_digest(
            &self.resolver,
            &self.dispatcher,
            &self.config,
            self.fan_out_width,
        )
        .await
        {
            Ok(TriggerReport::Completed(reports)) => {
                TriggerMetrics::record_completed("weekly_digest");
                let delivered: usize = reports.iter().map(|r| r.delivered).sum();
                let failed: usize = reports.iter().map(|r| r.failed).sum();
                tracing::info!(
                    jobs = reports.len(),
                    delivered,
                    failed,
                    "Scheduled digest run completed"
                );
            }
            Ok(TriggerReport::Skipped(reason)) => {
                TriggerMetrics::record_skipped("weekly_digest");
                tracing::info!(reason = reason.as_str(), "Scheduled digest run skipped");
            }
            Err(e) => {
                TriggerMetrics::record_error("weekly_digest");
                tracing::error!(error = %e, "Scheduled digest run failed");
            }
        }
    }
}
