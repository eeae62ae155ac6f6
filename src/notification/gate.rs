//! Delivery gating.
//!
//! Two pure decision points sit in front of every send: the per-user
//! preference gate and the price-drop significance rule.

use crate::config::NotificationConfig;
use crate::store::NotificationPreferences;

use super::JobKind;

/// Whether a user's preferences allow an email of the given kind.
///
/// Message and price-drop emails are opt-out: only an explicit `false`
/// suppresses them. The weekly digest is opt-in: anything but an
/// explicit `true` suppresses it.
pub fn preference_allows(prefs: &NotificationPreferences, kind: JobKind) -> bool {
    match kind {
        JobKind::Message => prefs.messages != Some(false),
        JobKind::PriceDrop => prefs.price_drops != Some(false),
        JobKind::Digest => prefs.weekly_digest == Some(true),
    }
}

/// Decision on a listing price change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceChangeDecision {
    /// Price rose or is unchanged
    NotDropped,
    /// Dropped, but below both thresholds
    BelowThreshold { amount: f64, percent: i64 },
    /// Dropped enough to notify
    Qualifies { amount: f64, percent: i64 },
}

/// Significance thresholds for price-drop alerts.
#[derive(Debug, Clone, Copy)]
pub struct PriceDropRule {
    /// Minimum percentage drop
    pub min_percent: i64,
    /// Minimum absolute drop in dollars
    pub min_amount: f64,
}

impl PriceDropRule {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            min_percent: config.price_drop_min_percent,
            min_amount: config.price_drop_min_amount,
        }
    }

    /// Evaluate a price change from `before` to `after`.
    ///
    /// The percentage is rounded to the nearest whole number before the
    /// comparison, so the decision always agrees with what the alert
    /// email shows. Meeting either threshold qualifies the drop.
    pub fn evaluate(&self, before: f64, after: f64) -> PriceChangeDecision {
        if after >= before {
            return PriceChangeDecision::NotDropped;
        }

        let amount = before - after;
        let percent = if before > 0.0 {
            (100.0 * amount / before).round() as i64
        } else {
            0
        };

        if percent >= self.min_percent || amount >= self.min_amount {
            PriceChangeDecision::Qualifies { amount, percent }
        } else {
            PriceChangeDecision::BelowThreshold { amount, percent }
        }
    }
}

impl Default for PriceDropRule {
    fn default() -> Self {
        Self::from_config(&NotificationConfig::default())
    }
}
