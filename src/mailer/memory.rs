//! In-memory mailer that captures messages instead of sending them.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{DeliveryError, Mailer, OutboundEmail};

/// A captured email.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub delivery_id: String,
    pub email: OutboundEmail,
    pub sent_at: DateTime<Utc>,
}

/// In-memory implementation of [`Mailer`].
///
/// Captures every send in arrival order. `fail_for` arms a permanent
/// failure for one recipient address so delivery error paths can be
/// exercised.
pub struct MemoryMailer {
    /// Captured emails keyed by send sequence number
    sent: DashMap<u64, SentEmail>,
    seq: AtomicU64,
    /// Addresses that should fail, with the failure detail
    failures: DashMap<String, String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self {
            sent: DashMap::new(),
            seq: AtomicU64::new(0),
            failures: DashMap::new(),
        }
    }

    /// Arm a permanent failure for the given recipient address.
    pub fn fail_for(&self, address: &str, detail: &str) {
        self.failures
            .insert(address.to_string(), detail.to_string());
    }

    /// Captured emails in send order.
    pub fn sent(&self) -> Vec<SentEmail> {
        let mut all: Vec<(u64, SentEmail)> = self
            .sent
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, email)| email).collect()
    }

    /// Captured emails for one recipient address.
    pub fn sent_to(&self, address: &str) -> Vec<SentEmail> {
        self.sent()
            .into_iter()
            .filter(|sent| sent.email.to_email == address)
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.len()
    }
}

impl Default for MemoryMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutboundEmail) -> Result<String, DeliveryError> {
        if let Some(detail) = self.failures.get(&email.to_email) {
            return Err(DeliveryError::Provider(detail.value().clone()));
        }

        let delivery_id = Uuid::new_v4().to_string();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.sent.insert(
            seq,
            SentEmail {
                delivery_id: delivery_id.clone(),
                email,
                sent_at: Utc::now(),
            },
        );
        Ok(delivery_id)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
