use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use linkpatrol_domain::{ProbeOutcome, StoreError};

/// Completed check for one URL, ready to persist. Which of the two
/// next-check timestamps applies is decided by the stored row's priority
/// flag, so both are always supplied.
#[derive(Debug, Clone)]
pub struct UrlCheckUpdate {
    pub url: String,
    pub check_time: DateTime<Utc>,
    pub next_check_time: DateTime<Utc>,
    pub priority_next_check_time: DateTime<Utc>,
    pub outcome: ProbeOutcome,
}

#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Stream of URLs due for rechecking. Ordering is the store's business;
    /// the query is expected to be host-fair and bounded.
    fn urls_due(&self) -> BoxStream<'_, Result<String, StoreError>>;

    async fn update(&self, update: UrlCheckUpdate) -> Result<(), StoreError>;

    async fn bump_stats(&self, num_urls_checked: u64) -> Result<(), StoreError>;
}
