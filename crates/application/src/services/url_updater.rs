use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use linkpatrol_domain::{ProbeOutcome, RecheckRange, StoreError};

use crate::ports::{UrlCheckUpdate, UrlStore};
use crate::services::HostPolicy;

/// Turns a finished probe into a store update: stamps the check time,
/// draws jittered next-check timestamps and bumps the checked counter.
pub struct UrlUpdater {
    store: Arc<dyn UrlStore>,
    policy: Arc<HostPolicy>,
}

impl UrlUpdater {
    pub fn new(store: Arc<dyn UrlStore>, policy: Arc<HostPolicy>) -> Self {
        Self { store, policy }
    }

    pub async fn update(&self, url: &str, outcome: ProbeOutcome) -> Result<(), StoreError> {
        let (recheck, priority_recheck) = self.policy.rechecks(url);

        let check_time = Utc::now();

        self.store
            .update(UrlCheckUpdate {
                url: url.to_string(),
                check_time,
                next_check_time: jittered(check_time, recheck),
                priority_next_check_time: jittered(check_time, priority_recheck),
                outcome,
            })
            .await?;

        self.store.bump_stats(1).await
    }
}

/// Uniform draw from the recheck window, spreading recheck load so batches
/// written together do not come due together.
fn jittered(from: DateTime<Utc>, range: RecheckRange) -> DateTime<Utc> {
    let span = (range.max_seconds - range.min_seconds) as f64;
    let seconds = range.min_seconds as f64 + span * fastrand::f64();
    from + Duration::milliseconds((seconds * 1000.0) as i64)
}
