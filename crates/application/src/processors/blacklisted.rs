use std::sync::Arc;

use async_trait::async_trait;
use linkpatrol_domain::{ExtendedStatus, ProbeOutcome, StoreError, UrlStatus};

use crate::ports::UrlProcessor;
use crate::services::{HostPolicy, HostStatus, UrlUpdater};

/// Handles URLs whose host is blacklisted or skipped. Blacklisted hosts get
/// a BLACKLISTED failure on both families; skipped hosts get a status-less
/// update that only advances the next-check time.
pub struct BlacklistedUrlProcessor {
    updater: Arc<UrlUpdater>,
    policy: Arc<HostPolicy>,
}

impl BlacklistedUrlProcessor {
    pub fn new(updater: Arc<UrlUpdater>, policy: Arc<HostPolicy>) -> Self {
        Self { updater, policy }
    }
}

#[async_trait]
impl UrlProcessor for BlacklistedUrlProcessor {
    fn taste(&self, url: &str) -> bool {
        self.policy.host_status(url) != HostStatus::Ok
    }

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError> {
        for url in urls {
            match self.policy.host_status(&url) {
                HostStatus::Skipped => {
                    self.updater.update(&url, ProbeOutcome::skipped()).await?;
                }
                HostStatus::Blacklisted => {
                    let status = UrlStatus::failure(ExtendedStatus::Blacklisted);
                    self.updater.update(&url, ProbeOutcome::both(status)).await?;
                }
                HostStatus::Ok => {}
            }
        }
        Ok(())
    }
}
