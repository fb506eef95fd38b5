use std::sync::Arc;

use async_trait::async_trait;
use linkpatrol_domain::{ProbeOutcome, StoreError};

use crate::ports::UrlProcessor;
use crate::services::UrlUpdater;

/// Fallback for unsupported schemes: records the check without a status so
/// the URL keeps its stored state but stops being due.
pub struct DummyUrlProcessor {
    updater: Arc<UrlUpdater>,
}

impl DummyUrlProcessor {
    pub fn new(updater: Arc<UrlUpdater>) -> Self {
        Self { updater }
    }
}

#[async_trait]
impl UrlProcessor for DummyUrlProcessor {
    fn taste(&self, _url: &str) -> bool {
        true
    }

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError> {
        for url in urls {
            self.updater.update(&url, ProbeOutcome::skipped()).await?;
        }
        Ok(())
    }
}
