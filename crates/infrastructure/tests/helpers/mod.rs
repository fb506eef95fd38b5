#![allow(dead_code)]

pub mod http_mock;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use linkpatrol_application::ports::{UrlCheckUpdate, UrlStore};
use linkpatrol_application::services::HostPolicy;
use linkpatrol_domain::{HostsFile, StoreError};

pub fn make_policy(yaml: &str) -> Arc<HostPolicy> {
    Arc::new(HostPolicy::new(HostsFile::from_yaml(yaml).expect("yaml")).expect("policy"))
}

pub fn zero_delay_policy() -> Arc<HostPolicy> {
    make_policy("defaults: {delay: 0, recheck: 1-2, priority_recheck: 1-2}")
}

#[derive(Default)]
pub struct MockUrlStore {
    updates: Mutex<Vec<UrlCheckUpdate>>,
    stats_bumps: AtomicU64,
}

impl MockUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<UrlCheckUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_for(&self, url: &str) -> Option<UrlCheckUpdate> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.url == url)
            .cloned()
    }
}

#[async_trait]
impl UrlStore for MockUrlStore {
    fn urls_due(&self) -> BoxStream<'_, Result<String, StoreError>> {
        stream::iter(Vec::new()).boxed()
    }

    async fn update(&self, update: UrlCheckUpdate) -> Result<(), StoreError> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }

    async fn bump_stats(&self, num_urls_checked: u64) -> Result<(), StoreError> {
        self.stats_bumps.fetch_add(num_urls_checked, Ordering::Relaxed);
        Ok(())
    }
}
