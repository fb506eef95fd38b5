#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use linkpatrol_application::ports::{UrlCheckUpdate, UrlProcessor, UrlStore};
use linkpatrol_application::services::HostPolicy;
use linkpatrol_domain::{HostsFile, StoreError};

pub fn default_policy() -> Arc<HostPolicy> {
    let file = HostsFile::from_yaml("defaults: {delay: 0, recheck: 1-2, priority_recheck: 1-2}")
        .expect("yaml");
    Arc::new(HostPolicy::new(file).expect("policy"))
}

pub struct MockUrlStore {
    due: Vec<String>,
    updates: Mutex<Vec<UrlCheckUpdate>>,
    stats_bumps: AtomicU64,
}

impl MockUrlStore {
    pub fn with_due(due: Vec<String>) -> Self {
        Self {
            due,
            updates: Mutex::new(Vec::new()),
            stats_bumps: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl UrlStore for MockUrlStore {
    fn urls_due(&self) -> BoxStream<'_, Result<String, StoreError>> {
        stream::iter(self.due.clone().into_iter().map(Ok)).boxed()
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

#[derive(Default)]
pub struct RecordingProcessor {
    urls: Mutex<Vec<String>>,
}

impl RecordingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn urls(&self) -> Vec<String> {
        let mut urls = self.urls.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

#[async_trait]
impl UrlProcessor for RecordingProcessor {
    fn taste(&self, _url: &str) -> bool {
        true
    }

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError> {
        self.urls.lock().unwrap().extend(urls);
        Ok(())
    }
}
