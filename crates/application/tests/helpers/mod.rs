#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Semaphore;

use linkpatrol_application::ports::{UrlCheckUpdate, UrlProcessor, UrlStore};
use linkpatrol_application::services::HostPolicy;
use linkpatrol_domain::{HostsFile, StoreError};

pub fn make_policy(yaml: &str) -> Arc<HostPolicy> {
    Arc::new(HostPolicy::new(HostsFile::from_yaml(yaml).expect("yaml")).expect("policy"))
}

pub fn default_policy() -> Arc<HostPolicy> {
    make_policy("defaults: {delay: 0, recheck: 1-2, priority_recheck: 1-2}")
}

#[derive(Default)]
pub struct MockUrlStore {
    updates: Mutex<Vec<UrlCheckUpdate>>,
    stats_bumps: AtomicU64,
    due: Vec<String>,
}

impl MockUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_due(due: Vec<String>) -> Self {
        Self {
            due,
            ..Self::default()
        }
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

    pub fn stats_bumps(&self) -> u64 {
        self.stats_bumps.load(Ordering::Relaxed)
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

/// Processor that records batches and can be held in-flight through a
/// zero-permit semaphore (one permit releases one batch).
#[derive(Default)]
pub struct RecordingProcessor {
    batches: Mutex<Vec<Vec<String>>>,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
    delay: Option<Duration>,
    hold: Option<Arc<Semaphore>>,
}

impl RecordingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_hold(mut self, hold: Arc<Semaphore>) -> Self {
        self.hold = Some(hold);
        self
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.batches().into_iter().flatten().collect();
        urls.sort();
        urls
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlProcessor for RecordingProcessor {
    fn taste(&self, _url: &str) -> bool {
        true
    }

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError> {
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.acquire().await.expect("semaphore closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut sorted = urls;
        sorted.sort();
        self.batches.lock().unwrap().push(sorted);

        self.concurrent.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
