use std::sync::Arc;

use async_trait::async_trait;
use linkpatrol_domain::StoreError;

use crate::ports::UrlProcessor;

/// Buckets a batch by the first processor that tastes each URL and runs the
/// per-bucket batches concurrently. Tasting order is fixed: blacklisted
/// before http before the fallback.
pub struct DispatchingUrlProcessor {
    blacklisted: Arc<dyn UrlProcessor>,
    http: Arc<dyn UrlProcessor>,
    fallback: Arc<dyn UrlProcessor>,
}

impl DispatchingUrlProcessor {
    pub fn new(
        blacklisted: Arc<dyn UrlProcessor>,
        http: Arc<dyn UrlProcessor>,
        fallback: Arc<dyn UrlProcessor>,
    ) -> Self {
        Self {
            blacklisted,
            http,
            fallback,
        }
    }
}

#[async_trait]
impl UrlProcessor for DispatchingUrlProcessor {
    fn taste(&self, _url: &str) -> bool {
        true
    }

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError> {
        let mut blacklisted_urls = Vec::new();
        let mut http_urls = Vec::new();
        let mut fallback_urls = Vec::new();

        for url in urls {
            if self.blacklisted.taste(&url) {
                blacklisted_urls.push(url);
            } else if self.http.taste(&url) {
                http_urls.push(url);
            } else {
                fallback_urls.push(url);
            }
        }

        let (blacklisted, http, fallback) = tokio::join!(
            self.blacklisted.process_urls(blacklisted_urls),
            self.http.process_urls(http_urls),
            self.fallback.process_urls(fallback_urls),
        );

        blacklisted.and(http).and(fallback)
    }
}
