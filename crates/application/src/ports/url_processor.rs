use async_trait::async_trait;
use linkpatrol_domain::StoreError;

#[async_trait]
pub trait UrlProcessor: Send + Sync {
    /// Whether this processor wants the URL. The dispatcher feeds each URL
    /// to the first processor that tastes it.
    fn taste(&self, url: &str) -> bool;

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError>;
}
