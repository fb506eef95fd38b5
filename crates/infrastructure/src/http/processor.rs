use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use reqwest::Method;
use tracing::error;
use url::Url;

use linkpatrol_application::ports::UrlProcessor;
use linkpatrol_application::services::{HostPolicy, UrlUpdater};
use linkpatrol_domain::{
    is_http_success, DnsFailure, ExtendedStatus, ProbeError, ProbeOutcome, StoreError, UrlStatus,
};

use crate::dns::{FamilyResolution, PrecachedResolver};
use crate::http::probe::{build_clients, request_following_redirects, ProbeClients};

/// Probes http(s) URLs over both address families. Each batch gets a fresh
/// DNS memo and a fresh pair of family-bound clients, so cached answers
/// never outlive the batch.
pub struct HttpUrlProcessor {
    updater: Arc<UrlUpdater>,
    policy: Arc<HostPolicy>,
    resolver: TokioAsyncResolver,
    timeout: Duration,
    skip_ipv6: bool,
    satisfy_with_ipv6: bool,
    strict_ssl: bool,
}

impl HttpUrlProcessor {
    pub fn new(
        updater: Arc<UrlUpdater>,
        policy: Arc<HostPolicy>,
        resolver: TokioAsyncResolver,
        timeout: Duration,
    ) -> Self {
        Self {
            updater,
            policy,
            resolver,
            timeout,
            skip_ipv6: false,
            satisfy_with_ipv6: false,
            strict_ssl: false,
        }
    }

    pub fn with_skip_ipv6(mut self, skip_ipv6: bool) -> Self {
        self.skip_ipv6 = skip_ipv6;
        self
    }

    pub fn with_satisfy_with_ipv6(mut self, satisfy_with_ipv6: bool) -> Self {
        self.satisfy_with_ipv6 = satisfy_with_ipv6;
        self
    }

    pub fn with_strict_ssl(mut self, strict_ssl: bool) -> Self {
        self.strict_ssl = strict_ssl;
        self
    }

    /// HEAD first; on a non-2xx answer fall back to GET. The politeness
    /// delay runs before every request. Errors out of the HEAD classify
    /// immediately, they do not trigger the fallback.
    async fn check_url(&self, url: &Url, client: &reqwest::Client) -> UrlStatus {
        let delay = Duration::from_secs_f64(self.policy.delay(url.as_str()));

        tokio::time::sleep(delay).await;

        match request_following_redirects(client, Method::HEAD, url).await {
            Ok(response) if is_http_success(response.status) => {
                return UrlStatus::http(response.status, response.permanent_redirect_target);
            }
            Ok(_) => {}
            Err(e) => return e.into_url_status(),
        }

        tokio::time::sleep(delay).await;

        match request_following_redirects(client, Method::GET, url).await {
            Ok(response) => UrlStatus::http(response.status, response.permanent_redirect_target),
            Err(e) => e.into_url_status(),
        }
    }

    async fn process_one(
        &self,
        url: &str,
        resolver: &PrecachedResolver,
        clients: &ProbeClients,
    ) -> Result<(), StoreError> {
        let started = Instant::now();

        let parsed = Url::parse(url).ok();
        let host = parsed
            .as_ref()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

        let (Some(parsed), Some(host)) = (parsed, host) else {
            let status = UrlStatus::failure(ExtendedStatus::InvalidUrl);
            return self.updater.update(url, ProbeOutcome::both(status)).await;
        };

        let dns = resolver.resolve(&host).await;

        let ipv6 = match ipv6_action(self.skip_ipv6, &dns.ipv6) {
            FamilyAction::Skip => None,
            FamilyAction::Fail(failure) => Some(ProbeError::Dns(failure).into_url_status()),
            FamilyAction::Probe => Some(self.check_url(&parsed, &clients.v6).await),
        };

        let ipv4 = match ipv4_action(&dns.ipv4, self.satisfy_with_ipv6, ipv6.as_ref()) {
            FamilyAction::Skip => None,
            FamilyAction::Fail(failure) => Some(ProbeError::Dns(failure).into_url_status()),
            FamilyAction::Probe => Some(self.check_url(&parsed, &clients.v4).await),
        };

        self.updater
            .update(
                url,
                ProbeOutcome {
                    ipv4,
                    ipv6,
                    check_duration: Some(started.elapsed()),
                },
            )
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FamilyAction {
    Probe,
    Skip,
    Fail(DnsFailure),
}

fn ipv6_action(skip_ipv6: bool, dns: &FamilyResolution) -> FamilyAction {
    if skip_ipv6 {
        FamilyAction::Skip
    } else if let Some(failure) = dns.error {
        FamilyAction::Fail(failure)
    } else {
        FamilyAction::Probe
    }
}

/// A failed IPv4 lookup always wins over the satisfy-with-ipv6 shortcut:
/// a synthesized DNS failure is recorded even when IPv6 already succeeded.
fn ipv4_action(
    dns: &FamilyResolution,
    satisfy_with_ipv6: bool,
    ipv6: Option<&UrlStatus>,
) -> FamilyAction {
    if let Some(failure) = dns.error {
        FamilyAction::Fail(failure)
    } else if satisfy_with_ipv6 && ipv6.is_some_and(|status| status.success) {
        FamilyAction::Skip
    } else {
        FamilyAction::Probe
    }
}

#[async_trait]
impl UrlProcessor for HttpUrlProcessor {
    fn taste(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    async fn process_urls(&self, urls: Vec<String>) -> Result<(), StoreError> {
        let resolver = Arc::new(PrecachedResolver::new(self.resolver.clone()));

        let clients = match build_clients(&resolver, self.timeout, self.strict_ssl) {
            Ok(clients) => clients,
            Err(e) => {
                // The batch stays due in the store and is retried next
                // iteration.
                error!(error = %e, "failed to build probe clients");
                return Ok(());
            }
        };

        for url in &urls {
            self.process_one(url, &resolver, &clients).await?;
        }

        resolver.close();
        Ok(())
    }
}
