use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Method, StatusCode};
use url::Url;

use linkpatrol_domain::{HttpFailure, ProbeError};

use crate::dns::{AddressFamily, FamilyResolve, PrecachedResolver};
use crate::http::error::classify_reqwest_error;

pub(crate) const USER_AGENT: &str = concat!("linkpatrol/", env!("CARGO_PKG_VERSION"));

// Redirect budget per request, matching the common client default.
pub(crate) const MAX_REDIRECTS: usize = 10;

pub(crate) struct ProbeClients {
    pub v4: reqwest::Client,
    pub v6: reqwest::Client,
}

pub(crate) fn build_clients(
    resolver: &Arc<PrecachedResolver>,
    timeout: Duration,
    strict_ssl: bool,
) -> Result<ProbeClients, reqwest::Error> {
    Ok(ProbeClients {
        v4: build_client(resolver.clone(), AddressFamily::V4, timeout, strict_ssl)?,
        v6: build_client(resolver.clone(), AddressFamily::V6, timeout, strict_ssl)?,
    })
}

/// One client per address family. Binding the local side to the family's
/// unspecified address pins every connection to that family; the resolver
/// hook feeds it the matching cached records. Redirects are followed by
/// hand, so the policy is off here. No cookies are ever kept.
fn build_client(
    resolver: Arc<PrecachedResolver>,
    family: AddressFamily,
    timeout: Duration,
    strict_ssl: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let local_address: IpAddr = match family {
        AddressFamily::V4 => Ipv4Addr::UNSPECIFIED.into(),
        AddressFamily::V6 => Ipv6Addr::UNSPECIFIED.into(),
    };

    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .pool_max_idle_per_host(1)
        .local_address(local_address)
        .dns_resolver(Arc::new(FamilyResolve::new(resolver, family)));

    if strict_ssl {
        builder = builder
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .max_tls_version(reqwest::tls::Version::TLS_1_2);
    }

    builder.build()
}

pub(crate) struct FollowedResponse {
    pub status: u16,
    pub permanent_redirect_target: Option<String>,
}

/// Issue a request and follow redirects manually, tracking the target of the
/// leading run of permanent (301/308) hops. Targets are resolved against the
/// original URL; a temporary hop ends the permanent run for good.
pub(crate) async fn request_following_redirects(
    client: &reqwest::Client,
    method: Method,
    url: &Url,
) -> Result<FollowedResponse, ProbeError> {
    let original = url.clone();
    let mut current = url.clone();
    let mut method = method;
    let mut permanent_target: Option<String> = None;
    let mut permanent_run = true;

    for _ in 0..=MAX_REDIRECTS {
        let response = client
            .request(method.clone(), current.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(original.as_str(), &e))?;

        let status = response.status();
        if !is_followable_redirect(status) {
            return Ok(FollowedResponse {
                status: status.as_u16(),
                permanent_redirect_target: permanent_target,
            });
        }

        // A redirect without a Location is treated as the final answer.
        let Some(location) = response.headers().get(LOCATION) else {
            return Ok(FollowedResponse {
                status: status.as_u16(),
                permanent_redirect_target: permanent_target,
            });
        };
        let location = location.to_str().map_err(|_| ProbeError::InvalidUrl)?;

        if matches!(status.as_u16(), 301 | 308) {
            if permanent_run {
                permanent_target = Some(
                    original
                        .join(location)
                        .map_err(|_| ProbeError::InvalidUrl)?
                        .to_string(),
                );
            }
        } else {
            permanent_run = false;
        }

        let next = current.join(location).map_err(|_| ProbeError::InvalidUrl)?;
        if !matches!(next.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidUrl);
        }

        if status == StatusCode::SEE_OTHER {
            method = Method::GET;
        }
        current = next;
    }

    Err(ProbeError::Http(HttpFailure::TooManyRedirects))
}

fn is_followable_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}
