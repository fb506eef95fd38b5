use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::Name;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use reqwest::dns::{Addrs, Name as ConnectName, Resolve, Resolving};

use linkpatrol_domain::{DnsFailure, ProbeError};

/// Outcome of one A or AAAA lookup: a non-empty address list or a failure.
#[derive(Debug, Clone)]
pub struct FamilyResolution {
    pub addresses: Vec<IpAddr>,
    pub error: Option<DnsFailure>,
}

impl FamilyResolution {
    fn ok(addresses: Vec<IpAddr>) -> Self {
        Self {
            addresses,
            error: None,
        }
    }

    fn failed(failure: DnsFailure) -> Self {
        Self {
            addresses: Vec::new(),
            error: Some(failure),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostResolution {
    pub ipv4: FamilyResolution,
    pub ipv6: FamilyResolution,
}

pub fn system_resolver() -> Result<TokioAsyncResolver, ResolveError> {
    TokioAsyncResolver::tokio_from_system_conf()
}

/// Resolver with a per-batch memo: each host is looked up once (A and AAAA
/// concurrently) and every later caller, including the HTTP clients'
/// connect path, reuses the cached answer.
pub struct PrecachedResolver {
    resolver: TokioAsyncResolver,
    cache: Mutex<HashMap<String, Arc<HostResolution>>>,
}

impl PrecachedResolver {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self {
            resolver,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, host: &str) -> Arc<HostResolution> {
        if let Some(cached) = self.cache.lock().expect("resolver cache poisoned").get(host) {
            return cached.clone();
        }

        let resolution = Arc::new(self.lookup(host).await);
        self.cache
            .lock()
            .expect("resolver cache poisoned")
            .insert(host.to_string(), resolution.clone());
        resolution
    }

    /// Drop all cached answers. In-flight lookups are cancelled with their
    /// callers' futures.
    pub fn close(&self) {
        self.cache.lock().expect("resolver cache poisoned").clear();
    }

    async fn lookup(&self, host: &str) -> HostResolution {
        // URL hosts keep IPv6 literals bracketed.
        let bare = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if let Ok(ip) = bare.parse::<IpAddr>() {
            return literal_resolution(ip);
        }

        if Name::from_utf8(bare).is_err() {
            let bad = FamilyResolution::failed(DnsFailure::BadName);
            return HostResolution {
                ipv4: bad.clone(),
                ipv6: bad,
            };
        }

        let (ipv4, ipv6) = tokio::join!(self.lookup_ipv4(bare), self.lookup_ipv6(bare));
        HostResolution { ipv4, ipv6 }
    }

    async fn lookup_ipv4(&self, host: &str) -> FamilyResolution {
        match self.resolver.ipv4_lookup(host).await {
            Ok(lookup) => {
                let addresses: Vec<IpAddr> =
                    lookup.iter().map(|record| IpAddr::V4(record.0)).collect();
                if addresses.is_empty() {
                    FamilyResolution::failed(DnsFailure::NoAddressRecord)
                } else {
                    FamilyResolution::ok(addresses)
                }
            }
            Err(e) => FamilyResolution::failed(classify_resolve_error(&e)),
        }
    }

    async fn lookup_ipv6(&self, host: &str) -> FamilyResolution {
        match self.resolver.ipv6_lookup(host).await {
            Ok(lookup) => classify_aaaa(lookup.iter().map(|record| record.0).collect()),
            Err(e) => FamilyResolution::failed(classify_resolve_error(&e)),
        }
    }
}

/// An AAAA answer consisting solely of IPv4-mapped addresses is a
/// misconfiguration; connecting to those over an IPv6 socket cannot work.
/// Mapped addresses in a mixed answer are dropped.
fn classify_aaaa(addresses: Vec<std::net::Ipv6Addr>) -> FamilyResolution {
    let (mapped, usable): (Vec<_>, Vec<_>) = addresses
        .into_iter()
        .partition(|addr| addr.to_ipv4_mapped().is_some());

    if usable.is_empty() {
        if mapped.is_empty() {
            FamilyResolution::failed(DnsFailure::NoAddressRecord)
        } else {
            FamilyResolution::failed(DnsFailure::Ipv4MappedInAaaa)
        }
    } else {
        FamilyResolution::ok(usable.into_iter().map(IpAddr::V6).collect())
    }
}

fn literal_resolution(ip: IpAddr) -> HostResolution {
    match ip {
        IpAddr::V4(_) => HostResolution {
            ipv4: FamilyResolution::ok(vec![ip]),
            ipv6: FamilyResolution::failed(DnsFailure::NoAddressRecord),
        },
        IpAddr::V6(_) => HostResolution {
            ipv4: FamilyResolution::failed(DnsFailure::NoAddressRecord),
            ipv6: FamilyResolution::ok(vec![ip]),
        },
    }
}

fn classify_resolve_error(error: &ResolveError) -> DnsFailure {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match response_code {
            ResponseCode::NXDomain => DnsFailure::DomainNotFound,
            ResponseCode::Refused => DnsFailure::Refused,
            _ => DnsFailure::NoAddressRecord,
        },
        ResolveErrorKind::Timeout => DnsFailure::Timeout,
        _ => DnsFailure::Unspecified,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// Connect-time resolver hook for one address family. Serves the memoized
/// answer and surfaces the cached DNS failure instead of re-querying.
pub struct FamilyResolve {
    resolver: Arc<PrecachedResolver>,
    family: AddressFamily,
}

impl FamilyResolve {
    pub fn new(resolver: Arc<PrecachedResolver>, family: AddressFamily) -> Self {
        Self { resolver, family }
    }
}

impl Resolve for FamilyResolve {
    fn resolve(&self, name: ConnectName) -> Resolving {
        let resolver = self.resolver.clone();
        let family = self.family;

        Box::pin(async move {
            let resolution = resolver.resolve(name.as_str()).await;
            let family_resolution = match family {
                AddressFamily::V4 => &resolution.ipv4,
                AddressFamily::V6 => &resolution.ipv6,
            };

            if let Some(failure) = family_resolution.error {
                return Err(
                    Box::new(ProbeError::Dns(failure)) as Box<dyn std::error::Error + Send + Sync>
                );
            }

            let addrs: Addrs = Box::new(
                family_resolution
                    .addresses
                    .clone()
                    .into_iter()
                    .map(|ip| SocketAddr::new(ip, 0)),
            );
            Ok(addrs)
        })
    }
}
