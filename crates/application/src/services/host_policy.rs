use std::collections::HashMap;

use linkpatrol_domain::{url_host, ConfigError, HostSettings, HostsFile, RecheckRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Ok,
    Blacklisted,
    Skipped,
}

/// Per-suffix settings with recheck strings parsed. Merging is field-by-field
/// with the deeper suffix winning; `aggregate` only ever turns on.
#[derive(Debug, Clone, Default)]
struct ResolvedSettings {
    delay: Option<f64>,
    recheck: Option<RecheckRange>,
    priority_recheck: Option<RecheckRange>,
    blacklist: Option<bool>,
    skip: Option<bool>,
    aggregate: bool,
}

impl ResolvedSettings {
    fn from_raw(host: &str, raw: &HostSettings) -> Result<Self, ConfigError> {
        let parse = |spec: &Option<String>| -> Result<Option<RecheckRange>, ConfigError> {
            spec.as_deref()
                .map(RecheckRange::parse)
                .transpose()
                .map_err(|e| ConfigError::Validation(format!("host '{}': {}", host, e)))
        };

        Ok(Self {
            delay: raw.delay,
            recheck: parse(&raw.recheck)?,
            priority_recheck: parse(&raw.priority_recheck)?,
            blacklist: raw.blacklist,
            skip: raw.skip,
            aggregate: raw.aggregate,
        })
    }

    fn apply(&mut self, other: &ResolvedSettings) {
        if other.delay.is_some() {
            self.delay = other.delay;
        }
        if other.recheck.is_some() {
            self.recheck = other.recheck;
        }
        if other.priority_recheck.is_some() {
            self.priority_recheck = other.priority_recheck;
        }
        if other.blacklist.is_some() {
            self.blacklist = other.blacklist;
        }
        if other.skip.is_some() {
            self.skip = other.skip;
        }
        if other.aggregate {
            self.aggregate = true;
        }
    }
}

/// Hierarchical per-host policy: delay, recheck windows, blacklist/skip
/// status and the aggregation key workers are partitioned by.
pub struct HostPolicy {
    default_delay: f64,
    default_recheck: RecheckRange,
    default_priority_recheck: RecheckRange,
    hosts: HashMap<String, ResolvedSettings>,
}

impl HostPolicy {
    pub fn new(config: HostsFile) -> Result<Self, ConfigError> {
        let default_recheck = RecheckRange::parse(&config.defaults.recheck)?;
        let default_priority_recheck = RecheckRange::parse(&config.defaults.priority_recheck)?;

        let mut hosts = HashMap::with_capacity(config.hosts.len());
        for (host, raw) in &config.hosts {
            hosts.insert(host.clone(), ResolvedSettings::from_raw(host, raw)?);
        }

        Ok(Self {
            default_delay: config.defaults.delay,
            default_recheck,
            default_priority_recheck,
            hosts,
        })
    }

    pub fn host_status(&self, url: &str) -> HostStatus {
        match self.gather(&host_of(url)) {
            Some(settings) if settings.blacklist == Some(true) => HostStatus::Blacklisted,
            Some(settings) if settings.skip == Some(true) => HostStatus::Skipped,
            _ => HostStatus::Ok,
        }
    }

    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.host_status(url) == HostStatus::Blacklisted
    }

    pub fn delay(&self, url: &str) -> f64 {
        self.gather(&host_of(url))
            .and_then(|settings| settings.delay)
            .unwrap_or(self.default_delay)
    }

    /// Effective `(recheck, priority_recheck)` windows for the URL's host.
    pub fn rechecks(&self, url: &str) -> (RecheckRange, RecheckRange) {
        let settings = self.gather(&host_of(url));
        (
            settings
                .as_ref()
                .and_then(|s| s.recheck)
                .unwrap_or(self.default_recheck),
            settings
                .as_ref()
                .and_then(|s| s.priority_recheck)
                .unwrap_or(self.default_priority_recheck),
        )
    }

    /// Hostname URLs are serialized under. A leading `www.` is stripped, then
    /// the deepest configured suffix with `aggregate: true` wins; policy
    /// lookups deliberately do not share the `www.` stripping.
    pub fn aggregation_key(&self, url: &str) -> String {
        let host = host_of(url);
        let stripped = host.strip_prefix("www.").unwrap_or(&host);

        let mut current = Some(stripped);
        while let Some(suffix) = current {
            if self.hosts.get(suffix).is_some_and(|s| s.aggregate) {
                return suffix.to_string();
            }
            current = parent_host(suffix);
        }

        stripped.to_string()
    }

    /// Union of every configured suffix of `host`, deeper suffixes layered
    /// over shallower ones.
    fn gather(&self, host: &str) -> Option<ResolvedSettings> {
        let mut matched: Vec<&ResolvedSettings> = Vec::new();

        let mut current = Some(host);
        while let Some(suffix) = current {
            if let Some(settings) = self.hosts.get(suffix) {
                matched.push(settings);
            }
            current = parent_host(suffix);
        }

        let mut merged = (*matched.last()?).clone();
        for overriding in matched[..matched.len() - 1].iter().rev() {
            merged.apply(overriding);
        }
        Some(merged)
    }
}

fn host_of(url: &str) -> String {
    url_host(url).unwrap_or_default()
}

fn parent_host(host: &str) -> Option<&str> {
    host.find('.').map(|dot| &host[dot + 1..])
}
