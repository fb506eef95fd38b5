use std::time::Duration;

/// Stable vocabulary of non-HTTP check outcomes. Stored in the database in
/// place of an HTTP status code, so discriminants must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExtendedStatus {
    UnknownError = -1,

    // Generic errors
    Timeout = -100,
    InvalidUrl = -101,
    Blacklisted = -102,

    // DNS
    DnsError = -200,
    DnsDomainNotFound = -201,
    DnsNoAddressRecord = -202,
    DnsRefused = -203,
    DnsTimeout = -204,
    DnsIpv4MappedInAaaa = -205,

    // Connection errors
    ConnectionRefused = -300,
    HostUnreachable = -301,
    ConnectionResetByPeer = -302,
    NetworkUnreachable = -303,
    ServerDisconnected = -304,
    ConnectionAborted = -306,
    AddressNotAvailable = -307,

    // HTTP
    TooManyRedirects = -400,
    BadHttp = -402,

    // SSL
    SslError = -500,
    SslCertificateHasExpired = -501,
    SslCertificateHostnameMismatch = -502,
    SslCertificateSelfSigned = -503,
    SslCertificateSelfSignedInChain = -504,
    SslCertificateIncompleteChain = -505,
}

impl ExtendedStatus {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Result of checking one URL over one address family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlStatus {
    pub success: bool,
    pub status_code: i32,
    pub permanent_redirect_target: Option<String>,
}

impl UrlStatus {
    pub fn http(status_code: u16, permanent_redirect_target: Option<String>) -> Self {
        Self {
            success: is_http_success(status_code),
            status_code: i32::from(status_code),
            permanent_redirect_target,
        }
    }

    pub fn failure(status: ExtendedStatus) -> Self {
        Self {
            success: false,
            status_code: status.code(),
            permanent_redirect_target: None,
        }
    }
}

pub fn is_http_success(code: u16) -> bool {
    (200..300).contains(&code)
}

/// Everything a probe can report for one URL. A `None` family means the
/// family was skipped and the stored state must be left alone.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    pub ipv4: Option<UrlStatus>,
    pub ipv6: Option<UrlStatus>,
    pub check_duration: Option<Duration>,
}

impl ProbeOutcome {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn both(status: UrlStatus) -> Self {
        Self {
            ipv4: Some(status.clone()),
            ipv6: Some(status),
            check_duration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsFailure {
    Unspecified,
    DomainNotFound,
    NoAddressRecord,
    BadName,
    Refused,
    Timeout,
    Ipv4MappedInAaaa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateProblem {
    Expired,
    SelfSigned,
    SelfSignedInChain,
    IncompleteChain,
    HostnameMismatch,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFailure {
    TooManyRedirects,
    ServerDisconnected,
    BadMessage,
}

/// Normalized probe failure. Adapters collapse raw network/TLS/DNS errors
/// into this sum type; `status()` is total over it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("DNS failure: {0:?}")]
    Dns(DnsFailure),

    #[error("OS error, errno {errno}")]
    Os { errno: i32 },

    #[error("TLS certificate problem: {0:?}")]
    Tls(CertificateProblem),

    #[error("HTTP failure: {0:?}")]
    Http(HttpFailure),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Unclassified error: {detail}")]
    Unknown { detail: String },
}

impl ProbeError {
    pub fn status(&self) -> ExtendedStatus {
        match self {
            ProbeError::Timeout => ExtendedStatus::Timeout,
            ProbeError::InvalidUrl => ExtendedStatus::InvalidUrl,

            ProbeError::Dns(DnsFailure::Unspecified) => ExtendedStatus::DnsError,
            ProbeError::Dns(DnsFailure::DomainNotFound) => ExtendedStatus::DnsDomainNotFound,
            ProbeError::Dns(DnsFailure::NoAddressRecord) => ExtendedStatus::DnsNoAddressRecord,
            ProbeError::Dns(DnsFailure::BadName) => ExtendedStatus::InvalidUrl,
            ProbeError::Dns(DnsFailure::Refused) => ExtendedStatus::DnsRefused,
            ProbeError::Dns(DnsFailure::Timeout) => ExtendedStatus::DnsTimeout,
            ProbeError::Dns(DnsFailure::Ipv4MappedInAaaa) => ExtendedStatus::DnsIpv4MappedInAaaa,

            ProbeError::Os { errno } => match *errno {
                libc::ENETUNREACH => ExtendedStatus::NetworkUnreachable,
                libc::ECONNRESET => ExtendedStatus::ConnectionResetByPeer,
                libc::ECONNREFUSED => ExtendedStatus::ConnectionRefused,
                libc::EHOSTUNREACH => ExtendedStatus::HostUnreachable,
                libc::EADDRNOTAVAIL => ExtendedStatus::AddressNotAvailable,
                libc::ECONNABORTED => ExtendedStatus::ConnectionAborted,
                // Seen for v4-mapped v6 connect attempts; nothing better to say.
                libc::EINVAL => ExtendedStatus::UnknownError,
                _ => ExtendedStatus::UnknownError,
            },

            ProbeError::Tls(CertificateProblem::Expired) => {
                ExtendedStatus::SslCertificateHasExpired
            }
            ProbeError::Tls(CertificateProblem::SelfSigned) => {
                ExtendedStatus::SslCertificateSelfSigned
            }
            ProbeError::Tls(CertificateProblem::SelfSignedInChain) => {
                ExtendedStatus::SslCertificateSelfSignedInChain
            }
            ProbeError::Tls(CertificateProblem::IncompleteChain) => {
                ExtendedStatus::SslCertificateIncompleteChain
            }
            ProbeError::Tls(CertificateProblem::HostnameMismatch) => {
                ExtendedStatus::SslCertificateHostnameMismatch
            }
            ProbeError::Tls(CertificateProblem::Other) => ExtendedStatus::SslError,

            ProbeError::Http(HttpFailure::TooManyRedirects) => ExtendedStatus::TooManyRedirects,
            ProbeError::Http(HttpFailure::ServerDisconnected) => ExtendedStatus::ServerDisconnected,
            ProbeError::Http(HttpFailure::BadMessage) => ExtendedStatus::BadHttp,

            ProbeError::Unknown { .. } => ExtendedStatus::UnknownError,
        }
    }

    pub fn into_url_status(self) -> UrlStatus {
        UrlStatus::failure(self.status())
    }
}
