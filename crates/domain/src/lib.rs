//! Linkpatrol Domain Layer
pub mod errors;
pub mod hosts_file;
pub mod recheck;
pub mod status;
pub mod urls;

pub use errors::{ConfigError, StoreError};
pub use hosts_file::{DefaultHostSettings, HostSettings, HostsFile};
pub use recheck::RecheckRange;
pub use status::{
    is_http_success, CertificateProblem, DnsFailure, ExtendedStatus, HttpFailure, ProbeError,
    ProbeOutcome, UrlStatus,
};
pub use urls::url_host;
