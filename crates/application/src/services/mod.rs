mod host_policy;
mod url_updater;
mod worker_pool;

pub use host_policy::{HostPolicy, HostStatus};
pub use url_updater::UrlUpdater;
pub use worker_pool::{HostWorkerPool, PoolStatistics};
