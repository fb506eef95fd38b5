use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use linkpatrol_application::ports::{UrlProcessor, UrlStore};
use linkpatrol_application::processors::{
    BlacklistedUrlProcessor, DispatchingUrlProcessor, DummyUrlProcessor,
};
use linkpatrol_application::services::{HostPolicy, HostWorkerPool, UrlUpdater};
use linkpatrol_domain::HostsFile;
use linkpatrol_infrastructure::database::create_pool;
use linkpatrol_infrastructure::dns::system_resolver;
use linkpatrol_infrastructure::http::HttpUrlProcessor;
use linkpatrol_infrastructure::repositories::PgUrlStore;
use linkpatrol_jobs::CheckerLoop;

mod signals;

#[derive(Parser)]
#[command(name = "linkpatrol")]
#[command(version)]
#[command(about = "Continuously rechecks a database of outbound links over IPv4 and IPv6")]
struct Cli {
    /// Database connection string
    #[arg(long, default_value = "postgres://linkpatrol@localhost/linkpatrol")]
    dsn: String,

    /// Max number of connections to the database
    #[arg(long, default_value_t = 5)]
    max_db_connections: u32,

    /// Path to host policy file
    #[arg(long, default_value = "./hosts.yaml")]
    hosts: String,

    /// Timeout for each check, seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Maximum number of parallel workers
    #[arg(long, default_value_t = 100)]
    max_workers: usize,

    /// Maximum depth of per-host url queue
    #[arg(long, default_value_t = 100)]
    max_host_queue: usize,

    /// Exit after a single run
    #[arg(long)]
    single_run: bool,

    /// Skip IPv6 checks
    #[arg(long)]
    skip_ipv6: bool,

    /// Skip IPv4 checks if the IPv6 check passes
    #[arg(long)]
    satisfy_with_ipv6: bool,

    /// Stricter SSL requirements (require TLS 1.2 support)
    #[arg(long)]
    strict_ssl: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_max_level(log_level)
        .init();

    info!("Starting linkpatrol v{}", env!("CARGO_PKG_VERSION"));

    let hosts_file = HostsFile::load(&cli.hosts)?;
    let policy = Arc::new(HostPolicy::new(hosts_file)?);
    info!(hosts = %cli.hosts, "Host policy loaded");

    let pool = create_pool(&cli.dsn, cli.max_db_connections).await?;
    info!(max_connections = cli.max_db_connections.max(2), "Database pool ready");

    let store: Arc<dyn UrlStore> = Arc::new(PgUrlStore::new(pool));
    let resolver = system_resolver()?;

    let updater = Arc::new(UrlUpdater::new(store.clone(), policy.clone()));

    let blacklisted = Arc::new(BlacklistedUrlProcessor::new(updater.clone(), policy.clone()));
    let http = Arc::new(
        HttpUrlProcessor::new(
            updater.clone(),
            policy.clone(),
            resolver,
            Duration::from_secs(cli.timeout),
        )
        .with_skip_ipv6(cli.skip_ipv6)
        .with_satisfy_with_ipv6(cli.satisfy_with_ipv6)
        .with_strict_ssl(cli.strict_ssl),
    );
    let dummy = Arc::new(DummyUrlProcessor::new(updater));

    // Tasting order matters: blacklisted first, dummy as the fallback.
    let dispatcher: Arc<dyn UrlProcessor> =
        Arc::new(DispatchingUrlProcessor::new(blacklisted, http, dummy));

    let worker_pool = Arc::new(HostWorkerPool::new(
        dispatcher,
        policy,
        cli.max_workers,
        cli.max_host_queue,
    ));

    let checker = Arc::new(
        CheckerLoop::new(store, worker_pool).with_single_run(cli.single_run),
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, finishing current iteration");
                shutdown.cancel();
            }
        });
    }

    signals::spawn_siginfo_handler(checker.clone());

    checker.run(shutdown).await;

    info!("Shutdown complete");
    Ok(())
}
