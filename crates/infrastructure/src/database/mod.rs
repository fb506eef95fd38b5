use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connection pool against the links database. Kept small: the checker is
/// network-bound and a handful of connections absorbs the update traffic.
pub async fn create_pool(dsn: &str, max_db_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(2)
        .max_connections(max_db_connections.max(2))
        .acquire_timeout(Duration::from_secs(600))
        .connect(dsn)
        .await
}
