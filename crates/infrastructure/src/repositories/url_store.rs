use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::PgPool;

use linkpatrol_application::ports::{UrlCheckUpdate, UrlStore};
use linkpatrol_domain::{StoreError, UrlStatus};

// The inner LIMIT is a tuning point: it should sit somewhat above the
// "url(s) scanned" figure of a loaded iteration so every worker stays busy
// through the whole iteration.
const URLS_DUE_SQL: &str = r#"
WITH all_urls AS (
    SELECT
        url,
        row_number() OVER(PARTITION BY substring(url from '.*://([^/]*)')) AS num_for_host
    FROM links
    WHERE refcount > 0 AND next_check < now()
)
SELECT
    url
FROM all_urls
WHERE num_for_host <= 100
LIMIT 20000
"#;

const UPDATE_URL_SQL: &str = r#"
UPDATE links
SET
    next_check = CASE WHEN priority THEN $4 ELSE $3 END,
    last_checked = $2,

    ipv4_last_success = CASE WHEN     $5 THEN $2 ELSE ipv4_last_success END,
    ipv4_last_failure = CASE WHEN NOT $5 THEN $2 ELSE ipv4_last_failure END,
    ipv4_success = $5,
    ipv4_status_code = $6,
    ipv4_permanent_redirect_target = $7,

    ipv6_last_success = CASE WHEN     $8 THEN $2 ELSE ipv6_last_success END,
    ipv6_last_failure = CASE WHEN NOT $8 THEN $2 ELSE ipv6_last_failure END,
    ipv6_success = COALESCE($8, ipv6_success),
    ipv6_status_code = COALESCE($9, ipv6_status_code),
    ipv6_permanent_redirect_target = COALESCE($10, ipv6_permanent_redirect_target),

    check_duration = $11
WHERE url = $1
"#;

pub struct PgUrlStore {
    pool: PgPool,
}

impl PgUrlStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn status_columns(status: &Option<UrlStatus>) -> (Option<bool>, Option<i32>, Option<&str>) {
    match status {
        Some(status) => (
            Some(status.success),
            Some(status.status_code),
            status.permanent_redirect_target.as_deref(),
        ),
        None => (None, None, None),
    }
}

#[async_trait]
impl UrlStore for PgUrlStore {
    fn urls_due(&self) -> BoxStream<'_, Result<String, StoreError>> {
        sqlx::query_scalar::<_, String>(URLS_DUE_SQL)
            .fetch(&self.pool)
            .map_err(store_error)
            .boxed()
    }

    async fn update(&self, update: UrlCheckUpdate) -> Result<(), StoreError> {
        let (ipv4_success, ipv4_status_code, ipv4_redirect) =
            status_columns(&update.outcome.ipv4);
        let (ipv6_success, ipv6_status_code, ipv6_redirect) =
            status_columns(&update.outcome.ipv6);

        sqlx::query(UPDATE_URL_SQL)
            .bind(&update.url)
            .bind(update.check_time)
            .bind(update.next_check_time)
            .bind(update.priority_next_check_time)
            .bind(ipv4_success)
            .bind(ipv4_status_code)
            .bind(ipv4_redirect)
            .bind(ipv6_success)
            .bind(ipv6_status_code)
            .bind(ipv6_redirect)
            .bind(update.outcome.check_duration.map(|d| d.as_secs_f64()))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn bump_stats(&self, num_urls_checked: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE statistics SET num_urls_checked = num_urls_checked + $1")
            .bind(num_urls_checked as i64)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }
}
