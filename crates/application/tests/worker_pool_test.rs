use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;

use linkpatrol_application::ports::UrlProcessor;
use linkpatrol_application::services::HostWorkerPool;

mod helpers;
use helpers::{default_policy, RecordingProcessor};

fn make_pool(
    processor: Arc<RecordingProcessor>,
    max_workers: usize,
    max_host_queue: usize,
) -> HostWorkerPool {
    HostWorkerPool::new(
        processor as Arc<dyn UrlProcessor>,
        default_policy(),
        max_workers,
        max_host_queue,
    )
}

#[tokio::test]
async fn urls_for_one_host_are_processed_serially() {
    let processor = Arc::new(RecordingProcessor::new().with_delay(Duration::from_millis(5)));
    let pool = make_pool(processor.clone(), 10, 100);

    for i in 0..8 {
        pool.add_url(format!("http://example.com/{i}")).await;
    }
    pool.join().await;

    assert_eq!(processor.max_concurrency(), 1);
    assert_eq!(processor.urls().len(), 8);
}

#[tokio::test]
async fn hosts_fan_out_to_distinct_workers() {
    let processor = Arc::new(RecordingProcessor::new().with_delay(Duration::from_millis(20)));
    let pool = make_pool(processor.clone(), 10, 100);

    pool.add_url("http://a.com/".to_string()).await;
    pool.add_url("http://b.com/".to_string()).await;
    pool.add_url("http://c.com/".to_string()).await;

    assert_eq!(pool.statistics().workers, 3);
    pool.join().await;

    assert_eq!(pool.statistics().workers, 0);
    assert!(processor.max_concurrency() > 1);
    assert_eq!(processor.urls().len(), 3);
}

#[tokio::test]
async fn www_prefix_shares_a_worker_with_the_bare_host() {
    let hold = Arc::new(Semaphore::new(0));
    let processor = Arc::new(RecordingProcessor::new().with_hold(hold.clone()));
    let pool = make_pool(processor.clone(), 10, 100);

    pool.add_url("http://example.com/a".to_string()).await;
    pool.add_url("http://www.example.com/b".to_string()).await;

    assert_eq!(pool.statistics().workers, 1);

    hold.add_permits(8);
    pool.join().await;
    assert_eq!(processor.urls().len(), 2);
}

#[tokio::test]
async fn admission_blocks_at_the_worker_cap() {
    let hold = Arc::new(Semaphore::new(0));
    let processor = Arc::new(RecordingProcessor::new().with_hold(hold.clone()));
    let pool = Arc::new(make_pool(processor.clone(), 2, 100));

    pool.add_url("http://one.com/".to_string()).await;
    pool.add_url("http://two.com/".to_string()).await;
    assert_eq!(pool.statistics().workers, 2);

    // A third host cannot be admitted while both workers are live.
    let mut blocked = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.add_url("http://three.com/".to_string()).await })
    };
    assert!(timeout(Duration::from_millis(50), &mut blocked).await.is_err());

    // Releasing one batch retires one worker and unblocks admission.
    hold.add_permits(1);
    timeout(Duration::from_secs(1), &mut blocked)
        .await
        .expect("admission should unblock")
        .unwrap();

    hold.add_permits(8);
    pool.join().await;

    assert_eq!(processor.urls().len(), 3);
    assert_eq!(pool.statistics().scanned, 3);
}

#[tokio::test]
async fn urls_in_flight_are_not_enqueued_again() {
    let hold = Arc::new(Semaphore::new(0));
    let processor = Arc::new(RecordingProcessor::new().with_hold(hold.clone()));
    let pool = make_pool(processor.clone(), 10, 100);

    pool.add_url("http://example.com/same".to_string()).await;
    // Let the worker move the URL from pending to in-flight.
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.add_url("http://example.com/same".to_string()).await;

    hold.add_permits(8);
    pool.join().await;

    assert_eq!(processor.urls(), vec!["http://example.com/same".to_string()]);
    let stats = pool.statistics();
    assert_eq!(stats.scanned, 2);
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.processed, 1);
}

#[tokio::test]
async fn host_queue_overflow_drops_silently() {
    let hold = Arc::new(Semaphore::new(0));
    let processor = Arc::new(RecordingProcessor::new().with_hold(hold.clone()));
    let pool = make_pool(processor.clone(), 10, 3);

    pool.add_url("http://example.com/0".to_string()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    for i in 1..10 {
        pool.add_url(format!("http://example.com/{i}")).await;
    }

    hold.add_permits(8);
    pool.join().await;

    // the in-flight URL plus a full pending queue survive, the rest are gone
    assert_eq!(processor.urls().len(), 1 + 3);
    assert_eq!(pool.statistics().scanned, 10);
}

#[tokio::test]
async fn reset_statistics_keeps_live_workers() {
    let hold = Arc::new(Semaphore::new(0));
    let processor = Arc::new(RecordingProcessor::new().with_hold(hold.clone()));
    let pool = make_pool(processor.clone(), 10, 100);

    pool.add_url("http://example.com/x".to_string()).await;
    assert_eq!(pool.statistics().scanned, 1);

    pool.reset_statistics();
    let stats = pool.statistics();
    assert_eq!(stats.scanned, 0);
    assert_eq!(stats.workers, 1);

    hold.add_permits(8);
    pool.join().await;
}

#[tokio::test]
async fn join_on_an_idle_pool_returns_immediately() {
    let processor = Arc::new(RecordingProcessor::new());
    let pool = make_pool(processor, 10, 100);

    timeout(Duration::from_millis(100), pool.join())
        .await
        .expect("join should not block on an empty pool");
}
