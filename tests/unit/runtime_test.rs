//! Tests for the tokio spawner and status reporter

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prometheus_admission::core::{RequestScheduler, SchedulerStats};
use prometheus_admission::runtime::{Spawn, StatusObserver, StatusReporter, TokioSpawner, TracingObserver};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct CollectingObserver {
    seen: Arc<Mutex<Vec<SchedulerStats>>>,
}

#[async_trait]
impl StatusObserver for CollectingObserver {
    async fn observe(&self, stats: &SchedulerStats) {
        self.seen.lock().await.push(stats.clone());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(start_paused = true)]
async fn test_reporter_observes_periodically() {
    let scheduler = Arc::new(RequestScheduler::new(2).unwrap());
    let observer = CollectingObserver::default();

    let handle = StatusReporter::start(
        Arc::clone(&scheduler),
        Duration::from_millis(100),
        observer.clone(),
        &TokioSpawner::current(),
    );

    for _ in 0..3 {
        let _: anyhow::Result<()> = scheduler.submit(|| async { Ok(()) }, None).await;
    }
    tokio::time::sleep(Duration::from_millis(350)).await;
    let ticks = observer.seen.lock().await.len();
    assert!(ticks >= 3, "expected periodic snapshots, got {ticks}");

    handle.shutdown().await;
    let seen = observer.seen.lock().await;
    assert_eq!(seen.len(), ticks + 1);
    let last = seen.last().expect("final snapshot");
    assert_eq!(last.completed, 3);
    assert!(last.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_reporter_with_tracing_observer_stops() {
    let scheduler = Arc::new(RequestScheduler::new(1).unwrap());
    let handle = StatusReporter::start(
        scheduler,
        Duration::from_millis(50),
        TracingObserver,
        &TokioSpawner::current(),
    );
    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.shutdown().await;
}
