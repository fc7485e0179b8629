use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// Background task that materializes recurring expense templates into the
/// current month. The engine-side check is idempotent, so a coarse hourly
/// tick is enough; the first tick covers startup after downtime.
pub async fn run_expense_scheduler(engine: Arc<Engine>) {
    let mut interval = tokio::time::interval(Duration::from_secs(3600));
    loop {
        interval.tick().await;
        match engine.materialize_recurring_expenses(now_ms()).await {
            Ok(0) => {}
            Ok(n) => {
                metrics::counter!(crate::observability::EXPENSES_MATERIALIZED_TOTAL)
                    .increment(n as u64);
                info!("materialized {n} recurring expenses");
            }
            Err(e) => tracing::warn!("expense scheduler: {e}"),
        }
    }
}

/// Background task that compacts the WAL once enough appends accumulate.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends >= threshold {
            match engine.compact_wal().await {
                Ok(()) => info!("compacted WAL after {appends} appends"),
                Err(e) => tracing::warn!("WAL compaction failed: {e}"),
            }
        }
    }
}
