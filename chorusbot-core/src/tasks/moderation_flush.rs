// chorusbot-core/src/tasks/moderation_flush.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

use crate::services::moderation::ModerationEvaluator;

/// Spawns a background task that periodically flushes the moderation
/// queue through the evaluator. The tick itself cannot overlap: the
/// evaluator takes its batch synchronously before any awaited work.
pub fn spawn_moderation_flush_task(
    evaluator: Arc<ModerationEvaluator>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sleep(interval) => {
                    evaluator.run_once().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("moderation flush task stopping");
                        break;
                    }
                }
            }
        }
    })
}
