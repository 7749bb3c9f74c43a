// File: src/services/response_queue.rs
//
// Two-level bounded-parallelism scheduler for persona reply tasks. A
// global semaphore caps total in-flight units; a per-persona semaphore
// serializes each persona's own replies. The scheduled delay runs inside
// the unit, after admission, so clearing the queue cancels pending delays
// and not-yet-started work uniformly.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use chorusbot_common::models::QueueConfig;
use crate::Error;

pub struct ResponseQueue {
    global: Arc<Semaphore>,
    per_persona: DashMap<String, Arc<Semaphore>>,
    per_persona_concurrency: usize,
    tracker: TaskTracker,
    cancel: StdMutex<CancellationToken>,
}

impl ResponseQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            global: Arc::new(Semaphore::new(config.global_concurrency)),
            per_persona: DashMap::new(),
            per_persona_concurrency: config.per_persona_concurrency,
            tracker: TaskTracker::new(),
            cancel: StdMutex::new(CancellationToken::new()),
        }
    }

    fn persona_semaphore(&self, persona_name: &str) -> Arc<Semaphore> {
        self.per_persona
            .entry(persona_name.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_persona_concurrency)))
            .clone()
    }

    /// Enqueue one unit of work for `persona_name`. The unit waits for a
    /// global permit, then the persona's permit, sleeps `delay`, and only
    /// then runs `task`. A failure inside `task` is logged and contained;
    /// it never disturbs other units or the queue itself.
    pub fn schedule<F>(&self, persona_name: &str, delay: Duration, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        if self.tracker.is_closed() {
            warn!("response queue is draining; dropped unit for '{}'", persona_name);
            return;
        }

        let global = self.global.clone();
        let persona_sem = self.persona_semaphore(persona_name);
        let cancel = self.cancel.lock().unwrap().clone();
        let persona = persona_name.to_string();

        self.tracker.spawn(async move {
            // Admission + delay form the cancellable phase. Once the task
            // body starts it runs to completion on its own.
            let gate = async {
                let g = global.acquire_owned().await.ok()?;
                let p = persona_sem.acquire_owned().await.ok()?;
                sleep(delay).await;
                Some((g, p))
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("discarded queued response unit for '{}'", persona);
                }
                gate = gate => {
                    let Some((_g, _p)) = gate else { return };
                    if let Err(e) = task.await {
                        error!("response task for '{}' failed: {e}", persona);
                    }
                }
            }
        });
    }

    /// Stop admitting new units and wait for everything in flight (both
    /// levels) to finish. Graceful shutdown.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Discard every unit still in its pre-task phase (waiting on permits
    /// or sleeping its delay) and return immediately. Units whose task
    /// body already started finish on their own. Used for forced shutdown
    /// and stream-offline transitions; the queue stays usable afterwards.
    pub fn clear(&self) {
        let old = {
            let mut guard = self.cancel.lock().unwrap();
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        old.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        done: Arc<AtomicUsize>,
        hold: Duration,
    ) -> impl Future<Output = Result<(), Error>> + Send + 'static {
        async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            sleep(hold).await;
            running.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn global_concurrency_is_bounded() {
        let queue = ResponseQueue::new(QueueConfig {
            global_concurrency: 3,
            per_persona_concurrency: 1,
        });
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..10 {
            let persona = format!("persona{i}");
            queue.schedule(
                &persona,
                Duration::ZERO,
                counting_task(running.clone(), peak.clone(), done.clone(), Duration::from_millis(30)),
            );
        }
        queue.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3, "peak={}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn per_persona_units_are_serialized() {
        let queue = ResponseQueue::new(QueueConfig {
            global_concurrency: 5,
            per_persona_concurrency: 1,
        });
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            queue.schedule(
                "alice",
                Duration::ZERO,
                counting_task(running.clone(), peak.clone(), done.clone(), Duration::from_millis(20)),
            );
        }
        queue.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_discards_units_still_delaying() {
        let queue = ResponseQueue::new(QueueConfig::default());
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let done = done.clone();
            queue.schedule("bob", Duration::from_secs(30), async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        // Give the units time to be admitted into their delay sleeps.
        sleep(Duration::from_millis(20)).await;
        queue.clear();
        queue.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn queue_stays_usable_after_clear() {
        let queue = ResponseQueue::new(QueueConfig::default());
        let done = Arc::new(AtomicUsize::new(0));

        queue.schedule("carol", Duration::from_secs(30), {
            let done = done.clone();
            async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        queue.clear();

        queue.schedule("carol", Duration::ZERO, {
            let done = done.clone();
            async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        queue.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn task_failure_does_not_block_later_units() {
        let queue = ResponseQueue::new(QueueConfig::default());
        let done = Arc::new(AtomicUsize::new(0));

        queue.schedule("dave", Duration::ZERO, async move {
            Err(Error::Ai("completion exploded".to_string()))
        });
        queue.schedule("dave", Duration::ZERO, {
            let done = done.clone();
            async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        queue.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drain_rejects_new_units() {
        let queue = ResponseQueue::new(QueueConfig::default());
        let done = Arc::new(AtomicUsize::new(0));
        queue.drain().await;

        queue.schedule("erin", Duration::ZERO, {
            let done = done.clone();
            async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        sleep(Duration::from_millis(20)).await;

        assert_eq!(done.load(Ordering::SeqCst), 0);
    }
}
