//! Flush scheduling for the tracking queue.
//!
//! Every recorded event re-arms a debounce timer, so the flush fires only
//! after a quiet period. A fixed-period safety-net interval flushes anyway
//! under continuous activity, a startup flush drains whatever a previous
//! session left behind, and dropping the last handle (or an explicit
//! `flush_now`) forces a final flush on the way out. Failed flushes keep
//! the queue; the next trigger retries the full contents.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Sleep};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tracker::queue::{PendingBatch, TrackingQueue};
use crate::tracker::traits::{FlushTarget, TrackingStore};

/// Timer policy for the batcher.
#[derive(Debug, Clone)]
pub struct FlushPolicy {
    /// Quiet period after the last event before a flush fires.
    pub debounce: Duration,
    /// Fixed-period flush independent of the debounce.
    pub safety_interval: Duration,
    /// Delay before the initial leftover flush.
    pub startup_delay: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(30),
            safety_interval: Duration::from_secs(60),
            startup_delay: Duration::from_secs(5),
        }
    }
}

enum Command {
    View(String),
    Share(String),
    FlushNow,
}

/// Cheap cloneable handle for recording events from anywhere in the app.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl TrackerHandle {
    pub fn record_view(&self, property_id: &str) {
        let _ = self.tx.send(Command::View(property_id.to_string()));
    }

    pub fn record_share(&self, property_id: &str) {
        let _ = self.tx.send(Command::Share(property_id.to_string()));
    }

    /// Force an immediate flush (the page-unload trigger).
    pub fn flush_now(&self) {
        let _ = self.tx.send(Command::FlushNow);
    }
}

/// Owns the queue and drives the flush timers.
pub struct Batcher {
    queue: TrackingQueue,
    target: Arc<dyn FlushTarget>,
    policy: FlushPolicy,
}

impl Batcher {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        target: Arc<dyn FlushTarget>,
        policy: FlushPolicy,
    ) -> Self {
        Self {
            queue: TrackingQueue::new(store),
            target,
            policy,
        }
    }

    /// Spawn the batcher loop. The loop exits, after a final flush, when
    /// every [`TrackerHandle`] has been dropped.
    pub fn spawn(self) -> (TrackerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (TrackerHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut safety = interval_at(
            Instant::now() + self.policy.safety_interval,
            self.policy.safety_interval,
        );

        // One-shot flush for events a previous session failed to deliver.
        // Independent of the debounce slot, so an event recorded right
        // after startup cannot push it out.
        let mut startup: Pin<Box<Sleep>> = Box::pin(sleep(self.policy.startup_delay));
        let mut startup_armed = true;

        let mut debounce: Pin<Box<Sleep>> = Box::pin(sleep(self.policy.debounce));
        let mut debounce_armed = false;

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::View(id)) => {
                        if self.queue.record_view(&id) {
                            debounce.as_mut().reset(Instant::now() + self.policy.debounce);
                            debounce_armed = true;
                        }
                    }
                    Some(Command::Share(id)) => {
                        self.queue.record_share(&id);
                        debounce.as_mut().reset(Instant::now() + self.policy.debounce);
                        debounce_armed = true;
                    }
                    Some(Command::FlushNow) => {
                        debounce_armed = false;
                        self.flush().await;
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = safety.tick() => {
                    self.flush().await;
                }
                () = startup.as_mut(), if startup_armed => {
                    startup_armed = false;
                    self.flush().await;
                }
                () = debounce.as_mut(), if debounce_armed => {
                    debounce_armed = false;
                    self.flush().await;
                }
            }
        }
    }

    async fn flush(&mut self) {
        match self.queue.flush(self.target.as_ref()).await {
            Ok(true) => debug!("Tracking batch delivered"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "Tracking flush failed, keeping queued events"),
        }
    }
}

/// Delivers batches to the tracking HTTP endpoint.
pub struct HttpFlushTarget {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFlushTarget {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FlushTarget for HttpFlushTarget {
    async fn deliver(&self, batch: &PendingBatch) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::queue::TrackingEvent;
    use crate::tracker::store::MemoryStore;
    use crate::tracker::traits::TrackingStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::time::advance;

    #[derive(Default)]
    struct RecordingTarget {
        delivered: Mutex<Vec<PendingBatch>>,
        fail: AtomicBool,
    }

    impl RecordingTarget {
        fn count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FlushTarget for RecordingTarget {
        async fn deliver(&self, batch: &PendingBatch) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Transport {
                    status: 500,
                    body: "simulated".to_string(),
                });
            }
            self.delivered.lock().unwrap().push(batch.clone());
            Ok(())
        }
    }

    fn policy() -> FlushPolicy {
        FlushPolicy {
            debounce: Duration::from_secs(30),
            safety_interval: Duration::from_secs(3600),
            startup_delay: Duration::from_secs(5),
        }
    }

    /// Let the batcher task observe queued commands and expired timers.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn step(duration: Duration) {
        advance(duration).await;
        settle().await;
    }

    /// Let the startup trigger fire over an empty queue so it cannot
    /// interfere with the timer under test.
    async fn past_startup() {
        settle().await;
        step(Duration::from_secs(6)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_is_rearmed_by_each_event() {
        let store = Arc::new(MemoryStore::default());
        let target = Arc::new(RecordingTarget::default());
        let (handle, _task) =
            Batcher::new(store, target.clone(), policy()).spawn();
        past_startup().await;

        handle.record_view("p1");
        settle().await;

        // One second short of the debounce: nothing sent yet.
        step(Duration::from_secs(29)).await;
        assert_eq!(target.count(), 0);

        // A new event pushes the flush out again.
        handle.record_share("p1");
        settle().await;
        step(Duration::from_secs(29)).await;
        assert_eq!(target.count(), 0);

        step(Duration::from_secs(2)).await;
        assert_eq!(target.count(), 1);
        let batch = &target.delivered.lock().unwrap()[0];
        assert_eq!(batch.views.len(), 1);
        assert_eq!(batch.shares.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn safety_interval_flushes_under_continuous_activity() {
        let store = Arc::new(MemoryStore::default());
        let target = Arc::new(RecordingTarget::default());
        let tight = FlushPolicy {
            debounce: Duration::from_secs(30),
            safety_interval: Duration::from_secs(60),
            startup_delay: Duration::from_secs(5),
        };
        let (handle, _task) = Batcher::new(store, target.clone(), tight).spawn();
        past_startup().await;

        // A share every 20 seconds keeps re-arming the debounce forever.
        for i in 0..3 {
            handle.record_share(&format!("p{i}"));
            settle().await;
            step(Duration::from_secs(20)).await;
        }

        // The safety net fired at the 60s mark regardless.
        assert!(target.count() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_flush_is_retried_with_full_contents() {
        let store = Arc::new(MemoryStore::default());
        let target = Arc::new(RecordingTarget::default());
        target.fail.store(true, Ordering::SeqCst);

        let (handle, _task) =
            Batcher::new(store.clone(), target.clone(), policy()).spawn();

        handle.record_view("p1");
        settle().await;
        step(Duration::from_secs(31)).await;

        // Delivery failed; the store still holds the event.
        assert_eq!(target.count(), 0);
        assert_eq!(store.load().len(), 1);

        // The safety-net tick retries and succeeds.
        target.fail.store(false, Ordering::SeqCst);
        step(Duration::from_secs(3600)).await;
        assert_eq!(target.count(), 1);
        assert!(store.load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn startup_flush_drains_a_previous_session() {
        let store = Arc::new(MemoryStore::default());
        store.save(&PendingBatch {
            views: vec![TrackingEvent {
                property_id: "leftover".to_string(),
                timestamp: 0,
            }],
            shares: vec![],
        });

        let target = Arc::new(RecordingTarget::default());
        let (_handle, _task) =
            Batcher::new(store.clone(), target.clone(), policy()).spawn();
        // The task must arm its timers before the clock moves.
        settle().await;

        step(Duration::from_secs(6)).await;
        assert_eq!(target.count(), 1);
        assert!(store.load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn startup_flush_survives_an_early_event() {
        let store = Arc::new(MemoryStore::default());
        store.save(&PendingBatch {
            views: vec![TrackingEvent {
                property_id: "leftover".to_string(),
                timestamp: 0,
            }],
            shares: vec![],
        });

        let target = Arc::new(RecordingTarget::default());
        let (handle, _task) =
            Batcher::new(store.clone(), target.clone(), policy()).spawn();
        settle().await;

        // An event inside the startup window must not push the startup
        // flush out to the debounce horizon.
        step(Duration::from_secs(1)).await;
        handle.record_view("p1");
        settle().await;

        step(Duration::from_secs(9)).await;
        assert_eq!(target.count(), 1);
        assert_eq!(target.delivered.lock().unwrap()[0].views.len(), 2);
        assert!(store.load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_last_handle_forces_a_final_flush() {
        let store = Arc::new(MemoryStore::default());
        let target = Arc::new(RecordingTarget::default());
        let (handle, task) =
            Batcher::new(store.clone(), target.clone(), policy()).spawn();

        handle.record_view("p1");
        settle().await;
        drop(handle);

        task.await.unwrap();
        assert_eq!(target.count(), 1);
        assert!(store.load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_bypasses_the_debounce() {
        let store = Arc::new(MemoryStore::default());
        let target = Arc::new(RecordingTarget::default());
        let (handle, _task) =
            Batcher::new(store, target.clone(), policy()).spawn();

        handle.record_view("p1");
        handle.flush_now();
        settle().await;

        assert_eq!(target.count(), 1);
    }
}
