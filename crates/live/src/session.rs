//! Drive a [`Reconciler`] from a history source and a live feed.
//!
//! Per device the session task:
//!
//! 1. subscribes to the feed,
//! 2. fetches the baseline while buffering any early events,
//! 3. folds feed events until cancelled or the feed ends.
//!
//! If the feed ends, the session waits [`RECONNECT_DELAY`] and starts over
//! with a fresh baseline. A failed baseline fetch leaves the view in
//! [`ViewState::Error`](crate::reconciler::ViewState::Error) and is not
//! retried.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{LiveConfig, DEFAULT_CAPACITY, DEFAULT_HISTORY_LIMIT};
use crate::reconciler::{EventOutcome, Generation, LiveSnapshot, Reconciler};
use crate::source::{ReadingFeed, ReadingHistory};

/// Delay before re-initializing after the feed drops.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub history_limit: usize,
    pub capacity: usize,
    pub display_offset: FixedOffset,
    pub reconnect_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            capacity: DEFAULT_CAPACITY,
            display_offset: Utc.fix(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

impl From<&LiveConfig> for SessionOptions {
    fn from(config: &LiveConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            capacity: config.capacity,
            display_offset: config.display_offset,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

struct Shared {
    reconciler: Mutex<Reconciler>,
    snapshots: watch::Sender<LiveSnapshot>,
    history: Arc<dyn ReadingHistory>,
    feed: Arc<dyn ReadingFeed>,
    options: SessionOptions,
}

impl Shared {
    /// Mutate the reconciler and publish the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut Reconciler) -> R) -> R {
        let mut reconciler = self
            .reconciler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut reconciler);
        self.snapshots.send_replace(reconciler.snapshot());
        result
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Handle to a live view. Observers read snapshots through [`LiveView::watch`].
pub struct LiveView {
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl LiveView {
    pub fn new(
        history: Arc<dyn ReadingHistory>,
        feed: Arc<dyn ReadingFeed>,
        options: SessionOptions,
    ) -> Self {
        let reconciler = Reconciler::with_offset(options.capacity, options.display_offset);
        let (snapshots, _) = watch::channel(reconciler.snapshot());
        Self {
            shared: Arc::new(Shared {
                reconciler: Mutex::new(reconciler),
                snapshots,
                history,
                feed,
                options,
            }),
            running: None,
        }
    }

    pub fn watch(&self) -> watch::Receiver<LiveSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Observe `device_id`, replacing any current device.
    ///
    /// The previous session stops mutating the view immediately and its feed
    /// subscription is released before the new one is opened.
    pub async fn switch_device(&mut self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        let generation = self.shared.update(|r| r.switch_device(device_id.clone()));
        self.stop().await;

        tracing::info!(device_id = %device_id, generation, "Starting live session");
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            Arc::clone(&self.shared),
            device_id,
            generation,
            cancel.clone(),
        ));
        self.running = Some(Running { cancel, task });
    }

    /// Stop observing and release the subscription.
    pub async fn shutdown(mut self) {
        self.shared.update(Reconciler::teardown);
        self.stop().await;
    }

    async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if let Err(e) = running.task.await {
                tracing::warn!(error = %e, "Live session task failed");
            }
        }
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

enum SessionEnd {
    Cancelled,
    Superseded,
    FetchFailed,
    FeedEnded,
}

async fn run_session(
    shared: Arc<Shared>,
    device_id: String,
    mut generation: Generation,
    cancel: CancellationToken,
) {
    loop {
        match run_once(&shared, &device_id, generation, &cancel).await {
            SessionEnd::Cancelled | SessionEnd::Superseded | SessionEnd::FetchFailed => return,
            SessionEnd::FeedEnded => {}
        }

        let delay = shared.options.reconnect_delay;
        tracing::warn!(
            device_id = %device_id,
            delay_ms = delay.as_millis() as u64,
            "Live feed ended, reinitializing after delay",
        );
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }

        match shared.update(|r| r.begin_reload(generation)) {
            Some(next) => generation = next,
            None => return,
        }
    }
}

async fn run_once(
    shared: &Shared,
    device_id: &str,
    generation: Generation,
    cancel: &CancellationToken,
) -> SessionEnd {
    let subscribed = tokio::select! {
        () = cancel.cancelled() => return SessionEnd::Cancelled,
        result = shared.feed.subscribe(device_id) => result,
    };
    let mut subscription = match subscribed {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(device_id, error = %e, "Live feed subscription failed");
            return SessionEnd::FeedEnded;
        }
    };

    let fetch = shared
        .history
        .fetch_recent(device_id, shared.options.history_limit);
    tokio::pin!(fetch);
    let mut feed_open = true;

    let fetched = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                subscription.close().await;
                return SessionEnd::Cancelled;
            }
            result = &mut fetch => break result,
            row = subscription.next(), if feed_open => match row {
                Some(row) => {
                    let outcome = shared.update(|r| r.apply_event(generation, row));
                    tracing::trace!(device_id, ?outcome, "Early feed event");
                }
                None => feed_open = false,
            },
        }
    };

    match fetched {
        Ok(rows) => {
            if !shared.update(|r| r.apply_history(generation, rows)) {
                subscription.close().await;
                return SessionEnd::Superseded;
            }
        }
        Err(e) => {
            tracing::error!(device_id, error = %e, "History fetch failed");
            shared.update(|r| r.apply_error(generation, e.to_string()));
            subscription.close().await;
            return SessionEnd::FetchFailed;
        }
    }

    if !feed_open {
        subscription.close().await;
        return SessionEnd::FeedEnded;
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                subscription.close().await;
                return SessionEnd::Cancelled;
            }
            row = subscription.next() => match row {
                Some(row) => {
                    let id = row.id;
                    match shared.update(|r| r.apply_event(generation, row)) {
                        EventOutcome::Stale => {
                            subscription.close().await;
                            return SessionEnd::Superseded;
                        }
                        outcome => tracing::trace!(device_id, id, ?outcome, "Feed event"),
                    }
                }
                None => {
                    subscription.close().await;
                    return SessionEnd::FeedEnded;
                }
            },
        }
    }
}
