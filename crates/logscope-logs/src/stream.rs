use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use logscope_api::{ApiClient, LogQuery};
use logscope_types::LogRecord;

use crate::buffer::RecordBuffer;

/// Anything the stream controller can poll records from
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the currently available record set
    async fn fetch(&self) -> anyhow::Result<Vec<LogRecord>>;
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn fetch(&self) -> anyhow::Result<Vec<LogRecord>> {
        Ok(self.fetch_logs(&LogQuery::default()).await?)
    }
}

/// Streaming configuration
#[derive(Clone, Copy, Debug)]
pub struct StreamConfig {
    /// Period between poll ticks
    pub poll_interval: Duration,

    /// Maximum records held in the window
    pub capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            capacity: 100,
        }
    }
}

/// Lifecycle state of a [`StreamController`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Paused,
}

/// Polling pseudo-stream over a record source
///
/// Periodically re-fetches the full record set (the backend has no "since"
/// cursor) and merges it into a bounded window, deduplicating by id. All
/// methods take `&self`; share the controller behind an `Arc` and clone the
/// buffer handle for readers.
pub struct StreamController {
    source: Arc<dyn RecordSource>,
    buffer: RecordBuffer,
    config: StreamConfig,
    state: RwLock<StreamState>,
    cancel: RwLock<CancellationToken>,

    /// Bumped on every stop/pause; a response fetched under an older
    /// generation is discarded instead of applied
    generation: Arc<AtomicU64>,

    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamController {
    /// Create a controller over the given source
    pub fn new(source: Arc<dyn RecordSource>, config: StreamConfig) -> Self {
        Self {
            source,
            buffer: RecordBuffer::new(config.capacity),
            config,
            state: RwLock::new(StreamState::Idle),
            cancel: RwLock::new(CancellationToken::new()),
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Handle to the record window
    pub fn buffer(&self) -> &RecordBuffer {
        &self.buffer
    }

    pub fn state(&self) -> StreamState {
        *self.state.read()
    }

    /// Start or resume streaming
    ///
    /// From `Idle` the window is seeded with one inline fetch before the
    /// periodic task starts; a seed failure returns the error and leaves the
    /// controller `Idle`, never `Streaming` without a poll task. From
    /// `Paused` polling resumes without re-seeding. Calling `start` while
    /// already `Streaming` is a no-op.
    pub async fn start(&self) -> anyhow::Result<()> {
        let generation = self.generation.load(Ordering::SeqCst);

        let seed = {
            let mut state = self.state.write();
            match *state {
                StreamState::Streaming => return Ok(()),
                StreamState::Paused => {
                    *state = StreamState::Streaming;
                    false
                }
                StreamState::Idle => {
                    *state = StreamState::Streaming;
                    true
                }
            }
        };

        if seed {
            match self.source.fetch().await {
                Ok(batch) => {
                    // A stop() that raced the seed fetch wins; the late
                    // response must not repopulate the window.
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return Ok(());
                    }
                    let added = self.buffer.merge_new(batch);
                    tracing::debug!(added, "seeded record window");
                }
                Err(e) => {
                    let mut state = self.state.write();
                    if *state == StreamState::Streaming {
                        *state = StreamState::Idle;
                    }
                    return Err(e);
                }
            }
        }

        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(());
        }
        self.spawn_poll_task();
        Ok(())
    }

    /// Halt polling but keep the window
    pub fn pause(&self) {
        {
            let mut state = self.state.write();
            if *state != StreamState::Streaming {
                return;
            }
            *state = StreamState::Paused;
        }
        self.halt_task();
    }

    /// Halt polling and clear the window
    pub fn stop(&self) {
        *self.state.write() = StreamState::Idle;
        self.halt_task();
        self.buffer.clear();
    }

    fn halt_task(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut cancel = self.cancel.write();
            cancel.cancel();
            // Fresh token for the next start()
            *cancel = CancellationToken::new();
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    fn spawn_poll_task(&self) {
        let source = Arc::clone(&self.source);
        let buffer = self.buffer.clone();
        let cancel = self.cancel.read().clone();
        let generation = Arc::clone(&self.generation);
        let started_at = generation.load(Ordering::SeqCst);
        let period = self.config.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval fires immediately; the seed fetch already covered
            // this instant
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    _ = ticker.tick() => {
                        match source.fetch().await {
                            Ok(batch) => {
                                if cancel.is_cancelled()
                                    || generation.load(Ordering::SeqCst) != started_at
                                {
                                    break;
                                }
                                let added = buffer.merge_new(batch);
                                if added > 0 {
                                    tracing::debug!(added, "merged new records");
                                }
                            }
                            Err(e) => {
                                // One bad tick never stops the stream
                                tracing::warn!(error = %e, "poll tick failed; retrying next tick");
                            }
                        }
                    }
                }
            }
        });

        *self.task.lock() = Some(handle);
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.halt_task();
    }
}
