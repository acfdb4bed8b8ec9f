/*!
 * Progress tracking with publish/subscribe notification.
 *
 * `ProgressTracker` holds the phase and counters of a translation run and
 * publishes a `ProgressState` snapshot after every change. Observers either
 * register a synchronous callback on the `ProgressEmitter` or take a
 * broadcast receiver for async consumption.
 */

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel; slow receivers see `Lagged`
const CHANNEL_CAPACITY: usize = 256;

/// Phase of a translation run, in the only order it may advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    #[default]
    Initializing,
    Extracting,
    Preparing,
    Translating,
    Validating,
    Applying,
    Completed,
    /// Terminal, reachable from any phase
    Error,
}

impl ProgressPhase {
    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Extracting => "extracting",
            Self::Preparing => "preparing",
            Self::Translating => "translating",
            Self::Validating => "validating",
            Self::Applying => "applying",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of a run's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Session of the run that published the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub current: usize,
    pub total: usize,
    pub phase: ProgressPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Estimated remaining time in milliseconds, once something is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining_ms: Option<u64>,
}

impl ProgressState {
    /// Completion percentage in `[0, 100]`
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return if self.phase == ProgressPhase::Completed { 100.0 } else { 0.0 };
        }
        self.current as f64 / self.total as f64 * 100.0
    }
}

/// Handle returned by `ProgressEmitter::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&ProgressState) + Send + Sync>;

/// Fan-out of progress snapshots to any number of observers
pub struct ProgressEmitter {
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
    channel: broadcast::Sender<ProgressState>,
}

impl ProgressEmitter {
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            channel,
        }
    }

    /// Register a callback invoked synchronously on every snapshot
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Receiver of every snapshot published from now on
    pub fn subscribe_channel(&self) -> broadcast::Receiver<ProgressState> {
        self.channel.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Publish a snapshot to every observer
    pub fn emit(&self, state: &ProgressState) {
        // Callbacks run outside the lock so they may (un)subscribe
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        for subscriber in subscribers {
            subscriber(state);
        }
        // No receivers is fine
        let _ = self.channel.send(state.clone());
    }
}

impl Default for ProgressEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("subscribers", &self.subscriber_count())
            .field("channel_receivers", &self.channel.receiver_count())
            .finish()
    }
}

#[derive(Debug)]
struct TrackerState {
    session_id: Option<String>,
    current: usize,
    total: usize,
    phase: ProgressPhase,
    message: Option<String>,
    start_time: Instant,
    phase_start_time: Instant,
}

impl TrackerState {
    fn new(session_id: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            current: 0,
            total: 0,
            phase: ProgressPhase::Initializing,
            message: None,
            start_time: now,
            phase_start_time: now,
        }
    }

    fn snapshot(&self) -> ProgressState {
        let estimated_time_remaining_ms = (self.current > 0).then(|| {
            let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
            let rate = self.current as f64 / elapsed_ms.max(1.0);
            ((self.total - self.current) as f64 / rate).round() as u64
        });

        ProgressState {
            session_id: self.session_id.clone(),
            current: self.current,
            total: self.total,
            phase: self.phase,
            message: self.message.clone(),
            estimated_time_remaining_ms,
        }
    }
}

/// Phase and counters of one run
#[derive(Debug)]
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    emitter: Arc<ProgressEmitter>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_emitter(Arc::new(ProgressEmitter::new()))
    }

    /// Tracker publishing to an emitter shared with other runs
    pub fn with_emitter(emitter: Arc<ProgressEmitter>) -> Self {
        Self {
            state: Mutex::new(TrackerState::new(None)),
            emitter,
        }
    }

    /// Tracker whose snapshots carry a session id, so observers of a shared
    /// emitter can tell runs apart
    pub fn for_session(emitter: Arc<ProgressEmitter>, session_id: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(TrackerState::new(Some(session_id.into()))),
            emitter,
        }
    }

    /// Emitter observers subscribe to
    pub fn emitter(&self) -> &ProgressEmitter {
        &self.emitter
    }

    /// Current snapshot without publishing it
    pub fn snapshot(&self) -> ProgressState {
        self.state.lock().snapshot()
    }

    pub fn set_total(&self, total: usize) {
        self.update(|s| {
            s.total = total;
            s.current = s.current.min(total);
        });
    }

    /// Move to a later phase.
    ///
    /// Moving backwards is ignored, and nothing leaves `Error`. Staying in the
    /// same phase only updates the message. Returns whether the change applied.
    pub fn set_phase(&self, phase: ProgressPhase, message: Option<String>) -> bool {
        let mut applied = true;
        self.update(|s| {
            if s.phase == ProgressPhase::Error || (phase < s.phase && phase != ProgressPhase::Error) {
                debug!("Ignoring phase change {} -> {}", s.phase, phase);
                applied = false;
                return;
            }
            if phase != s.phase {
                debug!(
                    "Phase {} -> {} after {:?}",
                    s.phase,
                    phase,
                    s.phase_start_time.elapsed()
                );
                s.phase = phase;
                s.phase_start_time = Instant::now();
            }
            s.message = message;
        });
        applied
    }

    /// Replace the message of the current phase
    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| s.message = Some(message));
    }

    pub fn increment(&self, n: usize) {
        self.update(|s| s.current = (s.current + n).min(s.total));
    }

    pub fn set_current(&self, current: usize) {
        self.update(|s| s.current = current.min(s.total));
    }

    /// Back to an empty `Initializing` state of the same session
    pub fn reset(&self) {
        self.update(|s| *s = TrackerState::new(s.session_id.take()));
    }

    fn update<F: FnOnce(&mut TrackerState)>(&self, f: F) {
        let snapshot = {
            let mut state = self.state.lock();
            f(&mut state);
            state.snapshot()
        };
        self.emitter.emit(&snapshot);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
