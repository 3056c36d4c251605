//! SIM change watcher.
//!
//! Reacts to platform SIM notifications and reports present/removed
//! transitions to a subscriber.
//!
//! # State Transitions
//!
//! ```text
//! Idle
//!     ↓ (start)
//! Watching ←──────────────┐
//!     ↓ (notification)    │
//! Debouncing              │
//!     ↓ (debounce elapsed)│
//! Resolving ──────────────┘
//! ```
//!
//! Any state moves to the terminal `Stopped` on [`SimWatcher::stop`].
//!
//! One resolution runs at a time. Notifications arriving while one is in
//! flight are coalesced into a single follow-up resolution. A failed
//! resolution is retried once after another debounce; if the retry fails
//! too, the SIM is reported removed.
//!
//! `stop` does not cancel an in-flight resolution. That resolution runs to
//! completion and its callback still fires once.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simbind_core::SimNotification;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{SimError, WatcherError};
use crate::platform::{NotificationSink, SimNotificationSource};
use crate::sim::{SimRecord, SimResolver};

/// Maximum number of state transitions to track in history.
const MAX_HISTORY_SIZE: usize = 100;

/// Default settle time before querying SIM state after a notification.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watcher lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatcherState {
    Idle,
    Watching,
    Debouncing,
    Resolving,
    Stopped,
}

/// Event delivered to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimChangeEvent {
    pub present: bool,
    /// Resolved SIM, or [`SimRecord::empty`] when removed
    pub record: SimRecord,
}

impl SimChangeEvent {
    pub fn present(record: SimRecord) -> Self {
        Self {
            present: true,
            record,
        }
    }

    pub fn removed() -> Self {
        Self {
            present: false,
            record: SimRecord::empty(),
        }
    }
}

/// Subscriber callback.
pub type SimChangeCallback = Arc<dyn Fn(SimChangeEvent) + Send + Sync>;

/// Record of a state transition for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: WatcherState,
    pub to_state: WatcherState,
    /// Unix epoch milliseconds
    pub timestamp: u64,
}

/// Last state reported to the subscriber, used to suppress repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reported {
    Present(String),
    Removed,
}

impl Reported {
    fn of(event: &SimChangeEvent) -> Self {
        if event.present {
            Self::Present(event.record.sim_id_hash.clone())
        } else {
            Self::Removed
        }
    }
}

struct Shared {
    state: WatcherState,
    callback: Option<SimChangeCallback>,
    last_reported: Option<Reported>,
    history: VecDeque<StateTransition>,
}

impl Shared {
    fn transition(&mut self, to_state: WatcherState) {
        if self.state == to_state {
            return;
        }
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(StateTransition {
            from_state: self.state,
            to_state,
            timestamp: current_timestamp(),
        });
        debug!(from = ?self.state, to = ?to_state, "SIM watcher transition");
        self.state = to_state;
    }
}

/// Owned SIM change watcher. Construct one per subscriber and keep it for
/// as long as events are wanted.
pub struct SimWatcher {
    resolver: Arc<SimResolver>,
    source: Arc<dyn SimNotificationSource>,
    debounce: Duration,
    slot_index: i32,
    shared: Arc<Mutex<Shared>>,
    stop_tx: watch::Sender<bool>,
}

impl SimWatcher {
    pub fn new(resolver: Arc<SimResolver>, source: Arc<dyn SimNotificationSource>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            resolver,
            source,
            debounce: DEFAULT_DEBOUNCE,
            slot_index: 0,
            shared: Arc::new(Mutex::new(Shared {
                state: WatcherState::Idle,
                callback: None,
                last_reported: None,
                history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            })),
            stop_tx,
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Watch a SIM slot other than 0.
    #[must_use]
    pub fn with_slot(mut self, slot_index: i32) -> Self {
        self.slot_index = slot_index;
        self
    }

    /// Current state.
    pub fn state(&self) -> WatcherState {
        lock(&self.shared).state
    }

    /// State transition history, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        lock(&self.shared).history.iter().cloned().collect()
    }

    /// Register for every SIM notification the platform version supports
    /// and start reporting to `callback`.
    ///
    /// Must be called from within a tokio runtime; the watcher's event loop
    /// runs as a task on it.
    pub fn start(
        &self,
        callback: impl Fn(SimChangeEvent) + Send + Sync + 'static,
    ) -> Result<(), WatcherError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;

        let mut shared = lock(&self.shared);
        match shared.state {
            WatcherState::Idle => {}
            WatcherState::Stopped => return Err(WatcherError::Stopped),
            _ => return Err(WatcherError::AlreadyStarted),
        }

        let notifications = self.resolver.capabilities().notifications.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        self.source
            .register(&notifications, NotificationSink::new(tx))?;

        shared.callback = Some(Arc::new(callback));
        shared.transition(WatcherState::Watching);
        drop(shared);

        info!(
            notifications = ?notifications,
            debounce_ms = self.debounce.as_millis() as u64,
            "SIM watcher started"
        );

        let driver = Driver {
            resolver: Arc::clone(&self.resolver),
            shared: Arc::clone(&self.shared),
            debounce: self.debounce,
            slot_index: self.slot_index,
        };
        runtime.spawn(driver.run(rx, self.stop_tx.subscribe()));
        Ok(())
    }

    /// Unregister listeners, drop the callback and move to `Stopped`.
    ///
    /// Idempotent; a no-op on a watcher that is not watching. An in-flight
    /// resolution is not cancelled and still reports once.
    pub fn stop(&self) {
        let mut shared = lock(&self.shared);
        match shared.state {
            WatcherState::Idle | WatcherState::Stopped => return,
            _ => {}
        }
        self.source.unregister();
        shared.callback = None;
        shared.transition(WatcherState::Stopped);
        drop(shared);

        let _ = self.stop_tx.send(true);
        info!("SIM watcher stopped");
    }
}

impl Drop for SimWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Event loop state moved into the spawned task.
struct Driver {
    resolver: Arc<SimResolver>,
    shared: Arc<Mutex<Shared>>,
    debounce: Duration,
    slot_index: i32,
}

impl Driver {
    async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<SimNotification>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        loop {
            let notification = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                n = rx.recv() => match n {
                    Some(n) => n,
                    None => break,
                },
            };

            if !self.enter(WatcherState::Debouncing) {
                break;
            }
            debug!(action = notification.action_name(), "SIM notification received");

            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(self.debounce) => {}
            }

            // Everything that arrived while settling is answered by this pass
            let mut coalesced = 0usize;
            while rx.try_recv().is_ok() {
                coalesced += 1;
            }
            if coalesced > 0 {
                debug!(coalesced, "Coalesced SIM notifications");
            }

            let callback = {
                let mut shared = lock(&self.shared);
                if shared.state == WatcherState::Stopped {
                    break;
                }
                shared.transition(WatcherState::Resolving);
                shared.callback.clone()
            };

            let event = self.resolve_with_retry().await;
            self.report(event, callback);

            if !self.enter(WatcherState::Watching) {
                break;
            }
        }
        debug!("SIM watcher event loop finished");
    }

    /// Move to `state` unless the watcher was stopped meanwhile.
    fn enter(&self, state: WatcherState) -> bool {
        let mut shared = lock(&self.shared);
        if shared.state == WatcherState::Stopped {
            return false;
        }
        shared.transition(state);
        true
    }

    async fn resolve_with_retry(&self) -> SimChangeEvent {
        match self.resolver.primary_sim(self.slot_index) {
            Ok(record) => return SimChangeEvent::present(record),
            Err(e) => log_failure("first attempt", &e),
        }

        tokio::time::sleep(self.debounce).await;

        match self.resolver.primary_sim(self.slot_index) {
            Ok(record) => SimChangeEvent::present(record),
            Err(e) => {
                log_failure("retry", &e);
                SimChangeEvent::removed()
            }
        }
    }

    fn report(&self, event: SimChangeEvent, callback: Option<SimChangeCallback>) {
        let reported = Reported::of(&event);
        {
            let mut shared = lock(&self.shared);
            if shared.last_reported.as_ref() == Some(&reported) {
                debug!(present = event.present, "SIM state unchanged, not reporting");
                return;
            }
            shared.last_reported = Some(reported);
        }

        info!(
            present = event.present,
            slot = event.record.slot_index,
            sim_id_hash = %event.record.sim_id_hash,
            "SIM state changed"
        );
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

fn log_failure(attempt: &str, error: &SimError) {
    warn!(attempt, error = %error, "SIM resolution failed");
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Get current timestamp in milliseconds.
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
