//! Progress tracker state machine.
//!
//! One tracker backs one progress dialog. It is opened when a task starts,
//! driven by [`ProgressEvent`]s (or by the job coordinator directly for paths
//! that produce no events), and dismissed by the consumer once the task is in
//! a closable state. `idle → running → {success, error, cancelled}`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::bus::{ProgressBus, Subscription};
use super::types::{
    LogType, ProgressEvent, ProgressLogEntry, ProgressSnapshot, ProgressStatus, SummaryItem,
};
use crate::cancel::CancellationToken;

/// What happens after a terminal status arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DismissPolicy {
    /// The consumer must close the tracker.
    #[default]
    Manual,
    /// Close automatically after the delay.
    AutoAfter(Duration),
}

struct TrackerState {
    snapshot: ProgressSnapshot,
    policy: DismissPolicy,
    pending_dismiss: Option<CancellationToken>,
}

struct TrackerInner {
    state: Mutex<TrackerState>,
    updates: watch::Sender<ProgressSnapshot>,
}

/// Shared handle to one progress dialog's state.
///
/// Cloning is cheap; all clones drive the same state.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ProgressTracker {
    /// Create a closed, idle tracker with the manual dismiss policy.
    pub fn new(title: impl Into<String>) -> Self {
        let snapshot = ProgressSnapshot {
            title: title.into(),
            ..ProgressSnapshot::default()
        };
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            inner: Arc::new(TrackerInner {
                state: Mutex::new(TrackerState {
                    snapshot,
                    policy: DismissPolicy::Manual,
                    pending_dismiss: None,
                }),
                updates,
            }),
        }
    }

    /// Set the dismiss policy for this and later sessions.
    pub fn with_policy(self, policy: DismissPolicy) -> Self {
        self.inner.state.lock().expect("tracker lock poisoned").policy = policy;
        self
    }

    /// Offer a cancel action while running.
    pub fn with_cancel(self, cancellable: bool) -> Self {
        self.inner
            .state
            .lock()
            .expect("tracker lock poisoned")
            .snapshot
            .cancellable = cancellable;
        self
    }

    fn mutate<R>(&self, f: impl FnOnce(&Self, &mut TrackerState) -> R) -> R {
        let mut state = self.inner.state.lock().expect("tracker lock poisoned");
        let result = f(self, &mut *state);
        state.snapshot.revision += 1;
        self.inner.updates.send_replace(state.snapshot.clone());
        result
    }

    /// Start a new session for `task_id`, discarding the previous session's log and summary.
    pub fn open(&self, task_id: impl Into<String>, status_text: impl Into<String>) {
        let task_id = task_id.into();
        debug!("Opening progress tracker for task {}", task_id);
        self.mutate(|_, state| {
            if let Some(token) = state.pending_dismiss.take() {
                token.cancel();
            }
            let snapshot = &mut state.snapshot;
            snapshot.open = true;
            snapshot.task_id = Some(task_id);
            snapshot.status = ProgressStatus::Running;
            snapshot.percent = 0.0;
            snapshot.status_text = status_text.into();
            snapshot.logs.clear();
            snapshot.summary.clear();
        });
    }

    /// Append a log line stamped with the current local time.
    pub fn log(&self, message: impl Into<String>, log_type: LogType) {
        let entry = ProgressLogEntry::now(message, log_type);
        self.mutate(|_, state| state.snapshot.logs.push(entry));
    }

    /// Apply an inbound event. Returns true when the event carried a terminal status.
    ///
    /// Percent, status and status text are overwritten unconditionally. The
    /// summary is rebuilt from only the counters present in this event, and is
    /// left untouched when the event has none.
    pub fn apply(&self, event: &ProgressEvent) -> bool {
        self.mutate(|tracker, state| {
            let snapshot = &mut state.snapshot;
            snapshot.percent = event.percent;
            snapshot.status = event.status;
            snapshot.status_text = event.status_text.clone();

            if let Some(message) = event.log_message.as_deref().filter(|m| !m.is_empty()) {
                let log_type = LogType::parse_or_info(event.log_type.as_deref());
                snapshot.logs.push(ProgressLogEntry::now(message, log_type));
            }

            let summary = SummaryItem::from_event(event);
            if !summary.is_empty() {
                snapshot.summary = summary;
            }

            let terminal = event.status.is_terminal();
            if terminal {
                tracker.schedule_dismiss(state);
            }
            terminal
        })
    }

    /// Manually move a running task forward (paths without an event stream).
    pub fn set_progress(&self, percent: f64, status_text: impl Into<String>) {
        self.mutate(|_, state| {
            state.snapshot.percent = percent;
            state.snapshot.status_text = status_text.into();
        });
    }

    /// Apply one synthetic final update: status, percent, text and an optional log line.
    pub fn finish(
        &self,
        status: ProgressStatus,
        percent: f64,
        status_text: impl Into<String>,
        log: Option<(String, LogType)>,
    ) {
        self.mutate(|tracker, state| {
            let snapshot = &mut state.snapshot;
            snapshot.status = status;
            snapshot.percent = percent;
            snapshot.status_text = status_text.into();
            if let Some((message, log_type)) = log {
                snapshot.logs.push(ProgressLogEntry::now(message, log_type));
            }
            if status.is_terminal() {
                tracker.schedule_dismiss(state);
            }
        });
    }

    /// Fold a call failure into the tracker.
    ///
    /// The status becomes `error` only if no terminal status has arrived yet,
    /// so a backend that already reported its own failure is not reported
    /// twice. The failure is logged either way. Returns whether the status changed.
    pub fn fail(&self, message: &str) -> bool {
        self.mutate(|tracker, state| {
            let changed = !state.snapshot.status.is_terminal();
            if changed {
                state.snapshot.status = ProgressStatus::Error;
                state.snapshot.status_text = format!("Failed: {}", message);
                tracker.schedule_dismiss(state);
            }
            state
                .snapshot
                .logs
                .push(ProgressLogEntry::now(format!("Failed: {}", message), LogType::Error));
            changed
        })
    }

    /// Dismiss the tracker. Refused while the task is running.
    pub fn close(&self) -> bool {
        let mut state = self.inner.state.lock().expect("tracker lock poisoned");
        if !state.snapshot.status.is_closable() {
            debug!("Refusing to close a running tracker");
            return false;
        }
        Self::dismiss_locked(&self.inner, &mut state);
        true
    }

    fn dismiss_locked(inner: &TrackerInner, state: &mut TrackerState) {
        if let Some(token) = state.pending_dismiss.take() {
            token.cancel();
        }
        state.snapshot.open = false;
        state.snapshot.revision += 1;
        inner.updates.send_replace(state.snapshot.clone());
    }

    fn schedule_dismiss(&self, state: &mut TrackerState) {
        let DismissPolicy::AutoAfter(delay) = state.policy else {
            return;
        };
        if let Some(previous) = state.pending_dismiss.take() {
            previous.cancel();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime; tracker will not auto-dismiss");
            return;
        };

        let token = CancellationToken::new();
        state.pending_dismiss = Some(token.clone());
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            if !token.sleep_unless_cancelled(delay).await {
                return;
            }
            let mut state = inner.state.lock().expect("tracker lock poisoned");
            if !token.is_cancelled() {
                debug!("Auto-dismissing progress tracker");
                Self::dismiss_locked(&inner, &mut state);
            }
        });
    }

    /// Forward bus events for this tracker's active task.
    ///
    /// The returned subscription must be kept alive for as long as the view
    /// is, and disposed (or dropped) when it is torn down.
    pub fn attach(&self, bus: &ProgressBus) -> Subscription {
        let tracker = self.clone();
        bus.subscribe(move |event| {
            if tracker.active_task().as_deref() == Some(event.task_id.as_str()) {
                tracker.apply(event);
            }
        })
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner
            .state
            .lock()
            .expect("tracker lock poisoned")
            .snapshot
            .clone()
    }

    /// Observe every change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn status(&self) -> ProgressStatus {
        self.inner.state.lock().expect("tracker lock poisoned").snapshot.status
    }

    pub fn active_task(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .expect("tracker lock poisoned")
            .snapshot
            .task_id
            .clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().expect("tracker lock poisoned").snapshot.open
    }

    pub fn is_closable(&self) -> bool {
        self.status().is_closable()
    }
}
