//! Replay observer seam and the channel-backed event stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::aggregation::AggregatedView;
use crate::chart::ChartPayload;
use crate::classification::ClassifiedTable;
use crate::error::{ExecutionError, UpliftResult};
use crate::ids::{ComboId, ReplayId};

/// Progress after one applied frame.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameUpdate {
    pub replay_id: ReplayId,
    pub day: u32,
    /// 0-based position in the replay.
    pub index: usize,
    pub total: usize,
    /// `(index + 1) / total`.
    pub progress: f64,
    pub view: AggregatedView,
    pub charts: ChartPayload,
}

/// Non-fatal data-quality condition met during a replay.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayWarning {
    pub replay_id: ReplayId,
    pub day: u32,
    /// Frame entries skipped because the combination is not loaded.
    pub unknown_combos: Vec<ComboId>,
}

/// Final state of a replay that ran to the end.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayCompletion {
    pub replay_id: ReplayId,
    pub frames_applied: usize,
    pub view: AggregatedView,
    pub table: ClassifiedTable,
}

/// Where a cancelled replay stopped.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCancelledInfo {
    pub replay_id: ReplayId,
    pub last_applied_day: Option<u32>,
    pub frames_applied: usize,
}

/// Replay callbacks. All methods default to no-ops.
///
/// Callbacks run on the replay worker thread, except for a replay started
/// with no frames, which completes on the caller's thread.
pub trait ReplayObserver: Send + Sync {
    /// A frame was applied and the view recomputed.
    fn on_frame(&self, _update: &FrameUpdate) {}

    /// A frame contained entries for unknown combinations.
    fn on_warning(&self, _warning: &ReplayWarning) {}

    /// Every frame was applied and the table classified.
    fn on_complete(&self, _completion: &ReplayCompletion) {}

    /// The replay stopped early. No completion follows.
    fn on_cancelled(&self, _info: &ReplayCancelledInfo) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReplayObserver for NoopObserver {}

/// Event delivered through a [`ReplayStream`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Frame(FrameUpdate),
    Warning(ReplayWarning),
    Completed(ReplayCompletion),
    Cancelled(ReplayCancelledInfo),
}

impl ReplayEvent {
    /// True for `Completed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled(_))
    }
}

/// Observer forwarding events into a bounded channel.
///
/// Frame and warning events never block the worker; those that do not fit are
/// dropped and counted. Completion and cancellation wait for buffer space, so
/// the reader must keep draining until it sees a terminal event.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<ReplayEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChannelObserver {
    /// Creates an observer and the stream reading from it.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, ReplayStream) {
        let (tx, rx) = bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let stream = ReplayStream {
            rx,
            dropped: Arc::clone(&dropped),
        };
        (Self { tx, dropped }, stream)
    }

    fn offer(&self, event: ReplayEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn deliver(&self, event: ReplayEvent) {
        // A dropped stream has nobody left to tell.
        let _ = self.tx.send(event);
    }
}

impl ReplayObserver for ChannelObserver {
    fn on_frame(&self, update: &FrameUpdate) {
        self.offer(ReplayEvent::Frame(update.clone()));
    }

    fn on_warning(&self, warning: &ReplayWarning) {
        self.offer(ReplayEvent::Warning(warning.clone()));
    }

    fn on_complete(&self, completion: &ReplayCompletion) {
        self.deliver(ReplayEvent::Completed(completion.clone()));
    }

    fn on_cancelled(&self, info: &ReplayCancelledInfo) {
        self.deliver(ReplayEvent::Cancelled(*info));
    }
}

/// Receiving side of a [`ChannelObserver`].
#[derive(Debug)]
pub struct ReplayStream {
    rx: Receiver<ReplayEvent>,
    dropped: Arc<AtomicU64>,
}

impl ReplayStream {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> UpliftResult<ReplayEvent> {
        self.rx.recv().map_err(|_| disconnected())
    }

    /// Receive the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> UpliftResult<ReplayEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
            .into(),
            RecvTimeoutError::Disconnected => disconnected(),
        })
    }

    /// Drains events that are already queued.
    pub fn try_iter(&self) -> impl Iterator<Item = ReplayEvent> + '_ {
        self.rx.try_iter()
    }

    /// Events dropped because the buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn disconnected() -> crate::error::UpliftError {
    ExecutionError::Disconnected {
        path: "replay_stream".to_string(),
    }
    .into()
}
