//! Day-by-day replay of simulation frames.
//!
//! `Idle -> Running -> (Completed | Cancelled) -> Idle`. Frame `i` is applied,
//! the view recomputed and reported, then the worker waits one interval before
//! frame `i + 1`. One more interval follows the last frame before the table is
//! classified. Cancellation revokes the store lease; the worker notices it on
//! its next wake-up or frame application.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use crate::aggregation::{AggregatedView, AggregationEngine, ViewSelection};
use crate::chart::ChartSeriesBuilder;
use crate::classification::ClassificationEngine;
use crate::config::DashboardConfig;
use crate::error::{ExecutionError, UpliftError, UpliftResult};
use crate::frame::{in_day_order, SimulationFrame};
use crate::ids::ReplayId;
use crate::store::{ReplayPhase, ReplayTicket, SimulationDataStore};

use super::observer::{FrameUpdate, ReplayCancelledInfo, ReplayCompletion, ReplayObserver, ReplayWarning};

/// What to replay and how fast.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct ReplayRequest {
    pub frames: Vec<SimulationFrame>,
    pub interval: Duration,
    pub selection: ViewSelection,
}

/// Handle to a started replay.
///
/// Dropping the handle detaches the replay; it keeps running.
#[derive(Debug)]
pub struct ReplayHandle {
    id: ReplayId,
    ticket: ReplayTicket,
    store: Arc<SimulationDataStore>,
    join: Option<JoinHandle<()>>,
}

impl ReplayHandle {
    /// The replay id.
    #[must_use]
    pub const fn id(&self) -> ReplayId {
        self.id
    }

    /// Cancels this replay. Returns false when it is no longer running.
    pub fn cancel(&self) -> bool {
        match self.store.cancel_lease(Some(self.ticket)) {
            Ok(released) => {
                tracing::info!(replay_id = %released.id, frames_applied = released.frames_applied, "replay cancelled");
                true
            }
            Err(_) => false,
        }
    }

    /// True once the worker has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the worker to exit.
    pub fn join(mut self) -> UpliftResult<()> {
        match self.join.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| UpliftError::internal(format!("replay worker {} panicked", self.id))),
            None => Ok(()),
        }
    }
}

/// Starts and cancels replays against one store.
#[derive(Debug, Clone)]
pub struct ReplayScheduler {
    store: Arc<SimulationDataStore>,
    aggregation: AggregationEngine,
    classification: ClassificationEngine,
    charts: ChartSeriesBuilder,
}

impl ReplayScheduler {
    /// Creates a scheduler for `store`.
    #[must_use]
    pub fn new(store: Arc<SimulationDataStore>, config: &DashboardConfig) -> Self {
        Self {
            store,
            aggregation: AggregationEngine::new(config),
            classification: ClassificationEngine::new(config),
            charts: ChartSeriesBuilder::new(config),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ReplayPhase {
        self.store.replay_phase()
    }

    /// Starts a replay.
    ///
    /// Fails with `AlreadyRunning` while another replay holds the store and
    /// with `NotLoaded` when nothing is loaded. An empty frame list completes
    /// before this returns.
    pub fn start(&self, request: ReplayRequest, observer: Arc<dyn ReplayObserver>) -> UpliftResult<ReplayHandle> {
        let (wake_tx, wake_rx) = bounded::<()>(1);
        let ticket = self.store.acquire_lease(wake_tx)?;
        let frames = in_day_order(&request.frames);

        tracing::info!(
            replay_id = %ticket.id,
            frames = frames.len(),
            interval_ms = u64::try_from(request.interval.as_millis()).unwrap_or(u64::MAX),
            "replay started"
        );

        let worker = ReplayWorker {
            ticket,
            store: Arc::clone(&self.store),
            aggregation: self.aggregation,
            classification: self.classification,
            charts: self.charts,
            frames,
            interval: request.interval,
            selection: request.selection,
            observer,
            wake_rx,
        };

        let join = if worker.frames.is_empty() {
            worker.run();
            None
        } else {
            let spawned = thread::Builder::new()
                .name("uplift-replay".to_string())
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    let _ = self.store.cancel_lease(Some(ticket));
                    return Err(ExecutionError::Spawn { message: e.to_string() }.into());
                }
            }
        };

        Ok(ReplayHandle {
            id: ticket.id,
            ticket,
            store: Arc::clone(&self.store),
            join,
        })
    }

    /// Cancels whichever replay is running.
    ///
    /// Fails with `NotRunning` when no replay is in the `Running` phase.
    pub fn cancel(&self) -> UpliftResult<ReplayCancelledInfo> {
        let released = self.store.cancel_lease(None)?;
        tracing::info!(replay_id = %released.id, frames_applied = released.frames_applied, "replay cancelled");
        Ok(ReplayCancelledInfo {
            replay_id: released.id,
            last_applied_day: released.last_applied_day,
            frames_applied: released.frames_applied,
        })
    }
}

struct ReplayWorker {
    ticket: ReplayTicket,
    store: Arc<SimulationDataStore>,
    aggregation: AggregationEngine,
    classification: ClassificationEngine,
    charts: ChartSeriesBuilder,
    frames: Vec<SimulationFrame>,
    interval: Duration,
    selection: ViewSelection,
    observer: Arc<dyn ReplayObserver>,
    wake_rx: Receiver<()>,
}

impl ReplayWorker {
    fn run(self) {
        let total = self.frames.len();
        let mut last_applied_day = None;

        for (index, frame) in self.frames.iter().enumerate() {
            let Ok((applied, combinations)) = self.store.apply_leased(self.ticket, frame) else {
                return self.cancelled(last_applied_day, index);
            };
            last_applied_day = Some(applied.day);

            if !applied.unknown.is_empty() {
                tracing::warn!(
                    replay_id = %self.ticket.id,
                    day = applied.day,
                    unknown = ?applied.unknown,
                    "frame references unknown combinations; entries skipped"
                );
                self.observer.on_warning(&ReplayWarning {
                    replay_id: self.ticket.id,
                    day: applied.day,
                    unknown_combos: applied.unknown,
                });
            }

            let view = self.aggregation.compute(&combinations, &self.selection);
            let charts = self.charts.build(&view, &combinations, &self.frames[..=index]);
            #[allow(clippy::cast_precision_loss)]
            let progress = (index + 1) as f64 / total as f64;
            tracing::debug!(replay_id = %self.ticket.id, day = frame.day, progress, "replay frame applied");

            self.observer.on_frame(&FrameUpdate {
                replay_id: self.ticket.id,
                day: frame.day,
                index,
                total,
                progress,
                view,
                charts,
            });

            if !self.wait() {
                return self.cancelled(last_applied_day, index + 1);
            }
        }

        self.complete(total);
    }

    /// Sleeps one interval. Returns false once the lease is gone.
    fn wait(&self) -> bool {
        match self.wake_rx.recv_timeout(self.interval) {
            Err(RecvTimeoutError::Timeout) => self.store.lease_is_current(self.ticket),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn complete(&self, frames_applied: usize) {
        let Ok(combinations) = self.store.begin_completion(self.ticket) else {
            return self.cancelled(self.frames.last().map(|f| f.day), frames_applied);
        };

        let view: AggregatedView = self.aggregation.compute(&combinations, &self.selection);
        let table = self.classification.classify_view(&view);

        if !self.store.finish_lease(self.ticket) {
            return self.cancelled(self.frames.last().map(|f| f.day), frames_applied);
        }

        tracing::info!(replay_id = %self.ticket.id, frames_applied, "replay completed");
        self.observer.on_complete(&ReplayCompletion {
            replay_id: self.ticket.id,
            frames_applied,
            view,
            table,
        });
    }

    fn cancelled(&self, last_applied_day: Option<u32>, frames_applied: usize) {
        tracing::debug!(replay_id = %self.ticket.id, frames_applied, "replay worker stopped");
        self.observer.on_cancelled(&ReplayCancelledInfo {
            replay_id: self.ticket.id,
            last_applied_day,
            frames_applied,
        });
    }
}
