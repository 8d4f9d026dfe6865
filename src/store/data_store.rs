//! In-memory simulation data store.
//!
//! The store exclusively owns the loaded `SimulationResult`. It also owns the
//! replay slot: a generation counter plus the lease held by the running replay.
//! Every leased frame application checks the lease under the same write lock
//! that cancellation takes, so a frame is either applied completely or not at
//! all.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::aggregation::{identify_control, ControlIdentification};
use crate::combination::{Combination, CombinationMetrics};
use crate::error::{ExecutionError, UpliftError, UpliftResult};
use crate::frame::{in_day_order, SimulationFrame};
use crate::ids::{ComboId, ReplayId, SimulationId, SubscriptionId};
use crate::result::SimulationResult;

use super::traits::{SimulationSnapshot, SnapshotStore, StoreEvent, StoreListener};

/// Outcome of applying one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFrame {
    /// The frame's day.
    pub day: u32,
    /// Entries written to known combinations.
    pub applied: usize,
    /// Entries skipped because the combination is unknown.
    pub unknown: Vec<ComboId>,
}

/// Replay lifecycle as seen from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPhase {
    /// No replay holds the lease.
    Idle,
    /// Frames are being applied.
    Running,
    /// All frames applied; final classification in progress.
    Completed,
}

/// How the most recent replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Every frame was applied and classified.
    Completed,
    /// Stopped before completion.
    Cancelled,
}

/// Proof of lease ownership handed to the replay worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplayTicket {
    pub(crate) id: ReplayId,
    pub(crate) generation: u64,
}

/// Lease state released by a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReleasedLease {
    pub(crate) id: ReplayId,
    pub(crate) frames_applied: usize,
    pub(crate) last_applied_day: Option<u32>,
}

#[derive(Debug)]
struct ReplayLease {
    ticket: ReplayTicket,
    phase: ReplayPhase,
    frames_applied: usize,
    last_applied_day: Option<u32>,
    // Dropping the lease disconnects the worker's wake channel.
    _wake: Sender<()>,
}

#[derive(Debug, Default)]
struct ReplaySlot {
    generation: u64,
    lease: Option<ReplayLease>,
    last_outcome: Option<ReplayOutcome>,
}

impl ReplaySlot {
    fn holds(&self, ticket: ReplayTicket) -> bool {
        self.generation == ticket.generation
            && self.lease.as_ref().is_some_and(|l| l.ticket == ticket)
    }

    fn release(&mut self, outcome: ReplayOutcome) -> Option<ReleasedLease> {
        let lease = self.lease.take()?;
        self.generation += 1;
        self.last_outcome = Some(outcome);
        Some(ReleasedLease {
            id: lease.ticket.id,
            frames_applied: lease.frames_applied,
            last_applied_day: lease.last_applied_day,
        })
    }
}

#[derive(Debug)]
struct LoadedState {
    id: Option<SimulationId>,
    combinations: Vec<Combination>,
    index: HashMap<ComboId, usize>,
    frames: Vec<SimulationFrame>,
    control_id: Option<ComboId>,
    control_metrics: CombinationMetrics,
    loaded_at: DateTime<Utc>,
    last_applied_day: Option<u32>,
}

impl LoadedState {
    fn from_result(result: SimulationResult) -> Self {
        let control = identify_control(&result.combinations);
        match &control {
            ControlIdentification::Found { .. } => {}
            ControlIdentification::Missing => {
                tracing::warn!("loaded result has no zero-uplift combination; control figures unavailable");
            }
            ControlIdentification::Ambiguous { candidates } => {
                tracing::warn!(
                    candidates = candidates.len(),
                    "loaded result has several zero-uplift combinations; control figures unavailable"
                );
            }
        }

        let control_metrics = control
            .resolve(&result.combinations)
            .map_or(result.control_metrics, |c| c.metrics);
        let index = result
            .combinations
            .iter()
            .enumerate()
            .map(|(i, c)| (c.combo_id.clone(), i))
            .collect();

        Self {
            id: result.id,
            index,
            frames: in_day_order(&result.frames),
            control_id: control.combo_id().cloned(),
            control_metrics,
            combinations: result.combinations,
            loaded_at: Utc::now(),
            last_applied_day: None,
        }
    }

    fn apply(&mut self, frame: &SimulationFrame) -> AppliedFrame {
        let mut applied = 0;
        let mut unknown = Vec::new();
        for entry in &frame.combos {
            let Some(&i) = self.index.get(&entry.combo_id) else {
                unknown.push(entry.combo_id.clone());
                continue;
            };
            let metrics = entry.metrics();
            self.combinations[i].metrics = metrics;
            if self.control_id.as_ref() == Some(&entry.combo_id) {
                self.control_metrics = metrics;
            }
            applied += 1;
        }
        self.last_applied_day = Some(frame.day);
        AppliedFrame {
            day: frame.day,
            applied,
            unknown,
        }
    }

    fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            id: self.id.clone(),
            combinations: self.combinations.clone(),
            frames: self.frames.clone(),
            control_id: self.control_id.clone(),
            control_metrics: self.control_metrics,
            loaded_at: self.loaded_at,
            last_applied_day: self.last_applied_day,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    loaded: Option<LoadedState>,
    replay: ReplaySlot,
}

impl StoreState {
    fn force_cancel(&mut self, reason: &'static str) {
        if let Some(released) = self.replay.release(ReplayOutcome::Cancelled) {
            tracing::info!(
                replay_id = %released.id,
                frames_applied = released.frames_applied,
                reason,
                "force-cancelled running replay"
            );
        }
    }
}

/// Thread-safe owner of the loaded simulation result.
#[derive(Default)]
pub struct SimulationDataStore {
    state: RwLock<StoreState>,
    listeners: RwLock<Vec<(SubscriptionId, StoreListener)>>,
}

impl std::fmt::Debug for SimulationDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationDataStore")
            .field("loaded", &self.is_loaded())
            .field("replay_phase", &self.replay_phase())
            .finish_non_exhaustive()
    }
}

impl SimulationDataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: &StoreEvent) {
        let listeners: Vec<StoreListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Replaces the current state with `result`.
    ///
    /// Invalid results are rejected and leave the previous state untouched. A
    /// running replay is cancelled before the new result is installed.
    pub fn load(&self, result: SimulationResult) -> UpliftResult<()> {
        result.validate()?;
        let loaded = LoadedState::from_result(result);
        let event = StoreEvent::Loaded {
            combinations: loaded.combinations.len(),
            frames: loaded.frames.len(),
        };

        {
            let mut state = self.write();
            state.force_cancel("load");
            state.loaded = Some(loaded);
        }

        tracing::info!(?event, "simulation result loaded");
        self.notify(&event);
        Ok(())
    }

    /// Empties the store, cancelling any running replay first.
    pub fn clear(&self) {
        {
            let mut state = self.write();
            state.force_cancel("clear");
            state.loaded = None;
        }
        tracing::info!("simulation store cleared");
        self.notify(&StoreEvent::Cleared);
    }

    /// True when a result is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.read().loaded.is_some()
    }

    /// Combinations with their current metrics; empty when unloaded.
    #[must_use]
    pub fn current_combinations(&self) -> Vec<Combination> {
        self.read()
            .loaded
            .as_ref()
            .map(|l| l.combinations.clone())
            .unwrap_or_default()
    }

    /// Frames of the loaded result in day order; empty when unloaded.
    #[must_use]
    pub fn current_frames(&self) -> Vec<SimulationFrame> {
        self.read()
            .loaded
            .as_ref()
            .map(|l| l.frames.clone())
            .unwrap_or_default()
    }

    /// Current control metrics; `None` when unloaded.
    #[must_use]
    pub fn current_control(&self) -> Option<CombinationMetrics> {
        self.read().loaded.as_ref().map(|l| l.control_metrics)
    }

    /// Writes a frame's per-combination values into the loaded combinations.
    ///
    /// Entries for unknown combinations are skipped while known entries are
    /// still applied; the skipped ids are then reported as `UnknownCombo`.
    /// Rejected with `AlreadyRunning` while a replay holds the lease.
    pub fn apply_frame(&self, frame: &SimulationFrame) -> UpliftResult<AppliedFrame> {
        let applied = {
            let mut state = self.write();
            if let Some(lease) = &state.replay.lease {
                return Err(ExecutionError::AlreadyRunning {
                    replay_id: lease.ticket.id,
                }
                .into());
            }
            let loaded = state.loaded.as_mut().ok_or(ExecutionError::NotLoaded)?;
            loaded.apply(frame)
        };

        self.notify(&StoreEvent::FrameApplied { day: applied.day });

        if applied.unknown.is_empty() {
            Ok(applied)
        } else {
            tracing::warn!(day = applied.day, unknown = ?applied.unknown, "frame references unknown combinations");
            Err(ExecutionError::UnknownCombo {
                day: applied.day,
                combo_ids: applied.unknown,
            }
            .into())
        }
    }

    /// Current replay phase.
    #[must_use]
    pub fn replay_phase(&self) -> ReplayPhase {
        self.read()
            .replay
            .lease
            .as_ref()
            .map_or(ReplayPhase::Idle, |l| l.phase)
    }

    /// Outcome of the most recently finished replay.
    #[must_use]
    pub fn last_replay_outcome(&self) -> Option<ReplayOutcome> {
        self.read().replay.last_outcome
    }

    pub(crate) fn acquire_lease(&self, wake: Sender<()>) -> UpliftResult<ReplayTicket> {
        let mut state = self.write();
        if let Some(lease) = &state.replay.lease {
            return Err(ExecutionError::AlreadyRunning {
                replay_id: lease.ticket.id,
            }
            .into());
        }
        if state.loaded.is_none() {
            return Err(ExecutionError::NotLoaded.into());
        }
        let ticket = ReplayTicket {
            id: ReplayId::new(),
            generation: state.replay.generation,
        };
        state.replay.lease = Some(ReplayLease {
            ticket,
            phase: ReplayPhase::Running,
            frames_applied: 0,
            last_applied_day: None,
            _wake: wake,
        });
        Ok(ticket)
    }

    /// Applies a frame on behalf of the lease holder and returns the resulting
    /// combinations. Fails with `ReplayCancelled` once the lease is gone.
    pub(crate) fn apply_leased(
        &self,
        ticket: ReplayTicket,
        frame: &SimulationFrame,
    ) -> UpliftResult<(AppliedFrame, Vec<Combination>)> {
        let out = {
            let mut state = self.write();
            let StoreState { loaded, replay } = &mut *state;
            if !replay.holds(ticket) {
                return Err(cancelled(ticket));
            }
            let loaded = loaded.as_mut().ok_or_else(|| cancelled(ticket))?;
            let applied = loaded.apply(frame);
            if let Some(lease) = replay.lease.as_mut() {
                lease.frames_applied += 1;
                lease.last_applied_day = Some(frame.day);
            }
            (applied, loaded.combinations.clone())
        };
        self.notify(&StoreEvent::FrameApplied { day: out.0.day });
        Ok(out)
    }

    pub(crate) fn lease_is_current(&self, ticket: ReplayTicket) -> bool {
        self.read().replay.holds(ticket)
    }

    /// Moves the lease to `Completed` and returns the final combinations.
    pub(crate) fn begin_completion(&self, ticket: ReplayTicket) -> UpliftResult<Vec<Combination>> {
        let mut state = self.write();
        let StoreState { loaded, replay } = &mut *state;
        if !replay.holds(ticket) {
            return Err(cancelled(ticket));
        }
        if let Some(lease) = replay.lease.as_mut() {
            lease.phase = ReplayPhase::Completed;
        }
        Ok(loaded.as_ref().map(|l| l.combinations.clone()).unwrap_or_default())
    }

    /// Releases a completed lease. No-op if it was already force-cancelled.
    pub(crate) fn finish_lease(&self, ticket: ReplayTicket) -> bool {
        let mut state = self.write();
        if !state.replay.holds(ticket) {
            return false;
        }
        state.replay.release(ReplayOutcome::Completed).is_some()
    }

    /// Cancels the running replay. When `ticket` is given, only that replay is
    /// cancelled. Only a `Running` lease can be cancelled.
    pub(crate) fn cancel_lease(&self, ticket: Option<ReplayTicket>) -> UpliftResult<ReleasedLease> {
        let mut state = self.write();
        let slot = &mut state.replay;
        let running = slot.lease.as_ref().is_some_and(|l| {
            l.phase == ReplayPhase::Running && ticket.map_or(true, |t| l.ticket == t)
        });
        if !running {
            return Err(ExecutionError::NotRunning.into());
        }
        slot.release(ReplayOutcome::Cancelled)
            .ok_or_else(|| UpliftError::Execution(ExecutionError::NotRunning))
    }
}

fn cancelled(ticket: ReplayTicket) -> UpliftError {
    ExecutionError::ReplayCancelled {
        replay_id: ticket.id,
    }
    .into()
}

impl SnapshotStore for SimulationDataStore {
    fn snapshot(&self) -> Option<SimulationSnapshot> {
        self.read().loaded.as_ref().map(LoadedState::snapshot)
    }

    fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }
}
