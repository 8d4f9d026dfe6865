//! Dashboard façade.
//!
//! Wires the store, the pure engines and the replay scheduler into the two
//! paths a host drives: the static path (load, then compute the view once) and
//! the replay path (load, then animate frame by frame).

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::aggregation::{AggregatedView, AggregationEngine, PointFilter, ViewSelection};
use crate::chart::{ChartPayload, ChartSeriesBuilder};
use crate::classification::{ClassificationEngine, ClassifiedTable};
use crate::config::DashboardConfig;
use crate::error::{ExecutionError, TransportError, UpliftError, UpliftResult};
use crate::frame::SimulationFrame;
use crate::ids::GoalId;
use crate::project::Goal;
use crate::replay::{ReplayCancelledInfo, ReplayHandle, ReplayObserver, ReplayRequest, ReplayScheduler};
use crate::result::SimulationResult;
use crate::source::SimulationSource;
use crate::store::{ReplayPhase, SimulationDataStore, SnapshotStore};

/// Everything the host renders for the current state.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub aggregated: AggregatedView,
    pub table: ClassifiedTable,
    pub charts: ChartPayload,
}

/// Result of a reset. The store is cleared whatever `remote` says.
#[derive(Debug)]
pub struct ResetOutcome {
    /// Outcome of the remote reset call.
    pub remote: Result<(), TransportError>,
}

impl ResetOutcome {
    /// True when the remote reset succeeded.
    #[must_use]
    pub const fn remote_ok(&self) -> bool {
        self.remote.is_ok()
    }
}

/// Dashboard state and operations.
#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    store: Arc<SimulationDataStore>,
    scheduler: ReplayScheduler,
    aggregation: AggregationEngine,
    classification: ClassificationEngine,
    charts: ChartSeriesBuilder,
    selection: RwLock<ViewSelection>,
}

impl Dashboard {
    /// Creates a dashboard with an empty store.
    pub fn new(config: DashboardConfig) -> UpliftResult<Self> {
        config.validate()?;
        let store = Arc::new(SimulationDataStore::new());
        Ok(Self {
            scheduler: ReplayScheduler::new(Arc::clone(&store), &config),
            aggregation: AggregationEngine::new(&config),
            classification: ClassificationEngine::new(&config),
            charts: ChartSeriesBuilder::new(&config),
            selection: RwLock::new(ViewSelection::default()),
            store,
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// The underlying store, for snapshots and subscriptions.
    #[must_use]
    pub const fn store(&self) -> &Arc<SimulationDataStore> {
        &self.store
    }

    /// Loads a fetched result.
    pub fn load(&self, result: SimulationResult) -> UpliftResult<()> {
        self.store.load(result)
    }

    /// Loads the most recent simulation for `goal`.
    ///
    /// Returns `Ok(false)` when the source has none; the store is untouched.
    pub fn load_latest(&self, source: &dyn SimulationSource, goal: &GoalId) -> UpliftResult<bool> {
        let recent = source.list_recent(goal)?;
        let Some(latest) = recent.first() else {
            tracing::info!(goal = %goal, "no stored simulation for goal");
            return Ok(false);
        };
        let result = source.fetch(&latest.id)?;
        self.store.load(result)?;
        self.select_goal(goal.clone());
        Ok(true)
    }

    /// Runs a fresh simulation for `goal` and loads it.
    pub fn run_simulation(&self, source: &dyn SimulationSource, goal: &GoalId) -> UpliftResult<()> {
        let result = source.run(goal)?;
        self.store.load(result)?;
        self.select_goal(goal.clone());
        Ok(())
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> ViewSelection {
        self.selection.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the selection.
    pub fn set_selection(&self, selection: ViewSelection) {
        *self.selection.write().unwrap_or_else(PoisonError::into_inner) = selection;
    }

    /// Changes only the point filter.
    pub fn set_point_filter(&self, point: PointFilter) {
        self.selection.write().unwrap_or_else(PoisonError::into_inner).point = point;
    }

    /// Selects the primary goal and clears the point filter.
    pub fn select_default_goal(&self, goals: &[Goal]) {
        self.set_selection(ViewSelection::default_for(goals));
    }

    fn select_goal(&self, goal: GoalId) {
        self.selection.write().unwrap_or_else(PoisonError::into_inner).goal_id = Some(goal);
    }

    /// Computes the view, table and charts for the current state.
    ///
    /// Charts plot the frames applied so far, or every frame when none has
    /// been applied. Empty when nothing is loaded.
    #[must_use]
    pub fn view(&self) -> DashboardView {
        let selection = self.selection();
        let snapshot = self.store.snapshot();
        let (combinations, frames) = match &snapshot {
            Some(s) => (s.combinations.as_slice(), s.applied_frames()),
            None => (&[][..], &[][..]),
        };

        let aggregated = self.aggregation.compute(combinations, &selection);
        let table = self.classification.classify_view(&aggregated);
        let charts = self.charts.build(&aggregated, combinations, frames);
        DashboardView {
            aggregated,
            table,
            charts,
        }
    }

    /// Replays the loaded frames at the configured interval.
    pub fn start_replay(&self, observer: Arc<dyn ReplayObserver>) -> UpliftResult<ReplayHandle> {
        self.start_replay_with(self.store.current_frames(), self.config.replay_interval(), observer)
    }

    /// Replays `frames` at `interval`.
    pub fn start_replay_with(
        &self,
        frames: Vec<SimulationFrame>,
        interval: Duration,
        observer: Arc<dyn ReplayObserver>,
    ) -> UpliftResult<ReplayHandle> {
        self.scheduler.start(
            ReplayRequest {
                frames,
                interval,
                selection: self.selection(),
            },
            observer,
        )
    }

    /// Cancels the running replay.
    pub fn cancel_replay(&self) -> UpliftResult<ReplayCancelledInfo> {
        self.scheduler.cancel()
    }

    /// Current replay phase.
    #[must_use]
    pub fn replay_phase(&self) -> ReplayPhase {
        self.scheduler.phase()
    }

    /// Stops any replay, resets remote state and clears the store.
    pub fn reset(&self, source: &dyn SimulationSource) -> ResetOutcome {
        match self.scheduler.cancel() {
            Ok(_) | Err(UpliftError::Execution(ExecutionError::NotRunning)) => {}
            Err(e) => tracing::warn!(error = %e, "cancel before reset failed"),
        }

        let remote = source.reset_remote();
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "remote reset failed; clearing local state anyway");
        }

        self.store.clear();
        ResetOutcome { remote }
    }
}
