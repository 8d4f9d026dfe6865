//! External simulation service seam.
//!
//! The core never performs network I/O itself. A host hands it a
//! [`SimulationSource`] that lists, fetches and runs simulations and resets
//! remote state.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::ids::{GoalId, SimulationId};
use crate::result::SimulationResult;

/// Listing entry for a stored simulation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub id: SimulationId,
    pub goal_id: GoalId,
    pub created_at: DateTime<Utc>,
}

/// Collaborator providing simulation results.
pub trait SimulationSource: Send + Sync {
    /// Simulations for `goal`, most recent first.
    fn list_recent(&self, goal: &GoalId) -> Result<Vec<SimulationSummary>, TransportError>;

    /// Full result for `id`.
    fn fetch(&self, id: &SimulationId) -> Result<SimulationResult, TransportError>;

    /// Runs a fresh simulation for `goal`.
    fn run(&self, goal: &GoalId) -> Result<SimulationResult, TransportError>;

    /// Resets remote simulation state.
    fn reset_remote(&self) -> Result<(), TransportError>;
}

#[derive(Debug, Default)]
struct SourceState {
    results: HashMap<SimulationId, (SimulationSummary, SimulationResult)>,
    templates: HashMap<GoalId, SimulationResult>,
    reset_error: Option<TransportError>,
    resets: usize,
}

/// In-memory [`SimulationSource`].
///
/// `run` stores a copy of the goal's template under a new id. Reset removes
/// every stored simulation unless a reset failure has been injected.
#[derive(Debug, Default)]
pub struct InMemorySimulationSource {
    state: RwLock<SourceState>,
}

impl InMemorySimulationSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `result` for `goal` created at `created_at`, returning its id.
    pub fn insert(&self, goal: impl Into<GoalId>, created_at: DateTime<Utc>, mut result: SimulationResult) -> SimulationId {
        let id = result
            .id
            .clone()
            .unwrap_or_else(|| SimulationId::new(uuid::Uuid::new_v4().to_string()));
        result.id = Some(id.clone());
        let summary = SimulationSummary {
            id: id.clone(),
            goal_id: goal.into(),
            created_at,
        };
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .insert(id.clone(), (summary, result));
        id
    }

    /// Sets the result `run` produces for `goal`.
    pub fn set_template(&self, goal: impl Into<GoalId>, result: SimulationResult) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .templates
            .insert(goal.into(), result);
    }

    /// Makes subsequent `reset_remote` calls fail with `error`.
    pub fn fail_reset_with(&self, error: Option<TransportError>) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).reset_error = error;
    }

    /// Number of `reset_remote` calls received.
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).resets
    }

    /// Number of stored simulations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).results.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimulationSource for InMemorySimulationSource {
    fn list_recent(&self, goal: &GoalId) -> Result<Vec<SimulationSummary>, TransportError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<SimulationSummary> = state
            .results
            .values()
            .filter(|(s, _)| &s.goal_id == goal)
            .map(|(s, _)| s.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn fetch(&self, id: &SimulationId) -> Result<SimulationResult, TransportError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .results
            .get(id)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| TransportError::ServerError {
                code: 404,
                message: format!("simulation {id} not found"),
            })
    }

    fn run(&self, goal: &GoalId) -> Result<SimulationResult, TransportError> {
        let template = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.templates.get(goal).cloned()
        };
        let mut result = template.ok_or_else(|| TransportError::ServerError {
            code: 422,
            message: format!("no simulation configured for goal {goal}"),
        })?;
        result.id = None;
        let id = self.insert(goal.clone(), Utc::now(), result.clone());
        result.id = Some(id);
        Ok(result)
    }

    fn reset_remote(&self) -> Result<(), TransportError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.resets += 1;
        if let Some(err) = state.reset_error.clone() {
            return Err(err);
        }
        state.results.clear();
        Ok(())
    }
}
