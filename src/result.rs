//! The unit that is loaded and replayed.

use std::collections::BTreeSet;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::combination::{Combination, CombinationMetrics};
use crate::error::{TransportError, UpliftError, UpliftResult};
use crate::frame::SimulationFrame;
use crate::ids::{ComboId, SimulationId};

/// A precomputed multi-day, multi-combination simulation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Persisted id, absent for freshly computed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SimulationId>,
    /// Combinations with their final metrics.
    pub combinations: Vec<Combination>,
    /// Daily frames in ascending day order.
    #[serde(default)]
    pub frames: Vec<SimulationFrame>,
    /// Metrics of the control combination as supplied upstream.
    #[serde(default)]
    pub control_metrics: CombinationMetrics,
}

impl SimulationResult {
    /// Parses a result from its JSON representation.
    pub fn from_json_str(json: &str) -> UpliftResult<Self> {
        serde_json::from_str(json).map_err(deserialize_err)
    }

    /// Parses a result from a reader (file, HTTP body).
    pub fn from_json_reader(reader: impl Read) -> UpliftResult<Self> {
        serde_json::from_reader(reader).map_err(deserialize_err)
    }

    /// Set of combination ids.
    #[must_use]
    pub fn combo_ids(&self) -> BTreeSet<&ComboId> {
        self.combinations.iter().map(|c| &c.combo_id).collect()
    }

    /// Structural validation performed before a load replaces store state.
    ///
    /// Combination ids must be unique, and when frames are present every frame
    /// must cover exactly the combinations' id set.
    pub fn validate(&self) -> UpliftResult<()> {
        let ids = self.combo_ids();
        if ids.len() != self.combinations.len() {
            return Err(UpliftError::invalid_result(
                "combination ids are not unique",
            ));
        }

        for frame in &self.frames {
            let frame_ids = frame.combo_ids();
            if frame_ids.len() != frame.combos.len() {
                return Err(UpliftError::invalid_result(format!(
                    "frame for day {} lists a combination more than once",
                    frame.day
                )));
            }
            if frame_ids != ids {
                let missing: Vec<&str> = ids.difference(&frame_ids).map(|id| id.as_str()).collect();
                let extra: Vec<&str> = frame_ids.difference(&ids).map(|id| id.as_str()).collect();
                return Err(UpliftError::invalid_result(format!(
                    "frame for day {} does not match combinations (missing: [{}], unexpected: [{}])",
                    frame.day,
                    missing.join(", "),
                    extra.join(", ")
                )));
            }
        }

        Ok(())
    }
}

fn deserialize_err(err: serde_json::Error) -> UpliftError {
    UpliftError::Transport(TransportError::DeserializationFailed {
        message: err.to_string(),
    })
}
