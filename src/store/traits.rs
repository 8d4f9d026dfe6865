//! Snapshot-and-subscribe contract.
//!
//! A store owns its state, hands out owned snapshots, and notifies listeners
//! synchronously after every mutation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::combination::{Combination, CombinationMetrics};
use crate::frame::SimulationFrame;
use crate::ids::{ComboId, SimulationId, SubscriptionId};

/// Owned copy of the store's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Persisted id of the loaded result.
    pub id: Option<SimulationId>,
    /// Combinations with their current metrics.
    pub combinations: Vec<Combination>,
    /// All frames of the loaded result.
    pub frames: Vec<SimulationFrame>,
    /// Control combination, when exactly one exists.
    pub control_id: Option<ComboId>,
    /// Current control metrics.
    pub control_metrics: CombinationMetrics,
    /// When the result was loaded.
    pub loaded_at: DateTime<Utc>,
    /// Day of the most recently applied frame.
    pub last_applied_day: Option<u32>,
}

impl SimulationSnapshot {
    /// Frames up to and including the last applied day, or every frame when
    /// none has been applied.
    #[must_use]
    pub fn applied_frames(&self) -> &[SimulationFrame] {
        match self.last_applied_day {
            None => &self.frames,
            Some(day) => {
                let end = self.frames.iter().take_while(|f| f.day <= day).count();
                &self.frames[..end]
            }
        }
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A result replaced the previous state.
    Loaded {
        /// Number of combinations.
        combinations: usize,
        /// Number of frames.
        frames: usize,
    },
    /// The store was emptied.
    Cleared,
    /// A frame was applied.
    FrameApplied {
        /// The frame's day.
        day: u32,
    },
}

/// Listener callback.
pub type StoreListener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// A component exposing snapshots and change notifications.
pub trait SnapshotStore: Send + Sync {
    /// Owned copy of the current state, `None` when nothing is loaded.
    fn snapshot(&self) -> Option<SimulationSnapshot>;

    /// Registers a listener called after every mutation.
    fn subscribe(&self, listener: StoreListener) -> SubscriptionId;

    /// Removes a listener. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
