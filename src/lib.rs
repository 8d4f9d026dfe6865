//! # uplift-replay - Simulation Results Aggregation & Replay
//!
//! Turns a fetched conversion-rate-optimization simulation result into
//! dashboard-ready rows, KPIs, badges and chart series, and replays the
//! simulated days one frame at a time.
//!
//! ## Core Concepts
//!
//! - **Combination**: one variant per optimization point, evaluated as a unit
//! - **Control**: the combination with zero uplift, used as the baseline
//! - **Frame**: one simulated day's metrics for every combination
//! - **View**: by-goal (all combinations) or by-point (variants of one point)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uplift_replay::{ChannelObserver, Dashboard, DashboardConfig, SimulationResult};
//!
//! let dashboard = Dashboard::new(DashboardConfig::default())?;
//! dashboard.load(SimulationResult::from_json_str(&json)?)?;
//!
//! // Static path
//! let view = dashboard.view();
//!
//! // Replay path
//! let (observer, events) = ChannelObserver::new(dashboard.config().event_capacity);
//! let handle = dashboard.start_replay(Arc::new(observer))?;
//! loop {
//!     let event = events.recv()?;
//!     let done = event.is_terminal();
//!     /* render */
//!     if done {
//!         break;
//!     }
//! }
//! handle.join()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod combination;
pub mod error;
pub mod frame;
pub mod ids;
pub mod project;
pub mod result;

// Engines
pub mod aggregation;
pub mod chart;
pub mod classification;

// State, replay and collaborators
pub mod config;
pub mod dashboard;
pub mod replay;
pub mod source;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root for convenience
pub use aggregation::{
    AggregatedView, AggregationEngine, ControlIdentification, Figure, GoalTypeFilter, Kpis, PointFilter,
    PointVariantRow, ViewMode, ViewRows, ViewSelection,
};
pub use chart::{ChartPayload, ChartSeriesBuilder};
pub use classification::{ClassificationEngine, ClassifiedTable, RowFlags};
pub use combination::{Combination, CombinationMetrics, CombinationPoint};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardView, ResetOutcome};
pub use error::{ExecutionError, TransportError, UpliftError, UpliftResult, ValidationError};
pub use frame::{FrameCombo, SimulationFrame};
pub use ids::{ComboId, GoalId, PointId, ReplayId, SimulationId, SubscriptionId, VariantId};
pub use project::{Goal, OptimizationPoint, Variant};
pub use replay::{
    ChannelObserver, FrameUpdate, NoopObserver, ReplayCancelledInfo, ReplayCompletion, ReplayEvent, ReplayHandle,
    ReplayObserver, ReplayRequest, ReplayScheduler, ReplayStream, ReplayWarning,
};
pub use result::SimulationResult;
pub use source::{InMemorySimulationSource, SimulationSource, SimulationSummary};
pub use store::{
    AppliedFrame, ReplayOutcome, ReplayPhase, SimulationDataStore, SimulationSnapshot, SnapshotStore, StoreEvent,
    StoreListener,
};
