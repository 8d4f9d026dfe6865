//! Ownership of the loaded simulation result.

mod data_store;
mod traits;

pub use data_store::{AppliedFrame, ReplayOutcome, ReplayPhase, SimulationDataStore};
pub(crate) use data_store::ReplayTicket;
pub use traits::{SimulationSnapshot, SnapshotStore, StoreEvent, StoreListener};
