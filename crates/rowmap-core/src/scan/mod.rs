//! Module: scan
//! Responsibility: turn a row source into typed entity graphs.
//! Does not own: descriptor analysis (registry) or value conversion (coerce).
//!
//! Two phases per orchestrator call:
//! - materialize: every row is folded into a scan-scoped identity map; join
//!   fan-out collapses onto one node per `(type, key)`.
//! - assemble: the requested roots are built from their fully merged nodes.

mod assemble;
mod identity;
mod mapper;
mod materialize;

#[cfg(test)]
mod tests;

pub use mapper::Mapper;

pub(crate) use assemble::Assembler;
pub(crate) use identity::NodeId;
pub(crate) use materialize::{Materialized, ScanState, materialize};
