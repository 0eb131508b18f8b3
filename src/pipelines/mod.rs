//! # Pipeline Module
//!
//! High-level orchestration: the stage plan, the job state machine and the
//! final aggregation into the output VCF.

pub mod aggregate;
pub mod plan;
pub mod simulation;

pub use plan::{SimulationPlan, Stage};
pub use simulation::{JobPipeline, PedigreeSimulation, SimulationOutcome};
