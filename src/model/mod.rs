//! # Model Module
//!
//! Simulation logic.
//!
//! ## Ordering and seeds
//! - `ordering`: which samples to create and in what order
//! - `seeds`: per-role job seeds from one master seed
//!
//! ## Transforms
//! - `simulator`: the `SampleSimulator` trait the pipeline drives, plus the
//!   built-in `VcfSimulator`
//! - `genotyping`, `inheritance`, `denovo`, `replay`: the per-job
//!   transforms used by `VcfSimulator`
//! - `statistics`: per-sample call counts for the final report

pub mod denovo;
pub mod genotyping;
pub mod inheritance;
pub mod ordering;
pub mod replay;
pub mod seeds;
pub mod simulator;
pub mod statistics;
