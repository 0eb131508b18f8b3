//! # Data Module
//!
//! In-memory representations of the pedigree and of genotype calls.
//!
//! - `sample`: sample identity, sex and ploidy rules
//! - `genotype`: `GT` allele lists
//! - `pedigree`: the validated pedigree graph and its families

pub mod genotype;
pub mod pedigree;
pub mod sample;

// Re-export commonly used types
pub use genotype::Genotype;
pub use pedigree::{Family, PedigreeGraph, Relationship};
pub use sample::{ChromKind, PloidyMode, Sample, Sex};
