//! # pedsim Library Root
//!
//! ## Role
//! The crate root that declares all public modules and re-exports common types.
//!
//! ## Module Structure
//! ```text
//! pedsim
//! ├── data        # Samples, genotypes, pedigree graph
//! ├── io          # PED, VCF, FASTA, staged artifacts
//! ├── model       # Ordering, seeds, simulator transforms, statistics
//! ├── pipelines   # Stage plan, job pipeline, aggregation
//! └── utils       # Progress telemetry
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
pub mod utils;

pub use config::{Config, SimulationSettings};
pub use error::{PedSimError, Result};
pub use pipelines::{PedigreeSimulation, SimulationOutcome};
