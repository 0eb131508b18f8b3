//! # Utilities Module
//!
//! Cross-cutting helpers that don't belong in domain-specific modules.
//!
//! - `telemetry`: progress board and heartbeat thread

pub mod telemetry;

#[cfg(test)]
pub(crate) mod log_capture;
