//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the generator runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the EcoPulse workspace.
//! This crate exposes configuration loading, tracing setup, and tick pacing
//! metrics consumed by the simulator and the command-line entrypoint.

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{parse_sites, AppConfig, GeneratorConfig, LoggingConfig, DEFAULT_SITES};
pub use logging::{init_tracing, LogFormat};
pub use metrics::{JitterHistogram, JitterSummary, LoopTimingReporter};
