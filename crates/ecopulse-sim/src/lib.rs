//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation module exports and shared types."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Synthetic energy consumption telemetry.
//!
//! [`Synthesizer`] turns a device profile and a UTC timestamp into a reading;
//! [`Emitter`] walks the [`Catalog`] once per tick and appends every reading
//! to a [`JsonlSink`]. [`analysis`] reads a sink back for summary statistics.

pub mod analysis;
pub mod catalog;
pub mod emitter;
pub mod error;
pub mod profile;
pub mod reading;
pub mod sink;
pub mod synth;

pub use analysis::{analyze_path, analyze_reader, SinkRecord, SinkSummary, ValueStats};
pub use catalog::{Catalog, CatalogEntry, STANDARD_DEVICES};
pub use emitter::{EmissionReport, EmissionSettings, Emitter, StopReason};
pub use error::{Result, SimError};
pub use profile::{DeviceKind, DeviceProfile, EnergySource, ProfileTable};
pub use reading::{Reading, WireTimestamp};
pub use sink::JsonlSink;
pub use synth::{parse_seed, seeded_rng, SpikePolicy, Synthesizer};
