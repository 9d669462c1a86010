//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Error taxonomy for synthesis and emission."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use crate::profile::{DeviceKind, EnergySource};

/// Result alias used throughout the simulator crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Error type for synthesis, emission, and sink analysis.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The catalog references a (device, source) pair with no profile.
    #[error("no consumption profile configured for {device}/{energy}")]
    UnknownProfile {
        device: DeviceKind,
        energy: EnergySource,
    },
    /// Structurally invalid profiles, catalog, or loop settings.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid random seed '{0}': expected an integer")]
    InvalidSeed(String),
    /// The sink (or one of its parent directories) could not be created or opened.
    #[error("unable to open sink {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A write or flush against an open sink failed.
    #[error("failed writing to sink {}: {source}", path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
