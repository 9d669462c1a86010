//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Device archetypes, energy sources, and consumption profiles."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{Result, SimError};

/// Category of energy-consuming equipment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Hvac,
    Servers,
    Lighting,
    Boiler,
    Generator,
    VehicleFleet,
}

/// Utility or fuel backing a reading.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnergySource {
    Electricity,
    Gas,
    Diesel,
}

/// Steady-state consumption model for one (device, source) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub unit: String,
    pub baseline: f64,
    /// Relative standard deviation of the multiplicative noise.
    pub variability: f64,
}

impl DeviceProfile {
    pub fn new(unit: impl Into<String>, baseline: f64, variability: f64) -> Self {
        Self {
            unit: unit.into(),
            baseline,
            variability,
        }
    }

    fn validate(&self, device: DeviceKind, source: EnergySource) -> Result<()> {
        if self.unit.trim().is_empty() {
            return Err(SimError::Configuration(format!(
                "profile {device}/{source} has an empty unit"
            )));
        }
        if !self.baseline.is_finite() || self.baseline < 0.0 {
            return Err(SimError::Configuration(format!(
                "profile {device}/{source} baseline must be finite and non-negative, got {}",
                self.baseline
            )));
        }
        if !self.variability.is_finite() || self.variability < 0.0 {
            return Err(SimError::Configuration(format!(
                "profile {device}/{source} variability must be finite and non-negative, got {}",
                self.variability
            )));
        }
        Ok(())
    }
}

/// Immutable lookup of consumption profiles keyed by (device, source).
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: IndexMap<(DeviceKind, EnergySource), DeviceProfile>,
}

impl ProfileTable {
    /// Build a table, rejecting duplicate keys and out-of-range parameters.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (DeviceKind, EnergySource, DeviceProfile)>,
    {
        let mut profiles = IndexMap::new();
        for (device, source, profile) in entries {
            profile.validate(device, source)?;
            if profiles.insert((device, source), profile).is_some() {
                return Err(SimError::Configuration(format!(
                    "duplicate profile for {device}/{source}"
                )));
            }
        }
        Ok(Self { profiles })
    }

    /// The reference profile set shipped with the generator.
    pub fn standard() -> Self {
        use DeviceKind::*;
        use EnergySource::*;
        let profiles = [
            (Hvac, Electricity, DeviceProfile::new("kWh", 4.0, 0.12)),
            (Servers, Electricity, DeviceProfile::new("kWh", 6.0, 0.06)),
            (Lighting, Electricity, DeviceProfile::new("kWh", 1.0, 0.18)),
            (Boiler, Gas, DeviceProfile::new("kWh", 2.5, 0.15)),
            (Generator, Diesel, DeviceProfile::new("L", 0.02, 0.50)),
            (VehicleFleet, Diesel, DeviceProfile::new("L", 0.5, 0.25)),
        ]
        .into_iter()
        .map(|(device, source, profile)| ((device, source), profile))
        .collect();
        Self { profiles }
    }

    pub fn get(&self, device: DeviceKind, source: EnergySource) -> Result<&DeviceProfile> {
        self.profiles
            .get(&(device, source))
            .ok_or(SimError::UnknownProfile {
                device,
                energy: source,
            })
    }

    pub fn contains(&self, device: DeviceKind, source: EnergySource) -> bool {
        self.profiles.contains_key(&(device, source))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Apply `update` to every profile, keeping keys and order.
    ///
    /// Used to derive noise-free tables for deterministic checks.
    pub fn map_profiles<F>(&self, mut update: F) -> Result<Self>
    where
        F: FnMut(&DeviceProfile) -> DeviceProfile,
    {
        Self::from_entries(
            self.profiles
                .iter()
                .map(|(&(device, source), profile)| (device, source, update(profile))),
        )
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::standard()
    }
}
