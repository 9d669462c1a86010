//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Per-run catalog of site and device combinations."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use crate::error::{Result, SimError};
use crate::profile::{DeviceKind, EnergySource, ProfileTable};

/// Device list installed at every site, in emission order.
pub const STANDARD_DEVICES: [(DeviceKind, EnergySource); 6] = [
    (DeviceKind::Hvac, EnergySource::Electricity),
    (DeviceKind::Servers, EnergySource::Electricity),
    (DeviceKind::Lighting, EnergySource::Electricity),
    (DeviceKind::Boiler, EnergySource::Gas),
    (DeviceKind::VehicleFleet, EnergySource::Diesel),
    (DeviceKind::Generator, EnergySource::Diesel),
];

/// One (site, device, source) combination synthesized per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry<'a> {
    pub site: &'a str,
    pub device: DeviceKind,
    pub source: EnergySource,
}

/// Immutable site × device catalog, validated against a profile table.
#[derive(Debug, Clone)]
pub struct Catalog {
    sites: Vec<String>,
    devices: Vec<(DeviceKind, EnergySource)>,
}

impl Catalog {
    pub fn new(
        sites: Vec<String>,
        devices: Vec<(DeviceKind, EnergySource)>,
        profiles: &ProfileTable,
    ) -> Result<Self> {
        if sites.is_empty() {
            return Err(SimError::Configuration(
                "catalog requires at least one site".into(),
            ));
        }
        if sites.iter().any(|site| site.trim().is_empty()) {
            return Err(SimError::Configuration(
                "catalog site names cannot be empty".into(),
            ));
        }
        if devices.is_empty() {
            return Err(SimError::Configuration(
                "catalog requires at least one device".into(),
            ));
        }
        for &(device, source) in &devices {
            profiles.get(device, source)?;
        }
        Ok(Self { sites, devices })
    }

    /// Every site receives the standard device list.
    pub fn standard(sites: Vec<String>, profiles: &ProfileTable) -> Result<Self> {
        Self::new(sites, STANDARD_DEVICES.to_vec(), profiles)
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn devices(&self) -> &[(DeviceKind, EnergySource)] {
        &self.devices
    }

    /// Number of readings in one complete tick.
    pub fn len(&self) -> usize {
        self.sites.len() * self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sites in configured order, then devices in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry<'_>> + '_ {
        self.sites.iter().flat_map(move |site| {
            self.devices
                .iter()
                .map(move |&(device, source)| CatalogEntry {
                    site: site.as_str(),
                    device,
                    source,
                })
        })
    }
}
