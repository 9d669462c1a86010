//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Emitted reading record and its wire timestamp format."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::Serialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::profile::{DeviceKind, EnergySource};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// UTC instant rendered as `YYYY-MM-DDTHH:MM:SSZ`, whole seconds only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct WireTimestamp(DateTime<Utc>);

impl WireTimestamp {
    /// Drops any sub-second component.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::new(at)
    }
}

impl fmt::Display for WireTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl FromStr for WireTimestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s, WIRE_FORMAT).map(|naive| Self(naive.and_utc()))
    }
}

/// One emitted record. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading<'a> {
    pub site_id: &'a str,
    pub device_id: DeviceKind,
    pub source: EnergySource,
    pub value: f64,
    pub unit: &'a str,
    pub ts: WireTimestamp,
}

impl Reading<'_> {
    /// Compact single-line JSON, without the trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
