//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Consumption value synthesis from device profiles and wall-clock time."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Converts a (device, source, timestamp) triple into a plausible reading.
//!
//! The model multiplies the profile baseline by a daily cycle, a weekend drop
//! and Gaussian noise, then adds an occasional spike sized from the baseline.
//! Randomness comes from a caller-owned generator; per call the draws are
//! always taken in the same order (noise, spike trigger, spike amplitude) so
//! a seeded generator replays byte-identical output.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rand::prelude::*;
use rand_distr::Normal;
use tracing::debug;

use crate::error::{Result, SimError};
use crate::profile::{DeviceKind, EnergySource, ProfileTable};

const PEAK_HOUR: f64 = 15.0;
const WEEKEND_FACTOR: f64 = 0.6;

/// Daily load cycle: ×1.3 at 15:00 UTC, ×0.7 at 03:00 UTC.
pub fn diurnal_multiplier(hour_of_day: f64) -> f64 {
    let rad = 2.0 * PI * ((hour_of_day - PEAK_HOUR) / 24.0);
    let base = (rad.cos() + 1.0) / 2.0;
    0.7 + 0.6 * base
}

pub fn weekend_multiplier(weekday: Weekday) -> f64 {
    match weekday {
        Weekday::Sat | Weekday::Sun => WEEKEND_FACTOR,
        _ => 1.0,
    }
}

/// Hour plus minute fraction; seconds are ignored.
pub fn hour_of_day(at: &DateTime<Utc>) -> f64 {
    f64::from(at.hour()) + f64::from(at.minute()) / 60.0
}

fn round_millis(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

/// Probability and size of additive consumption spikes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikePolicy {
    hvac_lighting_probability: f64,
    default_probability: f64,
    min_amplitude: f64,
    max_amplitude: f64,
}

impl SpikePolicy {
    pub const fn standard() -> Self {
        Self {
            hvac_lighting_probability: 0.008,
            default_probability: 0.003,
            min_amplitude: 2.0,
            max_amplitude: 5.0,
        }
    }

    /// Never triggers. The trigger draw is still taken so the RNG stream
    /// advances exactly as with the standard policy.
    pub const fn disabled() -> Self {
        Self {
            hvac_lighting_probability: 0.0,
            default_probability: 0.0,
            min_amplitude: 2.0,
            max_amplitude: 5.0,
        }
    }

    pub fn probability(&self, device: DeviceKind) -> f64 {
        match device {
            DeviceKind::Hvac | DeviceKind::Lighting => self.hvac_lighting_probability,
            _ => self.default_probability,
        }
    }
}

impl Default for SpikePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Stateless value model; all mutable state lives in the caller's RNG.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    profiles: ProfileTable,
    spikes: SpikePolicy,
}

impl Synthesizer {
    pub fn new(profiles: ProfileTable) -> Self {
        Self::with_spike_policy(profiles, SpikePolicy::standard())
    }

    pub fn with_spike_policy(profiles: ProfileTable, spikes: SpikePolicy) -> Self {
        Self { profiles, spikes }
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Produce one rounded, non-negative value and its unit.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        device: DeviceKind,
        source: EnergySource,
        at: DateTime<Utc>,
    ) -> Result<(f64, &str)> {
        let profile = self.profiles.get(device, source)?;
        let baseline = profile.baseline;

        let mut value = baseline;
        value *= diurnal_multiplier(hour_of_day(&at));
        value *= weekend_multiplier(at.weekday());

        let noise = Normal::new(0.0, profile.variability).map_err(|err| {
            SimError::Configuration(format!(
                "invalid variability {} for {device}/{source}: {err}",
                profile.variability
            ))
        })?;
        value *= (1.0 + noise.sample(rng)).max(0.0);
        value += self.spike(rng, device, baseline);

        Ok((round_millis(value.max(0.0)), profile.unit.as_str()))
    }

    fn spike<R: Rng + ?Sized>(&self, rng: &mut R, device: DeviceKind, baseline: f64) -> f64 {
        if rng.gen::<f64>() >= self.spikes.probability(device) {
            return 0.0;
        }
        let amplitude = rng.gen_range(self.spikes.min_amplitude..=self.spikes.max_amplitude);
        debug!(device = %device, amplitude, "consumption spike");
        baseline * amplitude
    }
}

/// Seeded generator when a seed is given, OS entropy otherwise.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Parse a seed value. Negative integers are reinterpreted bit-for-bit.
pub fn parse_seed(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u64>()
        .or_else(|_| trimmed.parse::<i64>().map(|signed| signed as u64))
        .map_err(|_| SimError::InvalidSeed(raw.to_owned()))
}
