//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Read-back statistics over a JSON Lines sink."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Summarises a sink file the way a downstream consumer sees it.
//!
//! The file may still be growing, so blank lines, malformed JSON and a
//! trailing partial line are skipped rather than treated as errors.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::reading::WireTimestamp;

const SAMPLE_SIZE: usize = 5;
const TOP_DEVICES: usize = 10;

/// Owned view of one sink line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SinkRecord {
    pub site_id: String,
    pub device_id: String,
    pub source: String,
    pub value: f64,
    pub unit: String,
    pub ts: WireTimestamp,
}

/// Running min/avg/max accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    sum: f64,
}

impl ValueStats {
    fn new(value: f64) -> Self {
        Self {
            count: 1,
            min: value,
            max: value,
            sum: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct SinkSummary {
    pub total: u64,
    pub skipped: u64,
    pub sample: Vec<SinkRecord>,
    /// Keyed by site, in first-seen order.
    pub by_site: IndexMap<String, ValueStats>,
    pub by_site_device: IndexMap<(String, String), ValueStats>,
    pub by_source_unit: IndexMap<(String, String), u64>,
}

impl SinkSummary {
    fn record(&mut self, record: SinkRecord) {
        self.total += 1;
        self.by_site
            .entry(record.site_id.clone())
            .and_modify(|stats| stats.push(record.value))
            .or_insert_with(|| ValueStats::new(record.value));
        self.by_site_device
            .entry((record.site_id.clone(), record.device_id.clone()))
            .and_modify(|stats| stats.push(record.value))
            .or_insert_with(|| ValueStats::new(record.value));
        *self
            .by_source_unit
            .entry((record.source.clone(), record.unit.clone()))
            .or_default() += 1;
        if self.sample.len() < SAMPLE_SIZE {
            self.sample.push(record);
        }
    }

    /// (site, device) pairs ranked by mean value, highest first.
    pub fn top_devices(&self, limit: usize) -> Vec<(&str, &str, f64)> {
        let mut ranked: Vec<_> = self
            .by_site_device
            .iter()
            .map(|((site, device), stats)| (site.as_str(), device.as_str(), stats.mean()))
            .collect();
        ranked.sort_by(|a, b| b.2.total_cmp(&a.2));
        ranked.truncate(limit);
        ranked
    }
}

/// Summarise any line-oriented reader.
///
/// Lines are split on raw bytes: a tail cut inside a multi-byte character
/// is counted as skipped like any other partial line.
pub fn analyze_reader<R: BufRead>(reader: R) -> Result<SinkSummary> {
    let mut summary = SinkSummary::default();
    for line in reader.split(b'\n') {
        let line = line?;
        let Ok(line) = std::str::from_utf8(&line) else {
            summary.skipped += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SinkRecord>(line) {
            Ok(record) => summary.record(record),
            Err(_) => summary.skipped += 1,
        }
    }
    Ok(summary)
}

pub fn analyze_path(path: &Path) -> Result<SinkSummary> {
    let file = File::open(path).map_err(|source| SimError::SinkOpen {
        path: path.to_path_buf(),
        source,
    })?;
    analyze_reader(BufReader::new(file))
}

impl fmt::Display for SinkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total messages: {}", self.total)?;
        if self.skipped > 0 {
            writeln!(f, "Skipped malformed lines: {}", self.skipped)?;
        }
        if self.total == 0 {
            return Ok(());
        }

        writeln!(f, "\nSample ({} lines):", self.sample.len())?;
        for record in &self.sample {
            writeln!(
                f,
                "- {} {} {} {} {} {}",
                record.ts,
                record.site_id,
                record.device_id,
                record.source,
                record.value,
                record.unit
            )?;
        }

        writeln!(f, "\nPer-site stats (min/avg/max):")?;
        for (site, stats) in &self.by_site {
            writeln!(
                f,
                "- {:10} min={:6.3}  avg={:6.3}  max={:6.3}",
                site,
                stats.min,
                stats.mean(),
                stats.max
            )?;
        }

        writeln!(f, "\nTop {TOP_DEVICES} (site, device) by avg:")?;
        for (site, device, mean) in self.top_devices(TOP_DEVICES) {
            writeln!(f, "- {:10} / {:12} avg={:6.3}", site, device, mean)?;
        }

        writeln!(f, "\nCount per (source, unit):")?;
        for ((source, unit), count) in &self.by_source_unit {
            writeln!(f, "- {:12} ({}): {}", source, unit, count)?;
        }
        Ok(())
    }
}
