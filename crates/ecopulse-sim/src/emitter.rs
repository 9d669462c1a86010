//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Paced emission loop driving the synthesizer over the catalog."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::future::Future;
use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use ecopulse_common::LoopTimingReporter;
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::reading::{Reading, WireTimestamp};
use crate::sink::JsonlSink;
use crate::synth::Synthesizer;

/// Pacing and termination policy for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionSettings {
    pub interval: Duration,
    /// Stop after this many readings. Runs until interrupted when `None`.
    pub max_messages: Option<u64>,
}

impl Default for EmissionSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_messages: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetReached,
    Interrupted,
}

/// Totals reported when the loop returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionReport {
    pub emitted: u64,
    pub ticks: u64,
    pub stop: StopReason,
}

/// Single-writer loop: one reading per catalog entry per tick.
pub struct Emitter<R> {
    synthesizer: Synthesizer,
    catalog: Catalog,
    rng: R,
    settings: EmissionSettings,
    timing: LoopTimingReporter,
    emitted: u64,
    ticks: u64,
}

impl<R: Rng> Emitter<R> {
    pub fn new(
        synthesizer: Synthesizer,
        catalog: Catalog,
        rng: R,
        settings: EmissionSettings,
    ) -> Self {
        Self {
            synthesizer,
            catalog,
            rng,
            settings,
            timing: LoopTimingReporter::new(settings.interval),
            emitted: 0,
            ticks: 0,
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn budget_reached(&self) -> bool {
        self.settings
            .max_messages
            .is_some_and(|max| self.emitted >= max)
    }

    /// Emit one tick stamped `ts`, stopping early once the budget is spent.
    /// Returns the number of lines appended. Does not flush.
    pub fn emit_tick<W: Write>(
        &mut self,
        sink: &mut JsonlSink<W>,
        ts: WireTimestamp,
    ) -> Result<u64> {
        let at = ts.as_datetime();
        let mut lines = 0;
        for entry in self.catalog.entries() {
            if self.budget_reached() {
                break;
            }
            let (value, unit) =
                self.synthesizer
                    .synthesize(&mut self.rng, entry.device, entry.source, at)?;
            sink.append(&Reading {
                site_id: entry.site,
                device_id: entry.device,
                source: entry.source,
                value,
                unit,
                ts,
            })?;
            self.emitted += 1;
            lines += 1;
        }
        Ok(lines)
    }

    /// Run until the budget is spent. Never returns for unbounded settings.
    pub async fn run<W: Write>(&mut self, sink: &mut JsonlSink<W>) -> Result<EmissionReport> {
        self.run_until(sink, std::future::pending::<()>()).await
    }

    /// Run until the budget is spent or `shutdown` resolves during a pause.
    ///
    /// Each tick is flushed before pausing, so an interrupt never leaves
    /// buffered lines behind.
    pub async fn run_until<W, F>(
        &mut self,
        sink: &mut JsonlSink<W>,
        shutdown: F,
    ) -> Result<EmissionReport>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            sink = %sink.path().display(),
            sites = ?self.catalog.sites(),
            interval_secs = self.settings.interval.as_secs_f64(),
            max_messages = ?self.settings.max_messages,
            "emission started"
        );

        let stop = loop {
            self.timing.record_tick();
            let ts = WireTimestamp::new(Utc::now());
            let lines = self.emit_tick(sink, ts)?;
            sink.flush()?;
            self.ticks += 1;
            debug!(tick = self.ticks, lines, ts = %ts, total = self.emitted, "tick flushed");

            if self.budget_reached() {
                break StopReason::BudgetReached;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = &mut shutdown => break StopReason::Interrupted,
            }
        };

        let report = EmissionReport {
            emitted: self.emitted,
            ticks: self.ticks,
            stop,
        };
        if let Some(jitter) = self.timing.histogram().summary() {
            debug!(
                mean_ms = jitter.mean_ms,
                std_dev_ms = jitter.std_dev_ms,
                max_ms = jitter.max_ms,
                samples = jitter.samples,
                "tick pacing"
            );
        }
        info!(
            emitted = report.emitted,
            ticks = report.ticks,
            stop = ?report.stop,
            "emission finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileTable;
    use crate::synth::seeded_rng;
    use chrono::TimeZone;

    fn emitter(sites: &[&str], max_messages: Option<u64>) -> Emitter<rand::rngs::StdRng> {
        let profiles = ProfileTable::standard();
        let catalog = Catalog::standard(
            sites.iter().map(|site| (*site).to_owned()).collect(),
            &profiles,
        )
        .unwrap();
        Emitter::new(
            Synthesizer::new(profiles),
            catalog,
            seeded_rng(Some(42)),
            EmissionSettings {
                interval: Duration::ZERO,
                max_messages,
            },
        )
    }

    fn fixed_ts() -> WireTimestamp {
        WireTimestamp::new(Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).single().unwrap())
    }

    #[test]
    fn tick_covers_every_catalog_entry() {
        let mut emitter = emitter(&["paris", "lyon"], None);
        let mut sink = JsonlSink::from_writer("memory", Vec::new());
        assert_eq!(emitter.emit_tick(&mut sink, fixed_ts()).unwrap(), 12);
        assert_eq!(emitter.emitted(), 12);
    }

    #[test]
    fn tick_is_truncated_by_budget() {
        let mut emitter = emitter(&["paris", "lyon"], Some(8));
        let mut sink = JsonlSink::from_writer("memory", Vec::new());
        assert_eq!(emitter.emit_tick(&mut sink, fixed_ts()).unwrap(), 8);
        assert_eq!(emitter.emit_tick(&mut sink, fixed_ts()).unwrap(), 0);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let last = text.lines().last().unwrap();
        assert!(last.contains("\"site_id\":\"lyon\""));
        assert!(last.contains("\"device_id\":\"servers\""));
    }

    #[test]
    fn seeded_ticks_are_byte_identical() {
        let render = || {
            let mut emitter = emitter(&["paris"], None);
            let mut sink = JsonlSink::from_writer("memory", Vec::new());
            for _ in 0..5 {
                emitter.emit_tick(&mut sink, fixed_ts()).unwrap();
            }
            sink.into_inner()
        };
        assert_eq!(render(), render());
    }

    #[tokio::test]
    async fn bounded_run_spans_multiple_ticks() {
        let mut emitter = emitter(&["paris"], Some(15));
        let mut sink = JsonlSink::from_writer("memory", Vec::new());
        let report = emitter.run(&mut sink).await.unwrap();
        assert_eq!(report.emitted, 15);
        assert_eq!(report.ticks, 3);
        assert_eq!(report.stop, StopReason::BudgetReached);
        assert_eq!(sink.lines_written(), 15);
    }

    #[tokio::test]
    async fn shutdown_interrupts_unbounded_run() {
        let profiles = ProfileTable::standard();
        let catalog = Catalog::standard(vec!["paris".into()], &profiles).unwrap();
        let mut emitter = Emitter::new(
            Synthesizer::new(profiles),
            catalog,
            seeded_rng(Some(1)),
            EmissionSettings {
                interval: Duration::from_secs(3600),
                max_messages: None,
            },
        );
        let mut sink = JsonlSink::from_writer("memory", Vec::new());
        let report = emitter
            .run_until(&mut sink, async {})
            .await
            .unwrap();
        assert_eq!(report.stop, StopReason::Interrupted);
        assert_eq!(report.ticks, 1);
        assert_eq!(report.emitted, 6);
    }
}
