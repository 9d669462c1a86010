//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "End-to-end emission runs against on-disk sinks."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use ecopulse_sim::{
    analyze_path, seeded_rng, Catalog, EmissionSettings, Emitter, JsonlSink, ProfileTable, SimError,
    StopReason, Synthesizer,
};
use serde_json::Value;
use tempfile::tempdir;

fn build_emitter(
    sites: &[&str],
    seed: u64,
    settings: EmissionSettings,
) -> Emitter<rand::rngs::StdRng> {
    let profiles = ProfileTable::standard();
    let catalog = Catalog::standard(
        sites.iter().map(|site| (*site).to_owned()).collect(),
        &profiles,
    )
    .unwrap();
    Emitter::new(Synthesizer::new(profiles), catalog, seeded_rng(Some(seed)), settings)
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn single_site_single_tick_scenario() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("outbox/raw.energy.jsonl");
    let mut sink = JsonlSink::open(&path)?;
    let mut emitter = build_emitter(
        &["paris"],
        42,
        EmissionSettings {
            interval: Duration::from_secs(2),
            max_messages: Some(6),
        },
    );

    let report = emitter.run(&mut sink).await?;
    assert_eq!(report.emitted, 6);
    assert_eq!(report.ticks, 1);
    assert_eq!(report.stop, StopReason::BudgetReached);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 6);
    let ts = lines[0]["ts"].as_str().unwrap().to_owned();
    let expected = [
        ("hvac", "electricity", "kWh"),
        ("servers", "electricity", "kWh"),
        ("lighting", "electricity", "kWh"),
        ("boiler", "gas", "kWh"),
        ("vehicle_fleet", "diesel", "L"),
        ("generator", "diesel", "L"),
    ];
    for (line, (device, source, unit)) in lines.iter().zip(expected) {
        assert_eq!(line["site_id"], "paris");
        assert_eq!(line["device_id"], device);
        assert_eq!(line["source"], source);
        assert_eq!(line["unit"], unit);
        assert_eq!(line["ts"].as_str().unwrap(), ts);
    }
    Ok(())
}

#[tokio::test]
async fn budget_stops_without_a_final_pause() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("raw.jsonl");
    let mut sink = JsonlSink::open(&path)?;
    let mut emitter = build_emitter(
        &["paris", "lyon", "berlin"],
        7,
        EmissionSettings {
            interval: Duration::from_secs(3600),
            max_messages: Some(10),
        },
    );

    let report = tokio::time::timeout(Duration::from_secs(10), emitter.run(&mut sink)).await??;
    assert_eq!(report.emitted, 10);
    assert_eq!(report.ticks, 1);
    assert_eq!(read_lines(&path).len(), 10);
    Ok(())
}

#[tokio::test]
async fn lines_carry_exactly_the_wire_fields() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("raw.jsonl");
    let mut sink = JsonlSink::open(&path)?;
    let mut emitter = build_emitter(
        &["paris", "lyon"],
        3,
        EmissionSettings {
            interval: Duration::ZERO,
            max_messages: Some(30),
        },
    );
    emitter.run(&mut sink).await?;

    let raw = fs::read_to_string(&path)?;
    for line in raw.lines() {
        assert!(line.starts_with("{\"site_id\":"));
        let object = serde_json::from_str::<Value>(line)?;
        let object = object.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["device_id", "site_id", "source", "ts", "unit", "value"]
        );
        assert!(object["site_id"].is_string());
        assert!(object["device_id"].is_string());
        assert!(object["source"].is_string());
        assert!(object["unit"].is_string());
        let value = object["value"].as_f64().unwrap();
        assert!(value >= 0.0);
        let ts = object["ts"].as_str().unwrap();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
    }
    Ok(())
}

#[tokio::test]
async fn repeated_runs_accumulate_in_the_sink() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("raw.jsonl");
    for seed in [1, 2] {
        let mut sink = JsonlSink::open(&path)?;
        let mut emitter = build_emitter(
            &["paris"],
            seed,
            EmissionSettings {
                interval: Duration::ZERO,
                max_messages: Some(4),
            },
        );
        emitter.run(&mut sink).await?;
    }
    assert_eq!(read_lines(&path).len(), 8);

    let summary = analyze_path(&path)?;
    assert_eq!(summary.total, 8);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.by_site["paris"].count, 8);
    assert_eq!(summary.by_site_device.len(), 4);
    Ok(())
}

#[tokio::test]
async fn seeded_runs_produce_identical_values() -> Result<()> {
    let dir = tempdir()?;
    let mut runs = Vec::new();
    for name in ["a.jsonl", "b.jsonl"] {
        let path = dir.path().join(name);
        let mut sink = JsonlSink::open(&path)?;
        let mut emitter = build_emitter(
            &["paris", "berlin"],
            42,
            EmissionSettings {
                interval: Duration::ZERO,
                max_messages: Some(12),
            },
        );
        emitter.run(&mut sink).await?;
        let values: Vec<_> = read_lines(&path)
            .into_iter()
            .map(|line| (line["device_id"].clone(), line["value"].clone()))
            .collect();
        runs.push(values);
    }
    assert_eq!(runs[0], runs[1]);
    Ok(())
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn write_failures_terminate_the_run() {
    let mut sink = JsonlSink::from_writer("broken", BrokenPipe);
    let mut emitter = build_emitter(&["paris"], 1, EmissionSettings::default());
    let err = emitter.run(&mut sink).await.unwrap_err();
    assert!(matches!(err, SimError::SinkWrite { .. }));
    assert_eq!(emitter.emitted(), 0);
}
