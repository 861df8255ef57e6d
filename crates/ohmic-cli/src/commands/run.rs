use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use ohmic_core::meter::{Quantity, Summary};
use ohmic_core::{Circuit, ElementId, Reading};
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub time: f64,
    pub tick_rate: f64,
    pub ticks: usize,
    pub elements: Vec<ElementReport>,
    pub probes: Vec<ProbeReport>,
}

#[derive(Debug, Serialize)]
pub struct ElementReport {
    pub label: String,
    pub kind: &'static str,
    #[serde(flatten)]
    pub reading: Reading,
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub label: String,
    pub samples: usize,
    pub voltage: Summary,
    pub current: Summary,
    pub power: Summary,
}

/// Simulate `circuit` for `duration` seconds, probing the named elements.
pub fn simulate(circuit: &mut Circuit, duration: f64, probes: &[String]) -> Result<RunReport> {
    let ids = probes
        .iter()
        .map(|name| {
            circuit.find(name).ok_or_else(|| {
                anyhow::anyhow!("No element named '{}' to probe", name)
            })
        })
        .collect::<Result<Vec<ElementId>>>()?;

    let meters = circuit
        .run(duration, &ids)
        .with_context(|| format!("Simulation failed at t = {}s", circuit.time()))?;
    log::info!("Simulated {}s in steps of {}s", circuit.time(), circuit.tick_rate());

    let elements = circuit
        .ids()
        .map(|id| -> Result<ElementReport> {
            Ok(ElementReport {
                label: circuit.label(id),
                kind: circuit.element(id)?.name(),
                reading: circuit.reading(id)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let probes = meters
        .iter()
        .map(|meter| ProbeReport {
            label: circuit.label(meter.element()),
            samples: meter.len(),
            voltage: meter.summary(Quantity::Voltage),
            current: meter.summary(Quantity::Current),
            power: meter.summary(Quantity::Power),
        })
        .collect();

    Ok(RunReport {
        time: circuit.time(),
        tick_rate: circuit.tick_rate(),
        ticks: meters.first().map_or(0, |meter| meter.len()),
        elements,
        probes,
    })
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "t = {:.6}s (tick rate {}s)\n", self.time, self.tick_rate)?;

        let width = self.elements.iter().map(|e| e.label.len()).max().unwrap_or(0);
        writeln!(
            f,
            "{:<width$}  {:>12} {:>12} {:>12}",
            "element",
            "voltage",
            "current",
            "power",
            width = width
        )?;
        for element in &self.elements {
            let r = &element.reading;
            writeln!(
                f,
                "{:<width$}  {:>11.4}V {:>11.4}A {:>11.4}W",
                element.label,
                r.voltage,
                r.current,
                r.power,
                width = width
            )?;
        }

        for probe in &self.probes {
            writeln!(f, "\n{} ({} samples)", probe.label, probe.samples)?;
            for (name, unit, summary) in [
                ("voltage", "V", &probe.voltage),
                ("current", "A", &probe.current),
                ("power", "W", &probe.power),
            ] {
                writeln!(
                    f,
                    "  {:<8} avg {:>10.4}{unit}  rms {:>10.4}{unit}  min {:>10.4}{unit}  max {:>10.4}{unit}",
                    name, summary.average, summary.rms, summary.min, summary.max,
                )?;
            }
        }
        Ok(())
    }
}

/// Simulate a netlist and print the final readings.
pub fn run_simulation(
    path: &Path,
    config: &Config,
    duration: f64,
    tick_rate: Option<f64>,
    probes: &[String],
    json: bool,
) -> Result<()> {
    if duration.is_nan() || duration <= 0.0 {
        anyhow::bail!("Duration must be positive, got {}", duration);
    }
    let mut circuit = super::load_circuit(path, &config.simulation, tick_rate)?;
    let report = simulate(&mut circuit, duration, probes)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", report);
    }
    Ok(())
}
