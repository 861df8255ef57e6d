use std::path::Path;

use anyhow::{Context, Result};
use ohmic_core::Circuit;

use crate::config::Config;

/// One line per element, labelled with its name.
pub fn operating_point(circuit: &mut Circuit) -> Result<Vec<String>> {
    circuit.prepare().context("Failed to compile circuit")?;

    let width = circuit.ids().map(|id| circuit.label(id).len()).max().unwrap_or(0);
    circuit
        .ids()
        .map(|id| {
            let line = circuit.describe(id)?;
            Ok(format!("{:<width$}  {}", circuit.label(id), line, width = width))
        })
        .collect()
}

/// Compile a netlist and print its operating point.
pub fn run_op(path: &Path, config: &Config) -> Result<()> {
    let mut circuit = super::load_circuit(path, &config.simulation, None)?;
    for line in operating_point(&mut circuit)? {
        println!("{}", line);
    }
    Ok(())
}
