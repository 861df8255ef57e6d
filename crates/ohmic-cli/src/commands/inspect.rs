use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use ohmic_core::matrix::format_vector;
use ohmic_core::Circuit;

use crate::config::Config;

/// Topology summary, plus the DOT graph and the compiled MNA system on request.
pub fn render(circuit: &mut Circuit, dot: bool, matrices: bool) -> Result<String> {
    let report = circuit.topology();
    let mut out = format!(
        "elements: {}\nnodes: {}\nextra rows: {}\nconnected components: {}\n",
        report.elements, report.nodes, report.extra_rows, report.components
    );
    out.push_str("\nnode degrees:\n");
    for degree in &report.degrees {
        writeln!(out, "  {:<6} {} pins", degree.node.to_string(), degree.pins)?;
    }

    if dot {
        out.push('\n');
        out.push_str(&circuit.dot());
    }

    if matrices {
        circuit.prepare().context("Failed to compile circuit")?;
        let system = circuit
            .system()
            .ok_or_else(|| anyhow::anyhow!("Circuit has no compiled system"))?;
        let nodes = system
            .nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "\nnode rows: {}", nodes)?;
        writeln!(out, "\nG =\n{}", system.lhs)?;
        writeln!(out, "z =\n{}", format_vector(&system.rhs))?;
        writeln!(out, "x =\n{}", format_vector(&system.x))?;
    }
    Ok(out)
}

/// Print the structure of a netlist.
pub fn run_inspect(path: &Path, config: &Config, dot: bool, matrices: bool) -> Result<()> {
    let mut circuit = super::load_circuit(path, &config.simulation, None)?;
    print!("{}", render(&mut circuit, dot, matrices)?);
    Ok(())
}
