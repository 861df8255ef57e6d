use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ohmic_core::spice::export_spice;

use crate::config::Config;

/// Export a netlist as a SPICE deck, to `output` or stdout.
///
/// With a `duration` the deck gets a `.tran` card stepping at the circuit's
/// tick rate.
pub fn run_spice(
    path: &Path,
    config: &Config,
    duration: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let circuit = super::load_circuit(path, &config.simulation, None)?;
    let tran = duration.map(|stop| (circuit.effective_tick_rate(), stop));
    let deck = export_spice(&circuit, &super::title(path), tran);

    match output {
        Some(out) => {
            std::fs::write(&out, deck)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("✓ Wrote SPICE deck to {}", out.display());
        }
        None => print!("{}", deck),
    }
    Ok(())
}
