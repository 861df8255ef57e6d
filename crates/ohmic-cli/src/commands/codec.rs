use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ohmic_core::{codec, Netlist};

use crate::config::Config;

/// Write the binary form of a netlist.
pub fn run_encode(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let circuit = super::load_circuit(input, &config.simulation, None)?;
    let bytes = codec::encode(&circuit).context("Failed to encode circuit")?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "✓ Encoded {} elements into {} bytes: {}",
        circuit.len(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

/// Turn a binary circuit back into a TOML netlist, to `output` or stdout.
pub fn run_decode(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let circuit = codec::decode(&bytes)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    let netlist = Netlist::from_circuit(&circuit);

    match output {
        Some(out) => {
            netlist
                .save(&out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("✓ Decoded {} elements into {}", circuit.len(), out.display());
        }
        None => print!("{}", netlist.to_toml().context("Failed to render netlist")?),
    }
    Ok(())
}
