pub mod codec;
pub mod config;
pub mod inspect;
pub mod op;
pub mod run;
pub mod spice;

use std::path::Path;

use anyhow::{Context, Result};
use ohmic_core::codec::MAGIC;
use ohmic_core::{Circuit, Netlist};

use crate::config::SimulationConfig;

/// Load a circuit from a TOML netlist or a binary circuit file.
///
/// The tick rate comes from `tick_rate` if given, then the file, then the
/// `[simulation]` config. Only the config value is lowered to what the
/// circuit's sources can follow; the other two must already fit.
pub fn load_circuit(
    path: &Path,
    simulation: &SimulationConfig,
    tick_rate: Option<f64>,
) -> Result<Circuit> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut circuit = if bytes.starts_with(MAGIC) {
        ohmic_core::codec::decode(&bytes)
            .with_context(|| format!("Failed to decode {}", path.display()))?
    } else {
        let text = std::str::from_utf8(&bytes)
            .with_context(|| format!("{} is neither a netlist nor a circuit file", path.display()))?;
        let netlist: Netlist = text
            .parse()
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let mut circuit = netlist
            .to_circuit()
            .with_context(|| format!("Invalid circuit in {}", path.display()))?;
        if netlist.tick_rate.is_none() {
            circuit
                .set_tick_rate_clamped(simulation.tick_rate)
                .context("Invalid simulation.tick_rate in config")?;
        }
        circuit
    };

    circuit.set_options(simulation.solver_options());
    if let Some(dt) = tick_rate {
        circuit.set_tick_rate(dt).context("Invalid --tick-rate")?;
    }
    log::info!(
        "Loaded {} elements from {} (tick rate {}s)",
        circuit.len(),
        path.display(),
        circuit.tick_rate()
    );
    Ok(circuit)
}

/// Display name of a netlist file for titles: its stem, or the whole path.
pub fn title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::PathBuf;

    use tempfile::TempDir;

    /// 10 V across 4 Ω and 6 Ω in series.
    pub const DIVIDER: &str = r#"
[[element]]
kind = "voltage_source"
name = "supply"
nodes = ["in", "gnd"]
voltage = 10.0

[[element]]
kind = "resistor"
name = "top"
nodes = ["in", "mid"]
resistance = 4.0

[[element]]
kind = "resistor"
name = "bottom"
nodes = ["mid", "gnd"]
resistance = 6.0
"#;

    pub fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{write, DIVIDER};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_netlist_uses_config_tick_rate() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "divider.toml", DIVIDER);
        let simulation = SimulationConfig {
            tick_rate: 0.02,
            max_iterations: 7,
            ..SimulationConfig::default()
        };

        let circuit = load_circuit(&path, &simulation, None).unwrap();
        assert_eq!(circuit.len(), 3);
        assert!((circuit.tick_rate() - 0.02).abs() < f64::EPSILON);
        assert_eq!(circuit.options().max_iterations, 7);

        let circuit = load_circuit(&path, &simulation, Some(0.001)).unwrap();
        assert!((circuit.tick_rate() - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_tick_rate_lowered_for_fast_sources() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            "mains.toml",
            r#"
[[element]]
kind = "ac_voltage_source"
nodes = ["in", "gnd"]
amplitude = 10.0
frequency = 50.0

[[element]]
kind = "resistor"
name = "load"
nodes = ["in", "gnd"]
resistance = 100.0
"#,
        );

        let mut circuit = load_circuit(&path, &SimulationConfig::default(), None).unwrap();
        assert!((circuit.tick_rate() - 0.0025).abs() < 1e-12);
        let load = circuit.find("load").unwrap();
        let meters = circuit.run(0.02, &[load]).unwrap();
        let peak = meters[0].max(ohmic_core::meter::Quantity::Voltage);
        assert!(peak > 5.0 && peak <= 10.0 + 1e-9, "{peak}");

        assert!(load_circuit(&path, &SimulationConfig::default(), Some(0.01)).is_err());
    }

    #[test]
    fn test_load_binary_circuit() {
        let temp_dir = TempDir::new().unwrap();
        let netlist: Netlist = DIVIDER.parse().unwrap();
        let bytes = ohmic_core::codec::encode(&netlist.to_circuit().unwrap()).unwrap();
        let path = temp_dir.path().join("divider.ohmc");
        std::fs::write(&path, &bytes).unwrap();

        let circuit = load_circuit(&path, &SimulationConfig::default(), None).unwrap();
        assert_eq!(circuit.find("bottom"), Some(ohmic_core::ElementId::new(2)));
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "broken.toml", "[[element]]\nkind = 3\n");
        let err = load_circuit(&path, &SimulationConfig::default(), None).unwrap_err();
        assert!(err.to_string().contains("broken.toml"), "{err}");

        let missing = temp_dir.path().join("missing.toml");
        assert!(load_circuit(&missing, &SimulationConfig::default(), None).is_err());
    }

    #[test]
    fn test_title() {
        assert_eq!(title(Path::new("/tmp/rectifier.toml")), "rectifier");
    }
}
