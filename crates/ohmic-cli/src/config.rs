use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use confyg::{env, Confygery};
use ohmic_core::circuit::DEFAULT_TICK_RATE;
use ohmic_core::newton::{
    DEFAULT_MAX_DAMPING_STEPS, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_CONDUCTANCE, DEFAULT_TOLERANCE,
};
use ohmic_core::SolverOptions;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Keys accepted by `ohmic config get` and `ohmic config set`.
pub const KEYS: [&str; 10] = [
    "simulation.tick_rate",
    "simulation.max_iterations",
    "simulation.tolerance",
    "simulation.max_damping_steps",
    "simulation.min_conductance",
    "simulation.threads",
    "logging.level",
    "logging.coloured",
    "logging.output",
    "logging.report_caller",
];

/// Configuration for ohmic.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (OHMIC_* prefix)
/// 3. Config file (~/.config/ohmic/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// The `[simulation]` section.
///
/// Can be set via:
/// - ENV: OHMIC_SIMULATION_TICK_RATE, OHMIC_SIMULATION_THREADS, ...
/// - Config: `[simulation]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Default step in seconds for netlists that do not set one.
    #[serde(deserialize_with = "lenient")]
    pub tick_rate: f64,
    #[serde(deserialize_with = "lenient")]
    pub max_iterations: usize,
    #[serde(deserialize_with = "lenient")]
    pub tolerance: f64,
    #[serde(deserialize_with = "lenient")]
    pub max_damping_steps: usize,
    #[serde(deserialize_with = "lenient")]
    pub min_conductance: f64,
    /// LU worker threads.
    #[serde(deserialize_with = "lenient")]
    pub threads: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            max_damping_steps: DEFAULT_MAX_DAMPING_STEPS,
            min_conductance: DEFAULT_MIN_CONDUCTANCE,
            threads: 1,
        }
    }
}

impl SimulationConfig {
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions::default()
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance)
            .with_max_damping_steps(self.max_damping_steps)
            .with_min_conductance(self.min_conductance)
            .with_threads(self.threads.max(1))
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
    #[serde(deserialize_with = "lenient")]
    pub coloured: bool,
    /// `stdout`, `stderr` or a file path.
    pub output: String,
    #[serde(deserialize_with = "lenient")]
    pub report_caller: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("warn"),
            coloured: true,
            output: String::from("stderr"),
            report_caller: false,
        }
    }
}

impl LoggingConfig {
    /// Parsed log level.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown level name.
    pub fn level(&self) -> Result<twyg::LogLevel> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Ok(twyg::LogLevel::Trace),
            "debug" => Ok(twyg::LogLevel::Debug),
            "info" => Ok(twyg::LogLevel::Info),
            "warn" | "warning" => Ok(twyg::LogLevel::Warn),
            "error" => Ok(twyg::LogLevel::Error),
            other => anyhow::bail!(
                "Unknown log level: {}\n\nValid levels: trace, debug, info, warn, error",
                other
            ),
        }
    }

    pub fn output(&self) -> twyg::Output {
        match self.output.as_str() {
            "stdout" => twyg::Output::Stdout,
            "stderr" | "" => twyg::Output::Stderr,
            path => twyg::Output::File(PathBuf::from(path)),
        }
    }

    /// Install the global logger.
    ///
    /// # Errors
    ///
    /// Returns an error if the level is unknown or a logger is already set.
    pub fn setup(&self) -> Result<()> {
        let opts = twyg::OptsBuilder::new()
            .coloured(self.coloured)
            .level(self.level()?)
            .output(self.output())
            .report_caller(self.report_caller)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid logging options: {}", e))?;
        twyg::setup(opts).map_err(|e| anyhow::anyhow!("Failed to set up logging: {}", e))?;
        Ok(())
    }
}

/// Accept a value either natively or as a string, as environment variables
/// always arrive as strings.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Value(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if path.exists() {
            let path_str = path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
        }

        // OHMIC_SIMULATION_* and OHMIC_LOGGING_* override the file
        let mut env_opts = env::Options::with_top_level("ohmic");
        env_opts.add_section("simulation").add_section("logging");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Look up a dotted key such as `simulation.tick_rate`.
    pub fn get(&self, key: &str) -> Option<String> {
        let s = &self.simulation;
        let l = &self.logging;
        let value = match key {
            "simulation.tick_rate" => s.tick_rate.to_string(),
            "simulation.max_iterations" => s.max_iterations.to_string(),
            "simulation.tolerance" => s.tolerance.to_string(),
            "simulation.max_damping_steps" => s.max_damping_steps.to_string(),
            "simulation.min_conductance" => s.min_conductance.to_string(),
            "simulation.threads" => s.threads.to_string(),
            "logging.level" => l.level.clone(),
            "logging.coloured" => l.coloured.to_string(),
            "logging.output" => l.output.clone(),
            "logging.report_caller" => l.report_caller.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/ohmic/config.toml
/// - macOS: ~/Library/Application Support/ohmic/config.toml
/// - Windows: %APPDATA%\ohmic\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ohmic")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Ohmic Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (OHMIC_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

[simulation]
# Step in seconds for netlists that do not set `tick_rate` themselves.
# Elements may lower it further (e.g. a 1 kHz AC source needs <= 0.125 ms).
#
# Can also be set via:
# - CLI: ohmic run --tick-rate 0.001 circuit.toml
# - Environment: OHMIC_SIMULATION_TICK_RATE=0.001
tick_rate = 0.05

# Newton-Raphson limits for circuits with diodes or transistors
max_iterations = 500
tolerance = 1e-6
max_damping_steps = 50

# Conductance added across junctions so the Jacobian stays regular
min_conductance = 1e-12

# Worker threads for LU decomposition of large systems
threads = 1

[logging]
# trace, debug, info, warn or error
level = "warn"
coloured = true
# stdout, stderr or a file path
output = "stderr"
report_caller = false
"#
}

/// Create the config file with the example content if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file_at(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

/// Set `key` to `value` in a config document, keeping its comments and layout.
///
/// Values that parse as TOML (numbers, booleans, quoted strings) are stored
/// as such, anything else as a string.
///
/// # Errors
///
/// Returns an error for an unknown key, or a value of the wrong type.
pub fn set_value(contents: &str, key: &str, value: &str) -> Result<String> {
    let Some((section, field)) = key.split_once('.').filter(|_| KEYS.contains(&key)) else {
        anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, KEYS.join(", "));
    };

    let mut doc = contents
        .parse::<toml_edit::DocumentMut>()
        .context("Failed to parse config file")?;
    let parsed = value
        .parse::<toml_edit::Value>()
        .unwrap_or_else(|_| toml_edit::Value::from(value));

    let table = doc
        .entry(section)
        .or_insert(toml_edit::table())
        .as_table_mut()
        .ok_or_else(|| anyhow::anyhow!("[{}] is not a table", section))?;
    table[field] = toml_edit::Item::Value(parsed);

    let updated = doc.to_string();
    toml::from_str::<Config>(&updated)
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;
    Ok(updated)
}
