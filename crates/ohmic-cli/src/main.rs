use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod config;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "ohmic", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ~/.config/ohmic/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding the [logging] config section
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Compile a circuit and print its operating point
    ///
    /// Solves the circuit once at t = 0 and prints one line per element with
    /// its parameters, the nodes it connects and its voltage, current and
    /// power, e.g.
    ///
    ///   top  Resistor(4Ω)[1,2]: 4.00v, 1.00A, 4.00W
    ///
    /// Voltages are V(A) - V(B) and currents flow from pin A to pin B, so
    /// a source delivering power reads a negative current.
    Op {
        /// TOML netlist or binary circuit file
        netlist: PathBuf,
    },
    /// Simulate a circuit over time
    ///
    /// Steps the circuit until the duration has elapsed and prints the final
    /// reading of every element. Probed elements are sampled on every tick
    /// and get average, RMS, min and max of voltage, current and power.
    ///
    /// The tick rate comes from --tick-rate, then the netlist's own
    /// tick_rate, then [simulation] tick_rate in the config. Elements that
    /// need a finer step (AC and square sources) lower it automatically.
    Run {
        /// TOML netlist or binary circuit file
        netlist: PathBuf,

        /// Simulated time in seconds
        #[arg(long, short)]
        duration: f64,

        /// Step in seconds
        #[arg(long)]
        tick_rate: Option<f64>,

        /// Element name to sample on every tick (repeatable)
        #[arg(long, short)]
        probe: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the structure of a circuit
    Inspect {
        /// TOML netlist or binary circuit file
        netlist: PathBuf,

        /// Also print a Graphviz DOT graph
        #[arg(long)]
        dot: bool,

        /// Also print the compiled MNA system (G, z and x)
        #[arg(long)]
        matrices: bool,
    },
    /// Export a circuit as a SPICE deck
    Spice {
        /// TOML netlist or binary circuit file
        netlist: PathBuf,

        /// Add a .tran card running for this many seconds
        #[arg(long, short)]
        duration: Option<f64>,

        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Convert a netlist to the compact binary format
    Encode {
        /// TOML netlist
        netlist: PathBuf,

        /// Binary output file
        output: PathBuf,
    },
    /// Convert a binary circuit back to a TOML netlist
    Decode {
        /// Binary circuit file
        input: PathBuf,

        /// Netlist output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get {
        /// Dotted key, e.g. simulation.tick_rate
        key: Option<String>,
    },
    /// Set a value in the config file
    Set {
        /// Dotted key, e.g. simulation.tick_rate
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::config_file_path);
    let mut config = Config::load_from(&config_path)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.setup()?;

    match cli.command {
        Commands::Op { netlist } => {
            commands::op::run_op(&netlist, &config)?;
        }
        Commands::Run {
            netlist,
            duration,
            tick_rate,
            probe,
            json,
        } => {
            commands::run::run_simulation(&netlist, &config, duration, tick_rate, &probe, json)?;
        }
        Commands::Inspect {
            netlist,
            dot,
            matrices,
        } => {
            commands::inspect::run_inspect(&netlist, &config, dot, matrices)?;
        }
        Commands::Spice {
            netlist,
            duration,
            output,
        } => {
            commands::spice::run_spice(&netlist, &config, duration, output)?;
        }
        Commands::Encode { netlist, output } => {
            commands::codec::run_encode(&netlist, &output, &config)?;
        }
        Commands::Decode { input, output } => {
            commands::codec::run_decode(&input, output)?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show_config(&config, &config_path)?,
            ConfigCommands::Get { key } => {
                commands::config::get_config(&config, &config_path, key)?;
            }
            ConfigCommands::Set { key, value } => {
                commands::config::set_config(&config_path, &key, &value)?;
            }
            ConfigCommands::Path => commands::config::show_path(&config_path),
            ConfigCommands::Example => commands::config::show_example(),
            ConfigCommands::Init => commands::config::init_config(&config_path)?,
        },
    }

    Ok(())
}
