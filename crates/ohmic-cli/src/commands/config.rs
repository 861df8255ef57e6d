use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{self, Config, KEYS};

/// Show the current effective configuration.
pub fn show_config(config: &Config, config_path: &Path) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    for key in KEYS {
        println!("  {}: {}", key, config.get(key).unwrap_or_default());
    }

    println!("\nPriority: CLI args > ENV vars (OHMIC_*) > Config file > Defaults");
    Ok(())
}

/// Print one config value, or the whole file when no key is given.
pub fn get_config(config: &Config, config_path: &Path, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let value = config.get(&key).ok_or_else(|| {
            anyhow::anyhow!("Unknown config key: {}\n\nValid keys: {}", key, KEYS.join(", "))
        })?;
        println!("{}", value);
    } else if config_path.exists() {
        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;
        print!("{}", contents);
    } else {
        println!("Config file does not exist: {}", config_path.display());
        println!("\nRun 'ohmic config init' to create it.");
    }
    Ok(())
}

/// Set a config value in the file, creating the file first if needed.
pub fn set_config(config_path: &Path, key: &str, value: &str) -> Result<()> {
    config::ensure_config_file_at(config_path)?;
    let contents = std::fs::read_to_string(config_path).context("Failed to read config file")?;
    let updated = config::set_value(&contents, key, value)?;
    std::fs::write(config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {} = {}", key, value);
    println!("  in {}", config_path.display());
    Ok(())
}

/// Show the config file path.
pub fn show_path(config_path: &Path) {
    println!("{}", config_path.display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config(config_path: &Path) -> Result<()> {
    if config::ensure_config_file_at(config_path)? {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure ohmic.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_creates_and_updates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ohmic").join("config.toml");

        set_config(&path, "simulation.threads", "4").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.simulation.threads, 4);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("# Ohmic Configuration File"));

        assert!(set_config(&path, "simulation.colour", "red").is_err());
    }

    #[test]
    fn test_get_unknown_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let err = get_config(&Config::default(), &path, Some(String::from("nope"))).unwrap_err();
        assert!(err.to_string().contains("Valid keys"));
    }
}
