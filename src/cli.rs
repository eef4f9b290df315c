// CLI module - command-line argument parsing and handlers
//
// Top-level flags override the configuration for one run. Subcommands for
// configuration management:
// - config --show: Display effective configuration
// - config --path: Print the config file location
// - config --reset: Regenerate config file with defaults

use crate::config::{Config, DisplayMode, Overrides, VERSION};
use clap::{Parser, Subcommand};
use std::io::Write;

/// hatdraw - shared pixel canvas for the Sense HAT and the browser
#[derive(Parser, Debug)]
#[command(name = "hatdraw")]
#[command(version = VERSION)]
#[command(about = "Shared pixel canvas for the Sense HAT and web clients", long_about = None)]
pub struct Cli {
    /// Canvas width in pixels (8 to 40)
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height in pixels (8 to 40)
    #[arg(long)]
    pub height: Option<u32>,

    /// HTTP bind address, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub bind: Option<String>,

    /// Display driver
    #[arg(long, value_enum)]
    pub display: Option<DisplayMode>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            width: self.width,
            height: self.height,
            bind: self.bind.clone(),
            display: self.display,
        }
    }
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub fn handle_cli(cli: &Cli) -> bool {
    match cli.command {
        Some(Commands::Config { show, reset, path }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show(&cli.overrides());
            } else if reset {
                handle_config_reset();
            } else {
                // No flag provided, show help
                println!("Usage: hatdraw config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            true
        }
        None => false, // No subcommand, run the canvas
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show(overrides: &Overrides) {
    let config = match Config::load(overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("# Effective configuration (flags > env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        let _ = std::io::stderr().flush();

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err()
            || !input.trim().eq_ignore_ascii_case("y")
        {
            println!("Aborted.");
            return;
        }
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            std::process::exit(1);
        }
    }

    // Write the default config (using Config's single source of truth)
    if let Err(e) = std::fs::write(&path, Config::default().to_toml()) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::parse_from([
            "hatdraw",
            "--width",
            "32",
            "--bind",
            "127.0.0.1:3000",
            "--display",
            "headless",
        ]);
        let overrides = cli.overrides();

        assert_eq!(overrides.width, Some(32));
        assert_eq!(overrides.height, None);
        assert_eq!(overrides.bind.as_deref(), Some("127.0.0.1:3000"));
        assert_eq!(overrides.display, Some(DisplayMode::Headless));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::parse_from(["hatdraw", "config", "--path"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                path: true,
                show: false,
                reset: false
            })
        ));
    }

    #[test]
    fn test_unknown_display_is_rejected() {
        assert!(Cli::try_parse_from(["hatdraw", "--display", "hologram"]).is_err());
    }
}
