// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hatch - a plugin runtime with dependency-aware loading.
//!
//! This is the binary entry point. It inspects plugin archives and previews
//! the order a plugin directory would load in.

mod inspect;
mod plan;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hatch_config::HatchConfig;
use hatch_core::LoadError;
use hatch_plugin::DescriptorReader;
use thiserror::Error;

/// Hatch - a plugin runtime with dependency-aware loading.
#[derive(Parser, Debug)]
#[command(name = "hatch", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the descriptor of one plugin archive.
    Inspect {
        /// Plugin archive directory.
        archive: PathBuf,
    },
    /// Show the order in which a plugin directory would load.
    Plan {
        /// Plugin directory. Defaults to `plugins.directory` from the config.
        dir: Option<PathBuf>,
    },
}

/// Failures a subcommand reports before exiting non-zero.
#[derive(Debug, Error)]
pub(crate) enum CommandError {
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Load(#[from] LoadError),
}

fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => hatch_config::load_and_validate_path(path),
        None => hatch_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            hatch_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.engine.log_level);
    tracing::debug!(engine = %config.engine.name, "configuration loaded");

    let reader = descriptor_reader(&config);
    let mut stdout = io::stdout().lock();
    let result = match cli.command {
        Some(Commands::Inspect { archive }) => inspect::run_inspect(
            &archive,
            &reader,
            config.plugins.data_directory.as_deref(),
            &mut stdout,
        ),
        Some(Commands::Plan { dir }) => {
            let dir = dir.unwrap_or_else(|| config.plugins.directory.clone());
            let skip_soft = config.plugins.skip_soft_dependencies;
            plan::run_plan(&dir, &reader, &engine_version(), skip_soft, &mut stdout)
        }
        None => {
            println!("hatch: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("hatch: {err}");
        std::process::exit(1);
    }
}

/// Descriptor reader honouring the configured metadata file names.
fn descriptor_reader(config: &HatchConfig) -> DescriptorReader {
    DescriptorReader::new(
        config.plugins.primary_metadata.clone(),
        config.plugins.fallback_metadata.clone(),
    )
}

fn engine_version() -> semver::Version {
    semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| semver::Version::new(0, 0, 0))
}

/// `HATCH_LOG` wins, then `RUST_LOG`, then the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("HATCH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("hatch={log_level},hatch_plugin={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}
