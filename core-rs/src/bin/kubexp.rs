//! kubexp - experiment compiler CLI
//!
//! Compiles an experiment description into cluster manifests

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use kubexp_core::logging::init_cli_logger;
use kubexp_core::naming::sanitize_name;
use kubexp_core::{Experiment, ExperimentConfig};

#[derive(Parser)]
#[command(name = "kubexp")]
#[command(version = kubexp_core::VERSION)]
#[command(about = "Compile distributed experiments into cluster manifests", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an experiment (YAML description or JSON dump) into manifests
    Compile {
        /// experiment.yaml, or a .json file written by `kubexp dump`
        input: PathBuf,
        /// Write the manifest here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Also write the compiled experiment state as JSON
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print the serialized experiment as JSON
    Dump {
        /// experiment.yaml
        config: PathBuf,
    },
    /// List manifest components in output order
    Components {
        /// experiment.yaml, or a .json dump
        input: PathBuf,
    },
    /// Sanitize and validate a name
    CheckName {
        name: String,
    },
}

fn load_experiment(input: &Path) -> anyhow::Result<Experiment> {
    let is_json = input.extension().map(|ext| ext == "json").unwrap_or(false);

    if is_json {
        let json = fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        Ok(Experiment::from_json(&json)?)
    } else {
        let config = ExperimentConfig::load(input)?;
        Ok(config.build()?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    match cli.command {
        Commands::Compile {
            input,
            output,
            state,
        } => {
            let mut experiment = load_experiment(&input)?;
            let manifest = experiment.compile()?;

            match output {
                Some(path) => {
                    fs::write(&path, &manifest)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("✓ Manifest written to {}", path.display());
                }
                None => print!("{}", manifest),
            }

            if let Some(path) = state {
                fs::write(&path, experiment.to_json()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        Commands::Dump { config } => {
            let experiment = ExperimentConfig::load(&config)?.build()?;
            println!("{}", experiment.to_json()?);
        }

        Commands::Components { input } => {
            let mut experiment = load_experiment(&input)?;
            for component in experiment.compile_components()? {
                println!("{}", component.key);
            }
        }

        Commands::CheckName { name } => {
            let sanitized = sanitize_name(&name)?;
            println!("{}", sanitized);
        }
    }

    Ok(())
}
