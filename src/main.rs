#![forbid(unsafe_code)]
//! cfmeta Command Line Interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use cfmeta::commands::{
    execute_check, execute_generate, execute_validate, CheckOptions, GenerateOptions,
    ValidateOptions,
};
use cfmeta::config::{Config, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "cfmeta")]
#[command(about = "Custom functions metadata generator for spreadsheet add-ins")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate functions.json from annotated source files
    Generate {
        /// Source files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Metadata output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write registration code (CustomFunctions.associate calls) to this path
        #[arg(long)]
        code: Option<PathBuf>,
    },

    /// Check that an existing functions.json matches the sources
    Check {
        /// Source files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Metadata file to compare against
        #[arg(long, default_value = "functions.json")]
        against: PathBuf,
    },

    /// Validate a functions.json file against the schema
    Validate {
        /// File to validate
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} Failed to load {}: {}",
                style("✗").red(),
                cli.config.display(),
                e
            );
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Generate { inputs, output, code } => {
            execute_generate(GenerateOptions { inputs, output, code }, config)
        }
        Commands::Check { inputs, against } => {
            execute_check(CheckOptions { inputs, against }, config)
        }
        Commands::Validate { file } => execute_validate(ValidateOptions { file }),
    }
}
