//! # docschema-cli
//!
//! Command-line front end for the document schema engine.
//!
//! Loads one or more schema documents and runs validation, completion,
//! path resolution, or hover against JSON documents.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use docschema_schema::SchemaRegistry;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

#[derive(Parser)]
#[command(name = "docschema")]
#[command(about = "Schema-driven validation and completion for structured documents")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate documents against a schema
    Validate {
        /// Document file paths
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// Schema file paths
        #[arg(short, long = "schema")]
        schemas: Vec<PathBuf>,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print completions at a byte offset as JSON
    Complete {
        /// Document file path
        document: PathBuf,

        /// Schema file paths
        #[arg(short, long = "schema")]
        schemas: Vec<PathBuf>,

        /// Byte offset of the cursor
        #[arg(short, long)]
        offset: usize,
    },

    /// Print the schema node governing a path such as `steps/0/tool_id`
    Resolve {
        /// Document path
        path: String,

        /// Schema file paths
        #[arg(short, long = "schema")]
        schemas: Vec<PathBuf>,
    },

    /// Print hover text at a byte offset
    Hover {
        /// Document file path
        document: PathBuf,

        /// Schema file paths
        #[arg(short, long = "schema")]
        schemas: Vec<PathBuf>,

        /// Byte offset of the cursor
        #[arg(short, long)]
        offset: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let registry = SchemaRegistry::new();

    match cli.command {
        Commands::Validate {
            documents,
            schemas,
            json,
        } => {
            let model = commands::load_model(&registry, &config.schemas_for(&schemas)?)?;
            commands::validate(model, config.validation, documents, json).await
        }
        Commands::Complete {
            document,
            schemas,
            offset,
        } => {
            let model = commands::load_model(&registry, &config.schemas_for(&schemas)?)?;
            commands::complete(&model, config.completion, &document, offset)
        }
        Commands::Resolve { path, schemas } => {
            let model = commands::load_model(&registry, &config.schemas_for(&schemas)?)?;
            commands::resolve(&model, &path)
        }
        Commands::Hover {
            document,
            schemas,
            offset,
        } => {
            let model = commands::load_model(&registry, &config.schemas_for(&schemas)?)?;
            commands::hover(&model, &document, offset)
        }
    }
}
