//! QueryForge CLI
//!
//! Replays query definition files through the condition builder and prints
//! the normalized tree or the rendered backend predicate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qf_conditions::{Filter, Token};
use qf_core::config::{BackendKind, ForgeConfig, LoggingConfig};
use qf_render::Renderer;
use qf_schema::{FieldResolver, StaticSchemaSource};

mod definition;

use definition::QueryDefinition;

#[derive(Debug, Parser)]
#[command(name = "queryforge", version, about = "Build, normalize and render condition trees")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, global = true, env = "QUERYFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Document metadata file (YAML or JSON)
    #[arg(long, global = true, env = "QUERYFORGE_SCHEMA")]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the normalized condition tree as JSON
    Tree {
        definition: PathBuf,

        /// Include the recorded token stream
        #[arg(long)]
        tokens: bool,
    },
    /// Print the predicate rendered for a backend
    Render {
        definition: PathBuf,

        /// Backend to render for (sql, document); defaults to the configured one
        #[arg(long)]
        backend: Option<BackendKind>,
    },
}

#[derive(Serialize)]
struct TreeOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens: Option<&'a [Token]>,
    filter: &'a Filter,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ForgeConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting queryforge");

    let schema = cli
        .schema
        .as_deref()
        .context("no schema file given (use --schema or QUERYFORGE_SCHEMA)")?;
    let resolver = load_resolver(schema, &config)?;

    match cli.command {
        Command::Tree { definition, tokens } => {
            let definition = QueryDefinition::from_path(&definition)?;
            let mut builder = definition.replay(resolver, &config.render.main_alias)?;
            let filter = builder.seal()?;
            let output = TreeOutput {
                tokens: tokens.then(|| builder.tokens()),
                filter: &filter,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Render { definition, backend } => {
            let definition = QueryDefinition::from_path(&definition)?;
            let filter = definition.replay(resolver, &config.render.main_alias)?.seal()?;

            let backend = backend.unwrap_or(config.render.backend);
            let renderer = Renderer::for_backend(backend, &config.render)
                .with_parameters(definition.parameters.clone());
            let predicate = renderer.render(&filter)?;
            println!("{}", serde_json::to_string_pretty(&predicate)?);
        }
    }

    Ok(())
}

fn load_resolver(schema: &Path, config: &ForgeConfig) -> anyhow::Result<Arc<FieldResolver>> {
    let source = StaticSchemaSource::from_path(schema)?;
    let resolver = Arc::new(FieldResolver::from_source(Arc::new(source)));
    resolver
        .registry()
        .preload(&config.schema.preload)
        .context("failed to preload document metadata")?;
    Ok(resolver)
}

/// Initialize tracing/logging on stderr
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
