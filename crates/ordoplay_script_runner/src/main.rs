// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` script runner
//!
//! Loads a saved orchestration and either executes it, validates it, or
//! lists the node kinds it may use. Print nodes write to stdout; everything
//! else goes through `tracing`.

mod cli;
mod config;

use clap::Parser;
use cli::{Cli, Command};
use config::RunnerConfig;
use ordoplay_script::{
    create_builtin_registry, BuildError, ExecutionDriver, ExecutionError, Format, NodeId, NodeRegistry,
    Orchestration, OrchestrationRecord, PersistenceError, ScriptNode,
};
use std::path::Path;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Failures surfaced by the runner
#[derive(Debug, Error)]
enum RunnerError {
    #[error("failed to read config: {0}")]
    Config(#[from] std::io::Error),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("orchestration has no entry node")]
    NoEntry,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ordoplay_script={default_level},ordoplay_script_runner={default_level}"
        ))
    });
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = execute(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<(), RunnerError> {
    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    let registry = create_builtin_registry();
    let format = cli.format.map(Format::from);

    match cli.command {
        Command::Run { path, entry, max_steps, trace } => {
            let mut config = config;
            if let Some(max_steps) = max_steps {
                config.driver.max_steps = max_steps;
            }
            config.driver.trace_steps |= trace;
            let orchestration = load(&path, format, &registry)?;
            run(&orchestration, entry.map(NodeId), &config)
        }
        Command::Validate { path } => {
            let orchestration = load(&path, format, &registry)?;
            orchestration.validate()?;
            tracing::info!(
                name = %orchestration.name,
                nodes = orchestration.node_count(),
                "orchestration is valid"
            );
            Ok(())
        }
        Command::Nodes { search } => {
            list_nodes(&registry, search.as_deref());
            Ok(())
        }
    }
}

fn load(path: &Path, format: Option<Format>, registry: &NodeRegistry) -> Result<Orchestration, RunnerError> {
    let Some(format) = format else {
        return Ok(Orchestration::load(path, registry)?);
    };
    let content = std::fs::read_to_string(path).map_err(PersistenceError::from)?;
    let record = OrchestrationRecord::decode(&content, format)?;
    Ok(Orchestration::from_record(&record, registry)?)
}

fn run(orchestration: &Orchestration, entry: Option<NodeId>, config: &RunnerConfig) -> Result<(), RunnerError> {
    orchestration.validate()?;

    let entry = match entry {
        Some(entry) => entry,
        None => orchestration
            .entry_nodes()
            .next()
            .map(ScriptNode::id)
            .ok_or(RunnerError::NoEntry)?,
    };
    tracing::info!(name = %orchestration.name, %entry, "running orchestration");

    let container = config.container();
    let report = ExecutionDriver::new(orchestration, config.driver.clone()).run(&container, entry)?;
    for line in &report.log {
        println!("{line}");
    }
    tracing::info!(steps = report.steps, nodes = report.path.len(), "run finished");
    Ok(())
}

fn list_nodes(registry: &NodeRegistry, search: Option<&str>) {
    let types = match search {
        Some(text) => registry.search(text),
        None => registry.catalogable().collect(),
    };
    for node_type in types {
        println!("{:<14} {:<12} {}", node_type.id, format!("{:?}", node_type.category), node_type.description);
    }
}
