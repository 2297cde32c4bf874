// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use ordoplay_script::Format;
use std::path::PathBuf;

/// Run, check and inspect `OrdoPlay` orchestrations
#[derive(Debug, Parser)]
#[command(name = "ordoplay-script", version)]
#[command(about = "Run, check and inspect OrdoPlay orchestrations", long_about = None)]
pub struct Cli {
    /// Runner settings file (RON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Orchestration file format; guessed from the extension when omitted
    #[arg(long, global = true, value_enum)]
    pub format: Option<FormatArg>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Orchestration file formats accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Rusty Object Notation
    Ron,
    /// JSON
    Json,
}

impl From<FormatArg> for Format {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Ron => Format::Ron,
            FormatArg::Json => Format::Json,
        }
    }
}

/// Runner subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute an orchestration from one of its entry nodes
    Run {
        /// Orchestration file (`.ron` or `.json`)
        path: PathBuf,

        /// Entry node id; defaults to the first entry node
        #[arg(short, long)]
        entry: Option<i32>,

        /// Override the step limit
        #[arg(long)]
        max_steps: Option<usize>,

        /// Log every step
        #[arg(long)]
        trace: bool,
    },

    /// Load an orchestration and run build validation
    Validate {
        /// Orchestration file (`.ron` or `.json`)
        path: PathBuf,
    },

    /// List the available node kinds
    Nodes {
        /// Only list kinds matching this text
        search: Option<String>,
    },
}
