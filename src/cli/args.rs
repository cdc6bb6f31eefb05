//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, creature::CreatureCommands, handler::HandlerCommands,
    init::InitArgs, link::LinkCommands, moves::MoveCommands, types::TypeCommands,
};

#[derive(Parser)]
#[command(name = "bestiary")]
#[command(author, version, about = "Creature catalog with enforced relational integrity")]
#[command(long_about = "Manage creatures, moves, elemental types, and handlers. \
References are validated, names are unique per kind, mirrored links are kept in \
lockstep, and deletes remove every reference to the deleted entity.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .bestiary/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bestiary project
    Init(InitArgs),

    /// Creature management
    #[command(subcommand)]
    Creature(CreatureCommands),

    /// Move management
    #[command(subcommand)]
    Move(MoveCommands),

    /// Elemental type management
    #[command(subcommand)]
    Type(TypeCommands),

    /// Handler management
    #[command(subcommand)]
    Handler(HandlerCommands),

    /// Check and repair links between entities
    #[command(subcommand)]
    Link(LinkCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Resolve `Auto`: first the configured default, then the command's own
    pub fn resolve(self, configured: Option<&str>, fallback: OutputFormat) -> OutputFormat {
        if self != OutputFormat::Auto {
            return self;
        }
        match configured.and_then(|s| OutputFormat::from_str(s, true).ok()) {
            Some(OutputFormat::Auto) | None => fallback,
            Some(format) => format,
        }
    }
}
