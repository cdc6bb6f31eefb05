//! `bestiary move` command - Move management

use miette::Result;

use crate::cli::commands::utils::{print_listing, print_saved, DeleteArgs, ListArgs, ShowArgs};
use crate::cli::helpers::{open_catalog, print_success};
use crate::cli::table::print_one;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::CatalogError;
use crate::entities::{MovePatch, NewMove};

#[derive(clap::Subcommand, Debug)]
pub enum MoveCommands {
    /// List moves
    List(ListArgs),

    /// Show a move's details
    Show(ShowArgs),

    /// Add a new move
    Add(AddArgs),

    /// Update a move (omitted options are left unchanged)
    Update(UpdateArgs),

    /// Delete a move and remove it from every creature
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Move name (unique, case-insensitive)
    pub name: String,

    /// Base power
    #[arg(long, short = 'p')]
    pub power: Option<i64>,

    /// Accuracy, 0.0 to 1.0
    #[arg(long, short = 'a')]
    pub accuracy: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Move ID
    pub id: EntityId,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New base power
    #[arg(long, short = 'p')]
    pub power: Option<i64>,

    /// New accuracy
    #[arg(long, short = 'a')]
    pub accuracy: Option<f64>,
}

pub fn run(cmd: MoveCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MoveCommands::List(args) => run_list(args, global),
        MoveCommands::Show(args) => run_show(args, global),
        MoveCommands::Add(args) => run_add(args, global),
        MoveCommands::Update(args) => run_update(args, global),
        MoveCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let moves = catalog.list_moves()?;
    print_listing(&args, moves, "move", global, &config)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let found = catalog.get_move(args.id)?.ok_or(CatalogError::NotFound {
        kind: EntityKind::Move,
        id: args.id,
    })?;
    let format = global
        .format
        .resolve(config.default_format.as_deref(), OutputFormat::Yaml);
    print_one(&found, format)
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let created = catalog.add_move(NewMove {
        name: args.name,
        power: args.power,
        accuracy: args.accuracy,
    })?;
    print_saved(&created, "Added", global)
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let updated = catalog.update_move(
        args.id,
        MovePatch {
            name: args.name,
            power: args.power,
            accuracy: args.accuracy,
        },
    )?;
    print_saved(&updated, "Updated", global)
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let message = catalog.delete_move(args.id)?;
    print_success(global, message);
    Ok(())
}
