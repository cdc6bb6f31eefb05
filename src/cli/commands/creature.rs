//! `bestiary creature` command - Creature management

use miette::Result;
use serde::Serialize;

use crate::cli::commands::utils::{
    ids_if_given, ids_or_empty, print_listing, print_saved, DeleteArgs, ListArgs, ShowArgs,
};
use crate::cli::helpers::{open_catalog, print_json, print_success, print_yaml};
use crate::cli::table::print_one;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, EntityKind, IdList};
use crate::core::CatalogError;
use crate::entities::{Creature, CreaturePatch, ElementalType, Handler, Move, NewCreature};

#[derive(clap::Subcommand, Debug)]
pub enum CreatureCommands {
    /// List creatures
    List(ListArgs),

    /// Show a creature's details
    Show(ShowArgs),

    /// Add a new creature
    Add(AddArgs),

    /// Update a creature (omitted options are left unchanged)
    Update(UpdateArgs),

    /// Delete a creature and remove it from every handler
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
EXAMPLES:
  bestiary creature add Pikachu --moves 1,4 --types 2 --handlers 1
  bestiary creature add Eevee --image eevee.png
")]
pub struct AddArgs {
    /// Creature name (unique, case-insensitive)
    pub name: String,

    /// Image path or URL
    #[arg(long, short = 'i')]
    pub image: Option<String>,

    /// Move IDs, comma separated
    #[arg(long, short = 'm')]
    pub moves: Option<IdList>,

    /// Elemental type IDs, comma separated
    #[arg(long, short = 't')]
    pub types: Option<IdList>,

    /// Handler IDs, comma separated (each handler gains this creature)
    #[arg(long = "handlers")]
    pub handlers: Option<IdList>,
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
An empty list replaces the current one, e.g. `--handlers \"\"` releases the
creature from all handlers. A blank --name or --image is ignored.
")]
pub struct UpdateArgs {
    /// Creature ID
    pub id: EntityId,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New image path or URL
    #[arg(long, short = 'i')]
    pub image: Option<String>,

    /// Replacement move IDs
    #[arg(long, short = 'm')]
    pub moves: Option<IdList>,

    /// Replacement elemental type IDs
    #[arg(long, short = 't')]
    pub types: Option<IdList>,

    /// Replacement handler IDs
    #[arg(long = "handlers")]
    pub handlers: Option<IdList>,
}

/// A creature with its links resolved
#[derive(Serialize)]
struct CreatureView<'a> {
    #[serde(flatten)]
    creature: &'a Creature,
    moves: Vec<Move>,
    types: Vec<ElementalType>,
    handlers: Vec<Handler>,
}

pub fn run(cmd: CreatureCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CreatureCommands::List(args) => run_list(args, global),
        CreatureCommands::Show(args) => run_show(args, global),
        CreatureCommands::Add(args) => run_add(args, global),
        CreatureCommands::Update(args) => run_update(args, global),
        CreatureCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let creatures = catalog.list_creatures()?;
    print_listing(&args, creatures, "creature", global, &config)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let creature = catalog
        .get_creature(args.id)?
        .ok_or(CatalogError::NotFound {
            kind: EntityKind::Creature,
            id: args.id,
        })?;

    let format = global
        .format
        .resolve(config.default_format.as_deref(), OutputFormat::Yaml);

    if args.resolve {
        let view = CreatureView {
            creature: &creature,
            moves: catalog.creature_moves(&creature)?,
            types: catalog.creature_types(&creature)?,
            handlers: catalog.creature_handlers(&creature)?,
        };
        return match format {
            OutputFormat::Json => print_json(&view),
            _ => print_yaml(&view),
        };
    }

    print_one(&creature, format)
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let input = NewCreature {
        name: args.name,
        image: args.image,
        move_ids: ids_or_empty(args.moves),
        type_ids: ids_or_empty(args.types),
        handler_ids: ids_or_empty(args.handlers),
    };
    let creature = catalog.add_creature(input)?;
    print_saved(&creature, "Added", global)
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let patch = CreaturePatch {
        name: args.name,
        image: args.image,
        move_ids: ids_if_given(args.moves),
        type_ids: ids_if_given(args.types),
        handler_ids: ids_if_given(args.handlers),
    };
    let creature = catalog.update_creature(args.id, patch)?;
    print_saved(&creature, "Updated", global)
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let message = catalog.delete_creature(args.id)?;
    print_success(global, message);
    Ok(())
}
