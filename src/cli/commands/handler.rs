//! `bestiary handler` command - Handler management

use miette::Result;
use serde::Serialize;

use crate::cli::commands::utils::{
    ids_if_given, ids_or_empty, print_listing, print_saved, DeleteArgs, ListArgs, ShowArgs,
};
use crate::cli::helpers::{open_catalog, print_json, print_success, print_yaml};
use crate::cli::table::print_one;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, IdList};
use crate::entities::{Creature, Handler, HandlerPatch, NewHandler};

#[derive(clap::Subcommand, Debug)]
pub enum HandlerCommands {
    /// List handlers
    List(ListArgs),

    /// Show a handler's details
    Show(ShowArgs),

    /// Add a new handler
    Add(AddArgs),

    /// Update a handler (omitted options are left unchanged)
    Update(UpdateArgs),

    /// Delete a handler and release its creatures
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Handler name (unique, case-insensitive)
    pub name: String,

    /// Creature IDs, comma separated (each creature gains this handler)
    #[arg(long, short = 'c')]
    pub creatures: Option<IdList>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Handler ID
    pub id: EntityId,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// Replacement creature IDs ("" releases all)
    #[arg(long, short = 'c')]
    pub creatures: Option<IdList>,
}

#[derive(Serialize)]
struct HandlerView<'a> {
    #[serde(flatten)]
    handler: &'a Handler,
    creatures: Vec<Creature>,
}

pub fn run(cmd: HandlerCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        HandlerCommands::List(args) => run_list(args, global),
        HandlerCommands::Show(args) => run_show(args, global),
        HandlerCommands::Add(args) => run_add(args, global),
        HandlerCommands::Update(args) => run_update(args, global),
        HandlerCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let handlers = catalog.list_handlers()?;
    print_listing(&args, handlers, "handler", global, &config)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let handler = catalog.get_handler(args.id)?;
    let format = global
        .format
        .resolve(config.default_format.as_deref(), OutputFormat::Yaml);

    if args.resolve {
        let view = HandlerView {
            handler: &handler,
            creatures: catalog.handler_creatures(&handler)?,
        };
        return match format {
            OutputFormat::Json => print_json(&view),
            _ => print_yaml(&view),
        };
    }

    print_one(&handler, format)
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let handler = catalog.add_handler(NewHandler {
        name: args.name,
        creature_ids: ids_or_empty(args.creatures),
    })?;
    print_saved(&handler, "Added", global)
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let handler = catalog.update_handler(
        args.id,
        HandlerPatch {
            name: args.name,
            creature_ids: ids_if_given(args.creatures),
        },
    )?;
    print_saved(&handler, "Updated", global)
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let message = catalog.delete_handler(args.id)?;
    print_success(global, message);
    Ok(())
}
