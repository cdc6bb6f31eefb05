//! `bestiary type` command - Elemental type management

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
use crate::entities::{ElementalType, ElementalTypePatch, NewElementalType};

#[derive(clap::Subcommand, Debug)]
pub enum TypeCommands {
    /// List elemental types
    List(ListArgs),

    /// Show an elemental type's details
    Show(ShowArgs),

    /// Add a new elemental type
    Add(AddArgs),

    /// Update an elemental type (omitted options are left unchanged)
    Update(UpdateArgs),

    /// Delete an elemental type and remove every reference to it
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
Strengths and weaknesses are mirrored: if Water is strong against Fire,
Fire is recorded as weak against Water.

EXAMPLES:
  bestiary type add Water --strong 1 --weak 3
")]
pub struct AddArgs {
    /// Type name (unique, case-insensitive)
    pub name: String,

    /// IDs of types this one is strong against
    #[arg(long)]
    pub strong: Option<IdList>,

    /// IDs of types this one is weak against
    #[arg(long)]
    pub weak: Option<IdList>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Type ID
    pub id: EntityId,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// Replacement strong-against IDs ("" clears)
    #[arg(long)]
    pub strong: Option<IdList>,

    /// Replacement weak-against IDs ("" clears)
    #[arg(long)]
    pub weak: Option<IdList>,
}

#[derive(Serialize)]
struct TypeView<'a> {
    #[serde(flatten)]
    ty: &'a ElementalType,
    strong_against: Vec<ElementalType>,
    weak_against: Vec<ElementalType>,
}

pub fn run(cmd: TypeCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TypeCommands::List(args) => run_list(args, global),
        TypeCommands::Show(args) => run_show(args, global),
        TypeCommands::Add(args) => run_add(args, global),
        TypeCommands::Update(args) => run_update(args, global),
        TypeCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let types = catalog.list_types()?;
    print_listing(&args, types, "type", global, &config)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, config) = open_catalog(global)?;
    let ty = catalog.get_type(args.id)?.ok_or(CatalogError::NotFound {
        kind: EntityKind::ElementalType,
        id: args.id,
    })?;
    let format = global
        .format
        .resolve(config.default_format.as_deref(), OutputFormat::Yaml);

    if args.resolve {
        let view = TypeView {
            ty: &ty,
            strong_against: catalog.strong_against(&ty)?,
            weak_against: catalog.weak_against(&ty)?,
        };
        return match format {
            OutputFormat::Json => print_json(&view),
            _ => print_yaml(&view),
        };
    }

    print_one(&ty, format)
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let ty = catalog.add_type(NewElementalType {
        name: args.name,
        strong_against_ids: ids_or_empty(args.strong),
        weak_against_ids: ids_or_empty(args.weak),
    })?;
    print_saved(&ty, "Added", global)
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let ty = catalog.update_type(
        args.id,
        ElementalTypePatch {
            name: args.name,
            strong_against_ids: ids_if_given(args.strong),
            weak_against_ids: ids_if_given(args.weak),
        },
    )?;
    print_saved(&ty, "Updated", global)
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;
    let message = catalog.delete_type(args.id)?;
    print_success(global, message);
    Ok(())
}
