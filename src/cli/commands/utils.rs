//! Shared arguments and output for entity commands

use miette::Result;

use crate::cli::helpers::{print_json, print_success};
use crate::cli::table::{print_list, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, IdList};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only show entries whose name contains this text (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Limit the number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Print only the number of matching entries
    #[arg(long)]
    pub count: bool,
}

impl ListArgs {
    /// Apply the search and limit options
    pub fn filter<T: Entity>(&self, items: Vec<T>) -> Vec<T> {
        let needle = self.search.as_ref().map(|s| s.to_lowercase());
        let mut items: Vec<T> = items
            .into_iter()
            .filter(|item| {
                needle
                    .as_ref()
                    .map_or(true, |n| item.name().to_lowercase().contains(n))
            })
            .collect();
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Entity ID
    pub id: EntityId,

    /// Include the linked entities themselves, not just their IDs
    #[arg(long, short = 'r')]
    pub resolve: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Entity ID
    pub id: EntityId,
}

/// Filter, then print a listing in the requested format
pub fn print_listing<T: Entity + TableRow>(
    args: &ListArgs,
    items: Vec<T>,
    noun: &str,
    global: &GlobalOpts,
    config: &Config,
) -> Result<()> {
    let items = args.filter(items);
    if args.count {
        println!("{}", items.len());
        return Ok(());
    }
    let format = global
        .format
        .resolve(config.default_format.as_deref(), OutputFormat::Tsv);
    print_list(&items, format, noun, global.quiet)
}

/// Report an entity that was just added or updated
pub fn print_saved<T: Entity + TableRow>(
    entity: &T,
    action: &str,
    global: &GlobalOpts,
) -> Result<()> {
    match global.format {
        OutputFormat::Json => print_json(entity),
        OutputFormat::Id => {
            println!("{}", entity.id());
            Ok(())
        }
        _ => {
            print_success(
                global,
                format!(
                    "{} {} {} ({})",
                    action,
                    T::KIND.label().to_lowercase(),
                    console::style(entity.id()).cyan(),
                    entity.name()
                ),
            );
            Ok(())
        }
    }
}

/// Ids given for a new entity's link option, or none
pub fn ids_or_empty(list: Option<IdList>) -> Vec<EntityId> {
    list.map(IdList::into_vec).unwrap_or_default()
}

/// Ids given for an update's link option. `None` leaves the field unchanged.
pub fn ids_if_given(list: Option<IdList>) -> Option<Vec<EntityId>> {
    list.map(IdList::into_vec)
}
