//! Table formatting for list and show commands
//!
//! Every entity renders through [`TableRow`], so list output in each format
//! (TSV, CSV, markdown, ids) is produced in one place.

use std::io;

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_ids, print_json, print_yaml, truncate_str};
use crate::cli::OutputFormat;
use crate::core::identity::EntityId;
use crate::entities::{Creature, ElementalType, Handler, Move};

/// An entity that can be shown as one table row
pub trait TableRow: Serialize {
    fn headers() -> &'static [&'static str];

    fn row_id(&self) -> EntityId;

    fn cells(&self) -> Vec<String>;
}

impl TableRow for Creature {
    fn headers() -> &'static [&'static str] {
        &["ID", "NAME", "IMAGE", "MOVES", "TYPES", "HANDLERS"]
    }

    fn row_id(&self) -> EntityId {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.image.clone().unwrap_or_else(|| "-".to_string()),
            format_ids(&self.move_ids),
            format_ids(&self.type_ids),
            format_ids(&self.handler_ids),
        ]
    }
}

impl TableRow for Move {
    fn headers() -> &'static [&'static str] {
        &["ID", "NAME", "POWER", "ACCURACY"]
    }

    fn row_id(&self) -> EntityId {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.power.map_or_else(|| "-".to_string(), |p| p.to_string()),
            self.accuracy.map_or_else(|| "-".to_string(), |a| a.to_string()),
        ]
    }
}

impl TableRow for ElementalType {
    fn headers() -> &'static [&'static str] {
        &["ID", "NAME", "STRONG AGAINST", "WEAK AGAINST"]
    }

    fn row_id(&self) -> EntityId {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            format_ids(&self.strong_against_ids),
            format_ids(&self.weak_against_ids),
        ]
    }
}

impl TableRow for Handler {
    fn headers() -> &'static [&'static str] {
        &["ID", "NAME", "CREATURES"]
    }

    fn row_id(&self) -> EntityId {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            format_ids(&self.creature_ids),
        ]
    }
}

/// Print a list of entities. `Auto` must already be resolved.
pub fn print_list<T: TableRow>(
    items: &[T],
    format: OutputFormat,
    noun: &str,
    quiet: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(items),
        OutputFormat::Yaml => print_yaml(items),
        OutputFormat::Id => {
            for item in items {
                println!("{}", item.row_id());
            }
            Ok(())
        }
        OutputFormat::Csv => print_csv(items),
        OutputFormat::Md => {
            println!("{}", render_markdown(items));
            Ok(())
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            if items.is_empty() {
                if !quiet {
                    println!("No {} found.", noun);
                }
                return Ok(());
            }
            print_tsv(items);
            if !quiet {
                println!();
                println!("{} {}(s) found", style(items.len()).cyan(), noun);
            }
            Ok(())
        }
    }
}

/// Print a single entity. `Auto` must already be resolved.
pub fn print_one<T: TableRow>(item: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(item),
        OutputFormat::Yaml | OutputFormat::Auto => print_yaml(item),
        OutputFormat::Id => {
            println!("{}", item.row_id());
            Ok(())
        }
        OutputFormat::Csv => print_csv(std::slice::from_ref(item)),
        OutputFormat::Md => {
            println!("{}", render_markdown(std::slice::from_ref(item)));
            Ok(())
        }
        OutputFormat::Tsv => {
            print_tsv(std::slice::from_ref(item));
            Ok(())
        }
    }
}

fn print_tsv<T: TableRow>(items: &[T]) {
    let headers: Vec<String> = T::headers()
        .iter()
        .map(|h| style(h).bold().to_string())
        .collect();
    println!("{}", headers.join("\t"));
    for item in items {
        let cells: Vec<String> = item
            .cells()
            .into_iter()
            .map(|cell| truncate_str(&cell, 40))
            .collect();
        println!("{}", cells.join("\t"));
    }
}

fn print_csv<T: TableRow>(items: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(T::headers()).into_diagnostic()?;
    for item in items {
        writer.write_record(item.cells()).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;
    Ok(())
}

fn render_markdown<T: TableRow>(items: &[T]) -> String {
    let mut builder = Builder::default();
    builder.push_record(T::headers().iter().copied());
    for item in items {
        builder.push_record(item.cells());
    }
    builder.build().with(Style::markdown()).to_string()
}
