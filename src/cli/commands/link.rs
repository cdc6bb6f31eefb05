//! `bestiary link` command - Check and repair links between entities

use console::style;
use miette::Result;

use crate::cli::helpers::{open_catalog, print_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::reconcile::{LinkIssue, LinkReport};

#[derive(clap::Subcommand, Debug)]
pub enum LinkCommands {
    /// Find broken links (missing targets and one-sided mirrored links)
    Check(CheckLinksArgs),
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
Mirrored links must be recorded on both sides:
  creature handler_ids        <-> handler creature_ids
  type strong_against_ids     <-> type weak_against_ids

Mirrored updates interrupted by a store failure stay pending until --fix
finishes them from the owner's current links. After that, links to missing
entities are removed and missing mirror entries are added.
")]
pub struct CheckLinksArgs {
    /// Repair the problems found
    #[arg(long)]
    pub fix: bool,
}

pub fn run(cmd: LinkCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LinkCommands::Check(args) => run_check(args, global),
    }
}

fn run_check(args: CheckLinksArgs, global: &GlobalOpts) -> Result<()> {
    let (catalog, _) = open_catalog(global)?;

    let report = if args.fix {
        catalog.repair_links()?
    } else {
        catalog.check_links()?
    };

    if global.format == OutputFormat::Json {
        print_json(&report)?;
    } else {
        if !global.quiet {
            println!(
                "{} Checking links across all collections...\n",
                style("→").blue()
            );
        }
        for issue in &report.issues {
            println!("{} {}", style("✗").red(), issue);
            if args.fix {
                println!("  {} {}", style("fix:").yellow(), describe_fix(issue));
            }
        }
        if !global.quiet {
            println!();
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "Checked {} link(s), found {} broken",
                style(report.checked).cyan(),
                if report.issues.is_empty() {
                    style(report.issues.len()).green()
                } else {
                    style(report.issues.len()).red()
                }
            );
        }
    }

    let chatty = !global.quiet && global.format != OutputFormat::Json;
    if report.is_clean() {
        if chatty {
            println!("{} All links are valid!", style("✓").green().bold());
        }
        Ok(())
    } else if args.fix {
        if chatty && report.interrupted > 0 {
            println!(
                "{} Finished {} interrupted update(s)",
                style("✓").green().bold(),
                report.interrupted
            );
        }
        if chatty && !report.issues.is_empty() {
            println!(
                "{} Repaired {} link(s)",
                style("✓").green().bold(),
                report.issues.len()
            );
        }
        Ok(())
    } else {
        Err(miette::miette!(
            help = "run `bestiary link check --fix` to repair them",
            "{}",
            problem_summary(&report)
        ))
    }
}

/// One-line summary of what an unclean report found
fn problem_summary(report: &LinkReport) -> String {
    let mut parts = Vec::new();
    if !report.issues.is_empty() {
        parts.push(format!("{} broken link(s) found", report.issues.len()));
    }
    if report.interrupted > 0 {
        parts.push(format!("{} interrupted update(s) pending", report.interrupted));
    }
    parts.join(", ")
}

fn describe_fix(issue: &LinkIssue) -> String {
    match issue {
        LinkIssue::Dangling { field, target, .. } => {
            format!("removed {} from {}", target, field)
        }
        LinkIssue::Asymmetric {
            owner_id, field, ..
        } => {
            let (kind, target) = issue.target();
            format!(
                "added {} to {} {} {}",
                owner_id,
                kind.label().to_lowercase(),
                target,
                field.reciprocal().map_or("", |r| r.as_str())
            )
        }
    }
}
