//! `bestiary init` command - Initialize a new bestiary project

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::project::{Project, ProjectError};
use crate::core::store::SqliteStore;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .bestiary/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    // Create directory if it doesn't exist
    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            let config = Config::load(Some(&project));
            let database = config.database_path(&project);
            SqliteStore::open_with_timeout(&database, config.busy_timeout())
                .map_err(|e| miette::miette!("cannot create catalog: {}", e))?;

            println!(
                "{} Initialized bestiary project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created:");
            println!("  {}", project.config_path().display());
            println!("  {}", database.display());
            println!();
            println!("Next steps:");
            println!(
                "  {} Add an elemental type",
                style("bestiary type add Electric").yellow()
            );
            println!(
                "  {} Add a creature",
                style("bestiary creature add Pikachu --types 1").yellow()
            );
            println!(
                "  {} Check links",
                style("bestiary link check").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} bestiary project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("bestiary init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}
