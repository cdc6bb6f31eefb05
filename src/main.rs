use bestiary::cli::{Cli, Commands};
use bestiary::core::{Config, Project};
use clap::Parser;
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let project = match &global.project {
        Some(path) => Project::discover_from(path).ok(),
        None => Project::discover().ok(),
    };
    let config = Config::load(project.as_ref());
    bestiary::cli::logging::init_logging(&global, &config)?;

    match cli.command {
        Commands::Init(args) => bestiary::cli::commands::init::run(args),
        Commands::Creature(cmd) => bestiary::cli::commands::creature::run(cmd, &global),
        Commands::Move(cmd) => bestiary::cli::commands::moves::run(cmd, &global),
        Commands::Type(cmd) => bestiary::cli::commands::types::run(cmd, &global),
        Commands::Handler(cmd) => bestiary::cli::commands::handler::run(cmd, &global),
        Commands::Link(cmd) => bestiary::cli::commands::link::run(cmd, &global),
        Commands::Completions(args) => bestiary::cli::commands::completions::run(args),
    }
}
