mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let paths = AppPaths::discover()?;
    let config = run::load_config(cli.config.as_deref(), &paths)?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved backdrop paths");

    match cli.command {
        Some(Command::Preview(args)) => run::preview(args, config, &paths),
        Some(Command::Thumbnails(args)) => run::thumbnails(args, &config),
        Some(Command::List) => run::list(&config, &paths),
        Some(Command::Scroll(args)) => run::scroll(args, &config),
        None => run::preview(cli.preview, config, &paths),
    }
}
