use anyhow::Result;
use clap::Parser;
use lorekeep::cli::{Cli, Commands};
use lorekeep::{commands, config, AppContext};
use lorekeep_core::KnowledgeBase;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cx = AppContext {
        knowledge_base: KnowledgeBase::new(config::store_config(&cli)?),
    };
    debug!("Knowledge base at {}", cx.knowledge_base.base_path().display());

    match cli.command {
        Commands::Doc(args) => commands::handle_doc(args, &cx).await?,
        Commands::Note(args) => commands::handle_note(args, &cx).await?,
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
