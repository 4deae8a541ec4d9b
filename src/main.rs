//! voxloop CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use voxloop::cli::{Cli, Commands};
use voxloop::session::SessionExit;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxloop=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => voxloop::cli::run::handle_run(cli.config.as_deref(), args).await,
        Commands::Tools => voxloop::cli::run::handle_tools().map(|()| SessionExit::Closed),
    };

    match result {
        Ok(SessionExit::Closed) => {}
        Ok(SessionExit::Fatal { message }) => {
            eprintln!("Error: session ended: {message}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = e.recovery_suggestion().hint() {
                eprintln!("Hint: {hint}");
            }
            std::process::exit(1);
        }
    }
}
