use beltline::cli::{Cli, run_command};
use beltline::logging;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let workspace = args.workspace();

    let log_file = workspace.as_ref().ok().and_then(|w| w.log_file.clone());
    if let Err(e) = logging::init(log_file.as_deref()) {
        eprintln!("Failed to create log file: {e}");
        std::process::exit(1);
    }

    let result = match workspace {
        Ok(workspace) => run_command(args, workspace).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
