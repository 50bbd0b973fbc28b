use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use mosaic_cli::{execute, AppContext, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let context = match AppContext::load(&cli.config) {
        Ok(context) => context,
        Err(error) => {
            eprintln!("{} {}", style("error:").red().bold(), error);
            std::process::exit(1);
        }
    };

    if let Err(error) = execute(cli.command, &context).await {
        eprintln!("{} {}", style("error:").red().bold(), error);
        std::process::exit(1);
    }
}
