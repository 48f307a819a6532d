//! Lectern CLI entry point.

use clap::Parser;

use lectern::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = cli::run(cli).await {
        cli::handle_error(&err);
    }
}
