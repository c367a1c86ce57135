use clap::Parser;
use tracing::Level;

use pyproject_release::cli::{orchestration, Cli};
use pyproject_release::ui;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = orchestration::run(cli) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr; stdout is reserved for command output
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}
