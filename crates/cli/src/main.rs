mod cli;
mod commands;
mod config;
mod decoder;
mod error;
mod logging;
mod styles;
mod v4l2;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		tracing::debug!(target = "camscan.cli", error = ?err, "command failed");
		eprintln!("error: {}", err.user_message());
		std::process::exit(1);
	}
}
