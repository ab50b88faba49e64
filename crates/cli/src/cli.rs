use std::path::PathBuf;

use camscan::ScanMode;
use camscan_runtime::{LogLevel, LogSource};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::styles::cli_styles;

#[cfg(test)]
mod tests;

/// Record severity (CLI wrapper for camscan_runtime::LogLevel)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CliLogLevel {
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl From<CliLogLevel> for LogLevel {
	fn from(level: CliLogLevel) -> Self {
		match level {
			CliLogLevel::Debug => LogLevel::Debug,
			CliLogLevel::Info => LogLevel::Info,
			CliLogLevel::Warn => LogLevel::Warn,
			CliLogLevel::Error => LogLevel::Error,
		}
	}
}

/// Record origin (CLI wrapper for camscan_runtime::LogSource)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CliLogSource {
	/// The application itself
	#[default]
	Client,
	/// The decoder library it drives
	Lib,
}

impl From<CliLogSource> for LogSource {
	fn from(source: CliLogSource) -> Self {
		match source {
			CliLogSource::Client => LogSource::Client,
			CliLogSource::Lib => LogSource::Lib,
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "camscan")]
#[command(about = "Scan barcodes and QR codes from a local camera, mirroring diagnostics to a log sink")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (default: $XDG_CONFIG_HOME/camscan/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Log ingestion endpoint
	#[arg(long, global = true, value_name = "URL")]
	pub log_endpoint: Option<String>,

	/// Screenshot ingestion endpoint
	#[arg(long, global = true, value_name = "URL")]
	pub screenshot_endpoint: Option<String>,

	/// Per-request timeout for sink POSTs, in milliseconds
	#[arg(long, global = true, value_name = "MS")]
	pub timeout_ms: Option<u64>,

	/// Keep diagnostics on the local console only
	#[arg(long, global = true)]
	pub offline: bool,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Prime camera permission and list video inputs
	Devices(DevicesArgs),

	/// Scan codes until interrupted
	Scan(ScanArgs),

	/// Send one record to the log sink
	Log(LogArgs),

	/// Upload an image to the screenshot sink
	Screenshot(ScreenshotArgs),
}

#[derive(Args, Debug, Default)]
pub struct DevicesArgs {
	/// Print the device list as JSON
	#[arg(long)]
	pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct ScanArgs {
	/// Device id to scan with (default: configured, then first listed)
	#[arg(short, long, value_name = "ID")]
	pub device: Option<String>,

	/// Exit after the first decoded code
	#[arg(long)]
	pub once: bool,

	/// Decoder command; `{device}` is replaced by the device node
	#[arg(long, value_name = "CMD")]
	pub decoder: Option<String>,

	/// Print results as JSON lines
	#[arg(long)]
	pub json: bool,
}

#[derive(Args, Debug)]
pub struct LogArgs {
	/// Message text
	pub message: String,

	#[arg(short, long, value_enum, default_value = "info")]
	pub level: CliLogLevel,

	#[arg(short, long, default_value = "Cli")]
	pub component: String,

	/// Record origin (default: configured source)
	#[arg(short, long, value_enum)]
	pub source: Option<CliLogSource>,

	/// Auxiliary JSON payload
	#[arg(short, long, value_name = "JSON")]
	pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScreenshotArgs {
	/// Image file to upload
	pub path: PathBuf,

	/// Free-form note stored with the image
	#[arg(short, long)]
	pub note: Option<String>,

	#[arg(short, long, default_value = "Cli")]
	pub component: String,

	/// Image subtype when the extension does not tell (png, jpeg, webp, ...)
	#[arg(long, value_name = "SUBTYPE")]
	pub image_type: Option<String>,
}

impl ScanArgs {
	/// `--once` forces stop-on-first; otherwise the configured mode applies.
	pub fn mode_override(&self) -> Option<ScanMode> {
		self.once.then_some(ScanMode::StopOnFirst)
	}
}
