use std::path::PathBuf;

use camscan::ScanError;
use camscan_protocol::DataUrlError;
use camscan_runtime::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid config file {path}: {source}")]
	Config {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("config file not found: {0}")]
	ConfigMissing(PathBuf),

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error(transparent)]
	Scan(#[from] ScanError),

	#[error(transparent)]
	Transport(#[from] TransportError),

	#[error(transparent)]
	Image(#[from] DataUrlError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Text printed to stderr before exiting.
	pub fn user_message(&self) -> String {
		match self {
			CliError::Scan(err) => err.user_message(),
			CliError::Anyhow(err) => format!("{err:#}"),
			other => other.to_string(),
		}
	}
}
