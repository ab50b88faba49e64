//! Log ingestion endpoint contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client id the sink records when a request carries none.
pub const UNKNOWN_CLIENT: &str = "UNKNOWN";
/// Source/component name the sink records when a request carries none.
pub const UNKNOWN_ORIGIN: &str = "Unknown";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl LogLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			LogLevel::Debug => "DEBUG",
			LogLevel::Info => "INFO",
			LogLevel::Warn => "WARN",
			LogLevel::Error => "ERROR",
		}
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Which side of the client produced a record.
///
/// `Client` records come from the application itself, `Lib` records from the
/// decode engine it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogSource {
	Client,
	Lib,
}

impl LogSource {
	pub fn as_str(self) -> &'static str {
		match self {
			LogSource::Client => "Client",
			LogSource::Lib => "Lib",
		}
	}
}

impl fmt::Display for LogSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Body of a POST to the log ingestion endpoint.
///
/// `source` stays a free-form string on the wire: the sink accepts any value and
/// substitutes [`UNKNOWN_ORIGIN`] when it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
	#[serde(default = "default_client")]
	pub client_id: String,
	#[serde(default = "default_origin")]
	pub source: String,
	#[serde(default)]
	pub level: LogLevel,
	#[serde(default = "default_origin")]
	pub component: String,
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data_string: Option<String>,
}

fn default_client() -> String {
	UNKNOWN_CLIENT.to_string()
}

fn default_origin() -> String {
	UNKNOWN_ORIGIN.to_string()
}

/// Response of the log ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LogResponse {
	/// The record was accepted.
	Logged,
	/// The body was not valid JSON; returned with a client-error status.
	Error { message: String },
}
