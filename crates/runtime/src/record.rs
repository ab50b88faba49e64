//! Immutable log records.

use camscan_protocol::{LogLevel, LogRequest, LogSource};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::identity::ClientIdentity;

/// Sent in place of auxiliary data that cannot be serialized.
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "[unserializable data]";

/// One structured event bound for the sink.
///
/// Fields are private: a record is fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
	timestamp: DateTime<Utc>,
	client_id: ClientIdentity,
	source: LogSource,
	level: LogLevel,
	component: String,
	message: String,
	data_string: Option<String>,
}

impl LogRecord {
	/// Builds a record stamped with the current time.
	pub fn new(client_id: ClientIdentity, source: LogSource, level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			timestamp: Utc::now(),
			client_id,
			source,
			level,
			component: component.into(),
			message: message.into(),
			data_string: None,
		}
	}

	/// Attaches auxiliary data, serialized to JSON.
	///
	/// Data that fails to serialize is replaced by [`UNSERIALIZABLE_PLACEHOLDER`].
	pub fn with_data<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
		self.data_string = Some(serialize_data(data));
		self
	}

	pub fn timestamp(&self) -> DateTime<Utc> {
		self.timestamp
	}

	pub fn client_id(&self) -> &ClientIdentity {
		&self.client_id
	}

	pub fn source(&self) -> LogSource {
		self.source
	}

	pub fn level(&self) -> LogLevel {
		self.level
	}

	pub fn component(&self) -> &str {
		&self.component
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn data_string(&self) -> Option<&str> {
		self.data_string.as_deref()
	}

	/// Single-line console rendering.
	pub fn render(&self) -> String {
		let mut line = format!(
			"{} [{}] [{}] {} {}: {}",
			self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
			self.client_id,
			self.source,
			self.level,
			self.component,
			self.message
		);
		if let Some(data) = &self.data_string {
			line.push_str(" | ");
			line.push_str(data);
		}
		line
	}

	/// Wire body for the log ingestion endpoint.
	pub fn to_request(&self) -> LogRequest {
		LogRequest {
			client_id: self.client_id.to_string(),
			source: self.source.to_string(),
			level: self.level,
			component: self.component.clone(),
			message: self.message.clone(),
			data_string: self.data_string.clone(),
		}
	}
}

fn serialize_data<T: Serialize + ?Sized>(data: &T) -> String {
	serde_json::to_string(data).unwrap_or_else(|_| UNSERIALIZABLE_PLACEHOLDER.to_string())
}
