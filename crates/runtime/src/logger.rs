//! Component-bound front end for [`LogTransport`].

use std::sync::Arc;

use camscan_protocol::{LogLevel, LogSource};
use serde::Serialize;

use crate::transport::LogTransport;

/// Emits records for one component through a shared transport.
#[derive(Clone)]
pub struct Logger {
	transport: LogTransport,
	source: LogSource,
	component: Arc<str>,
}

impl Logger {
	pub fn new(transport: LogTransport, source: LogSource, component: impl Into<Arc<str>>) -> Self {
		Self {
			transport,
			source,
			component: component.into(),
		}
	}

	/// Same transport and source, different component.
	pub fn for_component(&self, component: impl Into<Arc<str>>) -> Self {
		Self {
			transport: self.transport.clone(),
			source: self.source,
			component: component.into(),
		}
	}

	/// Same transport and component, different source.
	pub fn with_source(&self, source: LogSource) -> Self {
		Self {
			transport: self.transport.clone(),
			source,
			component: self.component.clone(),
		}
	}

	pub fn component(&self) -> &str {
		&self.component
	}

	pub fn source(&self) -> LogSource {
		self.source
	}

	pub fn transport(&self) -> &LogTransport {
		&self.transport
	}

	pub fn log(&self, level: LogLevel, message: impl Into<String>) {
		self.transport.emit(self.transport.record(self.source, level, &*self.component, message));
	}

	pub fn log_with<T: Serialize + ?Sized>(&self, level: LogLevel, message: impl Into<String>, data: &T) {
		self.transport
			.emit(self.transport.record(self.source, level, &*self.component, message).with_data(data));
	}

	pub fn debug(&self, message: impl Into<String>) {
		self.log(LogLevel::Debug, message);
	}

	pub fn info(&self, message: impl Into<String>) {
		self.log(LogLevel::Info, message);
	}

	pub fn warn(&self, message: impl Into<String>) {
		self.log(LogLevel::Warn, message);
	}

	pub fn error(&self, message: impl Into<String>) {
		self.log(LogLevel::Error, message);
	}

	pub fn debug_with<T: Serialize + ?Sized>(&self, message: impl Into<String>, data: &T) {
		self.log_with(LogLevel::Debug, message, data);
	}

	pub fn info_with<T: Serialize + ?Sized>(&self, message: impl Into<String>, data: &T) {
		self.log_with(LogLevel::Info, message, data);
	}

	pub fn warn_with<T: Serialize + ?Sized>(&self, message: impl Into<String>, data: &T) {
		self.log_with(LogLevel::Warn, message, data);
	}

	pub fn error_with<T: Serialize + ?Sized>(&self, message: impl Into<String>, data: &T) {
		self.log_with(LogLevel::Error, message, data);
	}
}
