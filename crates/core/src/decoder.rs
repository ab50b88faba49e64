//! Decode engine capability.
//!
//! The controller never looks at frames. It hands a [`StreamSink`] to a
//! [`DecoderFactory`], starts the engine it gets back and listens on the
//! [`DecodeEvents`] channel for results and failures.

use async_trait::async_trait;
use camscan_runtime::Logger;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::DecodeError;
use crate::platform::StreamSink;

/// Whether a session keeps scanning after the first result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
	#[default]
	Continuous,
	StopOnFirst,
}

/// One decoded code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
	pub text: String,
	/// Symbology reported by the engine, when it reports one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub format: Option<String>,
}

impl DecodeResult {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			format: None,
		}
	}

	pub fn with_format(mut self, format: impl Into<String>) -> Self {
		self.format = Some(format.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
	Decoded(DecodeResult),
	Failed(String),
}

/// Sending half handed to a decode engine.
#[derive(Debug, Clone)]
pub struct DecodeEvents {
	tx: mpsc::UnboundedSender<DecodeEvent>,
}

impl DecodeEvents {
	/// A sender and the receiver the controller (or a test) reads from.
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<DecodeEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	/// Reports a decoded code. Returns false once the session is gone.
	pub fn decoded(&self, result: DecodeResult) -> bool {
		self.tx.send(DecodeEvent::Decoded(result)).is_ok()
	}

	/// Reports an engine failure. The controller ends the session on the first one.
	pub fn failed(&self, message: impl Into<String>) -> bool {
		self.tx.send(DecodeEvent::Failed(message.into())).is_ok()
	}

	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Everything an engine needs to bind to one open stream.
#[derive(Clone)]
pub struct DecoderConfig {
	pub sink: StreamSink,
	pub device_id: String,
	pub events: DecodeEvents,
	pub mode: ScanMode,
	pub logger: Logger,
}

/// A running (or startable) decoder bound to one stream.
#[async_trait]
pub trait DecodeEngine: Send {
	async fn start(&mut self) -> Result<(), DecodeError>;

	/// Must be safe to call on an engine that never started or already stopped.
	async fn stop(&mut self);
}

pub trait DecoderFactory: Send + Sync {
	fn create(&self, config: DecoderConfig) -> Result<Box<dyn DecodeEngine>, DecodeError>;
}
