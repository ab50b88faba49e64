//! Video hardware capability consumed by the scanner.
//!
//! Any platform that can list media devices and open a video stream by device
//! id implements [`VideoPlatform`]. Streams come back as boxed
//! [`HardwareStream`]s; the controller wraps them in an [`OwnedStream`] that
//! also holds the [`HardwareGate`] claim, so the next owner cannot open
//! hardware before the previous release completed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::PlatformError;

/// Kind of media device reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
	VideoInput,
	AudioInput,
	AudioOutput,
	Other,
}

/// Device entry as the platform reports it, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
	pub id: String,
	/// May be empty until camera permission was granted once.
	pub label: String,
	pub kind: DeviceKind,
}

impl RawDevice {
	pub fn video(id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			kind: DeviceKind::VideoInput,
		}
	}
}

/// What to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamConstraints {
	/// Any video input, no audio. Used for permission priming.
	AnyVideo,
	/// Exactly this device id.
	Device(String),
}

/// Where a decode engine reads frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSink {
	pub device_id: String,
	/// Platform-specific address of the open stream (device node, pipeline name, ...).
	pub locator: String,
}

/// An open video stream.
///
/// Implementations must also release their hardware when dropped without
/// [`release`](Self::release), since teardown outside a runtime can only drop.
#[async_trait]
pub trait HardwareStream: Send {
	fn sink(&self) -> StreamSink;

	/// Number of hardware tracks held by this stream.
	fn track_count(&self) -> usize {
		1
	}

	/// Stops every track and gives the hardware back.
	async fn release(self: Box<Self>);
}

/// Device enumeration and stream acquisition.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
	/// Lists every media device the platform knows, in platform order.
	async fn enumerate_devices(&self) -> Result<Vec<RawDevice>, PlatformError>;

	/// Opens a stream matching `constraints`.
	async fn acquire(&self, constraints: &StreamConstraints) -> Result<Box<dyn HardwareStream>, PlatformError>;
}

/// Serializes hardware ownership: one claim, one open stream.
#[derive(Debug, Clone, Default)]
pub struct HardwareGate {
	lock: Arc<Mutex<()>>,
}

impl HardwareGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits until no one else holds the hardware.
	pub async fn claim(&self) -> HardwareClaim {
		HardwareClaim {
			_guard: self.lock.clone().lock_owned().await,
		}
	}

	/// Claims the hardware only if nobody holds it right now.
	pub fn try_claim(&self) -> Option<HardwareClaim> {
		self.lock.clone().try_lock_owned().ok().map(|guard| HardwareClaim { _guard: guard })
	}

	/// True while some stream (or acquisition) holds the gate.
	pub fn is_claimed(&self) -> bool {
		self.lock.try_lock().is_err()
	}
}

/// Exclusive right to open hardware; released on drop.
#[derive(Debug)]
pub struct HardwareClaim {
	_guard: OwnedMutexGuard<()>,
}

/// A stream together with the gate claim it was opened under.
pub struct OwnedStream {
	stream: Box<dyn HardwareStream>,
	claim: HardwareClaim,
}

impl OwnedStream {
	pub fn new(stream: Box<dyn HardwareStream>, claim: HardwareClaim) -> Self {
		Self { stream, claim }
	}

	pub fn sink(&self) -> StreamSink {
		self.stream.sink()
	}

	pub fn track_count(&self) -> usize {
		self.stream.track_count()
	}

	/// Releases the hardware, then the gate claim.
	pub async fn release(self) {
		let Self { stream, claim } = self;
		stream.release().await;
		drop(claim);
	}
}
