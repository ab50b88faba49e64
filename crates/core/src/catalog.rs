//! Video input enumeration.

use std::sync::Arc;

use camscan_runtime::Logger;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ScanError};
use crate::platform::{DeviceKind, RawDevice, VideoPlatform};

/// A video input the user can pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
	device_id: String,
	label: String,
	kind: DeviceKind,
}

impl DeviceDescriptor {
	pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			device_id: device_id.into(),
			label: label.into(),
			kind: DeviceKind::VideoInput,
		}
	}

	pub fn device_id(&self) -> &str {
		&self.device_id
	}

	/// Empty until camera permission has been granted once.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Label, or a stable placeholder when the platform withholds it.
	pub fn display_label(&self, position: usize) -> String {
		if self.label.is_empty() {
			format!("Camera {}", position + 1)
		} else {
			self.label.clone()
		}
	}

	pub fn kind(&self) -> DeviceKind {
		self.kind
	}
}

impl From<RawDevice> for DeviceDescriptor {
	fn from(raw: RawDevice) -> Self {
		Self {
			device_id: raw.id,
			label: raw.label,
			kind: raw.kind,
		}
	}
}

/// Lists video inputs through a [`VideoPlatform`].
#[derive(Clone)]
pub struct DeviceCatalog {
	platform: Arc<dyn VideoPlatform>,
	log: Logger,
}

impl DeviceCatalog {
	pub fn new(platform: Arc<dyn VideoPlatform>, log: Logger) -> Self {
		Self { platform, log }
	}

	/// Video inputs in platform order. Non-video devices are dropped.
	pub async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
		let raw = match self.platform.enumerate_devices().await {
			Ok(raw) => raw,
			Err(err) => {
				self.log.warn_with("device enumeration failed", &err.to_string());
				return Err(ScanError::Enumeration(err));
			}
		};

		let total = raw.len();
		let devices: Vec<DeviceDescriptor> = raw
			.into_iter()
			.filter(|d| d.kind == DeviceKind::VideoInput)
			.map(DeviceDescriptor::from)
			.collect();

		debug!(target = "camscan.catalog", total, video = devices.len(), "enumerated devices");
		self.log.debug_with("enumerated video inputs", &devices);
		Ok(devices)
	}
}
