//! Error types for the scanner core.

use thiserror::Error;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Failures reported by a [`VideoPlatform`](crate::VideoPlatform).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
	/// The user or the OS refused camera access.
	#[error("camera permission denied: {0}")]
	PermissionDenied(String),

	/// No device matched the requested id.
	#[error("camera not found: {0}")]
	NotFound(String),

	/// The device exists but another owner holds it.
	#[error("camera busy: {0}")]
	Busy(String),

	/// The platform has no camera support at all.
	#[error("camera unavailable: {0}")]
	Unavailable(String),

	#[error("camera platform error: {0}")]
	Other(String),
}

/// Failures reported by a decode engine or its factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	#[error("failed to construct decoder: {0}")]
	Construction(String),

	#[error("failed to start decoder: {0}")]
	Start(String),

	#[error("decoder failed: {0}")]
	Runtime(String),
}

/// Which half of a session start failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartFailure {
	#[error(transparent)]
	Acquire(PlatformError),

	#[error(transparent)]
	Decoder(DecodeError),
}

/// Errors surfaced by [`SessionController`](crate::SessionController).
///
/// All of them leave the controller in a recoverable state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
	/// No explicit, selected, or enumerated device to start on.
	#[error("no camera device available")]
	NoDeviceAvailable,

	/// The platform failed to list devices; the device list was cleared.
	#[error("device enumeration failed: {0}")]
	Enumeration(#[source] PlatformError),

	/// Hardware acquisition or decoder setup failed; the controller is in `Error`.
	#[error("failed to start camera {device_id}: {reason}")]
	StartFailed { device_id: String, reason: StartFailure },

	/// The decode engine reported a failure mid-session.
	#[error("decoding failed on camera {device_id}: {message}")]
	Decode { device_id: String, message: String },

	/// The operation was overtaken by a stop, switch or teardown and its result discarded.
	#[error("operation superseded by a later stop")]
	Cancelled,

	/// The controller has been torn down.
	#[error("scanner has been shut down")]
	TornDown,
}

impl ScanError {
	/// Short text suitable for showing to the person holding the camera.
	pub fn user_message(&self) -> String {
		match self {
			ScanError::NoDeviceAvailable => "No camera found. Connect a camera and refresh the device list.".to_string(),
			ScanError::Enumeration(_) => "Could not list cameras. Try refreshing the device list.".to_string(),
			ScanError::StartFailed { reason, .. } => match reason {
				StartFailure::Acquire(PlatformError::PermissionDenied(_)) => "Camera access was denied. Allow camera access and try again.".to_string(),
				StartFailure::Acquire(PlatformError::NotFound(_)) => "The selected camera is no longer available. Pick another camera.".to_string(),
				StartFailure::Acquire(PlatformError::Busy(_)) => "The camera is in use by another application.".to_string(),
				_ => format!("Could not start the camera: {reason}"),
			},
			ScanError::Decode { message, .. } => format!("Scanning stopped: {message}"),
			ScanError::Cancelled => "Camera start was cancelled.".to_string(),
			ScanError::TornDown => "The scanner has been closed.".to_string(),
		}
	}

	/// True for failures caused by camera permission being refused.
	pub fn is_permission_denied(&self) -> bool {
		matches!(
			self,
			ScanError::Enumeration(PlatformError::PermissionDenied(_))
				| ScanError::StartFailed {
					reason: StartFailure::Acquire(PlatformError::PermissionDenied(_)),
					..
				}
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn permission_denial_is_detected_through_start_failure() {
		let err = ScanError::StartFailed {
			device_id: "cam1".into(),
			reason: StartFailure::Acquire(PlatformError::PermissionDenied("NotAllowedError".into())),
		};
		assert!(err.is_permission_denied());
		assert!(err.user_message().contains("denied"));
		assert!(!ScanError::NoDeviceAvailable.is_permission_denied());
	}

	#[test]
	fn start_failure_display_includes_device_and_cause() {
		let err = ScanError::StartFailed {
			device_id: "cam2".into(),
			reason: StartFailure::Acquire(PlatformError::NotFound("cam2".into())),
		};
		assert_eq!(err.to_string(), "failed to start camera cam2: camera not found: cam2");
	}

	#[test]
	fn start_failure_cause_is_rendered_once() {
		use std::error::Error as _;

		let err = ScanError::StartFailed {
			device_id: "cam2".into(),
			reason: StartFailure::Acquire(PlatformError::NotFound("cam2".into())),
		};
		let mut chain = err.to_string();
		let mut cause = err.source();
		while let Some(inner) = cause {
			chain.push_str(&format!(": {inner}"));
			cause = inner.source();
		}
		assert_eq!(chain.matches("camera not found").count(), 1);
	}
}
