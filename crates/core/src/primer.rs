//! One-shot camera permission priming.

use std::sync::Arc;

use camscan_runtime::Logger;
use tracing::debug;

use crate::platform::{HardwareGate, OwnedStream, StreamConstraints, VideoPlatform};

/// Opens and immediately releases any camera so the platform exposes labels.
#[derive(Clone)]
pub struct PermissionPrimer {
	platform: Arc<dyn VideoPlatform>,
	gate: HardwareGate,
	log: Logger,
}

impl PermissionPrimer {
	pub fn new(platform: Arc<dyn VideoPlatform>, gate: HardwareGate, log: Logger) -> Self {
		Self { platform, gate, log }
	}

	/// Returns whether the throwaway capture succeeded. Never fails.
	///
	/// The acquisition runs under the hardware gate, so priming cannot overlap a
	/// session start. A held gate means some stream was already granted, so
	/// priming is skipped instead of waiting for that stream to end.
	pub async fn prime(&self) -> bool {
		let Some(claim) = self.gate.try_claim() else {
			debug!(target = "camscan.primer", "hardware in use, priming skipped");
			self.log.debug("camera already in use, permission priming skipped");
			return true;
		};
		match self.platform.acquire(&StreamConstraints::AnyVideo).await {
			Ok(stream) => {
				let stream = OwnedStream::new(stream, claim);
				let tracks = stream.track_count();
				stream.release().await;
				debug!(target = "camscan.primer", tracks, "permission primed");
				self.log.debug_with("camera permission granted", &serde_json::json!({ "tracks": tracks }));
				true
			}
			Err(err) => {
				self.log.warn_with("camera permission not granted", &err.to_string());
				false
			}
		}
	}
}
