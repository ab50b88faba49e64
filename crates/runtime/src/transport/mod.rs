//! Log transport: console first, then best-effort network delivery.

use std::sync::Arc;
use std::time::Duration;

use camscan_protocol::{ImageDataUrl, LogLevel, LogSource, ScreenshotRequest, ScreenshotResponse};
use tracing::{debug, error, info, warn};

use crate::delivery::{BeaconDelivery, Delivery, DeliveryChain, InFlight, KeepaliveDelivery};
use crate::error::{Result, TransportError};
use crate::identity::ClientIdentity;
use crate::record::LogRecord;


/// Default log ingestion endpoint of the local development sink.
pub const DEFAULT_LOG_ENDPOINT: &str = "http://127.0.0.1:3000/log";
/// Default screenshot ingestion endpoint of the local development sink.
pub const DEFAULT_SCREENSHOT_ENDPOINT: &str = "http://127.0.0.1:3000/upload-screenshot";

/// Network settings for [`LogTransport::new`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
	pub log_endpoint: String,
	pub screenshot_endpoint: String,
	/// Per-request timeout for every POST.
	pub request_timeout: Duration,
	/// Number of beacons that may wait for the drain task before falling back.
	pub beacon_capacity: usize,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			log_endpoint: DEFAULT_LOG_ENDPOINT.to_string(),
			screenshot_endpoint: DEFAULT_SCREENSHOT_ENDPOINT.to_string(),
			request_timeout: Duration::from_secs(5),
			beacon_capacity: 256,
		}
	}
}

/// A screenshot bound for the screenshot ingestion endpoint.
#[derive(Debug, Clone)]
pub struct ScreenshotUpload {
	pub source: LogSource,
	pub component: String,
	pub note: Option<String>,
	pub image: ImageDataUrl,
}

/// Cross-cutting diagnostic transport.
///
/// Cheap to clone; clones share the identity, the delivery chain and the
/// in-flight tracker.
#[derive(Clone)]
pub struct LogTransport {
	inner: Arc<TransportInner>,
}

struct TransportInner {
	identity: ClientIdentity,
	chain: DeliveryChain,
	in_flight: InFlight,
	uploads: Option<UploadTarget>,
}

struct UploadTarget {
	client: reqwest::Client,
	url: String,
}

impl LogTransport {
	/// Builds a transport delivering to the configured sink.
	///
	/// Beacon delivery needs a running Tokio runtime; built outside one the
	/// chain degrades to console-only output for every record.
	pub fn new(identity: ClientIdentity, config: TransportConfig) -> Result<Self> {
		let client = reqwest::Client::builder().timeout(config.request_timeout).build().map_err(TransportError::Client)?;
		let in_flight = InFlight::new();
		let beacon = BeaconDelivery::new(
			client.clone(),
			config.log_endpoint.clone(),
			config.request_timeout,
			config.beacon_capacity,
			in_flight.clone(),
		);
		let keepalive = KeepaliveDelivery::new(client.clone(), config.log_endpoint.clone(), config.request_timeout, in_flight.clone());
		debug!(target = "camscan.transport", endpoint = %config.log_endpoint, client_id = %identity, "log transport ready");
		Ok(Self {
			inner: Arc::new(TransportInner {
				identity,
				chain: DeliveryChain::new(vec![Box::new(beacon), Box::new(keepalive)]),
				in_flight,
				uploads: Some(UploadTarget {
					client,
					url: config.screenshot_endpoint,
				}),
			}),
		})
	}

	/// Builds a transport that only writes to the local console.
	pub fn local_only(identity: ClientIdentity) -> Self {
		Self::with_deliveries(identity, Vec::new())
	}

	/// Builds a transport over caller-supplied delivery strategies.
	///
	/// Screenshot uploads are disabled on such a transport.
	pub fn with_deliveries(identity: ClientIdentity, strategies: Vec<Box<dyn Delivery>>) -> Self {
		Self {
			inner: Arc::new(TransportInner {
				identity,
				chain: DeliveryChain::new(strategies),
				in_flight: InFlight::new(),
				uploads: None,
			}),
		}
	}

	pub fn identity(&self) -> &ClientIdentity {
		&self.inner.identity
	}

	/// Starts a record stamped with this transport's identity.
	pub fn record(&self, source: LogSource, level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> LogRecord {
		LogRecord::new(self.inner.identity.clone(), source, level, component, message)
	}

	/// Writes `record` to the console, then hands it to the delivery chain.
	///
	/// Never fails and never waits on the network.
	pub fn emit(&self, record: LogRecord) {
		write_console(&record);

		if self.inner.chain.is_empty() {
			return;
		}
		let body = match serde_json::to_string(&record.to_request()) {
			Ok(body) => body,
			Err(err) => {
				warn!(target = "camscan.transport", error = %err, "failed to encode log record; dropping it");
				return;
			}
		};
		self.inner.chain.dispatch(&body);
	}

	/// Number of deliveries handed off but not finished.
	pub fn pending(&self) -> usize {
		self.inner.in_flight.count()
	}

	/// Waits, bounded by `timeout`, for queued and in-flight deliveries.
	///
	/// Returns `false` if some were still outstanding at the deadline; those
	/// may still complete or be lost.
	pub async fn flush(&self, timeout: Duration) -> bool {
		let drained = self.inner.in_flight.wait_idle(timeout).await;
		if !drained {
			warn!(target = "camscan.transport", pending = self.pending(), "log deliveries still pending at flush deadline");
		}
		drained
	}

	/// Uploads a screenshot and returns the sink's answer.
	pub async fn upload_screenshot(&self, upload: ScreenshotUpload) -> Result<ScreenshotResponse> {
		let target = self.inner.uploads.as_ref().ok_or(TransportError::Disabled)?;
		let component = upload.component.clone();
		let request = ScreenshotRequest {
			client_id: self.inner.identity.to_string(),
			source: upload.source.to_string(),
			component: upload.component,
			note: upload.note,
			data_url: upload.image,
		};

		let response = target
			.client
			.post(&target.url)
			.json(&request)
			.send()
			.await
			.map_err(|source| TransportError::Request {
				url: target.url.clone(),
				source,
			})?;
		let status = response.status();
		let text = response.text().await.map_err(|source| TransportError::Request {
			url: target.url.clone(),
			source,
		})?;

		if !status.is_success() {
			let message = serde_json::from_str::<ScreenshotResponse>(&text).ok().and_then(|r| r.message).unwrap_or(text);
			return Err(TransportError::Rejected {
				status: status.as_u16(),
				message,
			});
		}

		let parsed: ScreenshotResponse = serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
		self.emit(
			self.record(upload.source, LogLevel::Info, component, "screenshot uploaded")
				.with_data(&serde_json::json!({ "filename": parsed.filename })),
		);
		Ok(parsed)
	}
}

fn write_console(record: &LogRecord) {
	let line = record.render();
	match record.level() {
		LogLevel::Debug => debug!(target = "camscan.console", "{line}"),
		LogLevel::Info => info!(target = "camscan.console", "{line}"),
		LogLevel::Warn => warn!(target = "camscan.console", "{line}"),
		LogLevel::Error => error!(target = "camscan.console", "{line}"),
	}
}
