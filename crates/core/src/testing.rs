//! In-memory platform and decoder doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use camscan_runtime::{ClientIdentity, Delivery, DeliveryError, LogSource, LogTransport, Logger};
use parking_lot::Mutex;

use crate::decoder::{DecodeEngine, DecodeEvents, DecoderConfig, DecoderFactory};
use crate::error::{DecodeError, PlatformError};
use crate::platform::{HardwareStream, RawDevice, StreamConstraints, StreamSink, VideoPlatform};

/// Messages of every record that reached the network path.
#[derive(Clone, Default)]
pub struct SentRecords(Arc<Mutex<Vec<serde_json::Value>>>);

impl SentRecords {
	pub fn messages(&self) -> Vec<String> {
		self.0.lock().iter().filter_map(|r| r["message"].as_str().map(str::to_owned)).collect()
	}

	pub fn components(&self) -> Vec<String> {
		self.0.lock().iter().filter_map(|r| r["component"].as_str().map(str::to_owned)).collect()
	}
}

impl Delivery for SentRecords {
	fn name(&self) -> &'static str {
		"recording"
	}

	fn dispatch(&self, body: &str) -> Result<(), DeliveryError> {
		if let Ok(value) = serde_json::from_str(body) {
			self.0.lock().push(value);
		}
		Ok(())
	}
}

pub fn test_logger() -> (Logger, SentRecords) {
	let sent = SentRecords::default();
	let transport = LogTransport::with_deliveries(ClientIdentity::from_id("client-test"), vec![Box::new(sent.clone())]);
	(Logger::new(transport, LogSource::Client, "Test"), sent)
}

struct PlatformState {
	devices: Result<Vec<RawDevice>, PlatformError>,
	rejected: HashMap<String, PlatformError>,
	acquire_delay: Option<Duration>,
	enumerate_delay: Option<Duration>,
	deny_any_video: bool,
	hide_labels_until_granted: bool,
	granted: bool,
}

/// Platform double that counts open streams.
pub struct FakePlatform {
	state: Mutex<PlatformState>,
	open: Arc<AtomicUsize>,
	max_open: Arc<AtomicUsize>,
	acquisitions: Mutex<Vec<StreamConstraints>>,
}

impl FakePlatform {
	pub fn with_devices(devices: Vec<RawDevice>) -> Self {
		Self {
			state: Mutex::new(PlatformState {
				devices: Ok(devices),
				rejected: HashMap::new(),
				acquire_delay: None,
				enumerate_delay: None,
				deny_any_video: false,
				hide_labels_until_granted: false,
				granted: false,
			}),
			open: Arc::new(AtomicUsize::new(0)),
			max_open: Arc::new(AtomicUsize::new(0)),
			acquisitions: Mutex::new(Vec::new()),
		}
	}

	pub fn cameras(ids: &[&str]) -> Self {
		Self::with_devices(ids.iter().map(|id| RawDevice::video(*id, format!("Camera {id}"))).collect())
	}

	pub fn set_devices(&self, devices: Vec<RawDevice>) {
		self.state.lock().devices = Ok(devices);
	}

	pub fn fail_enumeration(&self, err: PlatformError) {
		self.state.lock().devices = Err(err);
	}

	/// Acquisition of `id` fails with `err`, whether or not it is listed.
	pub fn reject(&self, id: &str, err: PlatformError) {
		self.state.lock().rejected.insert(id.to_string(), err);
	}

	pub fn set_acquire_delay(&self, delay: Duration) {
		self.state.lock().acquire_delay = Some(delay);
	}

	pub fn set_enumerate_delay(&self, delay: Duration) {
		self.state.lock().enumerate_delay = Some(delay);
	}

	pub fn deny_any_video(&self) {
		self.state.lock().deny_any_video = true;
	}

	/// Labels read back empty until some acquisition succeeded.
	pub fn hide_labels_until_granted(&self) {
		self.state.lock().hide_labels_until_granted = true;
	}

	pub fn open_streams(&self) -> usize {
		self.open.load(Ordering::SeqCst)
	}

	pub fn max_open_streams(&self) -> usize {
		self.max_open.load(Ordering::SeqCst)
	}

	pub fn acquisitions(&self) -> Vec<StreamConstraints> {
		self.acquisitions.lock().clone()
	}
}

#[async_trait]
impl VideoPlatform for FakePlatform {
	async fn enumerate_devices(&self) -> Result<Vec<RawDevice>, PlatformError> {
		let delay = self.state.lock().enumerate_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		let state = self.state.lock();
		let mut devices = state.devices.clone()?;
		if state.hide_labels_until_granted && !state.granted {
			for device in &mut devices {
				device.label.clear();
			}
		}
		Ok(devices)
	}

	async fn acquire(&self, constraints: &StreamConstraints) -> Result<Box<dyn HardwareStream>, PlatformError> {
		self.acquisitions.lock().push(constraints.clone());
		let delay = self.state.lock().acquire_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let device_id = {
			let mut state = self.state.lock();
			let device_id = match constraints {
				StreamConstraints::AnyVideo => {
					if state.deny_any_video {
						return Err(PlatformError::PermissionDenied("NotAllowedError".into()));
					}
					state
						.devices
						.as_ref()
						.ok()
						.and_then(|d| d.first())
						.map(|d| d.id.clone())
						.ok_or_else(|| PlatformError::NotFound("no video input".into()))?
				}
				StreamConstraints::Device(id) => {
					if let Some(err) = state.rejected.get(id) {
						return Err(err.clone());
					}
					id.clone()
				}
			};
			state.granted = true;
			device_id
		};

		let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_open.fetch_max(now_open, Ordering::SeqCst);
		Ok(Box::new(FakeStream {
			device_id,
			open: self.open.clone(),
			released: false,
		}))
	}
}

struct FakeStream {
	device_id: String,
	open: Arc<AtomicUsize>,
	released: bool,
}

impl FakeStream {
	fn close(&mut self) {
		if !self.released {
			self.released = true;
			self.open.fetch_sub(1, Ordering::SeqCst);
		}
	}
}

#[async_trait]
impl HardwareStream for FakeStream {
	fn sink(&self) -> StreamSink {
		StreamSink {
			device_id: self.device_id.clone(),
			locator: format!("fake://{}", self.device_id),
		}
	}

	async fn release(mut self: Box<Self>) {
		tokio::task::yield_now().await;
		self.close();
	}
}

impl Drop for FakeStream {
	fn drop(&mut self) {
		self.close();
	}
}

/// Decoder factory that hands tests the event sender of every engine it built.
#[derive(Default)]
pub struct FakeDecoders {
	events: Mutex<Vec<DecodeEvents>>,
	fail_start: Mutex<Option<String>>,
	running: Arc<AtomicUsize>,
}

impl FakeDecoders {
	pub fn fail_start(&self, message: &str) {
		*self.fail_start.lock() = Some(message.to_string());
	}

	pub fn built(&self) -> usize {
		self.events.lock().len()
	}

	/// Sender of the most recently built engine.
	pub fn last_events(&self) -> DecodeEvents {
		match self.events.lock().last() {
			Some(events) => events.clone(),
			None => panic!("no decoder was built"),
		}
	}

	pub fn running(&self) -> usize {
		self.running.load(Ordering::SeqCst)
	}
}

impl DecoderFactory for FakeDecoders {
	fn create(&self, config: DecoderConfig) -> Result<Box<dyn DecodeEngine>, DecodeError> {
		self.events.lock().push(config.events.clone());
		Ok(Box::new(FakeEngine {
			fail_start: self.fail_start.lock().clone(),
			running: self.running.clone(),
			started: false,
		}))
	}
}

struct FakeEngine {
	fail_start: Option<String>,
	running: Arc<AtomicUsize>,
	started: bool,
}

#[async_trait]
impl DecodeEngine for FakeEngine {
	async fn start(&mut self) -> Result<(), DecodeError> {
		if let Some(message) = &self.fail_start {
			return Err(DecodeError::Start(message.clone()));
		}
		self.started = true;
		self.running.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn stop(&mut self) {
		if std::mem::take(&mut self.started) {
			self.running.fetch_sub(1, Ordering::SeqCst);
		}
	}
}

impl Drop for FakeEngine {
	fn drop(&mut self) {
		if self.started {
			self.running.fetch_sub(1, Ordering::SeqCst);
		}
	}
}
