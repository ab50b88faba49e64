//! Camera session state machine.
//!
//! [`SessionController`] owns at most one [`SessionHandle`] (open stream plus
//! decode engine). Every operation that suspends captures the controller
//! epoch before it awaits and compares it on resumption; `stop`, `teardown`,
//! `reset` and decode failures bump the epoch, so a slow acquisition that
//! finishes after any of them releases its stream instead of resurrecting a
//! session.
//!
//! Device refreshes are only discarded by an explicit stop or teardown, which
//! bump a separate stop counter; a start overlapping a refresh does not
//! invalidate the enumeration.
//!
//! Hardware ownership is additionally serialized by a [`HardwareGate`]: a new
//! start waits until the previous stream finished releasing.

mod handle;


use std::sync::{Arc, Weak};

use camscan_runtime::{LogSource, Logger};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use self::handle::SessionHandle;
use crate::catalog::{DeviceCatalog, DeviceDescriptor};
use crate::decoder::{DecodeEvent, DecodeEvents, DecodeResult, DecoderConfig, DecoderFactory, ScanMode};
use crate::error::{Result, ScanError, StartFailure};
use crate::platform::{HardwareGate, OwnedStream, StreamConstraints, VideoPlatform};
use crate::primer::PermissionPrimer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
	#[default]
	Idle,
	Starting,
	Active,
	Stopping,
	Error,
}

impl SessionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionStatus::Idle => "idle",
			SessionStatus::Starting => "starting",
			SessionStatus::Active => "active",
			SessionStatus::Stopping => "stopping",
			SessionStatus::Error => "error",
		}
	}
}

impl std::fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Notifications delivered on the controller's event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
	StateChanged(SessionStatus),
	DevicesChanged(Vec<DeviceDescriptor>),
	Decoded { device_id: String, result: DecodeResult },
	Error(ScanError),
}

#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
	pub mode: ScanMode,
	/// Start once, automatically, after the first refresh that finds a camera.
	pub auto_start: bool,
	/// Selected before the first refresh; refreshes never override it.
	pub preferred_device: Option<String>,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
	pub status: SessionStatus,
	pub devices: Vec<DeviceDescriptor>,
	pub selected_device: Option<String>,
	pub active_device: Option<String>,
	#[serde(skip)]
	pub last_error: Option<ScanError>,
	pub auto_start_attempted: bool,
}

struct ControllerState {
	status: SessionStatus,
	devices: Vec<DeviceDescriptor>,
	selected: Option<String>,
	session: Option<SessionHandle>,
	epoch: u64,
	stops: u64,
	auto_started: bool,
	torn_down: bool,
	last_error: Option<ScanError>,
}

struct Shared {
	platform: Arc<dyn VideoPlatform>,
	decoders: Arc<dyn DecoderFactory>,
	catalog: DeviceCatalog,
	primer: PermissionPrimer,
	gate: HardwareGate,
	config: ControllerConfig,
	log: Logger,
	decoder_log: Logger,
	events: mpsc::UnboundedSender<ScanEvent>,
	state: Mutex<ControllerState>,
}

/// Sequences device enumeration, permission priming and session start/stop.
///
/// Cheap to clone; all clones drive the same controller. Dropping the last
/// clone tears the controller down and releases any open stream.
#[derive(Clone)]
pub struct SessionController {
	shared: Arc<Shared>,
}

impl SessionController {
	/// Creates an idle controller and the receiving end of its event stream.
	pub fn new(
		platform: Arc<dyn VideoPlatform>,
		decoders: Arc<dyn DecoderFactory>,
		logger: Logger,
		config: ControllerConfig,
	) -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
		let (events, rx) = mpsc::unbounded_channel();
		let gate = HardwareGate::new();
		let shared = Shared {
			catalog: DeviceCatalog::new(platform.clone(), logger.for_component("DeviceCatalog")),
			primer: PermissionPrimer::new(platform.clone(), gate.clone(), logger.for_component("PermissionPrimer")),
			platform,
			decoders,
			gate,
			log: logger.for_component("CameraSession").with_source(LogSource::Client),
			decoder_log: logger.for_component("Decoder").with_source(LogSource::Lib),
			events,
			state: Mutex::new(ControllerState {
				status: SessionStatus::Idle,
				devices: Vec::new(),
				selected: config.preferred_device.clone(),
				session: None,
				epoch: 0,
				stops: 0,
				auto_started: false,
				torn_down: false,
				last_error: None,
			}),
			config,
		};
		(Self { shared: Arc::new(shared) }, rx)
	}

	pub fn status(&self) -> SessionStatus {
		self.shared.state.lock().status
	}

	pub fn snapshot(&self) -> ControllerSnapshot {
		let state = self.shared.state.lock();
		ControllerSnapshot {
			status: state.status,
			devices: state.devices.clone(),
			selected_device: state.selected.clone(),
			active_device: state.session.as_ref().map(|s| s.device_id().to_string()),
			last_error: state.last_error.clone(),
			auto_start_attempted: state.auto_started,
		}
	}

	pub fn devices(&self) -> Vec<DeviceDescriptor> {
		self.shared.state.lock().devices.clone()
	}

	pub fn selected_device(&self) -> Option<String> {
		self.shared.state.lock().selected.clone()
	}

	/// Records the selection without starting anything.
	pub fn select_device(&self, device_id: impl Into<String>) {
		let device_id = device_id.into();
		self.shared.log.debug_with("device selected", &json!({ "deviceId": device_id }));
		self.shared.state.lock().selected = Some(device_id);
	}

	/// Mount flow: prime permissions so labels become readable, then refresh.
	pub async fn initialize(&self) -> Result<()> {
		if self.shared.state.lock().torn_down {
			return Err(ScanError::TornDown);
		}
		self.shared.log.info("initializing camera session");
		let primed = self.shared.primer.prime().await;
		if self.shared.state.lock().torn_down {
			return Err(ScanError::TornDown);
		}
		if !primed {
			self.shared.log.warn("continuing without camera permission, labels may be empty");
		}
		self.refresh_devices().await
	}

	/// Re-enumerates devices and applies the auto-start policy.
	///
	/// A refresh overtaken by a stop is discarded with [`ScanError::Cancelled`].
	pub async fn refresh_devices(&self) -> Result<()> {
		let stops = {
			let state = self.shared.state.lock();
			if state.torn_down {
				return Err(ScanError::TornDown);
			}
			state.stops
		};

		let listed = self.shared.catalog.list_devices().await;

		{
			let mut state = self.shared.state.lock();
			if state.torn_down {
				return Err(ScanError::TornDown);
			}
			if state.stops != stops {
				debug!(target = "camscan.session", "discarding device refresh overtaken by stop");
				return Err(ScanError::Cancelled);
			}
			match listed {
				Ok(devices) => {
					if state.selected.is_none() {
						state.selected = devices.first().map(|d| d.device_id().to_string());
					}
					if state.devices != devices {
						state.devices = devices.clone();
						self.shared.emit(ScanEvent::DevicesChanged(devices));
					}
				}
				Err(err) => {
					if !state.devices.is_empty() {
						state.devices.clear();
						self.shared.emit(ScanEvent::DevicesChanged(Vec::new()));
					}
					state.last_error = Some(err.clone());
					self.shared.emit(ScanEvent::Error(err.clone()));
					return Err(err);
				}
			}
		}

		self.maybe_auto_start().await;
		Ok(())
	}

	async fn maybe_auto_start(&self) {
		let target = {
			let mut state = self.shared.state.lock();
			if !self.shared.config.auto_start || state.auto_started || state.torn_down || state.devices.is_empty() {
				return;
			}
			state.auto_started = true;
			if !matches!(state.status, SessionStatus::Idle | SessionStatus::Error) {
				debug!(target = "camscan.session", status = %state.status, "session already running, auto-start skipped");
				return;
			}
			state
				.selected
				.clone()
				.or_else(|| state.devices.first().map(|d| d.device_id().to_string()))
		};

		self.shared.log.info_with("auto-starting camera", &json!({ "deviceId": target }));
		if let Err(err) = self.start(target.as_deref()).await {
			debug!(target = "camscan.session", error = %err, "auto-start did not produce a session");
		}
	}

	/// Starts a session on `device_id`, the selected device, or the first listed one.
	///
	/// A no-op while a session is starting or active. The device id is not
	/// checked against the catalog; the platform decides.
	pub async fn start(&self, device_id: Option<&str>) -> Result<()> {
		let shared = &self.shared;
		let (epoch, stops, device_id) = {
			let mut state = shared.state.lock();
			if state.torn_down {
				return Err(ScanError::TornDown);
			}
			if matches!(state.status, SessionStatus::Starting | SessionStatus::Active) {
				shared.log.warn_with("start ignored, session already running", &json!({ "status": state.status }));
				return Ok(());
			}
			let resolved = device_id
				.map(str::to_owned)
				.or_else(|| state.selected.clone())
				.or_else(|| state.devices.first().map(|d| d.device_id().to_string()));
			let Some(device_id) = resolved else {
				shared.log.error("no camera device available");
				state.last_error = Some(ScanError::NoDeviceAvailable);
				shared.emit(ScanEvent::Error(ScanError::NoDeviceAvailable));
				return Err(ScanError::NoDeviceAvailable);
			};
			state.selected = Some(device_id.clone());
			state.epoch += 1;
			state.last_error = None;
			shared.set_status(&mut state, SessionStatus::Starting);
			(state.epoch, state.stops, device_id)
		};
		shared.log.info_with("starting camera", &json!({ "deviceId": device_id }));

		let claim = shared.gate.claim().await;
		if !shared.is_current(epoch) {
			debug!(target = "camscan.session", device = %device_id, "start overtaken while waiting for hardware");
			return Err(ScanError::Cancelled);
		}

		let stream = match shared.platform.acquire(&StreamConstraints::Device(device_id.clone())).await {
			Ok(stream) => OwnedStream::new(stream, claim),
			Err(err) => return Err(shared.fail_start(epoch, &device_id, StartFailure::Acquire(err))),
		};
		if !shared.is_current(epoch) {
			shared.log.warn_with("camera acquired after stop, releasing", &json!({ "deviceId": device_id }));
			stream.release().await;
			return Err(ScanError::Cancelled);
		}

		let (events, rx) = DecodeEvents::channel();
		let decoder_config = DecoderConfig {
			sink: stream.sink(),
			device_id: device_id.clone(),
			events,
			mode: shared.config.mode,
			logger: shared.decoder_log.clone(),
		};
		let mut engine = match shared.decoders.create(decoder_config) {
			Ok(engine) => engine,
			Err(err) => {
				stream.release().await;
				return Err(shared.fail_start(epoch, &device_id, StartFailure::Decoder(err)));
			}
		};
		if let Err(err) = engine.start().await {
			engine.stop().await;
			stream.release().await;
			return Err(shared.fail_start(epoch, &device_id, StartFailure::Decoder(err)));
		}

		let handle = SessionHandle::new(device_id.clone(), epoch, stream, engine);
		let rejected = {
			let mut state = shared.state.lock();
			if state.epoch != epoch || state.torn_down {
				Some(handle)
			} else {
				state.session = Some(handle);
				shared.set_status(&mut state, SessionStatus::Active);
				None
			}
		};
		if let Some(handle) = rejected {
			shared.log.warn_with("session started after stop, disposing", &json!({ "deviceId": device_id }));
			handle.dispose().await;
			return Err(ScanError::Cancelled);
		}

		tokio::spawn(pump_decode_events(Arc::downgrade(shared), epoch, device_id.clone(), rx));
		shared.log.info_with("camera started", &json!({ "deviceId": device_id, "mode": shared.config.mode }));

		self.refresh_labels(stops).await;
		Ok(())
	}

	/// Labels are often only readable once a stream was granted.
	async fn refresh_labels(&self, stops: u64) {
		let listed = self.shared.catalog.list_devices().await;
		let mut state = self.shared.state.lock();
		if state.stops != stops || state.torn_down {
			return;
		}
		match listed {
			Ok(devices) if devices != state.devices => {
				state.devices = devices.clone();
				self.shared.emit(ScanEvent::DevicesChanged(devices));
			}
			Ok(_) => {}
			Err(err) => debug!(target = "camscan.session", error = %err, "label refresh failed"),
		}
	}

	/// Ends the current session. Hardware release is initiated before this
	/// returns and may complete afterwards; the next start waits for it.
	pub fn stop(&self) {
		let handle = {
			let mut state = self.shared.state.lock();
			self.shared.stop_locked(&mut state)
		};
		if let Some(handle) = handle {
			spawn_dispose(handle);
		}
	}

	/// Stops the running session, if any, and starts on `device_id`.
	pub async fn switch_device(&self, device_id: &str) -> Result<()> {
		let running = matches!(self.status(), SessionStatus::Active | SessionStatus::Starting);
		self.shared.log.info_with("switching camera", &json!({ "deviceId": device_id, "running": running }));
		if running {
			self.stop();
		}
		self.start(Some(device_id)).await
	}

	/// Stops, clears the last error and re-arms auto-start.
	pub fn reset(&self) {
		self.stop();
		let mut state = self.shared.state.lock();
		state.auto_started = false;
		state.last_error = None;
		if state.status == SessionStatus::Error {
			self.shared.set_status(&mut state, SessionStatus::Idle);
		}
	}

	/// Marks the controller dead and stops. Later operations return
	/// [`ScanError::TornDown`].
	pub fn teardown(&self) {
		let handle = self.shared.teardown_locked(&mut self.shared.state.lock());
		if let Some(handle) = handle {
			spawn_dispose(handle);
		}
	}

	pub fn is_torn_down(&self) -> bool {
		self.shared.state.lock().torn_down
	}
}

impl Shared {
	fn emit(&self, event: ScanEvent) {
		let _ = self.events.send(event);
	}

	fn is_current(&self, epoch: u64) -> bool {
		let state = self.state.lock();
		state.epoch == epoch && !state.torn_down
	}

	fn set_status(&self, state: &mut ControllerState, status: SessionStatus) {
		if state.status != status {
			debug!(target = "camscan.session", from = %state.status, to = %status, "status changed");
			state.status = status;
			self.emit(ScanEvent::StateChanged(status));
		}
	}

	fn fail_start(&self, epoch: u64, device_id: &str, reason: StartFailure) -> ScanError {
		let mut state = self.state.lock();
		if state.epoch != epoch || state.torn_down {
			debug!(target = "camscan.session", device = %device_id, error = %reason, "discarding failure of overtaken start");
			return ScanError::Cancelled;
		}
		let err = ScanError::StartFailed {
			device_id: device_id.to_string(),
			reason,
		};
		self.log.error_with("camera start failed", &json!({ "deviceId": device_id, "error": err.to_string() }));
		state.last_error = Some(err.clone());
		self.set_status(&mut state, SessionStatus::Error);
		self.emit(ScanEvent::Error(err.clone()));
		err
	}

	fn stop_locked(&self, state: &mut ControllerState) -> Option<SessionHandle> {
		if state.status == SessionStatus::Idle && state.session.is_none() {
			return None;
		}
		state.epoch += 1;
		state.stops += 1;
		let handle = state.session.take();
		self.set_status(state, SessionStatus::Stopping);
		self.log.info_with(
			"camera stopped",
			&json!({ "deviceId": handle.as_ref().map(|h| h.device_id().to_string()) }),
		);
		self.set_status(state, SessionStatus::Idle);
		handle
	}

	fn teardown_locked(&self, state: &mut ControllerState) -> Option<SessionHandle> {
		if state.torn_down {
			return None;
		}
		let handle = self.stop_locked(state);
		state.torn_down = true;
		state.epoch += 1;
		state.stops += 1;
		self.log.info("camera session torn down");
		handle
	}

	/// Applies one decode event. Returns false once the session is over.
	fn on_decode_event(&self, epoch: u64, device_id: &str, event: DecodeEvent) -> bool {
		let mut state = self.state.lock();
		if state.epoch != epoch || state.torn_down || state.status != SessionStatus::Active {
			return false;
		}
		match event {
			DecodeEvent::Decoded(result) => {
				self.decoder_log.info_with("code decoded", &result);
				self.emit(ScanEvent::Decoded {
					device_id: device_id.to_string(),
					result,
				});
				if self.config.mode == ScanMode::StopOnFirst {
					if let Some(handle) = self.stop_locked(&mut state) {
						drop(state);
						spawn_dispose(handle);
					}
					return false;
				}
				true
			}
			DecodeEvent::Failed(message) => {
				state.epoch += 1;
				let handle = state.session.take();
				let err = ScanError::Decode {
					device_id: device_id.to_string(),
					message,
				};
				self.decoder_log.error_with("decoder failed", &err.to_string());
				state.last_error = Some(err.clone());
				self.set_status(&mut state, SessionStatus::Error);
				self.emit(ScanEvent::Error(err));
				drop(state);
				if let Some(handle) = handle {
					spawn_dispose(handle);
				}
				false
			}
		}
	}
}

impl Drop for Shared {
	fn drop(&mut self) {
		let handle = {
			let state = self.state.get_mut();
			if state.torn_down {
				None
			} else {
				state.torn_down = true;
				state.epoch += 1;
				state.stops += 1;
				state.session.take()
			}
		};
		if let Some(handle) = handle {
			spawn_dispose(handle);
		}
	}
}

async fn pump_decode_events(shared: Weak<Shared>, epoch: u64, device_id: String, mut rx: mpsc::UnboundedReceiver<DecodeEvent>) {
	while let Some(event) = rx.recv().await {
		let Some(shared) = shared.upgrade() else {
			break;
		};
		if !shared.on_decode_event(epoch, &device_id, event) {
			break;
		}
	}
	debug!(target = "camscan.session", device = %device_id, epoch, "decode event pump finished");
}

/// Releases a session off the caller's stack. Without a runtime the handle is
/// dropped, which releases hardware synchronously.
fn spawn_dispose(handle: SessionHandle) {
	debug!(target = "camscan.session", device = %handle.device_id(), epoch = handle.epoch(), "disposing session");
	match tokio::runtime::Handle::try_current() {
		Ok(runtime) => {
			runtime.spawn(handle.dispose());
		}
		Err(_) => {
			warn!(target = "camscan.session", "no runtime for async release, dropping session");
			drop(handle);
		}
	}
}
