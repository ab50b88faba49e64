//! Best-effort delivery strategies for serialized log bodies.
//!
//! A [`DeliveryChain`] tries each [`Delivery`] in order until one accepts the
//! body. Acceptance only means the send was handed off: outcomes of the actual
//! request are logged locally and never reported back, retried, or re-queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

/// Immediate refusal of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
	#[error("delivery queue is full")]
	QueueFull,
	#[error("delivery queue is closed")]
	Closed,
	#[error("no async runtime available")]
	NoRuntime,
}

/// One way of handing a serialized record to the network.
///
/// `dispatch` must return without waiting on the network.
pub trait Delivery: Send + Sync {
	fn name(&self) -> &'static str;

	fn dispatch(&self, body: &str) -> Result<(), DeliveryError>;
}

/// Ordered fallback chain of delivery strategies.
#[derive(Default)]
pub struct DeliveryChain {
	strategies: Vec<Box<dyn Delivery>>,
}

impl DeliveryChain {
	pub fn new(strategies: Vec<Box<dyn Delivery>>) -> Self {
		Self { strategies }
	}

	pub fn is_empty(&self) -> bool {
		self.strategies.is_empty()
	}

	/// Hands `body` to the first strategy that accepts it.
	///
	/// Returns the name of the accepting strategy, or `None` when every strategy
	/// refused. Refusals are logged here and go no further.
	pub fn dispatch(&self, body: &str) -> Option<&'static str> {
		for strategy in &self.strategies {
			match strategy.dispatch(body) {
				Ok(()) => return Some(strategy.name()),
				Err(err) => {
					debug!(target = "camscan.transport", strategy = strategy.name(), error = %err, "delivery refused; falling back");
				}
			}
		}
		if !self.strategies.is_empty() {
			warn!(target = "camscan.transport", "all delivery strategies refused log record; dropping it");
		}
		None
	}
}

/// Counts deliveries that were handed off but have not finished yet.
///
/// Shutdown paths wait on it through [`InFlight::wait_idle`].
#[derive(Debug, Clone, Default)]
pub struct InFlight {
	inner: Arc<InFlightInner>,
}

#[derive(Debug, Default)]
struct InFlightInner {
	count: AtomicUsize,
	idle: Notify,
}

impl InFlight {
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks one delivery as started; it finishes when the guard drops.
	pub fn begin(&self) -> InFlightGuard {
		self.inner.count.fetch_add(1, Ordering::SeqCst);
		InFlightGuard { inner: self.inner.clone() }
	}

	pub fn count(&self) -> usize {
		self.inner.count.load(Ordering::SeqCst)
	}

	/// Waits until nothing is in flight. Returns `false` on timeout.
	///
	/// Registers for the wakeup before checking the count to avoid a lost notify.
	pub async fn wait_idle(&self, timeout: Duration) -> bool {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			let notified = self.inner.idle.notified();
			if self.count() == 0 {
				return true;
			}
			let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
			if remaining.is_zero() {
				return false;
			}
			tokio::select! {
				biased;
				_ = notified => {}
				_ = tokio::time::sleep(remaining) => return self.count() == 0,
			}
		}
	}
}

/// Keeps one delivery counted as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
	inner: Arc<InFlightInner>,
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
			self.inner.idle.notify_waiters();
		}
	}
}

/// Fire-and-forget delivery through a bounded queue.
///
/// A background task drains the queue and posts each body without looking at
/// the response. Enqueueing fails immediately when the queue is full, when the
/// drain task is gone, or when no runtime was available to start it.
pub struct BeaconDelivery {
	tx: Option<mpsc::Sender<(String, InFlightGuard)>>,
	in_flight: InFlight,
}

impl BeaconDelivery {
	pub fn new(client: reqwest::Client, url: String, timeout: Duration, capacity: usize, in_flight: InFlight) -> Self {
		let Ok(handle) = Handle::try_current() else {
			debug!(target = "camscan.transport", "no runtime; beacon delivery unavailable");
			return Self { tx: None, in_flight };
		};
		let (tx, rx) = mpsc::channel(capacity.max(1));
		handle.spawn(drain_beacons(rx, client, url, timeout));
		Self { tx: Some(tx), in_flight }
	}
}

async fn drain_beacons(mut rx: mpsc::Receiver<(String, InFlightGuard)>, client: reqwest::Client, url: String, timeout: Duration) {
	while let Some((body, _guard)) = rx.recv().await {
		let result = client.post(&url).header(CONTENT_TYPE, "application/json").body(body).timeout(timeout).send().await;
		if let Err(err) = result {
			debug!(target = "camscan.transport", %url, error = %err, "beacon send failed");
		}
	}
}

impl Delivery for BeaconDelivery {
	fn name(&self) -> &'static str {
		"beacon"
	}

	fn dispatch(&self, body: &str) -> Result<(), DeliveryError> {
		let tx = self.tx.as_ref().ok_or(DeliveryError::NoRuntime)?;
		tx.try_send((body.to_string(), self.in_flight.begin())).map_err(|err| match err {
			mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
			mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
		})
	}
}

/// Standalone POST per record, kept alive until it completes.
///
/// Each dispatch spawns its own request task, tracked by [`InFlight`] so a
/// shutdown flush can wait for it.
pub struct KeepaliveDelivery {
	client: reqwest::Client,
	url: String,
	timeout: Duration,
	in_flight: InFlight,
}

impl KeepaliveDelivery {
	pub fn new(client: reqwest::Client, url: String, timeout: Duration, in_flight: InFlight) -> Self {
		Self {
			client,
			url,
			timeout,
			in_flight,
		}
	}
}

impl Delivery for KeepaliveDelivery {
	fn name(&self) -> &'static str {
		"keepalive"
	}

	fn dispatch(&self, body: &str) -> Result<(), DeliveryError> {
		let handle = Handle::try_current().map_err(|_| DeliveryError::NoRuntime)?;
		let guard = self.in_flight.begin();
		let request = self
			.client
			.post(&self.url)
			.header(CONTENT_TYPE, "application/json")
			.body(body.to_string())
			.timeout(self.timeout);
		let url = self.url.clone();
		handle.spawn(async move {
			let _guard = guard;
			match request.send().await {
				Ok(response) if !response.status().is_success() => {
					warn!(target = "camscan.transport", %url, status = response.status().as_u16(), "log sink rejected record");
				}
				Ok(_) => {}
				Err(err) => {
					warn!(target = "camscan.transport", %url, error = %err, "keepalive send failed");
				}
			}
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;

	struct Refusing(DeliveryError);

	impl Delivery for Refusing {
		fn name(&self) -> &'static str {
			"refusing"
		}

		fn dispatch(&self, _body: &str) -> Result<(), DeliveryError> {
			Err(self.0.clone())
		}
	}

	#[derive(Clone, Default)]
	struct Recording(Arc<Mutex<Vec<String>>>);

	impl Delivery for Recording {
		fn name(&self) -> &'static str {
			"recording"
		}

		fn dispatch(&self, body: &str) -> Result<(), DeliveryError> {
			self.0.lock().push(body.to_string());
			Ok(())
		}
	}

	#[test]
	fn chain_falls_back_after_refusal() {
		let recording = Recording::default();
		let chain = DeliveryChain::new(vec![Box::new(Refusing(DeliveryError::QueueFull)), Box::new(recording.clone())]);
		assert_eq!(chain.dispatch("{}"), Some("recording"));
		assert_eq!(recording.0.lock().as_slice(), ["{}"]);
	}

	#[test]
	fn chain_stops_at_first_acceptance() {
		let first = Recording::default();
		let second = Recording::default();
		let chain = DeliveryChain::new(vec![Box::new(first.clone()), Box::new(second.clone())]);
		chain.dispatch("a");
		assert_eq!(first.0.lock().len(), 1);
		assert!(second.0.lock().is_empty());
	}

	#[test]
	fn chain_swallows_total_refusal() {
		let chain = DeliveryChain::new(vec![Box::new(Refusing(DeliveryError::Closed)), Box::new(Refusing(DeliveryError::NoRuntime))]);
		assert_eq!(chain.dispatch("lost"), None);
	}

	#[test]
	fn delivery_without_runtime_is_unavailable() {
		let in_flight = InFlight::new();
		let client = reqwest::Client::new();
		let beacon = BeaconDelivery::new(client.clone(), "http://127.0.0.1:9/log".into(), Duration::from_secs(1), 4, in_flight.clone());
		assert_eq!(beacon.dispatch("{}"), Err(DeliveryError::NoRuntime));
		let keepalive = KeepaliveDelivery::new(client, "http://127.0.0.1:9/log".into(), Duration::from_secs(1), in_flight.clone());
		assert_eq!(keepalive.dispatch("{}"), Err(DeliveryError::NoRuntime));
		assert_eq!(in_flight.count(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_idle_resolves_when_last_guard_drops() {
		let in_flight = InFlight::new();
		let guard = in_flight.begin();
		let waiter = {
			let in_flight = in_flight.clone();
			tokio::spawn(async move { in_flight.wait_idle(Duration::from_secs(5)).await })
		};
		tokio::task::yield_now().await;
		drop(guard);
		assert!(waiter.await.unwrap());
	}

	#[tokio::test(start_paused = true)]
	async fn wait_idle_times_out_while_busy() {
		let in_flight = InFlight::new();
		let _guard = in_flight.begin();
		assert!(!in_flight.wait_idle(Duration::from_millis(50)).await);
	}
}
