use crate::decoder::DecodeEngine;
use crate::platform::OwnedStream;

/// The one live session: an open stream and the engine reading it.
pub(crate) struct SessionHandle {
	device_id: String,
	epoch: u64,
	stream: OwnedStream,
	engine: Box<dyn DecodeEngine>,
}

impl SessionHandle {
	pub(crate) fn new(device_id: String, epoch: u64, stream: OwnedStream, engine: Box<dyn DecodeEngine>) -> Self {
		Self {
			device_id,
			epoch,
			stream,
			engine,
		}
	}

	pub(crate) fn device_id(&self) -> &str {
		&self.device_id
	}

	pub(crate) fn epoch(&self) -> u64 {
		self.epoch
	}

	/// Stops the engine before the stream it reads from goes away.
	pub(crate) async fn dispose(self) {
		let Self { mut engine, stream, .. } = self;
		engine.stop().await;
		drop(engine);
		stream.release().await;
	}
}
