//! Decode engine that delegates to an external scanner process.
//!
//! The command template is split on whitespace and `{device}` is replaced by
//! the stream locator. Every non-empty stdout line is one decoded code; a
//! non-zero exit that was not requested by `stop` is a decode failure.

use std::process::Stdio;

use async_trait::async_trait;
use camscan::{DecodeEngine, DecodeError, DecodeEvents, DecodeResult, DecoderConfig, DecoderFactory};
use camscan_runtime::Logger;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

const DEVICE_PLACEHOLDER: &str = "{device}";

/// Builds a [`CommandDecoder`] per session from a command template.
#[derive(Debug, Clone)]
pub struct CommandDecoderFactory {
	template: String,
}

impl CommandDecoderFactory {
	pub fn new(template: impl Into<String>) -> Self {
		Self { template: template.into() }
	}
}

impl DecoderFactory for CommandDecoderFactory {
	fn create(&self, config: DecoderConfig) -> Result<Box<dyn DecodeEngine>, DecodeError> {
		let mut parts = self.template.split_whitespace().map(|part| part.replace(DEVICE_PLACEHOLDER, &config.sink.locator));
		let program = parts
			.next()
			.ok_or_else(|| DecodeError::Construction("decoder command is empty".into()))?;
		Ok(Box::new(CommandDecoder {
			program,
			args: parts.collect(),
			device_id: config.device_id,
			events: config.events,
			logger: config.logger,
			running: None,
		}))
	}
}

struct Running {
	stop_tx: oneshot::Sender<()>,
	task: JoinHandle<()>,
}

pub struct CommandDecoder {
	program: String,
	args: Vec<String>,
	device_id: String,
	events: DecodeEvents,
	logger: Logger,
	running: Option<Running>,
}

#[async_trait]
impl DecodeEngine for CommandDecoder {
	async fn start(&mut self) -> Result<(), DecodeError> {
		if self.running.is_some() {
			return Ok(());
		}
		let mut child = Command::new(&self.program)
			.args(&self.args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| DecodeError::Start(format!("failed to spawn {}: {e}", self.program)))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| DecodeError::Start("decoder stdout was not captured".into()))?;

		let (stop_tx, stop_rx) = oneshot::channel();
		let task = tokio::spawn(read_results(child, BufReader::new(stdout), self.events.clone(), stop_rx));
		self.running = Some(Running { stop_tx, task });

		self.logger
			.info_with("decoder started", &json!({ "program": self.program, "deviceId": self.device_id }));
		Ok(())
	}

	async fn stop(&mut self) {
		let Some(Running { stop_tx, task }) = self.running.take() else {
			return;
		};
		let _ = stop_tx.send(());
		if let Err(err) = task.await {
			debug!(target = "camscan.decoder", error = %err, "decoder reader task ended abnormally");
		}
		self.logger.debug_with("decoder stopped", &json!({ "deviceId": self.device_id }));
	}
}

async fn read_results<R>(mut child: Child, stdout: BufReader<R>, events: DecodeEvents, mut stop_rx: oneshot::Receiver<()>)
where
	R: tokio::io::AsyncRead + Unpin,
{
	let mut lines = stdout.lines();
	loop {
		tokio::select! {
			_ = &mut stop_rx => {
				if let Err(err) = child.kill().await {
					debug!(target = "camscan.decoder", error = %err, "failed to kill decoder");
				}
				return;
			}
			line = lines.next_line() => match line {
				Ok(Some(line)) => {
					let text = line.trim();
					if !text.is_empty() {
						events.decoded(DecodeResult::new(text));
					}
				}
				Ok(None) => break,
				Err(err) => {
					let _ = child.start_kill();
					events.failed(format!("failed to read decoder output: {err}"));
					return;
				}
			},
		}
	}

	match child.wait().await {
		Ok(status) if status.success() => {
			debug!(target = "camscan.decoder", "decoder exited");
		}
		Ok(status) => {
			events.failed(format!("decoder exited with {status}"));
		}
		Err(err) => {
			events.failed(format!("failed to wait for decoder: {err}"));
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use camscan::{DecodeEvent, ScanMode, StreamSink};
	use camscan_runtime::{ClientIdentity, LogSource, LogTransport};
	use tokio::sync::mpsc;

	use super::*;

	fn config(locator: &str) -> (DecoderConfig, mpsc::UnboundedReceiver<DecodeEvent>) {
		let (events, rx) = DecodeEvents::channel();
		let logger = Logger::new(LogTransport::local_only(ClientIdentity::from_id("client-d")), LogSource::Lib, "Decoder");
		let config = DecoderConfig {
			sink: StreamSink {
				device_id: "video0".into(),
				locator: locator.into(),
			},
			device_id: "video0".into(),
			events,
			mode: ScanMode::Continuous,
			logger,
		};
		(config, rx)
	}

	async fn next(rx: &mut mpsc::UnboundedReceiver<DecodeEvent>) -> DecodeEvent {
		tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap()
	}

	#[test]
	fn empty_template_fails_construction() {
		let (config, _rx) = config("/dev/video0");
		assert!(matches!(CommandDecoderFactory::new("   ").create(config), Err(DecodeError::Construction(_))));
	}

	#[tokio::test]
	async fn each_output_line_is_a_result() {
		let (config, mut rx) = config("first\nsecond");
		let mut engine = CommandDecoderFactory::new("echo {device}").create(config).unwrap();
		engine.start().await.unwrap();

		assert_eq!(next(&mut rx).await, DecodeEvent::Decoded(DecodeResult::new("first")));
		assert_eq!(next(&mut rx).await, DecodeEvent::Decoded(DecodeResult::new("second")));
		engine.stop().await;
	}

	#[tokio::test]
	async fn nonzero_exit_is_reported_as_failure() {
		let (config, mut rx) = config("/dev/video0");
		let mut engine = CommandDecoderFactory::new("false {device}").create(config).unwrap();
		engine.start().await.unwrap();

		assert!(matches!(next(&mut rx).await, DecodeEvent::Failed(msg) if msg.contains("exited")));
		engine.stop().await;
	}

	#[tokio::test]
	async fn stop_kills_without_reporting_failure() {
		let (config, mut rx) = config("/dev/video0");
		let mut engine = CommandDecoderFactory::new("sleep 30").create(config).unwrap();
		engine.start().await.unwrap();

		engine.stop().await;
		drop(engine);
		assert!(rx.recv().await.is_none());
	}

	#[tokio::test]
	async fn missing_program_fails_to_start() {
		let (config, _rx) = config("/dev/video0");
		let mut engine = CommandDecoderFactory::new("camscan-no-such-decoder {device}").create(config).unwrap();
		assert!(matches!(engine.start().await, Err(DecodeError::Start(_))));
	}
}
