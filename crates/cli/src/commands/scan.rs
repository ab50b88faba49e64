use std::sync::Arc;

use camscan::{ScanEvent, ScanMode, SessionStatus};
use serde_json::json;
use tracing::{debug, info};

use super::Env;
use crate::cli::ScanArgs;
use crate::decoder::CommandDecoderFactory;
use crate::error::Result;

/// Runs a session until Ctrl-C, a decode failure, or (with `--once`) the first code.
pub async fn execute(env: &Env, args: ScanArgs) -> Result<()> {
	let decoders = Arc::new(CommandDecoderFactory::new(env.settings.decoder_command(args.decoder.clone())));
	let config = env.settings.controller(args.device.clone(), args.mode_override());
	let stop_on_first = config.mode == ScanMode::StopOnFirst;
	let (controller, mut events) = env.controller(decoders, config);

	let outcome = run(&controller, &mut events, stop_on_first, args.json).await;
	controller.teardown();
	outcome
}

async fn run(
	controller: &camscan::SessionController,
	events: &mut tokio::sync::mpsc::UnboundedReceiver<ScanEvent>,
	stop_on_first: bool,
	json_output: bool,
) -> Result<()> {
	controller.initialize().await?;
	if let Some(err) = controller.snapshot().last_error {
		return Err(err.into());
	}
	if controller.status() == SessionStatus::Idle {
		controller.start(None).await?;
	}
	info!(target = "camscan.cli", device = ?controller.snapshot().active_device, "scanning, press Ctrl-C to stop");

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				debug!(target = "camscan.cli", "interrupted");
				return Ok(());
			}
			event = events.recv() => match event {
				Some(ScanEvent::Decoded { device_id, result }) => {
					if json_output {
						println!("{}", json!({ "deviceId": device_id, "text": result.text, "format": result.format }));
					} else {
						println!("{}", result.text);
					}
					if stop_on_first {
						return Ok(());
					}
				}
				Some(ScanEvent::Error(err)) => return Err(err.into()),
				Some(ScanEvent::StateChanged(status)) => debug!(target = "camscan.cli", %status, "session status"),
				Some(ScanEvent::DevicesChanged(devices)) => debug!(target = "camscan.cli", count = devices.len(), "device list changed"),
				None => return Ok(()),
			},
		}
	}
}
