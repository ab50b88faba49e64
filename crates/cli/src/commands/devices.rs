use std::sync::Arc;

use camscan::ControllerConfig;

use super::Env;
use crate::cli::DevicesArgs;
use crate::decoder::CommandDecoderFactory;
use crate::error::Result;

pub async fn execute(env: &Env, args: DevicesArgs) -> Result<()> {
	let decoders = Arc::new(CommandDecoderFactory::new(env.settings.decoder_command(None)));
	let config = ControllerConfig {
		auto_start: false,
		..env.settings.controller(None, None)
	};
	let (controller, _events) = env.controller(decoders, config);

	let outcome = controller.initialize().await;
	let snapshot = controller.snapshot();
	controller.teardown();
	outcome?;

	if args.json {
		println!("{}", serde_json::to_string_pretty(&snapshot.devices)?);
		return Ok(());
	}

	if snapshot.devices.is_empty() {
		println!("no cameras found");
		return Ok(());
	}
	for (position, device) in snapshot.devices.iter().enumerate() {
		let marker = if snapshot.selected_device.as_deref() == Some(device.device_id()) { "*" } else { " " };
		println!("{marker} {:<10} {}", device.device_id(), device.display_label(position));
	}
	Ok(())
}
