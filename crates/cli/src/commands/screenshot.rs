use anyhow::Context;
use camscan_protocol::ImageDataUrl;
use camscan_runtime::ScreenshotUpload;

use super::Env;
use crate::cli::ScreenshotArgs;
use crate::error::{CliError, Result};

pub async fn execute(env: &Env, args: ScreenshotArgs) -> Result<()> {
	let subtype = match args.image_type.as_deref() {
		Some(subtype) => subtype.to_string(),
		None => args
			.path
			.extension()
			.and_then(|ext| ext.to_str())
			.and_then(ImageDataUrl::subtype_for_extension)
			.map(str::to_string)
			.ok_or_else(|| CliError::InvalidArgument(format!("cannot tell the image type of {}, pass --image-type", args.path.display())))?,
	};

	let bytes = tokio::fs::read(&args.path)
		.await
		.with_context(|| format!("reading {}", args.path.display()))?;
	let image = ImageDataUrl::from_bytes(&subtype, &bytes)?;

	let response = env
		.transport
		.upload_screenshot(ScreenshotUpload {
			source: env.settings.source(),
			component: args.component,
			note: args.note,
			image,
		})
		.await?;

	match response.filename {
		Some(filename) => println!("{filename}"),
		None => println!("{}", response.status),
	}
	Ok(())
}
