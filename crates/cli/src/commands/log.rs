use camscan_runtime::{LogLevel, LogSource};

use super::Env;
use crate::cli::LogArgs;
use crate::error::{CliError, Result};

pub async fn execute(env: &Env, args: LogArgs) -> Result<()> {
	let mut logger = env.logger(&args.component);
	if let Some(source) = args.source {
		logger = logger.with_source(LogSource::from(source));
	}
	let level = LogLevel::from(args.level);

	match args.data {
		Some(raw) => {
			let data: serde_json::Value =
				serde_json::from_str(&raw).map_err(|e| CliError::InvalidArgument(format!("--data is not valid JSON: {e}")))?;
			logger.log_with(level, args.message, &data);
		}
		None => logger.log(level, args.message),
	}
	Ok(())
}
