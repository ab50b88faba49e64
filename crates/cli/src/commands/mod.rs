//! Command dispatch. Every command shares one client identity and one
//! transport, which is flushed before the process exits.

mod devices;
mod log;
mod scan;
mod screenshot;

use std::sync::Arc;
use std::time::Duration;

use camscan::{ControllerConfig, DecoderFactory, ScanEvent, SessionController};
use camscan_runtime::{ClientIdentity, LogTransport, Logger};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cli::{Cli, Commands};
use crate::config::{self, ConfigOverrides, Settings};
use crate::error::Result;
use crate::v4l2::V4l2Platform;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared state handed to every command.
pub struct Env {
	pub settings: Settings,
	pub transport: LogTransport,
}

impl Env {
	pub fn logger(&self, component: &str) -> Logger {
		Logger::new(self.transport.clone(), self.settings.source(), component)
	}

	/// A controller over the local V4L2 cameras.
	pub fn controller(&self, decoders: Arc<dyn DecoderFactory>, config: ControllerConfig) -> (SessionController, mpsc::UnboundedReceiver<ScanEvent>) {
		SessionController::new(Arc::new(V4l2Platform::default()), decoders, self.logger("Scanner"), config)
	}
}

pub async fn dispatch(cli: Cli) -> Result<()> {
	let file = config::load(cli.config.as_deref())?;
	let settings = Settings::resolve(file, ConfigOverrides::from(&cli));

	let identity = ClientIdentity::from_env_or_generate();
	let transport = if settings.offline {
		LogTransport::local_only(identity)
	} else {
		LogTransport::new(identity, settings.transport())?
	};
	debug!(target = "camscan.cli", client = %transport.identity(), offline = settings.offline, "transport ready");

	let env = Env { settings, transport };
	let result = match cli.command {
		Commands::Devices(args) => devices::execute(&env, args).await,
		Commands::Scan(args) => scan::execute(&env, args).await,
		Commands::Log(args) => log::execute(&env, args).await,
		Commands::Screenshot(args) => screenshot::execute(&env, args).await,
	};

	if !env.transport.flush(FLUSH_TIMEOUT).await {
		warn!(target = "camscan.cli", pending = env.transport.pending(), "log sink did not drain before exit");
	}
	result
}
