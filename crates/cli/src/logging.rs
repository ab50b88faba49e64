use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
	// 0: only the console mirror of emitted records
	// 1 (-v): session and transport lifecycle
	// 2+ (-vv): everything, including reqwest and hyper
	let filter = match verbosity {
		0 => "warn,camscan=info",
		1 => "info,camscan=debug",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(false)
		.with_level(true)
		.compact()
		.init();
}
