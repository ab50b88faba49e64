//! CLI configuration: a JSON file merged with command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camscan::{ControllerConfig, ScanMode};
use camscan_runtime::transport::{DEFAULT_LOG_ENDPOINT, DEFAULT_SCREENSHOT_ENDPOINT};
use camscan_runtime::{LogSource, TransportConfig};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Decoder used when neither the config nor `--decoder` names one.
pub const DEFAULT_DECODER_COMMAND: &str = "zbarcam --quiet --nodisplay --raw {device}";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BEACON_CAPACITY: usize = 256;

/// On-disk settings. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CliConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub log_endpoint: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub screenshot_endpoint: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_timeout_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub beacon_capacity: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<LogSource>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scan_mode: Option<ScanMode>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub decoder_command: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub preferred_device: Option<String>,
}

/// Command-line values that win over [`CliConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
	pub log_endpoint: Option<String>,
	pub screenshot_endpoint: Option<String>,
	pub timeout_ms: Option<u64>,
	pub offline: bool,
}

impl From<&Cli> for ConfigOverrides {
	fn from(cli: &Cli) -> Self {
		Self {
			log_endpoint: cli.log_endpoint.clone(),
			screenshot_endpoint: cli.screenshot_endpoint.clone(),
			timeout_ms: cli.timeout_ms,
			offline: cli.offline,
		}
	}
}

/// Effective settings after merging file and flags.
#[derive(Debug, Clone)]
pub struct Settings {
	pub config: CliConfig,
	pub offline: bool,
}

impl Settings {
	pub fn resolve(config: CliConfig, overrides: ConfigOverrides) -> Self {
		let mut config = config;
		if overrides.log_endpoint.is_some() {
			config.log_endpoint = overrides.log_endpoint;
		}
		if overrides.screenshot_endpoint.is_some() {
			config.screenshot_endpoint = overrides.screenshot_endpoint;
		}
		if overrides.timeout_ms.is_some() {
			config.request_timeout_ms = overrides.timeout_ms;
		}
		Self {
			config,
			offline: overrides.offline,
		}
	}

	pub fn transport(&self) -> TransportConfig {
		TransportConfig {
			log_endpoint: self.config.log_endpoint.clone().unwrap_or_else(|| DEFAULT_LOG_ENDPOINT.to_string()),
			screenshot_endpoint: self
				.config
				.screenshot_endpoint
				.clone()
				.unwrap_or_else(|| DEFAULT_SCREENSHOT_ENDPOINT.to_string()),
			request_timeout: Duration::from_millis(self.config.request_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
			beacon_capacity: self.config.beacon_capacity.unwrap_or(DEFAULT_BEACON_CAPACITY),
		}
	}

	pub fn controller(&self, device: Option<String>, mode: Option<ScanMode>) -> ControllerConfig {
		ControllerConfig {
			mode: mode.or(self.config.scan_mode).unwrap_or_default(),
			auto_start: true,
			preferred_device: device.or_else(|| self.config.preferred_device.clone()),
		}
	}

	pub fn source(&self) -> LogSource {
		self.config.source.unwrap_or(LogSource::Client)
	}

	pub fn decoder_command(&self, flag: Option<String>) -> String {
		flag.or_else(|| self.config.decoder_command.clone())
			.unwrap_or_else(|| DEFAULT_DECODER_COMMAND.to_string())
	}
}

/// `$XDG_CONFIG_HOME/camscan/config.json`, falling back to `~/.config`.
pub fn default_config_path() -> PathBuf {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."));
	config_home.join("camscan").join("config.json")
}

/// Loads the explicit config file, or the default one when present.
///
/// A missing explicit file is an error; a missing default file is not.
pub fn load(explicit: Option<&Path>) -> Result<CliConfig> {
	match explicit {
		Some(path) => {
			if !path.exists() {
				return Err(CliError::ConfigMissing(path.to_path_buf()));
			}
			read_config(path)
		}
		None => {
			let path = default_config_path();
			if path.exists() { read_config(&path) } else { Ok(CliConfig::default()) }
		}
	}
}

fn read_config(path: &Path) -> Result<CliConfig> {
	let content = fs::read_to_string(path)?;
	serde_json::from_str(&content).map_err(|source| CliError::Config {
		path: path.to_path_buf(),
		source,
	})
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn defaults_point_at_local_sink() {
		let settings = Settings::resolve(CliConfig::default(), ConfigOverrides::default());
		let transport = settings.transport();

		assert_eq!(transport.log_endpoint, DEFAULT_LOG_ENDPOINT);
		assert_eq!(transport.screenshot_endpoint, DEFAULT_SCREENSHOT_ENDPOINT);
		assert_eq!(transport.request_timeout, Duration::from_secs(5));
		assert_eq!(settings.source(), LogSource::Client);
		assert_eq!(settings.decoder_command(None), DEFAULT_DECODER_COMMAND);
	}

	#[test]
	fn flags_override_file_values() {
		let file = CliConfig {
			log_endpoint: Some("http://sink:9000/log".into()),
			request_timeout_ms: Some(800),
			decoder_command: Some("zbarcam --raw {device}".into()),
			preferred_device: Some("video2".into()),
			scan_mode: Some(ScanMode::StopOnFirst),
			..Default::default()
		};
		let overrides = ConfigOverrides {
			log_endpoint: Some("http://127.0.0.1:4000/log".into()),
			..Default::default()
		};
		let settings = Settings::resolve(file, overrides);

		assert_eq!(settings.transport().log_endpoint, "http://127.0.0.1:4000/log");
		assert_eq!(settings.transport().request_timeout, Duration::from_millis(800));
		assert_eq!(settings.decoder_command(Some("cat {device}".into())), "cat {device}");

		let controller = settings.controller(None, None);
		assert_eq!(controller.preferred_device.as_deref(), Some("video2"));
		assert_eq!(controller.mode, ScanMode::StopOnFirst);
		assert_eq!(settings.controller(Some("video0".into()), None).preferred_device.as_deref(), Some("video0"));
	}

	#[test]
	fn load_reads_camel_case_file() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("config.json");
		fs::write(&path, r#"{"logEndpoint":"http://h/log","source":"Lib","scanMode":"stop-on-first","beaconCapacity":8}"#).unwrap();

		let config = load(Some(&path)).unwrap();
		assert_eq!(config.log_endpoint.as_deref(), Some("http://h/log"));
		assert_eq!(config.source, Some(LogSource::Lib));
		assert_eq!(config.scan_mode, Some(ScanMode::StopOnFirst));
		assert_eq!(config.beacon_capacity, Some(8));
	}

	#[test]
	fn missing_explicit_file_is_an_error() {
		let tmp = TempDir::new().unwrap();
		let err = load(Some(&tmp.path().join("absent.json"))).unwrap_err();
		assert!(matches!(err, CliError::ConfigMissing(_)));
	}

	#[test]
	fn malformed_file_names_the_path() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("config.json");
		fs::write(&path, "{not json").unwrap();

		let err = load(Some(&path)).unwrap_err();
		assert!(matches!(&err, CliError::Config { path: p, .. } if p == &path));
	}

	#[test]
	fn default_path_ends_with_app_dir() {
		assert!(default_config_path().ends_with("camscan/config.json"));
	}
}
