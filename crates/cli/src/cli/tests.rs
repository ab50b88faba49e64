use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_scan_with_device_and_once() {
	let cli = Cli::try_parse_from(["camscan", "scan", "--device", "video2", "--once"]).unwrap();

	match cli.command {
		Commands::Scan(args) => {
			assert_eq!(args.device.as_deref(), Some("video2"));
			assert!(args.once);
			assert_eq!(args.mode_override(), Some(ScanMode::StopOnFirst));
		}
		_ => panic!("Expected Scan command"),
	}
}

#[test]
fn parse_log_defaults() {
	let cli = Cli::try_parse_from(["camscan", "log", "hello"]).unwrap();
	assert!(!cli.offline);

	match cli.command {
		Commands::Log(args) => {
			assert_eq!(args.message, "hello");
			assert_eq!(LogLevel::from(args.level), LogLevel::Info);
			assert_eq!(args.component, "Cli");
			assert!(args.source.is_none());
			assert!(args.data.is_none());
		}
		_ => panic!("Expected Log command"),
	}
}

#[test]
fn parse_log_with_level_source_and_data() {
	let cli = Cli::try_parse_from(["camscan", "log", "low light", "-l", "warn", "-s", "lib", "-d", r#"{"lux":3}"#]).unwrap();

	match cli.command {
		Commands::Log(args) => {
			assert_eq!(LogLevel::from(args.level), LogLevel::Warn);
			assert_eq!(args.source.map(LogSource::from), Some(LogSource::Lib));
			assert_eq!(args.data.as_deref(), Some(r#"{"lux":3}"#));
		}
		_ => panic!("Expected Log command"),
	}
}

#[test]
fn global_flags_work_after_subcommand() {
	let cli = Cli::try_parse_from(["camscan", "devices", "--offline", "-vv", "--config", "/tmp/c.json"]).unwrap();

	assert!(cli.offline);
	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
	assert!(matches!(cli.command, Commands::Devices(_)));
}

#[test]
fn parse_screenshot_command() {
	let cli = Cli::try_parse_from(["camscan", "screenshot", "shot.png", "--note", "blurry frame"]).unwrap();

	match cli.command {
		Commands::Screenshot(args) => {
			assert_eq!(args.path, PathBuf::from("shot.png"));
			assert_eq!(args.note.as_deref(), Some("blurry frame"));
			assert_eq!(args.component, "Cli");
			assert!(args.image_type.is_none());
		}
		_ => panic!("Expected Screenshot command"),
	}
}

#[test]
fn unknown_level_is_rejected() {
	assert!(Cli::try_parse_from(["camscan", "log", "x", "--level", "fatal"]).is_err());
}
