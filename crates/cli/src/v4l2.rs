//! Linux video platform backed by V4L2 device nodes.
//!
//! Devices are discovered through sysfs (`/sys/class/video4linux/<node>`),
//! where `name` holds the label and `index` is 0 for the capture node of a
//! physical camera (metadata nodes of the same camera have index 1+).
//! Acquiring a device opens `/dev/<node>`; the open file is the stream.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use camscan::{DeviceKind, HardwareStream, PlatformError, RawDevice, StreamConstraints, StreamSink, VideoPlatform};
use tokio::fs;
use tracing::debug;

const SYSFS_ROOT: &str = "/sys/class/video4linux";
const DEV_ROOT: &str = "/dev";
const EBUSY: i32 = 16;

#[derive(Debug, Clone)]
pub struct V4l2Platform {
	sysfs_root: PathBuf,
	dev_root: PathBuf,
}

impl Default for V4l2Platform {
	fn default() -> Self {
		Self::with_roots(SYSFS_ROOT, DEV_ROOT)
	}
}

impl V4l2Platform {
	pub fn with_roots(sysfs_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
		Self {
			sysfs_root: sysfs_root.into(),
			dev_root: dev_root.into(),
		}
	}

	async fn describe(&self, node: &str) -> io::Result<RawDevice> {
		let dir = self.sysfs_root.join(node);
		let label = read_attr(&dir.join("name")).await?.unwrap_or_default();
		let index = read_attr(&dir.join("index")).await?;
		let kind = match index.as_deref().map(str::parse::<u32>) {
			Some(Ok(0)) | None => DeviceKind::VideoInput,
			_ => DeviceKind::Other,
		};
		Ok(RawDevice {
			id: node.to_string(),
			label,
			kind,
		})
	}

	async fn first_capture_node(&self) -> Result<String, PlatformError> {
		self.enumerate_devices()
			.await?
			.into_iter()
			.find(|d| d.kind == DeviceKind::VideoInput)
			.map(|d| d.id)
			.ok_or_else(|| PlatformError::NotFound("no video capture device".into()))
	}

	fn node_path(&self, id: &str) -> Result<PathBuf, PlatformError> {
		if id.is_empty() || id.contains('/') || id.starts_with('.') {
			return Err(PlatformError::NotFound(id.to_string()));
		}
		Ok(self.dev_root.join(id))
	}
}

#[async_trait]
impl VideoPlatform for V4l2Platform {
	async fn enumerate_devices(&self) -> Result<Vec<RawDevice>, PlatformError> {
		let mut entries = match fs::read_dir(&self.sysfs_root).await {
			Ok(entries) => entries,
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				debug!(target = "camscan.v4l2", root = %self.sysfs_root.display(), "no video4linux class, no cameras");
				return Ok(Vec::new());
			}
			Err(err) => return Err(map_io_error(&self.sysfs_root, err)),
		};

		let mut nodes = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(|e| map_io_error(&self.sysfs_root, e))? {
			if let Some(name) = entry.file_name().to_str() {
				if name.starts_with("video") {
					nodes.push(name.to_string());
				}
			}
		}
		nodes.sort_by_key(|n| node_number(n));

		let mut devices = Vec::with_capacity(nodes.len());
		for node in nodes {
			devices.push(self.describe(&node).await.map_err(|e| map_io_error(&self.sysfs_root.join(&node), e))?);
		}
		Ok(devices)
	}

	async fn acquire(&self, constraints: &StreamConstraints) -> Result<Box<dyn HardwareStream>, PlatformError> {
		let id = match constraints {
			StreamConstraints::AnyVideo => self.first_capture_node().await?,
			StreamConstraints::Device(id) => id.clone(),
		};
		let path = self.node_path(&id)?;
		let file = fs::OpenOptions::new()
			.read(true)
			.write(true)
			.open(&path)
			.await
			.map_err(|e| map_io_error(&path, e))?;
		debug!(target = "camscan.v4l2", device = %id, path = %path.display(), "opened capture node");
		Ok(Box::new(V4l2Stream {
			device_id: id,
			path,
			file: Some(file),
		}))
	}
}

/// An open device node. Closing the file releases the camera.
struct V4l2Stream {
	device_id: String,
	path: PathBuf,
	file: Option<fs::File>,
}

#[async_trait]
impl HardwareStream for V4l2Stream {
	fn sink(&self) -> StreamSink {
		StreamSink {
			device_id: self.device_id.clone(),
			locator: self.path.display().to_string(),
		}
	}

	async fn release(mut self: Box<Self>) {
		if let Some(file) = self.file.take() {
			drop(file);
			debug!(target = "camscan.v4l2", device = %self.device_id, "released capture node");
		}
	}
}

async fn read_attr(path: &Path) -> io::Result<Option<String>> {
	match fs::read_to_string(path).await {
		Ok(value) => Ok(Some(value.trim().to_string())),
		Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(err) => Err(err),
	}
}

fn node_number(node: &str) -> u32 {
	node.trim_start_matches("video").parse().unwrap_or(u32::MAX)
}

fn map_io_error(path: &Path, err: io::Error) -> PlatformError {
	let detail = format!("{}: {err}", path.display());
	match err.kind() {
		io::ErrorKind::PermissionDenied => PlatformError::PermissionDenied(detail),
		io::ErrorKind::NotFound => PlatformError::NotFound(detail),
		_ if err.raw_os_error() == Some(EBUSY) => PlatformError::Busy(detail),
		_ => PlatformError::Other(detail),
	}
}
