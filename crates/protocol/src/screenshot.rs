//! Screenshot ingestion endpoint contract.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Reasons a string is not an acceptable image data URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
	#[error("data URL must start with `data:image/`")]
	NotAnImage,
	#[error("data URL must be base64 encoded")]
	NotBase64,
	#[error("invalid image subtype `{0}`")]
	InvalidSubtype(String),
	#[error("data URL payload is empty")]
	EmptyPayload,
	#[error("data URL payload is not valid base64: {0}")]
	Decode(String),
}

/// An image encoded as `data:image/<subtype>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDataUrl {
	subtype: String,
	payload: String,
}

impl ImageDataUrl {
	/// Encodes raw image bytes under the given subtype (`png`, `jpeg`, ...).
	pub fn from_bytes(subtype: &str, bytes: &[u8]) -> Result<Self, DataUrlError> {
		validate_subtype(subtype)?;
		if bytes.is_empty() {
			return Err(DataUrlError::EmptyPayload);
		}
		Ok(Self {
			subtype: subtype.to_ascii_lowercase(),
			payload: STANDARD.encode(bytes),
		})
	}

	pub fn subtype(&self) -> &str {
		&self.subtype
	}

	/// Decodes the base64 payload back to image bytes.
	pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
		STANDARD.decode(&self.payload).map_err(|e| DataUrlError::Decode(e.to_string()))
	}

	/// File extension the sink derives from the declared subtype.
	pub fn file_extension(&self) -> &str {
		match self.subtype.as_str() {
			"jpeg" => "jpg",
			"svg+xml" => "svg",
			"x-icon" | "vnd.microsoft.icon" => "ico",
			other => other,
		}
	}

	/// Image subtype for a file extension, for callers uploading files from disk.
	pub fn subtype_for_extension(ext: &str) -> Option<&'static str> {
		match ext.to_ascii_lowercase().as_str() {
			"png" => Some("png"),
			"jpg" | "jpeg" => Some("jpeg"),
			"webp" => Some("webp"),
			"gif" => Some("gif"),
			"bmp" => Some("bmp"),
			"svg" => Some("svg+xml"),
			_ => None,
		}
	}
}

fn validate_subtype(subtype: &str) -> Result<(), DataUrlError> {
	let valid = !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
	if valid {
		Ok(())
	} else {
		Err(DataUrlError::InvalidSubtype(subtype.to_string()))
	}
}

impl FromStr for ImageDataUrl {
	type Err = DataUrlError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let rest = s.strip_prefix(PREFIX).ok_or(DataUrlError::NotAnImage)?;
		let (subtype, payload) = rest.split_once(BASE64_MARKER).ok_or(DataUrlError::NotBase64)?;
		validate_subtype(subtype)?;
		if payload.is_empty() {
			return Err(DataUrlError::EmptyPayload);
		}
		Ok(Self {
			subtype: subtype.to_ascii_lowercase(),
			payload: payload.to_string(),
		})
	}
}

impl fmt::Display for ImageDataUrl {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{PREFIX}{}{BASE64_MARKER}{}", self.subtype, self.payload)
	}
}

impl Serialize for ImageDataUrl {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for ImageDataUrl {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

/// Body of a POST to the screenshot ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
	pub client_id: String,
	pub source: String,
	pub component: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
	#[serde(rename = "dataURL")]
	pub data_url: ImageDataUrl,
}

/// Response of the screenshot ingestion endpoint.
///
/// Successful uploads carry the file name the sink wrote; rejected ones carry
/// a message alongside a client-error status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotResponse {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}
