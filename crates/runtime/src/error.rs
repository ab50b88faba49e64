//! Error types for the diagnostic transport.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors surfaced by the awaited parts of the transport.
///
/// Fire-and-forget log delivery never returns these; they only come out of
/// construction and screenshot uploads.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The transport was built without network delivery.
	#[error("network delivery is not configured")]
	Disabled,

	/// The HTTP client could not be built.
	#[error("failed to build HTTP client: {0}")]
	Client(#[source] reqwest::Error),

	/// The request never produced a response.
	#[error("request to {url} failed: {source}")]
	Request {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	/// The sink answered with a non-success status.
	#[error("sink rejected request with status {status}: {message}")]
	Rejected { status: u16, message: String },

	/// The sink answered with a body we could not understand.
	#[error("invalid response from sink: {0}")]
	InvalidResponse(String),
}
