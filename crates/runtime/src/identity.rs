//! Per-session client identity.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Environment variable a parent process can use to hand its identity down.
pub const CLIENT_ID_ENV: &str = "CAMSCAN_CLIENT_ID";

/// Identifies one client session in every record sent to the sink.
///
/// Constructed once per session and cloned into every component that emits
/// records. Clones share the same id; nothing regenerates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(Arc<str>);

impl ClientIdentity {
	/// Creates a fresh random identity.
	pub fn generate() -> Self {
		let id = Uuid::new_v4().simple().to_string();
		Self(Arc::from(format!("client-{}", &id[..12])))
	}

	/// Wraps an existing id, e.g. one restored from the environment.
	pub fn from_id(id: impl Into<Arc<str>>) -> Self {
		Self(id.into())
	}

	/// Reuses [`CLIENT_ID_ENV`] when set, otherwise generates a new identity.
	pub fn from_env_or_generate() -> Self {
		Self::from_inherited(std::env::var(CLIENT_ID_ENV).ok())
	}

	fn from_inherited(inherited: Option<String>) -> Self {
		match inherited.as_deref().map(str::trim) {
			Some(id) if !id.is_empty() => Self::from_id(id),
			_ => Self::generate(),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ClientIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
