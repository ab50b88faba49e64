//! camscan runtime - diagnostic transport and client identity
//!
//! Every lifecycle event of the scanner is mirrored to a remote sink for
//! debugging. This crate owns that path:
//!
//! - **Identity**: one [`ClientIdentity`] per session, created once and passed down
//! - **Records**: immutable [`LogRecord`] values stamped at construction
//! - **Delivery**: a strategy chain (beacon queue, then keepalive post) behind a
//!   non-propagating failure boundary
//! - **Transport**: [`LogTransport`] renders to the local console first, then
//!   delivers at most once
//!
//! ```text
//! Logger ──► LogTransport ──► console (tracing)
//!                   │
//!                   └──► DeliveryChain ──► BeaconDelivery ──► sink
//!                                     └──► KeepaliveDelivery ─┘
//! ```

pub mod delivery;
pub mod error;
pub mod identity;
pub mod logger;
pub mod record;
pub mod transport;

pub use camscan_protocol::{LogLevel, LogSource};
pub use delivery::{BeaconDelivery, Delivery, DeliveryChain, DeliveryError, InFlight, KeepaliveDelivery};
pub use error::{Result, TransportError};
pub use identity::ClientIdentity;
pub use logger::Logger;
pub use record::{LogRecord, UNSERIALIZABLE_PLACEHOLDER};
pub use transport::{LogTransport, ScreenshotUpload, TransportConfig};
