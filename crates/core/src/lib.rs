//! camscan - camera session lifecycle for continuous code scanning
//!
//! The crate sequences everything between "the user picked a camera" and
//! "decoded codes are flowing":
//!
//! - **Capabilities**: [`VideoPlatform`] (enumerate/acquire video hardware) and
//!   [`DecoderFactory`] (build a decode engine bound to a stream) are supplied
//!   by the embedding application
//! - **Catalog**: [`DeviceCatalog`] filters platform devices to video inputs
//! - **Primer**: [`PermissionPrimer`] unlocks labels with a throwaway capture
//! - **Controller**: [`SessionController`] owns at most one live session and
//!   discards the results of operations overtaken by a stop or teardown
//!
//! Every step is mirrored to the diagnostic sink through a
//! [`camscan_runtime::Logger`].

pub mod catalog;
pub mod decoder;
pub mod error;
pub mod platform;
pub mod primer;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{DeviceCatalog, DeviceDescriptor};
pub use decoder::{DecodeEngine, DecodeEvent, DecodeEvents, DecodeResult, DecoderConfig, DecoderFactory, ScanMode};
pub use error::{DecodeError, PlatformError, Result, ScanError, StartFailure};
pub use platform::{DeviceKind, HardwareClaim, HardwareGate, HardwareStream, OwnedStream, RawDevice, StreamConstraints, StreamSink, VideoPlatform};
pub use primer::PermissionPrimer;
pub use session::{ControllerConfig, ControllerSnapshot, ScanEvent, SessionController, SessionStatus};
