//! Wire types for the camscan diagnostic sink.
//!
//! The sink exposes two JSON endpoints:
//!
//! - the log ingestion endpoint, which accepts a [`LogRequest`] and answers with a [`LogResponse`]
//! - the screenshot ingestion endpoint, which accepts a [`ScreenshotRequest`] carrying an
//!   [`ImageDataUrl`] and answers with a [`ScreenshotResponse`]
//!
//! Field names follow the sink's camelCase contract. Every field of a request is optional on the
//! wire; the defaults the sink applies are encoded here so both sides agree on them.

pub mod log;
pub mod screenshot;

pub use log::{LogLevel, LogRequest, LogResponse, LogSource};
pub use screenshot::{DataUrlError, ImageDataUrl, ScreenshotRequest, ScreenshotResponse};
