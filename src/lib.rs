//! # Frameart
//!
//! Pulls a display image from a remote or local source, normalizes it to the
//! panel resolution and pushes it to one or more art-mode displays.
//!
//! Repeat runs stay cheap: every successful upload is recorded in a ledger
//! keyed by source, image aliases and (for multi-device runs) the device
//! address, so an image already resident on a device is selected again
//! instead of being transferred twice.
//!
//! ## Layers
//!
//! - [`sources`]: one resolver per origin (Bing archive, Unsplash, Google
//!   Arts & Culture, local file)
//! - [`imaging`]: resize + center crop + JPEG re-encode
//! - [`storage`]: the upload ledger
//! - [`services`]: acquisition orchestration and the per-device run loop
//! - [`device`]: the display collaborator interface
//!
//! ## Example
//!
//! ```rust,ignore
//! use frameart::services::{AcquisitionService, FrameService, RunOptions};
//! use frameart::sources::BingWallpaperSource;
//! use frameart::storage::Ledger;
//!
//! let ledger = Ledger::load("uploaded_files.json")?;
//! let acquisition = AcquisitionService::new(Box::new(source), ledger, normalizer);
//! let summary = FrameService::new(acquisition, &connector).run(&devices, None, &options)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod device;
pub mod http;
pub mod imaging;
pub mod models;
pub mod observability;
pub mod services;
pub mod sources;
pub mod storage;

// Re-exports for convenience
pub use config::FrameConfig;
pub use device::{DeviceConnector, DirectoryDevice, FrameDevice};
pub use http::{HttpFetch, HttpResponse};
pub use imaging::Normalizer;
pub use models::{
    EncodingHint, ImageIdentifier, ImageLocation, MatteOption, NormalizedImage, PhotoFilter,
    ResolvedImage, SourceName,
};
pub use services::{AcquisitionService, FrameService, RunOptions, RunSummary};
pub use sources::ImageResolver;
pub use storage::{Ledger, LedgerEntry};

/// Error type for frameart operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Configuration` | A source needs a credential or setting that is missing |
/// | `Fetch` | Transport failure, timeout or non-2xx response |
/// | `Parse` | An upstream response has an unexpected shape |
/// | `Resolution` | Every discovery fallback of a source was exhausted |
/// | `Decode` | Bytes are not a decodable raster image |
/// | `Dimension` | The decoded image has a zero width or height |
/// | `FileRead` | A local image cannot be read |
/// | `Device` | The display rejected or failed an operation |
/// | `Ledger` | The ledger file cannot be read or rewritten |
/// | `InvalidInput` | Fatal setup problems (no devices, bad tokens, unusable log file) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A source is selected but not configured.
    ///
    /// Raised when:
    /// - The Unsplash source runs without an access key
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A network request failed.
    ///
    /// Raised when:
    /// - The connection or request timed out
    /// - The server answered with a non-2xx status
    /// - The response body could not be read
    #[error("fetch of '{url}' failed: {cause}")]
    Fetch {
        /// The requested URL.
        url: String,
        /// The underlying cause.
        cause: String,
    },

    /// An upstream response could not be interpreted.
    #[error("unexpected response from '{context}': {cause}")]
    Parse {
        /// Where the response came from.
        context: String,
        /// What was wrong with it.
        cause: String,
    },

    /// No image could be discovered after all fallbacks.
    #[error("no image resolved for '{subject}': {cause}")]
    Resolution {
        /// The asset, selector or source that was being resolved.
        subject: String,
        /// Summary of why discovery gave up.
        cause: String,
    },

    /// Image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Image has a degenerate size.
    #[error("invalid image dimensions {width}x{height}")]
    Dimension {
        /// Source width.
        width: u32,
        /// Source height.
        height: u32,
    },

    /// A local image file could not be read.
    #[error("cannot read '{path}': {cause}")]
    FileRead {
        /// The file path.
        path: String,
        /// The underlying cause.
        cause: String,
    },

    /// A display operation failed.
    #[error("device {device}: {cause}")]
    Device {
        /// Device address.
        device: String,
        /// The underlying cause.
        cause: String,
    },

    /// The upload ledger could not be read or written.
    #[error("ledger operation '{operation}' failed: {cause}")]
    Ledger {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Returns true for errors that must stop the whole run before any device
    /// is touched.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidInput(_))
    }
}

/// Result type alias for frameart operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Fetch {
            url: "https://example.com/a.jpg".to_string(),
            cause: "status 404".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fetch of 'https://example.com/a.jpg' failed: status 404"
        );

        let err = Error::Dimension {
            width: 0,
            height: 10,
        };
        assert_eq!(err.to_string(), "invalid image dimensions 0x10");

        let err = Error::Configuration("UNSPLASH_ACCESS_KEY not set".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: UNSPLASH_ACCESS_KEY not set"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::InvalidInput("no devices".to_string()).is_fatal());
        assert!(Error::Configuration("missing key".to_string()).is_fatal());
        assert!(
            !Error::Resolution {
                subject: "abc".to_string(),
                cause: "none".to_string(),
            }
            .is_fatal()
        );
        assert!(!Error::Decode("bad".to_string()).is_fatal());
    }
}
