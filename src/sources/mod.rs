//! Image sources.
//!
//! Each resolver turns an optional selector into an [`ImageLocation`]
//! (identity, no image bytes yet) and then into a [`ResolvedImage`]. The
//! split lets the acquisition layer consult the ledger before any image
//! download happens.
//!
//! | Source | Selector | Locate cost |
//! |--------|----------|-------------|
//! | Bing archive | `YYYY-MM-DD` or random date | offline |
//! | Local file | path (required) | offline |
//! | Unsplash | photo id or random landscape | one API call |
//! | Google Arts & Culture | asset id/URL or random asset | offline with selector, scraping without |

mod art;
mod bing;
mod local;
mod unsplash;

pub use art::{
    ArtArchiveSource, ManifestShape, asset_id_from_reference, find_manifest_image,
    full_resolution_url,
};
pub use bing::{BingWallpaperSource, random_date};
pub use local::LocalFileSource;
pub use unsplash::UnsplashSource;

use crate::config::FrameConfig;
use crate::http::HttpFetch;
use crate::models::{ImageLocation, ResolvedImage, SourceName};
use crate::{Error, Result};
use std::sync::Arc;

/// Trait for image resolvers.
pub trait ImageResolver: Send + Sync {
    /// The source this resolver serves.
    fn source(&self) -> SourceName;

    /// Establishes the identity of the image to use.
    ///
    /// Offline resolvers derive it without I/O; API-backed resolvers have to
    /// query their endpoint but never download image bytes here.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is invalid or the identity cannot be
    /// discovered.
    fn locate(&self, selector: Option<&str>) -> Result<ImageLocation>;

    /// Downloads (or reads) the bytes for a located image.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be obtained.
    fn fetch(&self, location: &ImageLocation) -> Result<ResolvedImage>;

    /// Locates and fetches in one step.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::locate`] or [`Self::fetch`].
    fn resolve(&self, selector: Option<&str>) -> Result<ResolvedImage> {
        let location = self.locate(selector)?;
        self.fetch(&location)
    }
}

/// Source and optional selector chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSelection {
    /// The source to resolve from.
    pub source: SourceName,
    /// Date, photo id, asset reference or path, depending on the source.
    pub selector: Option<String>,
}

impl SourceSelection {
    /// Creates a selection; blank selectors are treated as absent.
    #[must_use]
    pub fn new(source: SourceName, selector: Option<String>) -> Self {
        Self {
            source,
            selector: selector.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Returns the selector as a string slice.
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }
}

/// Builds the resolver for a selection.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the selected source is not configured
/// (Unsplash without an access key) and [`Error::InvalidInput`] if a local
/// image is selected without a path. There is no fallback source, so callers
/// treat both as fatal before touching any device.
pub fn build_resolver(
    selection: &SourceSelection,
    config: &FrameConfig,
    fetcher: Arc<dyn HttpFetch>,
) -> Result<Box<dyn ImageResolver>> {
    let resolver: Box<dyn ImageResolver> = match selection.source {
        SourceName::BingWallpaper => Box::new(BingWallpaperSource::new(fetcher, &config.bing)),
        SourceName::LocalImage => {
            if selection.selector.is_none() {
                return Err(Error::InvalidInput("local image path is empty".to_string()));
            }
            Box::new(LocalFileSource::new())
        },
        SourceName::Unsplash => {
            if config.unsplash.access_key.is_none() {
                return Err(Error::Configuration(
                    "Unsplash source selected but no access key configured \
                     (set UNSPLASH_ACCESS_KEY or unsplash.access_key)"
                        .to_string(),
                ));
            }
            Box::new(UnsplashSource::new(
                fetcher,
                &config.unsplash,
                config.target_width,
                config.target_height,
            ))
        },
        SourceName::GoogleArt => Box::new(ArtArchiveSource::new(fetcher, &config.art)),
    };
    Ok(resolver)
}
