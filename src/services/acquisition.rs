//! Acquisition orchestration.
//!
//! Decides per device whether an image has to be downloaded at all: the
//! resolver first establishes identity, the ledger is consulted, and only on
//! a miss are bytes fetched and normalized.

use crate::imaging::Normalizer;
use crate::models::{ImageIdentifier, ImageLocation, NormalizedImage, ResolvedImage, SourceName};
use crate::sources::ImageResolver;
use crate::storage::{Ledger, LedgerEntry};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A normalized image ready for upload, with the identity to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    /// Normalized JPEG.
    pub normalized: NormalizedImage,
    /// Identity of the source image.
    pub identifier: ImageIdentifier,
    /// Human-facing URL.
    pub display_url: String,
    /// Origin of the image.
    pub source: SourceName,
}

/// Outcome of acquiring an image for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// The image is already on the device under `handle`.
    Cached {
        /// Handle recorded in the ledger.
        handle: String,
        /// Human-facing URL of the image.
        display_url: String,
    },
    /// The image must be uploaded.
    Fresh(Arc<PreparedImage>),
}

/// An image located once and shared by every device of a run.
///
/// Bytes are fetched and normalized on the first device that misses the
/// ledger and reused for the rest.
#[derive(Debug)]
pub struct SharedImage {
    location: ImageLocation,
    prepared: Option<Arc<PreparedImage>>,
}

impl SharedImage {
    /// The shared location.
    #[must_use]
    pub const fn location(&self) -> &ImageLocation {
        &self.location
    }

    /// Returns true once the bytes have been fetched.
    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }
}

/// Service that turns a selector into an upload decision.
pub struct AcquisitionService {
    resolver: Box<dyn ImageResolver>,
    ledger: Ledger,
    normalizer: Normalizer,
    debug_dir: Option<PathBuf>,
}

impl AcquisitionService {
    /// Creates a service owning the resolver and the ledger snapshot.
    #[must_use]
    pub fn new(resolver: Box<dyn ImageResolver>, ledger: Ledger, normalizer: Normalizer) -> Self {
        Self {
            resolver,
            ledger,
            normalizer,
            debug_dir: None,
        }
    }

    /// Saves original and normalized bytes into `dir` on every fetch.
    #[must_use]
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// The source served by this service.
    #[must_use]
    pub fn source(&self) -> SourceName {
        self.resolver.source()
    }

    /// Read access to the ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Acquires an image for one device.
    ///
    /// `scope` is the device address for multi-device runs and `None`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error, or [`crate::Error::Decode`] /
    /// [`crate::Error::Dimension`] if the fetched bytes cannot be normalized.
    pub fn acquire(&self, selector: Option<&str>, scope: Option<&str>) -> Result<Acquisition> {
        let location = self.resolver.locate(selector)?;
        if let Some(cached) = self.cached(&location.identifier, &location.display_url, scope) {
            return Ok(cached);
        }

        let resolved = self.resolver.fetch(&location)?;
        // Fetching can reveal more aliases (canonical pages, redirects).
        if let Some(cached) = self.cached(&resolved.identifier, &resolved.display_url, scope) {
            return Ok(cached);
        }
        Ok(Acquisition::Fresh(Arc::new(self.prepare(resolved)?)))
    }

    /// Locates the image once for a shared-image run.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error.
    pub fn locate_shared(&self, selector: Option<&str>) -> Result<SharedImage> {
        let location = self.resolver.locate(selector)?;
        tracing::info!(
            source = %location.source,
            identifier = %location.identifier,
            url = %location.display_url,
            "Located shared image"
        );
        Ok(SharedImage {
            location,
            prepared: None,
        })
    }

    /// Acquires the shared image for one device.
    ///
    /// The ledger lookup is still made per device; fetching and normalizing
    /// happen at most once per [`SharedImage`].
    ///
    /// # Errors
    ///
    /// Returns the resolver's or normalizer's error on the first miss.
    pub fn acquire_shared(&self, shared: &mut SharedImage, scope: Option<&str>) -> Result<Acquisition> {
        let (identifier, display_url) = shared.prepared.as_ref().map_or(
            (&shared.location.identifier, &shared.location.display_url),
            |p| (&p.identifier, &p.display_url),
        );
        if let Some(cached) = self.cached(identifier, display_url, scope) {
            return Ok(cached);
        }

        if let Some(prepared) = &shared.prepared {
            tracing::debug!(identifier = %prepared.identifier, "Reusing shared image bytes");
            return Ok(Acquisition::Fresh(Arc::clone(prepared)));
        }

        let resolved = self.resolver.fetch(&shared.location)?;
        let prepared = Arc::new(self.prepare(resolved)?);
        shared.prepared = Some(Arc::clone(&prepared));
        if let Some(cached) = self.cached(&prepared.identifier, &prepared.display_url, scope) {
            return Ok(cached);
        }
        Ok(Acquisition::Fresh(prepared))
    }

    /// Records a successful upload in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Ledger`] if the ledger file cannot be
    /// rewritten.
    pub fn record_upload(
        &mut self,
        image: &PreparedImage,
        handle: &str,
        scope: Option<&str>,
    ) -> Result<()> {
        self.ledger.insert(LedgerEntry::new(
            image.source,
            &image.identifier,
            &image.display_url,
            handle,
            scope,
        ))
    }

    fn cached(
        &self,
        identifier: &ImageIdentifier,
        display_url: &str,
        scope: Option<&str>,
    ) -> Option<Acquisition> {
        let candidates = identifier.candidates().chain(std::iter::once(display_url));
        let handle = self.ledger.lookup(self.resolver.source(), candidates, scope)?;
        tracing::info!(
            identifier = %identifier,
            handle = %handle,
            device = scope.unwrap_or("-"),
            "Image already on device, skipping download"
        );
        Some(Acquisition::Cached {
            handle: handle.to_string(),
            display_url: display_url.to_string(),
        })
    }

    fn prepare(&self, resolved: ResolvedImage) -> Result<PreparedImage> {
        tracing::info!(
            source = %resolved.source,
            identifier = %resolved.identifier,
            url = %resolved.display_url,
            bytes = resolved.bytes.len(),
            "Fetched image"
        );
        self.dump(
            &format!("debug_{}_original.{}", resolved.source, resolved.encoding.extension()),
            &resolved.bytes,
        );

        let normalized = self.normalizer.normalize(&resolved.bytes)?;
        self.dump(&format!("debug_{}_resized.jpg", resolved.source), &normalized.bytes);

        Ok(PreparedImage {
            normalized,
            identifier: resolved.identifier,
            display_url: resolved.display_url,
            source: resolved.source,
        })
    }

    fn dump(&self, name: &str, bytes: &[u8]) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let path: PathBuf = Path::new(dir).join(name);
        match std::fs::write(&path, bytes) {
            Ok(()) => tracing::info!(path = %path.display(), "Debug image saved"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Cannot save debug image"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted resolver for orchestration tests.

    use crate::models::{EncodingHint, ImageIdentifier, ImageLocation, ResolvedImage, SourceName};
    use crate::sources::ImageResolver;
    use crate::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Resolver with a fixed identity that counts locate/fetch calls.
    pub struct StubResolver {
        pub identifier: ImageIdentifier,
        pub display_url: String,
        pub bytes: Vec<u8>,
        pub fail_fetch: bool,
        pub locates: Arc<AtomicUsize>,
        pub fetches: Arc<AtomicUsize>,
    }

    impl StubResolver {
        pub fn new(id: &str, bytes: Vec<u8>) -> Self {
            Self {
                identifier: ImageIdentifier::new(id),
                display_url: format!("https://example.org/{id}"),
                bytes,
                fail_fetch: false,
                locates: Arc::new(AtomicUsize::new(0)),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ImageResolver for StubResolver {
        fn source(&self) -> SourceName {
            SourceName::BingWallpaper
        }

        fn locate(&self, _selector: Option<&str>) -> Result<ImageLocation> {
            self.locates.fetch_add(1, Ordering::SeqCst);
            Ok(ImageLocation {
                source: SourceName::BingWallpaper,
                identifier: self.identifier.clone(),
                locator: self.display_url.clone(),
                display_url: self.display_url.clone(),
                deferred: false,
            })
        }

        fn fetch(&self, location: &ImageLocation) -> Result<ResolvedImage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch {
                return Err(Error::Fetch {
                    url: location.locator.clone(),
                    cause: "status 503".to_string(),
                });
            }
            Ok(ResolvedImage {
                bytes: self.bytes.clone(),
                encoding: EncodingHint::Png,
                identifier: location.identifier.clone(),
                display_url: location.display_url.clone(),
                source: SourceName::BingWallpaper,
            })
        }
    }

    /// A small PNG.
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }
}
