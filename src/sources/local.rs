//! Local image files.

use super::ImageResolver;
use crate::models::{EncodingHint, ImageIdentifier, ImageLocation, ResolvedImage, SourceName};
use crate::{Error, Result};
use std::path::Path;

/// Resolver for a file on disk. The path string is both identity and
/// display URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSource;

impl LocalFileSource {
    /// Creates a resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Picks the encoding hint from the extension, sniffing the bytes when
    /// the file has none.
    fn encoding_for(path: &Path, bytes: &[u8]) -> EncodingHint {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => EncodingHint::from_extension(ext),
            _ => image::guess_format(bytes)
                .ok()
                .and_then(|f| f.extensions_str().first().copied())
                .map_or(EncodingHint::Jpeg, EncodingHint::from_extension),
        }
    }
}

impl ImageResolver for LocalFileSource {
    fn source(&self) -> SourceName {
        SourceName::LocalImage
    }

    fn locate(&self, selector: Option<&str>) -> Result<ImageLocation> {
        let path = selector
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::InvalidInput("local image path is empty".to_string()))?;

        Ok(ImageLocation {
            source: SourceName::LocalImage,
            identifier: ImageIdentifier::new(path),
            locator: path.to_string(),
            display_url: path.to_string(),
            deferred: false,
        })
    }

    fn fetch(&self, location: &ImageLocation) -> Result<ResolvedImage> {
        let path = Path::new(&location.locator);
        let bytes = std::fs::read(path).map_err(|e| Error::FileRead {
            path: location.locator.clone(),
            cause: e.to_string(),
        })?;

        Ok(ResolvedImage {
            encoding: Self::encoding_for(path, &bytes),
            bytes,
            identifier: location.identifier.clone(),
            display_url: location.display_url.clone(),
            source: SourceName::LocalImage,
        })
    }
}
