//! Image identity and payload types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of an image.
///
/// The serialized names are the ones written into the ledger file and must
/// stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    /// Daily Bing wallpaper archive.
    BingWallpaper,
    /// Unsplash photo API.
    Unsplash,
    /// Google Arts & Culture asset pages.
    GoogleArt,
    /// A file on the local filesystem.
    LocalImage,
}

impl SourceName {
    /// Returns the ledger name of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BingWallpaper => "bing_wallpaper",
            Self::Unsplash => "unsplash",
            Self::GoogleArt => "google_art",
            Self::LocalImage => "local_image",
        }
    }

    /// Parses a ledger source name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bing_wallpaper" => Some(Self::BingWallpaper),
            "unsplash" => Some(Self::Unsplash),
            "google_art" => Some(Self::GoogleArt),
            "local_image" => Some(Self::LocalImage),
            _ => None,
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding token handed to the display on upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EncodingHint {
    /// JPEG data.
    Jpeg,
    /// PNG data.
    Png,
    /// Anything else, as an uppercase token (e.g. `WEBP`).
    Other(String),
}

impl EncodingHint {
    /// Infers the hint from a file extension.
    ///
    /// `jpg`/`jpeg` map to JPEG; any other extension is uppercased.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        let lower = ext.to_ascii_lowercase();
        match lower.as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            _ => Self::Other(lower.to_ascii_uppercase()),
        }
    }

    /// Infers the hint from an HTTP `Content-Type` header value.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(ct) = content_type else {
            return Self::Jpeg;
        };
        let mime = ct.split(';').next().unwrap_or_default().trim();
        match mime.strip_prefix("image/") {
            Some("jpeg" | "jpg" | "pjpeg") | None => Self::Jpeg,
            Some(sub) => Self::from_extension(sub),
        }
    }

    /// Returns the token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Other(token) => token,
        }
    }

    /// Returns a file extension for debug dumps.
    #[must_use]
    pub fn extension(&self) -> String {
        match self {
            Self::Jpeg => "jpg".to_string(),
            Self::Png => "png".to_string(),
            Self::Other(token) => token.to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for EncodingHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of aliases that denote one source image.
///
/// The primary value is what gets written as the ledger `file` field; the
/// aliases hold the display URL and any secondary id. Lookups match when any
/// candidate equals any stored alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIdentifier {
    primary: String,
    aliases: Vec<String>,
}

impl ImageIdentifier {
    /// Creates an identifier with only a primary value.
    #[must_use]
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            aliases: Vec::new(),
        }
    }

    /// Adds an alias. Empty strings and duplicates are ignored.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if !alias.is_empty() && alias != self.primary && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }

    /// Returns the primary value.
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Returns the secondary aliases.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Iterates over every candidate, primary first.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Returns true if `value` is one of the candidates.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.candidates().any(|c| c == value)
    }
}

impl fmt::Display for ImageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)
    }
}

/// Where an image lives once its identity is known, before any bytes are
/// downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocation {
    /// Source the location belongs to.
    pub source: SourceName,
    /// Identity used for the ledger lookup.
    pub identifier: ImageIdentifier,
    /// Resolver-specific pointer used to fetch the bytes (URL, path or asset id).
    pub locator: String,
    /// Human-facing URL for logs.
    pub display_url: String,
    /// The locator is a bare reference that the resolver still has to turn
    /// into a download URL during `fetch`.
    pub deferred: bool,
}

/// Raw bytes plus identity as produced by a resolver.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    /// Undecoded image bytes.
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`.
    pub encoding: EncodingHint,
    /// Identity of the image.
    pub identifier: ImageIdentifier,
    /// Human-facing URL.
    pub display_url: String,
    /// Origin of the image.
    pub source: SourceName,
}

/// Fixed-resolution JPEG derived from a [`ResolvedImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
}

impl NormalizedImage {
    /// Normalized images are always JPEG.
    #[must_use]
    pub const fn encoding(&self) -> EncodingHint {
        EncodingHint::Jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("jpg", "JPEG" ; "jpg")]
    #[test_case("JPEG", "JPEG" ; "upper jpeg")]
    #[test_case("png", "PNG" ; "png")]
    #[test_case("webp", "WEBP" ; "webp")]
    #[test_case("Tiff", "TIFF" ; "mixed case")]
    fn test_encoding_from_extension(ext: &str, expected: &str) {
        assert_eq!(EncodingHint::from_extension(ext).as_str(), expected);
    }

    #[test]
    fn test_encoding_from_content_type() {
        assert_eq!(
            EncodingHint::from_content_type(Some("image/jpeg; charset=binary")),
            EncodingHint::Jpeg
        );
        assert_eq!(
            EncodingHint::from_content_type(Some("image/png")),
            EncodingHint::Png
        );
        assert_eq!(EncodingHint::from_content_type(None), EncodingHint::Jpeg);
        assert_eq!(
            EncodingHint::from_content_type(Some("application/octet-stream")),
            EncodingHint::Jpeg
        );
    }

    #[test]
    fn test_identifier_aliases() {
        let id = ImageIdentifier::new("abc")
            .with_alias("https://example.com/abc")
            .with_alias("")
            .with_alias("abc")
            .with_alias("https://example.com/abc");

        assert_eq!(id.primary(), "abc");
        assert_eq!(id.aliases(), ["https://example.com/abc".to_string()]);
        assert_eq!(id.candidates().count(), 2);
        assert!(id.contains("https://example.com/abc"));
        assert!(!id.contains("other"));
    }

    #[test]
    fn test_source_name_roundtrip() {
        for source in [
            SourceName::BingWallpaper,
            SourceName::Unsplash,
            SourceName::GoogleArt,
            SourceName::LocalImage,
        ] {
            assert_eq!(SourceName::parse(source.as_str()), Some(source));
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
        assert_eq!(SourceName::parse("flickr"), None);
    }
}
