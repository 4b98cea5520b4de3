//! Google Arts & Culture asset pages.
//!
//! The site has no public API, so discovery is a chain of scraping steps.
//! Each step either produces an image URL or falls through to the next one:
//!
//! 1. Asset page: embedded IIIF manifest reference, then the manifest itself
//! 2. Alternate per-asset metadata endpoints, same manifest extraction
//! 3. JSON-LD `image`, then `og:image` from the asset page
//!
//! Without an explicit asset the random endpoint is tried a bounded number of
//! times and the asset id is read from the redirect target or page body.
//! Image URLs on the Google image hosts are rewritten to request the original
//! size.

mod manifest;
mod page;

pub use manifest::{ManifestShape, find_manifest_image};

use super::ImageResolver;
use crate::config::ArtConfig;
use crate::http::HttpFetch;
use crate::models::{EncodingHint, ImageIdentifier, ImageLocation, ResolvedImage, SourceName};
use crate::{Error, Result};
use reqwest::Url;
use std::sync::Arc;

/// Hosts whose URLs carry a `=<size options>` suffix.
const IMAGE_HOSTS: [&str; 2] = ["googleusercontent.com", "ggpht.com"];

/// Reduces an asset reference to its id.
///
/// Accepts a bare id or a browsable URL, in which case the trailing non-empty
/// path segment is the id.
///
/// # Errors
///
/// Returns [`Error::Resolution`] if no id can be extracted or it contains
/// characters outside `[A-Za-z0-9_-]`.
pub fn asset_id_from_reference(reference: &str) -> Result<String> {
    let trimmed = reference.trim();
    let invalid = |cause: &str| Error::Resolution {
        subject: reference.to_string(),
        cause: cause.to_string(),
    };

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        let url = Url::parse(trimmed).map_err(|e| invalid(&format!("invalid URL: {e}")))?;
        url.path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(str::to_string)
            .ok_or_else(|| invalid("URL has no path"))?
    } else {
        trimmed.trim_matches('/').to_string()
    };

    if candidate.is_empty()
        || !candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid("not an asset id"));
    }
    Ok(candidate)
}

/// Rewrites an image-host URL to request the original resolution.
///
/// URLs on other hosts, and URLs whose last segment looks like a file name,
/// are returned unchanged.
#[must_use]
pub fn full_resolution_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let on_image_host = parsed
        .host_str()
        .is_some_and(|host| IMAGE_HOSTS.iter().any(|h| host.ends_with(h)));
    if !on_image_host {
        return url.to_string();
    }

    let path = parsed.path().to_string();
    let (dir, last) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
    let rewritten = if let Some((stem, _)) = last.split_once('=') {
        format!("{stem}=s0")
    } else if !last.is_empty() && !last.contains('.') {
        format!("{last}=s0")
    } else {
        return url.to_string();
    };

    parsed.set_path(&format!("{dir}/{rewritten}"));
    parsed.to_string()
}

/// Image found for an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Discovery {
    image_url: String,
    page_url: String,
}

/// Resolver for Google Arts & Culture assets.
pub struct ArtArchiveSource {
    fetcher: Arc<dyn HttpFetch>,
    base_url: String,
    random_attempts: usize,
}

impl ArtArchiveSource {
    /// Creates a resolver from config.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetch>, config: &ArtConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            random_attempts: config.random_attempts.clamp(1, 5),
        }
    }

    /// Returns the asset page URL for an id.
    #[must_use]
    pub fn asset_url(&self, id: &str) -> String {
        format!("{}/asset/{id}", self.base_url)
    }

    fn random_url(&self) -> String {
        format!("{}/random", self.base_url)
    }

    fn metadata_urls(&self, id: &str) -> [String; 3] {
        [
            format!("{}/api/asset/{id}?hl=en", self.base_url),
            format!("{}/asset/{id}?hl=en&format=json", self.base_url),
            format!("{}/asset/-/{id}", self.base_url),
        ]
    }

    /// Fetches a manifest and walks it for an image.
    fn image_from_manifest(&self, manifest_url: &str) -> Option<String> {
        let manifest = match self.fetcher.get(manifest_url, &[]).and_then(|r| r.json()) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!(url = %manifest_url, error = %e, "Manifest unavailable");
                return None;
            },
        };
        let found = find_manifest_image(&manifest);
        match &found {
            Some((shape, url)) => {
                tracing::debug!(url = %url, shape = ?shape, "Image found in manifest");
            },
            None => tracing::debug!(url = %manifest_url, "Manifest has no image resource"),
        }
        found.map(|(_, url)| url)
    }

    /// Runs the discovery chain for one asset.
    fn discover(&self, id: &str) -> Result<Discovery> {
        let default_page = self.asset_url(id);

        let html = match self.fetcher.get(&default_page, &[]) {
            Ok(response) => Some(response.text()),
            Err(e) => {
                tracing::debug!(asset = %id, error = %e, "Asset page unavailable");
                None
            },
        };
        let page_url = html
            .as_deref()
            .and_then(page::extract_canonical)
            .unwrap_or_else(|| default_page.clone());
        let found = |image_url: String| Discovery {
            image_url: full_resolution_url(&image_url),
            page_url: page_url.clone(),
        };

        if let Some(image_url) = html
            .as_deref()
            .and_then(page::extract_manifest_url)
            .and_then(|m| self.image_from_manifest(&m))
        {
            return Ok(found(image_url));
        }

        for url in self.metadata_urls(id) {
            let Ok(response) = self.fetcher.get(&url, &[]) else {
                tracing::debug!(url = %url, "Metadata endpoint unavailable");
                continue;
            };
            let manifest_url = response
                .json()
                .ok()
                .and_then(|json| page::manifest_url_in_json(&json))
                .or_else(|| page::extract_manifest_url(&response.text()));
            if let Some(image_url) = manifest_url.and_then(|m| self.image_from_manifest(&m)) {
                return Ok(found(image_url));
            }
        }

        if let Some(image_url) = html.as_deref().and_then(|html| {
            page::extract_json_ld_image(html).or_else(|| page::extract_og_image(html))
        }) {
            tracing::debug!(asset = %id, "Using page metadata image");
            return Ok(found(image_url));
        }

        Err(Error::Resolution {
            subject: id.to_string(),
            cause: "no manifest, metadata or page image found".to_string(),
        })
    }

    /// Draws random assets until one can be discovered.
    fn locate_random(&self) -> Result<ImageLocation> {
        let random_url = self.random_url();
        for attempt in 1..=self.random_attempts {
            let response = match self.fetcher.get(&random_url, &[]) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Random asset request failed");
                    continue;
                },
            };
            let Some(id) = page::asset_id_in_url(&response.final_url)
                .or_else(|| page::asset_id_in_body(&response.text()))
            else {
                tracing::debug!(attempt, url = %response.final_url, "No asset id in random page");
                continue;
            };

            match self.discover(&id) {
                Ok(discovery) => return Ok(self.location(&id, discovery)),
                Err(e) => tracing::debug!(attempt, asset = %id, error = %e, "Random asset unusable"),
            }
        }

        Err(Error::Resolution {
            subject: random_url,
            cause: format!("no usable asset after {} attempts", self.random_attempts),
        })
    }

    fn location(&self, id: &str, discovery: Discovery) -> ImageLocation {
        ImageLocation {
            source: SourceName::GoogleArt,
            identifier: ImageIdentifier::new(id).with_alias(discovery.page_url.clone()),
            locator: discovery.image_url,
            display_url: discovery.page_url,
            deferred: false,
        }
    }
}

impl ImageResolver for ArtArchiveSource {
    fn source(&self) -> SourceName {
        SourceName::GoogleArt
    }

    fn locate(&self, selector: Option<&str>) -> Result<ImageLocation> {
        let Some(reference) = selector else {
            return self.locate_random();
        };

        let id = asset_id_from_reference(reference)?;
        Ok(ImageLocation {
            source: SourceName::GoogleArt,
            identifier: ImageIdentifier::new(id.clone()),
            locator: id.clone(),
            display_url: self.asset_url(&id),
            deferred: true,
        })
    }

    fn fetch(&self, location: &ImageLocation) -> Result<ResolvedImage> {
        // Random locations are discovered already; explicit ones carry the id.
        let location = if location.deferred {
            let id = location.identifier.primary();
            let discovery = self.discover(id)?;
            ImageLocation {
                identifier: location.identifier.clone().with_alias(discovery.page_url.clone()),
                ..self.location(id, discovery)
            }
        } else {
            location.clone()
        };
        tracing::debug!(
            asset = %location.identifier,
            url = %location.locator,
            "Downloading artwork"
        );

        let response = self.fetcher.get(&location.locator, &[])?;
        if response.body.is_empty() {
            return Err(Error::Fetch {
                url: location.locator,
                cause: "empty body".to_string(),
            });
        }

        Ok(ResolvedImage {
            encoding: EncodingHint::from_content_type(response.content_type.as_deref()),
            bytes: response.body,
            identifier: location.identifier,
            display_url: location.display_url,
            source: SourceName::GoogleArt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::FakeFetcher;
    use test_case::test_case;

    const BASE: &str = "https://artsandculture.google.com";

    fn source(fetcher: FakeFetcher) -> (ArtArchiveSource, Arc<FakeFetcher>) {
        let fetcher = Arc::new(fetcher);
        let source = ArtArchiveSource::new(fetcher.clone(), &ArtConfig::default());
        (source, fetcher)
    }

    fn manifest_json(image: &str) -> String {
        format!(
            r#"{{"sequences": [{{"canvases": [{{"images": [{{"resource": {{"@id": "{image}"}}}}]}}]}}]}}"#
        )
    }

    #[test_case("XyZ123" => "XyZ123".to_string(); "bare id")]
    #[test_case("https://artsandculture.google.com/asset/abc/XyZ123" => "XyZ123".to_string(); "url")]
    #[test_case("https://artsandculture.google.com/asset/abc/XyZ123/?hl=en" => "XyZ123".to_string(); "trailing slash and query")]
    #[test_case(" /XyZ123/ " => "XyZ123".to_string(); "padded")]
    fn test_asset_id_from_reference(reference: &str) -> String {
        asset_id_from_reference(reference).unwrap()
    }

    #[test_case(""; "empty")]
    #[test_case("https://artsandculture.google.com/"; "url without path")]
    #[test_case("not an id"; "spaces")]
    fn test_asset_id_rejects(reference: &str) {
        assert!(matches!(
            asset_id_from_reference(reference),
            Err(Error::Resolution { .. })
        ));
    }

    #[test_case("https://lh3.googleusercontent.com/ci/AbC=w800-h600" => "https://lh3.googleusercontent.com/ci/AbC=s0".to_string(); "size suffix")]
    #[test_case("https://lh5.ggpht.com/AbCdEf" => "https://lh5.ggpht.com/AbCdEf=s0".to_string(); "no suffix")]
    #[test_case("https://lh3.googleusercontent.com/img/photo.jpg" => "https://lh3.googleusercontent.com/img/photo.jpg".to_string(); "file name")]
    #[test_case("https://example.org/AbC=w800" => "https://example.org/AbC=w800".to_string(); "other host")]
    #[test_case("not a url" => "not a url".to_string(); "unparseable")]
    fn test_full_resolution_url(url: &str) -> String {
        full_resolution_url(url)
    }

    #[test]
    fn test_locate_with_selector_is_offline() {
        let (source, fetcher) = source(FakeFetcher::new());
        let location = source
            .locate(Some("https://artsandculture.google.com/asset/night/AbC123"))
            .unwrap();
        assert_eq!(location.identifier.primary(), "AbC123");
        assert_eq!(location.display_url, format!("{BASE}/asset/AbC123"));
        assert!(location.deferred);
        assert!(fetcher.requested().is_empty());
    }

    #[test]
    fn test_id_starting_with_http_still_discovered() {
        let (source, fetcher) = source(
            FakeFetcher::new()
                .route(
                    &format!("{BASE}/asset/httpAbC123"),
                    "text/html",
                    r#"<meta property="og:image" content="https://lh3.ggpht.com/h=w640">"#,
                )
                .route("https://lh3.ggpht.com/h=s0", "image/jpeg", vec![4]),
        );

        let image = source.resolve(Some("httpAbC123")).unwrap();
        assert_eq!(image.bytes, vec![4]);
        assert_eq!(image.identifier.primary(), "httpAbC123");
        let requested = fetcher.requested();
        assert_eq!(
            requested.first().cloned(),
            Some(format!("{BASE}/asset/httpAbC123"))
        );
        assert!(!requested.iter().any(|u| u == "httpAbC123"));
    }

    #[test]
    fn test_resolve_through_page_manifest() {
        let page = r#"<html><head>
            <link rel="canonical" href="https://artsandculture.google.com/asset/night/AbC123">
            </head><script>var d = {"iiifManifestUrl":"https:\/\/example.org\/m\/AbC123"};</script></html>"#;
        let (source, fetcher) = source(
            FakeFetcher::new()
                .route(&format!("{BASE}/asset/AbC123"), "text/html", page)
                .route(
                    "https://example.org/m/AbC123",
                    "application/json",
                    manifest_json("https://lh3.googleusercontent.com/x=w512"),
                )
                .route("https://lh3.googleusercontent.com/x=s0", "image/jpeg", vec![1, 2]),
        );

        let image = source.resolve(Some("AbC123")).unwrap();
        assert_eq!(image.bytes, vec![1, 2]);
        assert_eq!(image.identifier.primary(), "AbC123");
        assert!(
            image
                .identifier
                .contains("https://artsandculture.google.com/asset/night/AbC123")
        );
        assert_eq!(
            image.display_url,
            "https://artsandculture.google.com/asset/night/AbC123"
        );
        assert_eq!(
            fetcher.requested().last().map(String::as_str),
            Some("https://lh3.googleusercontent.com/x=s0")
        );
    }

    #[test]
    fn test_falls_back_to_metadata_endpoint() {
        let (source, _) = source(
            FakeFetcher::new()
                .route(&format!("{BASE}/asset/AbC123"), "text/html", "<html></html>")
                .route(
                    &format!("{BASE}/asset/AbC123?hl=en&format=json"),
                    "application/json",
                    r#"{"asset": {"manifestUrl": "https://example.org/m2"}}"#,
                )
                .route(
                    "https://example.org/m2",
                    "application/json",
                    r#"{"items": [{"items": [{"items": [{"body": {"id": "https://example.org/full.png", "type": "Image"}}]}]}]}"#,
                )
                .route("https://example.org/full.png", "image/png", vec![9]),
        );

        let image = source.resolve(Some("AbC123")).unwrap();
        assert_eq!(image.encoding, EncodingHint::Png);
        assert_eq!(image.display_url, format!("{BASE}/asset/AbC123"));
    }

    #[test]
    fn test_falls_back_to_json_ld() {
        let page = r#"<script type="application/ld+json">{"image": "https://lh3.ggpht.com/LD"}</script>"#;
        let (source, _) = source(
            FakeFetcher::new()
                .route(&format!("{BASE}/asset/AbC123"), "text/html", page)
                .route("https://lh3.ggpht.com/LD=s0", "image/jpeg", vec![7]),
        );
        assert_eq!(source.resolve(Some("AbC123")).unwrap().bytes, vec![7]);
    }

    #[test]
    fn test_exhausted_fallbacks_is_resolution_error() {
        let (source, _) = source(FakeFetcher::new());
        assert!(matches!(
            source.resolve(Some("AbC123")),
            Err(Error::Resolution { .. })
        ));
    }

    #[test]
    fn test_random_reads_id_from_redirect() {
        let (source, _) = source(
            FakeFetcher::new()
                .redirect(
                    &format!("{BASE}/random"),
                    &format!("{BASE}/asset/sunflowers/hwEGmsmnPd_Lpg"),
                    "",
                )
                .route(
                    &format!("{BASE}/asset/hwEGmsmnPd_Lpg"),
                    "text/html",
                    r#"<meta property="og:image" content="https://lh3.ggpht.com/sun=w1200">"#,
                ),
        );

        let location = source.locate(None).unwrap();
        assert_eq!(location.identifier.primary(), "hwEGmsmnPd_Lpg");
        assert_eq!(location.locator, "https://lh3.ggpht.com/sun=s0");
        assert!(!location.deferred);
    }

    #[test]
    fn test_random_attempts_are_bounded() {
        let (source, fetcher) = source(
            FakeFetcher::new().redirect(&format!("{BASE}/random"), &format!("{BASE}/explore"), ""),
        );
        assert!(matches!(source.locate(None), Err(Error::Resolution { .. })));
        assert_eq!(fetcher.requested().len(), 5);
    }
}
