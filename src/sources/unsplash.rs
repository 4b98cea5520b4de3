//! Unsplash photo API.
//!
//! Locating calls `/photos/{id}` or `/photos/random?orientation=landscape`
//! and reads `id`, `slug`, `urls.raw` and `links.html` from the JSON. The
//! download URL is `urls.raw` with imgix parameters that crop server-side to
//! the panel resolution; the normalizer still runs on the result.

use super::ImageResolver;
use crate::config::UnsplashConfig;
use crate::http::HttpFetch;
use crate::models::{EncodingHint, ImageIdentifier, ImageLocation, ResolvedImage, SourceName};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;

/// Resolver for the Unsplash API.
pub struct UnsplashSource {
    fetcher: Arc<dyn HttpFetch>,
    access_key: Option<SecretString>,
    endpoint: String,
    width: u32,
    height: u32,
}

impl UnsplashSource {
    /// Creates a resolver that requests images at `width`x`height`.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        config: &UnsplashConfig,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            fetcher,
            access_key: config.access_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            width,
            height,
        }
    }

    fn metadata_url(&self, selector: Option<&str>) -> String {
        selector.map_or_else(
            || format!("{}/photos/random?orientation=landscape", self.endpoint),
            |id| format!("{}/photos/{}", self.endpoint, id.trim()),
        )
    }

    /// Appends the server-side resize/crop parameters to a raw image URL.
    #[must_use]
    pub fn sized_url(&self, raw: &str) -> String {
        let sep = if raw.contains('?') { '&' } else { '?' };
        format!(
            "{raw}{sep}w={}&h={}&fit=crop&crop=entropy&fm=jpg&q=90",
            self.width, self.height
        )
    }

    fn location_from_json(&self, context: &str, json: &Value) -> Result<ImageLocation> {
        // The random endpoint returns an array when `count` is passed.
        let photo = json.as_array().and_then(|a| a.first()).unwrap_or(json);

        let raw = photo
            .pointer("/urls/raw")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Parse {
                context: context.to_string(),
                cause: "response has no urls.raw image URL".to_string(),
            })?;
        let download_url = self.sized_url(raw);

        let id = photo.get("id").and_then(Value::as_str).filter(|s| !s.is_empty());
        let page = photo
            .pointer("/links/html")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let display_url = page.unwrap_or(&download_url).to_string();

        let mut identifier = id.map_or_else(
            || ImageIdentifier::new(display_url.clone()),
            |id| ImageIdentifier::new(id).with_alias(display_url.clone()),
        );
        if let Some(slug) = photo.get("slug").and_then(Value::as_str) {
            identifier = identifier.with_alias(slug);
        }

        Ok(ImageLocation {
            source: SourceName::Unsplash,
            identifier,
            locator: download_url,
            display_url,
            deferred: false,
        })
    }
}

impl ImageResolver for UnsplashSource {
    fn source(&self) -> SourceName {
        SourceName::Unsplash
    }

    fn locate(&self, selector: Option<&str>) -> Result<ImageLocation> {
        let key = self.access_key.as_ref().ok_or_else(|| {
            Error::Configuration("UNSPLASH_ACCESS_KEY not set".to_string())
        })?;

        let url = self.metadata_url(selector);
        let auth = format!("Client-ID {}", key.expose_secret());
        let response = self
            .fetcher
            .get(&url, &[("Authorization", auth.as_str()), ("Accept-Version", "v1")])?;
        let json = response.json()?;

        let location = self.location_from_json(&url, &json)?;
        tracing::debug!(
            identifier = %location.identifier,
            url = %location.display_url,
            "Located Unsplash photo"
        );
        Ok(location)
    }

    fn fetch(&self, location: &ImageLocation) -> Result<ResolvedImage> {
        let response = self.fetcher.get(&location.locator, &[])?;
        if response.body.is_empty() {
            return Err(Error::Fetch {
                url: location.locator.clone(),
                cause: "empty body".to_string(),
            });
        }

        Ok(ResolvedImage {
            encoding: EncodingHint::from_content_type(response.content_type.as_deref()),
            bytes: response.body,
            identifier: location.identifier.clone(),
            display_url: location.display_url.clone(),
            source: SourceName::Unsplash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::FakeFetcher;

    const RANDOM_URL: &str = "https://api.unsplash.com/photos/random?orientation=landscape";

    fn source(fetcher: FakeFetcher) -> UnsplashSource {
        let config = UnsplashConfig {
            access_key: Some(SecretString::from("test-key")),
            ..UnsplashConfig::default()
        };
        UnsplashSource::new(Arc::new(fetcher), &config, 3840, 2160)
    }

    #[test]
    fn test_locate_random_photo() {
        let body = r#"{
            "id": "Dwu85P9SOIk",
            "slug": "a-mountain-Dwu85P9SOIk",
            "urls": {"raw": "https://images.unsplash.com/photo-1?ixid=abc"},
            "links": {"html": "https://unsplash.com/photos/Dwu85P9SOIk"}
        }"#;
        let source = source(FakeFetcher::new().route(RANDOM_URL, "application/json", body));
        let location = source.locate(None).unwrap();

        assert_eq!(location.identifier.primary(), "Dwu85P9SOIk");
        assert!(location.identifier.contains("https://unsplash.com/photos/Dwu85P9SOIk"));
        assert!(location.identifier.contains("a-mountain-Dwu85P9SOIk"));
        assert_eq!(
            location.locator,
            "https://images.unsplash.com/photo-1?ixid=abc&w=3840&h=2160&fit=crop&crop=entropy&fm=jpg&q=90"
        );
        assert_eq!(location.display_url, "https://unsplash.com/photos/Dwu85P9SOIk");
    }

    #[test]
    fn test_locate_by_id_without_links() {
        let body = r#"{"urls": {"raw": "https://images.unsplash.com/photo-2"}}"#;
        let source = source(FakeFetcher::new().route(
            "https://api.unsplash.com/photos/xyz",
            "application/json",
            body,
        ));
        let location = source.locate(Some("xyz")).unwrap();

        let expected = "https://images.unsplash.com/photo-2?w=3840&h=2160&fit=crop&crop=entropy&fm=jpg&q=90";
        assert_eq!(location.display_url, expected);
        assert_eq!(location.identifier.primary(), expected);
    }

    #[test]
    fn test_missing_raw_url_is_parse_error() {
        let body = r#"{"id": "abc", "urls": {"small": "https://images.unsplash.com/s"}}"#;
        let source = source(FakeFetcher::new().route(RANDOM_URL, "application/json", body));
        let err = source.resolve(None).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let source = UnsplashSource::new(
            Arc::new(FakeFetcher::new()),
            &UnsplashConfig::default(),
            3840,
            2160,
        );
        assert!(matches!(source.locate(None), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_fetch_uses_content_type() {
        let body = r#"[{"id": "p1", "urls": {"raw": "https://images.unsplash.com/p1"}}]"#;
        let download = "https://images.unsplash.com/p1?w=3840&h=2160&fit=crop&crop=entropy&fm=jpg&q=90";
        let source = source(
            FakeFetcher::new()
                .route(RANDOM_URL, "application/json", body)
                .route(download, "image/png", vec![1, 2, 3]),
        );
        let image = source.resolve(None).unwrap();
        assert_eq!(image.encoding, EncodingHint::Png);
        assert_eq!(image.identifier.primary(), "p1");
    }
}
