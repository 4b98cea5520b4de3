//! Scraping helpers for asset pages and metadata responses.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static MANIFEST_REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)["']?(?:iiif_?manifest(?:_?url)?|manifest_?url)["']?\s*[:=]\s*["']([^"'\s]+)["']"#,
    )
    .expect("static regex: manifest reference")
});

static CANONICAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<link[^>]*rel=["']canonical["'][^>]*href=["']([^"']+)["']|<link[^>]*href=["']([^"']+)["'][^>]*rel=["']canonical["']"#,
    )
    .expect("static regex: canonical link")
});

static JSON_LD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type=["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("static regex: JSON-LD block")
});

static OG_IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta[^>]*property=["']og:image["'][^>]*content=["']([^"']+)["']|<meta[^>]*content=["']([^"']+)["'][^>]*property=["']og:image["']"#,
    )
    .expect("static regex: og:image")
});

static ASSET_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/asset/(?:[^/?#]+/)?([A-Za-z0-9_-]{6,})(?:[/?#]|$)")
        .expect("static regex: asset URL")
});

static ASSET_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/asset/[^"'/\s<>]+/([A-Za-z0-9_-]{6,})"#).expect("static regex: asset link")
});

/// Undoes the escaping found in inline scripts and HTML attributes.
#[must_use]
pub fn unescape(raw: &str) -> String {
    raw.replace("\\/", "/")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\u0026", "&")
        .replace("\\u003d", "=")
        .replace("\\u003D", "=")
        .replace("&amp;", "&")
}

fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    regex.captures(text).and_then(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| unescape(m.as_str()))
    })
}

/// Finds an embedded manifest URL in HTML or JSON text.
#[must_use]
pub fn extract_manifest_url(text: &str) -> Option<String> {
    MANIFEST_REF_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| unescape(m.as_str())))
        .find(|url| url.starts_with("http") || url.starts_with("//"))
        .map(|url| {
            if url.starts_with("//") {
                format!("https:{url}")
            } else {
                url
            }
        })
}

/// Returns the page's canonical URL, if declared.
#[must_use]
pub fn extract_canonical(html: &str) -> Option<String> {
    first_capture(&CANONICAL_REGEX, html)
}

/// Returns the `og:image` URL, if declared.
#[must_use]
pub fn extract_og_image(html: &str) -> Option<String> {
    first_capture(&OG_IMAGE_REGEX, html)
}

/// Finds an image URL in the page's JSON-LD blocks.
#[must_use]
pub fn extract_json_ld_image(html: &str) -> Option<String> {
    JSON_LD_REGEX
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
        .find_map(|doc| json_ld_image(&doc))
}

fn image_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.starts_with("http") => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(image_value),
        Value::Object(obj) => obj
            .get("contentUrl")
            .or_else(|| obj.get("url"))
            .and_then(image_value),
        _ => None,
    }
}

fn json_ld_image(doc: &Value) -> Option<String> {
    match doc {
        Value::Array(items) => items.iter().find_map(json_ld_image),
        Value::Object(obj) => obj
            .get("image")
            .and_then(image_value)
            .or_else(|| obj.get("contentUrl").and_then(image_value))
            .or_else(|| obj.get("@graph").and_then(json_ld_image)),
        _ => None,
    }
}

/// Pulls an asset id out of an asset URL.
#[must_use]
pub fn asset_id_in_url(url: &str) -> Option<String> {
    ASSET_URL_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pulls the first linked asset id out of a page body.
#[must_use]
pub fn asset_id_in_body(body: &str) -> Option<String> {
    ASSET_LINK_REGEX
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Walks an arbitrary JSON document for a manifest-looking string field.
#[must_use]
pub fn manifest_url_in_json(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => obj
            .iter()
            .find_map(|(key, v)| {
                let key = key.to_ascii_lowercase();
                v.as_str()
                    .filter(|s| key.contains("manifest") && s.starts_with("http"))
                    .map(str::to_string)
            })
            .or_else(|| obj.values().find_map(manifest_url_in_json)),
        Value::Array(items) => items.iter().find_map(manifest_url_in_json),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_in_inline_script() {
        let html = r#"<script>window.INIT = {"assetId":"x","iiifManifestUrl":"https:\/\/artsandculture.google.com\/iiif\/manifest\/x?hl=en&v=2"};</script>"#;
        assert_eq!(
            extract_manifest_url(html).as_deref(),
            Some("https://artsandculture.google.com/iiif/manifest/x?hl=en&v=2")
        );
    }

    #[test]
    fn test_manifest_protocol_relative() {
        let html = r#"data-manifest-url="x" manifest_url: '//example.org/m.json'"#;
        assert_eq!(
            extract_manifest_url(html).as_deref(),
            Some("https://example.org/m.json")
        );
    }

    #[test]
    fn test_no_manifest() {
        assert_eq!(extract_manifest_url("<html><body>hi</body></html>"), None);
    }

    #[test]
    fn test_canonical_either_attribute_order() {
        let a = r#"<link rel="canonical" href="https://site/asset/night/AbC123">"#;
        let b = r#"<link href="https://site/asset/day/XyZ789" rel="canonical"/>"#;
        assert_eq!(extract_canonical(a).as_deref(), Some("https://site/asset/night/AbC123"));
        assert_eq!(extract_canonical(b).as_deref(), Some("https://site/asset/day/XyZ789"));
    }

    #[test]
    fn test_json_ld_image_variants() {
        let html = r#"
            <script type="application/ld+json">{"@type": "WebSite", "name": "x"}</script>
            <script type="application/ld+json">
              {"@type": "VisualArtwork", "image": {"@type": "ImageObject", "contentUrl": "https://lh3.ggpht.com/q=s512"}}
            </script>"#;
        assert_eq!(
            extract_json_ld_image(html).as_deref(),
            Some("https://lh3.ggpht.com/q=s512")
        );

        let graph = r#"<script type="application/ld+json">{"@graph": [{"image": ["https://a/b.jpg"]}]}</script>"#;
        assert_eq!(extract_json_ld_image(graph).as_deref(), Some("https://a/b.jpg"));

        let broken = r#"<script type="application/ld+json">{not json</script>"#;
        assert_eq!(extract_json_ld_image(broken), None);
    }

    #[test]
    fn test_og_image() {
        let html = r#"<meta property="og:image" content="https://lh3.ggpht.com/og=w1200">"#;
        assert_eq!(extract_og_image(html).as_deref(), Some("https://lh3.ggpht.com/og=w1200"));
    }

    #[test]
    fn test_asset_id_patterns() {
        assert_eq!(
            asset_id_in_url("https://artsandculture.google.com/asset/the-kiss/HQGxUutM_F6ZGg?hl=en")
                .as_deref(),
            Some("HQGxUutM_F6ZGg")
        );
        assert_eq!(
            asset_id_in_url("https://artsandculture.google.com/asset/HQGxUutM_F6ZGg").as_deref(),
            Some("HQGxUutM_F6ZGg")
        );
        assert_eq!(asset_id_in_url("https://artsandculture.google.com/explore"), None);
        assert_eq!(
            asset_id_in_body(r#"<a href="/asset/sunflowers/hwEGmsmnPd_Lpg">"#).as_deref(),
            Some("hwEGmsmnPd_Lpg")
        );
    }

    #[test]
    fn test_manifest_url_in_json() {
        let doc = json!({"asset": {"title": "x", "links": [{"iiifManifest": "https://m/1"}]}});
        assert_eq!(manifest_url_in_json(&doc).as_deref(), Some("https://m/1"));
        assert_eq!(manifest_url_in_json(&json!({"manifest": 3})), None);
    }
}
