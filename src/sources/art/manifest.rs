//! IIIF manifest walking.
//!
//! Manifests come in two layouts. Each layout has its own depth-first
//! extractor and [`find_manifest_image`] tries them in order, returning the
//! first hit together with the shape that produced it.

use serde_json::Value;

/// Manifest layout that yielded an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestShape {
    /// `sequences[].canvases[].images[].resource` (Presentation 2).
    SequenceCanvases,
    /// `items[] -> items[] -> items[].body` (Presentation 3).
    ItemsAnnotations,
}

type Extractor = fn(&Value) -> Option<String>;

const EXTRACTORS: [(ManifestShape, Extractor); 2] = [
    (ManifestShape::SequenceCanvases, from_sequences),
    (ManifestShape::ItemsAnnotations, from_items),
];

/// Finds the first full-resolution image reference in a manifest.
#[must_use]
pub fn find_manifest_image(manifest: &Value) -> Option<(ManifestShape, String)> {
    EXTRACTORS
        .iter()
        .find_map(|(shape, extract)| extract(manifest).map(|url| (*shape, url)))
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> + use<'a> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn id_of(value: &Value) -> Option<&str> {
    value
        .get("@id")
        .or_else(|| value.get("id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn type_of(value: &Value) -> Option<&str> {
    value
        .get("@type")
        .or_else(|| value.get("type"))
        .and_then(Value::as_str)
}

fn is_image_type(value: &Value) -> bool {
    type_of(value).is_none_or(|t| t.eq_ignore_ascii_case("image") || t.ends_with(":Image"))
}

/// Builds a full-size request from an IIIF image service base.
fn from_service(resource: &Value) -> Option<String> {
    let service = resource.get("service")?;
    let service = service.as_array().and_then(|a| a.first()).unwrap_or(service);
    id_of(service).map(|base| format!("{}/full/full/0/default.jpg", base.trim_end_matches('/')))
}

fn image_resource(resource: &Value) -> Option<String> {
    if !is_image_type(resource) {
        return None;
    }
    id_of(resource)
        .map(str::to_string)
        .or_else(|| from_service(resource))
}

fn from_sequences(manifest: &Value) -> Option<String> {
    array(manifest, "sequences")
        .flat_map(|seq| array(seq, "canvases"))
        .flat_map(|canvas| array(canvas, "images"))
        .find_map(|image| image.get("resource").and_then(image_resource))
}

fn annotation_body(body: &Value) -> Option<String> {
    match body {
        Value::Array(bodies) => bodies.iter().find_map(annotation_body),
        Value::Object(_) if type_of(body) == Some("Choice") => {
            array(body, "items").find_map(annotation_body)
        },
        Value::Object(_) => image_resource(body),
        _ => None,
    }
}

fn from_items(manifest: &Value) -> Option<String> {
    array(manifest, "items")
        .flat_map(|canvas| array(canvas, "items"))
        .flat_map(|page| array(page, "items"))
        .find_map(|annotation| annotation.get("body").and_then(annotation_body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presentation_2_shape() {
        let manifest = json!({
            "@context": "http://iiif.io/api/presentation/2/context.json",
            "sequences": [{
                "canvases": [
                    {"images": []},
                    {"images": [{
                        "resource": {
                            "@id": "https://lh3.googleusercontent.com/abc=s1200",
                            "@type": "dctypes:Image"
                        }
                    }]}
                ]
            }]
        });
        assert_eq!(
            find_manifest_image(&manifest),
            Some((
                ManifestShape::SequenceCanvases,
                "https://lh3.googleusercontent.com/abc=s1200".to_string()
            ))
        );
    }

    #[test]
    fn test_presentation_2_service_only() {
        let manifest = json!({
            "sequences": [{"canvases": [{"images": [{
                "resource": {"service": {"@id": "https://iiif.example.org/img/42/"}}
            }]}]}]
        });
        assert_eq!(
            find_manifest_image(&manifest).map(|(_, url)| url),
            Some("https://iiif.example.org/img/42/full/full/0/default.jpg".to_string())
        );
    }

    #[test]
    fn test_presentation_3_shape() {
        let manifest = json!({
            "type": "Manifest",
            "items": [{
                "type": "Canvas",
                "items": [{
                    "type": "AnnotationPage",
                    "items": [{
                        "type": "Annotation",
                        "body": {"id": "https://lh3.ggpht.com/xyz=w800-h600", "type": "Image"}
                    }]
                }]
            }]
        });
        assert_eq!(
            find_manifest_image(&manifest),
            Some((
                ManifestShape::ItemsAnnotations,
                "https://lh3.ggpht.com/xyz=w800-h600".to_string()
            ))
        );
    }

    #[test]
    fn test_presentation_3_choice_skips_non_images() {
        let manifest = json!({
            "items": [{"items": [{"items": [{
                "body": {
                    "type": "Choice",
                    "items": [
                        {"id": "https://example.org/audio.mp3", "type": "Sound"},
                        {"id": "https://example.org/full.jpg", "type": "Image"}
                    ]
                }
            }]}]}]
        });
        assert_eq!(
            find_manifest_image(&manifest).map(|(_, url)| url),
            Some("https://example.org/full.jpg".to_string())
        );
    }

    #[test]
    fn test_sequences_win_over_items() {
        let manifest = json!({
            "sequences": [{"canvases": [{"images": [{"resource": {"@id": "https://a/1"}}]}]}],
            "items": [{"items": [{"items": [{"body": {"id": "https://b/2"}}]}]}]
        });
        assert_eq!(
            find_manifest_image(&manifest).map(|(shape, _)| shape),
            Some(ManifestShape::SequenceCanvases)
        );
    }

    #[test]
    fn test_unknown_shape() {
        assert_eq!(find_manifest_image(&json!({"label": "nothing"})), None);
        assert_eq!(find_manifest_image(&json!([1, 2, 3])), None);
        assert_eq!(find_manifest_image(&json!({"sequences": "bogus"})), None);
    }
}
