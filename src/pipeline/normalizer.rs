//! Schema-coercion boundary between the vision model and the pipeline.
//!
//! Nothing downstream ever touches the model's raw output: every field passes
//! through here, is forced into shape or dropped, and comes out as a strict
//! [`ImageClassification`].

use serde_json::{Map, Value};

use super::category::ImageCategory;
use super::classification::{Extracted, ImageClassification};
use crate::classifier::{ImageRef, RawClassification};
use crate::error::ClassifyError;

/// Coerces one raw model response into a strict per-image record.
///
/// A response that cannot be read as a single JSON object fails with
/// [`ClassifyError::MalformedResponse`]; the orchestrator turns that into a
/// failure record rather than aborting the batch.
pub fn normalize(
    image: &ImageRef,
    raw: &RawClassification,
    expected_colors: &[String],
) -> Result<ImageClassification, ClassifyError> {
    let fields = single_object(&raw.0)?;

    let category = fields
        .get("category")
        .and_then(Value::as_str)
        .map(ImageCategory::parse)
        .unwrap_or(ImageCategory::Other);

    // Color lineups and information tables never carry a single color, no
    // matter what the model reported.
    let color = if category.never_carries_color() {
        None
    } else {
        coerce_color(fields.get("color"), expected_colors)
    };

    let extracted = fields.get("extracted").and_then(sanitize_extracted);

    Ok(ImageClassification {
        file_name: image.file_name.clone(),
        file_path: image.file_path.clone(),
        category,
        color,
        confidence: unit_score(fields.get("confidence")),
        quality_score: unit_score(fields.get("quality_score")),
        has_multiple_items: fields
            .get("has_multiple_items")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        extracted,
        error: None,
    })
}

/// The model occasionally wraps its answer in a one-element array; unwrap
/// that, reject everything else.
fn single_object(value: &Value) -> Result<&Map<String, Value>, ClassifyError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(value)),
        _ => Err(malformed(value)),
    }
}

fn malformed(value: &Value) -> ClassifyError {
    let shape = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ClassifyError::MalformedResponse(format!("expected a single object, got {shape}"))
}

/// Forces a reported color to a single trusted value, or drops it.
///
/// Lists collapse to their first element and comma-joined strings to their
/// first token. With a non-empty expected set, the candidate resolves to the
/// first expected value it contains; no match means no color. Without an
/// expected set the trimmed value passes through verbatim.
pub fn coerce_color(raw: Option<&Value>, expected_colors: &[String]) -> Option<String> {
    let candidate = match raw? {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.first()?.as_str()?.to_string(),
        _ => return None,
    };

    let mut candidate = candidate.trim();
    if let Some((head, _)) = candidate.split_once(',') {
        candidate = head.trim();
    }
    if candidate.is_empty() {
        return None;
    }

    if expected_colors.is_empty() {
        return Some(candidate.to_string());
    }
    expected_colors
        .iter()
        .find(|expected| !expected.is_empty() && candidate.contains(expected.as_str()))
        .cloned()
}

// Anything that is not an object is never propagated raw.
fn sanitize_extracted(value: &Value) -> Option<Extracted> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn unit_score(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image() -> ImageRef {
        ImageRef::new("output/images/54822073/001.jpg")
    }

    fn normalize_value(value: Value, expected: &[&str]) -> ImageClassification {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        normalize(&image(), &RawClassification(value), &expected).unwrap()
    }

    #[test]
    fn well_formed_response_passes_through() {
        let record = normalize_value(
            json!({
                "category": "worn_front",
                "color": "아이보리",
                "confidence": 0.92,
                "quality_score": 0.8,
                "has_multiple_items": false,
            }),
            &[],
        );
        assert_eq!(record.category, ImageCategory::WornFront);
        assert_eq!(record.color.as_deref(), Some("아이보리"));
        assert_eq!(record.confidence, 0.92);
        assert!(record.error.is_none());
    }

    #[test]
    fn array_wrapped_object_is_unwrapped() {
        let record = normalize_value(
            json!([{ "category": "product_front", "confidence": 0.5 }]),
            &[],
        );
        assert_eq!(record.category, ImageCategory::ProductFront);
    }

    #[test]
    fn non_object_shapes_are_malformed() {
        for value in [json!("worn_front"), json!(3), json!([1, 2]), json!(null)] {
            let result = normalize(&image(), &RawClassification(value), &[]);
            assert!(matches!(
                result,
                Err(ClassifyError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn color_swatch_color_is_nulled_unconditionally() {
        let record = normalize_value(
            json!({ "category": "color_swatch", "color": "아이보리", "confidence": 0.9 }),
            &["아이보리"],
        );
        assert_eq!(record.category, ImageCategory::ColorSwatch);
        assert!(record.color.is_none());
    }

    #[test]
    fn product_info_color_is_nulled_unconditionally() {
        let record = normalize_value(
            json!({ "category": "product_info", "color": "베이지" }),
            &[],
        );
        assert!(record.color.is_none());
    }

    #[test]
    fn color_list_collapses_to_first_element() {
        let record = normalize_value(
            json!({ "category": "worn_front", "color": ["베이지", "차콜"] }),
            &[],
        );
        assert_eq!(record.color.as_deref(), Some("베이지"));
    }

    #[test]
    fn comma_joined_color_takes_first_token() {
        let record = normalize_value(
            json!({ "category": "worn_front", "color": " 베이지 , 차콜" }),
            &[],
        );
        assert_eq!(record.color.as_deref(), Some("베이지"));
    }

    #[test]
    fn expected_colors_match_by_containment_in_list_order() {
        let record = normalize_value(
            json!({ "category": "worn_front", "color": "아이보리 혼방" }),
            &["아이보리", "베이지"],
        );
        assert_eq!(record.color.as_deref(), Some("아이보리"));

        let record = normalize_value(
            json!({ "category": "worn_front", "color": "네이비" }),
            &["아이보리", "베이지"],
        );
        assert!(record.color.is_none());
    }

    #[test]
    fn empty_expected_set_accepts_verbatim() {
        let record = normalize_value(
            json!({ "category": "worn_front", "color": "올리브그린" }),
            &[],
        );
        assert_eq!(record.color.as_deref(), Some("올리브그린"));
    }

    #[test]
    fn non_string_color_is_dropped() {
        let record = normalize_value(json!({ "category": "worn_front", "color": 3 }), &[]);
        assert!(record.color.is_none());
        let record = normalize_value(json!({ "category": "worn_front", "color": [7] }), &[]);
        assert!(record.color.is_none());
    }

    #[test]
    fn non_object_extracted_is_dropped() {
        let record = normalize_value(
            json!({ "category": "product_info", "extracted": "폴리 100%" }),
            &[],
        );
        assert!(record.extracted.is_none());

        let record = normalize_value(
            json!({
                "category": "product_info",
                "extracted": { "composition": "폴리 97%, 스판 3%", "material": null }
            }),
            &[],
        );
        assert_eq!(
            record.extracted.unwrap().composition.as_deref(),
            Some("폴리 97%, 스판 3%")
        );
    }

    #[test]
    fn unknown_category_collapses_to_other() {
        let record = normalize_value(json!({ "category": "hero_banner" }), &[]);
        assert_eq!(record.category, ImageCategory::Other);
    }

    #[test]
    fn scores_are_clamped_and_defaulted() {
        let record = normalize_value(
            json!({ "category": "worn_front", "confidence": 1.7, "quality_score": -0.3 }),
            &[],
        );
        assert_eq!(record.confidence, 1.0);
        assert_eq!(record.quality_score, 0.0);

        let record = normalize_value(json!({ "category": "worn_front" }), &[]);
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.quality_score, 0.0);
        assert!(!record.has_multiple_items);
    }
}
