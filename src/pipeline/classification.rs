use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::category::ImageCategory;
use crate::classifier::ImageRef;

/// Fabric data lifted off information images. Only blend/material text is
/// extracted; sizes, fit notes and the like stay on the image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extracted {
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

impl Extracted {
    pub fn has_text(&self) -> bool {
        let non_empty = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
        };
        non_empty(&self.composition) || non_empty(&self.material)
    }
}

/// One image's normalized classification. Every image submitted to the batch
/// produces exactly one of these, keyed by `file_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageClassification {
    pub file_name: String,
    pub file_path: PathBuf,
    pub category: ImageCategory,
    pub color: Option<String>,
    pub confidence: f64,
    pub quality_score: f64,
    pub has_multiple_items: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<Extracted>,
    /// Present only when classification failed; the record then carries the
    /// `error` category and zeroed metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageClassification {
    /// Synthetic record for an image whose classification failed. The failure
    /// stays local to this image and never aborts sibling classifications.
    pub fn failure(image: &ImageRef, reason: impl Into<String>) -> Self {
        Self {
            file_name: image.file_name.clone(),
            file_path: image.file_path.clone(),
            category: ImageCategory::Error,
            color: None,
            confidence: 0.0,
            quality_score: 0.0,
            has_multiple_items: false,
            extracted: None,
            error: Some(reason.into()),
        }
    }

    pub fn has_extracted_text(&self) -> bool {
        self.extracted
            .as_ref()
            .is_some_and(Extracted::has_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_record_is_fully_zeroed() {
        let image = ImageRef::new("output/images/100/007.jpg");
        let record = ImageClassification::failure(&image, "request timed out");
        assert_eq!(record.category, ImageCategory::Error);
        assert_eq!(record.file_name, "007.jpg");
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.quality_score, 0.0);
        assert!(!record.has_multiple_items);
        assert!(record.color.is_none());
        assert_eq!(record.error.as_deref(), Some("request timed out"));
    }

    #[test]
    fn extracted_whitespace_does_not_count_as_text() {
        let extracted = Extracted {
            composition: Some("  ".to_string()),
            material: None,
        };
        assert!(!extracted.has_text());
        let extracted = Extracted {
            composition: None,
            material: Some("울 100%".to_string()),
        };
        assert!(extracted.has_text());
    }
}
