//! Turns a [`SelectionResult`] into the contracts its consumers read: a copy
//! plan for the file exporter and a composition payload for the metadata
//! merge. Pure planning; the filesystem side lives in `store`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::{ImageCategory, ImageClassification, SelectionResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    pub source: PathBuf,
    pub target_name: String,
}

/// Ordered list of copies for one product. Target names are unique; when two
/// slots resolve to the same target the first plan entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPlan {
    pub items: Vec<ExportItem>,
}

impl ExportPlan {
    fn push(&mut self, item: &ImageClassification, stem: String) {
        let target_name = format!("{stem}{}", extension_of(&item.file_path));
        if self.items.iter().any(|existing| existing.target_name == target_name) {
            return;
        }
        self.items.push(ExportItem {
            source: item.file_path.clone(),
            target_name,
        });
    }
}

/// Builds the copy plan for a product's selected images.
pub fn plan_exports(selection: &SelectionResult) -> ExportPlan {
    let mut plan = ExportPlan::default();

    for (color, item) in &selection.worn_shots_by_color {
        plan.push(item, format!("worn_{}", safe_filename_part(color)));
    }
    for (color, item) in &selection.product_shots_by_color {
        plan.push(item, format!("product_{}", safe_filename_part(color)));
    }
    if let Some(details) = &selection.representative_details {
        for (category, item) in details {
            plan.push(item, detail_stem(*category).to_string());
        }
    }
    let info = &selection.info_images;
    for (slot, item) in [
        ("info_size", &info.size),
        ("info_composition", &info.composition),
        ("info_product_info", &info.product_info),
    ] {
        if let Some(item) = item {
            plan.push(item, slot.to_string());
        }
    }

    plan
}

fn detail_stem(category: ImageCategory) -> &'static str {
    match category {
        ImageCategory::ProductFront => "detail_front",
        ImageCategory::ProductBack => "detail_back",
        _ => category.as_str(),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Keeps ASCII alphanumerics, Hangul syllables, `_` and `-`; everything else
/// becomes a single underscore. Never returns an empty string.
pub fn safe_filename_part(raw: &str) -> String {
    let mut out = String::new();
    for ch in raw.trim().chars() {
        let mapped = match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => ch,
            '가'..='힣' => ch,
            _ => '_',
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Source attribution for an extracted composition, so the merged metadata
/// can be traced back to the image it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSource {
    pub file_name: String,
    pub file_path: PathBuf,
    pub confidence: f64,
}

/// Payload for the metadata-merge collaborator, derived from the selected
/// composition image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionUpdate {
    pub composition: Option<String>,
    pub material: Option<String>,
    pub source: CompositionSource,
}

pub fn composition_update(selection: &SelectionResult) -> Option<CompositionUpdate> {
    let item = selection.info_images.composition.as_ref()?;
    let extracted = item.extracted.as_ref()?;
    if !extracted.has_text() {
        return None;
    }
    Some(CompositionUpdate {
        composition: extracted.composition.clone(),
        material: extracted.material.clone(),
        source: CompositionSource {
            file_name: item.file_name.clone(),
            file_path: item.file_path.clone(),
            confidence: item.confidence,
        },
    })
}
