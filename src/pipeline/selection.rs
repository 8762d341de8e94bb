//! Deterministic best-image selection over a product's classified set.
//!
//! Pure function of the input: no I/O, no clock, no randomness. Callers feed
//! records in file-name order; every tie-break below is defined against that
//! order ("first seen" means first in file-name order) so repeated runs on
//! identical input select identical images.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::category::ImageCategory;
use super::classification::ImageClassification;

/// Information-image slots: a size table, a fabric-composition image, and a
/// general product-information image. Each holds at most one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<ImageClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_info: Option<ImageClassification>,
}

/// The selection for one product. Derived, never mutated after construction.
///
/// `representative_color` and `representative_details` are both absent when
/// the set carries no color-bearing image at all, so callers can tell "no
/// colors found" apart from "colors found but zero detail coverage".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub worn_shots_by_color: IndexMap<String, ImageClassification>,
    pub product_shots_by_color: IndexMap<String, ImageClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative_details: Option<IndexMap<ImageCategory, ImageClassification>>,
    pub info_images: InfoImages,
}

/// Picks the best image per slot from a product's classifications.
pub fn select(classifications: &[ImageClassification]) -> SelectionResult {
    let by_color = group_by_color(classifications);

    // Worn shot per color: front-facing always outranks side/back, then
    // higher confidence, then higher quality.
    let mut worn_shots_by_color = IndexMap::new();
    for (color, items) in &by_color {
        let mut worn: Vec<&ImageClassification> = items
            .iter()
            .copied()
            .filter(|item| item.category.is_worn())
            .collect();
        worn.sort_by(|a, b| {
            let a_not_front = a.category != ImageCategory::WornFront;
            let b_not_front = b.category != ImageCategory::WornFront;
            a_not_front
                .cmp(&b_not_front)
                .then(b.confidence.total_cmp(&a.confidence))
                .then(b.quality_score.total_cmp(&a.quality_score))
        });
        if let Some(best) = worn.first() {
            worn_shots_by_color.insert(color.clone(), (*best).clone());
        }
    }

    // Product front per color.
    let mut product_shots_by_color = IndexMap::new();
    for (color, items) in &by_color {
        let front = items
            .iter()
            .copied()
            .filter(|item| item.category == ImageCategory::ProductFront);
        if let Some(best) = best_by_confidence(front) {
            product_shots_by_color.insert(color.clone(), best.clone());
        }
    }

    let (representative_color, representative_details) = pick_representative(&by_color);
    let info_images = pick_info_images(classifications);

    SelectionResult {
        worn_shots_by_color,
        product_shots_by_color,
        representative_color,
        representative_details,
        info_images,
    }
}

/// Colors in first-seen order; an image without a color joins no group.
fn group_by_color(
    classifications: &[ImageClassification],
) -> IndexMap<String, Vec<&ImageClassification>> {
    let mut by_color: IndexMap<String, Vec<&ImageClassification>> = IndexMap::new();
    for item in classifications {
        if let Some(color) = &item.color {
            by_color.entry(color.clone()).or_default().push(item);
        }
    }
    by_color
}

/// Coverage of one color over the representative detail slots.
/// Compared lexicographically: completeness, then slot count, then the sum of
/// each covered slot's best confidence.
struct DetailCoverage {
    complete: bool,
    covered: usize,
    confidence_sum: f64,
}

impl DetailCoverage {
    fn of(items: &[&ImageClassification]) -> Self {
        let mut covered = 0;
        let mut confidence_sum = 0.0;
        for category in ImageCategory::REPRESENTATIVE_DETAILS {
            let candidates = items.iter().copied().filter(|item| item.category == category);
            if let Some(best) = best_by_confidence(candidates) {
                covered += 1;
                confidence_sum += best.confidence;
            }
        }
        Self {
            complete: covered == ImageCategory::REPRESENTATIVE_DETAILS.len(),
            covered,
            confidence_sum,
        }
    }

    fn beats(&self, other: &Self) -> bool {
        (self.complete, self.covered)
            .cmp(&(other.complete, other.covered))
            .then(self.confidence_sum.total_cmp(&other.confidence_sum))
            == Ordering::Greater
    }
}

fn pick_representative(
    by_color: &IndexMap<String, Vec<&ImageClassification>>,
) -> (
    Option<String>,
    Option<IndexMap<ImageCategory, ImageClassification>>,
) {
    let mut groups = by_color.iter();
    let Some((first_color, first_items)) = groups.next() else {
        return (None, None);
    };

    // First-seen color wins exact score ties.
    let mut winner = first_color;
    let mut winner_items = first_items;
    let mut winner_coverage = DetailCoverage::of(first_items);
    for (color, items) in groups {
        let coverage = DetailCoverage::of(items);
        if coverage.beats(&winner_coverage) {
            winner = color;
            winner_items = items;
            winner_coverage = coverage;
        }
    }

    let mut details = IndexMap::new();
    for category in ImageCategory::REPRESENTATIVE_DETAILS {
        let candidates = winner_items
            .iter()
            .copied()
            .filter(|item| item.category == category);
        if let Some(best) = best_by_confidence(candidates) {
            details.insert(category, best.clone());
        }
    }

    (Some(winner.clone()), Some(details))
}

fn pick_info_images(classifications: &[ImageClassification]) -> InfoImages {
    let size_charts = || {
        classifications
            .iter()
            .filter(|item| item.category == ImageCategory::SizeChart)
    };
    let product_infos = || {
        classifications
            .iter()
            .filter(|item| item.category == ImageCategory::ProductInfo)
    };

    // Size: a dedicated size chart wins; a product-info table is the fallback.
    let size = best_by_confidence(size_charts()).or_else(|| best_by_confidence(product_infos()));

    let composition_candidates = classifications.iter().filter(|item| {
        matches!(
            item.category,
            ImageCategory::SizeChart | ImageCategory::ProductInfo
        ) && item.has_extracted_text()
    });
    let composition = best_by_confidence(composition_candidates);

    // A second info slot only when it is a different file than the size pick.
    let product_info = best_by_confidence(product_infos()).filter(|best| {
        size.map_or(true, |size_pick| size_pick.file_name != best.file_name)
    });

    InfoImages {
        size: size.cloned(),
        composition: composition.cloned(),
        product_info: product_info.cloned(),
    }
}

/// Highest confidence wins; equal confidence falls through to quality; a full
/// tie keeps the earliest candidate.
fn best_by_confidence<'a>(
    items: impl Iterator<Item = &'a ImageClassification>,
) -> Option<&'a ImageClassification> {
    let mut best: Option<&ImageClassification> = None;
    for item in items {
        let better = match best {
            None => true,
            Some(current) => match item.confidence.total_cmp(&current.confidence) {
                Ordering::Greater => true,
                Ordering::Equal => item.quality_score > current.quality_score,
                Ordering::Less => false,
            },
        };
        if better {
            best = Some(item);
        }
    }
    best
}
