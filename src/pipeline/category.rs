use serde::{Deserialize, Serialize};

/// Closed set of semantic roles an image can play on a product page.
///
/// The vision model answers with free-form strings; anything outside this set
/// collapses to [`ImageCategory::Other`] so the selection engine can match
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    WornFront,
    WornSide,
    WornBack,
    ProductFront,
    ProductBack,
    DetailNeckline,
    DetailSleeve,
    DetailHem,
    DetailMaterial,
    DetailButton,
    ColorSwatch,
    SizeChart,
    ProductInfo,
    Marketing,
    Other,
    Error,
}

impl ImageCategory {
    /// Detail slots the representative color is scored against.
    pub const REPRESENTATIVE_DETAILS: [ImageCategory; 5] = [
        ImageCategory::ProductFront,
        ImageCategory::ProductBack,
        ImageCategory::DetailNeckline,
        ImageCategory::DetailSleeve,
        ImageCategory::DetailHem,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "worn_front" => ImageCategory::WornFront,
            "worn_side" => ImageCategory::WornSide,
            "worn_back" => ImageCategory::WornBack,
            "product_front" => ImageCategory::ProductFront,
            "product_back" => ImageCategory::ProductBack,
            "detail_neckline" => ImageCategory::DetailNeckline,
            "detail_sleeve" => ImageCategory::DetailSleeve,
            "detail_hem" => ImageCategory::DetailHem,
            "detail_material" => ImageCategory::DetailMaterial,
            "detail_button" => ImageCategory::DetailButton,
            "color_swatch" => ImageCategory::ColorSwatch,
            "size_chart" => ImageCategory::SizeChart,
            "product_info" => ImageCategory::ProductInfo,
            "marketing" => ImageCategory::Marketing,
            "error" => ImageCategory::Error,
            _ => ImageCategory::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageCategory::WornFront => "worn_front",
            ImageCategory::WornSide => "worn_side",
            ImageCategory::WornBack => "worn_back",
            ImageCategory::ProductFront => "product_front",
            ImageCategory::ProductBack => "product_back",
            ImageCategory::DetailNeckline => "detail_neckline",
            ImageCategory::DetailSleeve => "detail_sleeve",
            ImageCategory::DetailHem => "detail_hem",
            ImageCategory::DetailMaterial => "detail_material",
            ImageCategory::DetailButton => "detail_button",
            ImageCategory::ColorSwatch => "color_swatch",
            ImageCategory::SizeChart => "size_chart",
            ImageCategory::ProductInfo => "product_info",
            ImageCategory::Marketing => "marketing",
            ImageCategory::Other => "other",
            ImageCategory::Error => "error",
        }
    }

    pub fn is_worn(self) -> bool {
        matches!(
            self,
            ImageCategory::WornFront | ImageCategory::WornSide | ImageCategory::WornBack
        )
    }

    /// Categories that never carry a single-color attribution: color lineups
    /// and information tables are multi-color or color-ambiguous by nature.
    pub fn never_carries_color(self) -> bool {
        matches!(self, ImageCategory::ColorSwatch | ImageCategory::ProductInfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_categories() {
        assert_eq!(ImageCategory::parse("worn_front"), ImageCategory::WornFront);
        assert_eq!(
            ImageCategory::parse(" color_swatch "),
            ImageCategory::ColorSwatch
        );
    }

    #[test]
    fn unknown_strings_collapse_to_other() {
        assert_eq!(ImageCategory::parse("hero_banner"), ImageCategory::Other);
        assert_eq!(ImageCategory::parse(""), ImageCategory::Other);
    }

    #[test]
    fn serde_round_trips_snake_case() {
        let json = serde_json::to_string(&ImageCategory::DetailNeckline).unwrap();
        assert_eq!(json, "\"detail_neckline\"");
        let back: ImageCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ImageCategory::DetailNeckline);
    }
}
