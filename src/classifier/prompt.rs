//! Per-product prompt assembly for the vision model.

use crate::metadata::ProductMetadata;

/// Builds the classification prompt for one product. Product metadata is
/// folded in so the model judges the target garment, not whatever else the
/// model in the photo happens to be wearing.
pub fn build_prompt(metadata: Option<&ProductMetadata>) -> String {
    let mut meta_lines: Vec<String> = Vec::new();
    if let Some(meta) = metadata {
        if let Some(name) = &meta.name {
            meta_lines.push(format!("- Product name: {name}"));
        }
        if let Some(category) = &meta.category {
            meta_lines.push(format!("- Category: {category}"));
        }
        if let Some(market) = &meta.market_name {
            meta_lines.push(format!("- Seller: {market}"));
        }
        let expected_colors = meta.expected_colors();
        if !expected_colors.is_empty() {
            meta_lines.push(format!(
                "- Expected color options: {}",
                expected_colors.join(", ")
            ));
        }
    }
    let meta_block = if meta_lines.is_empty() {
        "- (no metadata)".to_string()
    } else {
        meta_lines.join("\n")
    };

    format!(
        r#"You are an apparel product image classification expert.

Classify images of the target product below. Ignore the colors of any other
garments, bags, accessories or backgrounds worn alongside it; judge only the
target product (the single main garment).

Target product:
{meta_block}

Classification rules:
- If the same product appears in several colors laid out side by side for
  comparison (stacked variants, multiple color-name labels), the image is a
  color_swatch even though several products are visible. For color_swatch,
  color MUST be null.
- Table-style images carrying SIZE, PRODUCT CHECK, fabric blend, country of
  origin, material, fit, thickness/stretch/lining information are
  product_info. For product_info, color MUST be null.

Analyze this image and respond with JSON only, using this schema:

1. category: one of
   - worn_front / worn_side / worn_back (model wearing the product)
   - product_front / product_back (product alone: hanger, mannequin or flat)
   - detail_neckline / detail_sleeve / detail_hem / detail_material /
     detail_button (close-ups)
   - color_swatch (color lineup/comparison)
   - size_chart (size table / measurements)
   - product_info (product check table / blend / material / fit notes)
   - marketing (advertising copy, text imagery)
   - other

2. color: the target product's color as a single value
   - null for color_swatch and product_info
   - null when not certain
   - when expected color options are listed above, output one of them and
     nothing else

3. confidence: 0.0 - 1.0

4. has_multiple_items: whether several products/colors appear together
   (usually true for color_swatch lineups)

5. quality_score: 0.0 - 1.0, judged on sharpness, lighting and product
   visibility

6. extracted: normalized text extraction for fabric data only
   - composition: fiber blend, e.g. "폴리 97%, 스판 3%"
   - material: fabric description, e.g. "울10% 아크릴60% 폴리30%"
   - leave everything else (sizes, fit, country) null

Return JSON only, no other text."#
    )
}
