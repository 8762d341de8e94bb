//! Product metadata as persisted by the crawl stage (`meta.json`).

use serde::{Deserialize, Serialize};

/// The subset of crawled product metadata the classification pipeline cares
/// about. Unknown fields in `meta.json` are ignored on load and preserved by
/// the merge step in `store`, which edits the raw document instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub market_name: Option<String>,
    /// Colors from the option API. Preferred source for expected colors.
    #[serde(default)]
    pub option_colors: Option<Vec<String>>,
    /// Fallback: legal-notice color field, a separator-delimited string.
    #[serde(default)]
    pub legal_notice_colors: Option<String>,
    #[serde(default)]
    pub colors: Option<String>,
    #[serde(default)]
    pub fabric: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl ProductMetadata {
    /// Ordered list of known-valid color names for this product.
    ///
    /// Option-API colors win when present; otherwise the legal-notice string
    /// is split on `,` `/` `|`. Entries are trimmed and deduplicated with the
    /// original order preserved.
    pub fn expected_colors(&self) -> Vec<String> {
        if let Some(option_colors) = &self.option_colors {
            let colors = dedupe_trimmed(option_colors.iter().map(String::as_str));
            if !colors.is_empty() {
                return colors;
            }
        }

        let raw = self
            .legal_notice_colors
            .as_deref()
            .or(self.colors.as_deref())
            .unwrap_or("");
        dedupe_trimmed(raw.split(|c| matches!(c, ',' | '/' | '|')))
    }
}

fn dedupe_trimmed<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() || out.iter().any(|seen| seen == part) {
            continue;
        }
        out.push(part.to_string());
    }
    out
}
