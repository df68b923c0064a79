// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Site-specific extraction rules, kept apart from the rendering pipeline.
//!
//! The DOM query runs inside the rendered page, so image URLs are the
//! browser's resolved `src` (honouring `<base href>`) and text is `innerText`
//! (no script, style or hidden content). Rust only shapes the result.

use crate::models::scrape::ExtractionResult;
use scraper::Selector;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Turns a rendered page into an [`ExtractionResult`].
///
/// Missing elements produce empty fields, not errors; the executor decides
/// whether the result is complete.
pub trait PageExtractor: Send + Sync {
    /// JavaScript expression evaluated in the page; must yield a JSON value
    fn script(&self) -> &str;

    /// Shape the value the script returned
    fn extract(&self, evaluated: serde_json::Value) -> ExtractionResult;
}

/// Selectors for a product detail page
#[derive(Debug, Clone)]
pub struct ProductSelectors {
    /// Tried in order until one matches an element with a `src`
    pub image: Vec<String>,
    pub title: String,
    pub highlights: String,
}

impl Default for ProductSelectors {
    fn default() -> Self {
        Self {
            image: vec!["#landingImage".to_string(), "#imgTagWrapperId img".to_string()],
            title: "#productTitle".to_string(),
            highlights: "#feature-bullets ul li .a-list-item".to_string(),
        }
    }
}

// SELECTORS is replaced with a JSON object of the configured selectors.
const PRODUCT_SCRIPT: &str = r#"
    (() => {
        const selectors = SELECTORS;
        const text = el => (el ? el.innerText || '' : '').trim();
        const image = selectors.image
            .map(selector => document.querySelector(selector))
            .find(el => el && el.src);
        return {
            imageUrl: image ? image.src : '',
            title: text(document.querySelector(selectors.title)),
            highlights: Array.from(document.querySelectorAll(selectors.highlights)).map(text),
        };
    })()
"#;

/// What [`PRODUCT_SCRIPT`] returns
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProductFields {
    image_url: String,
    title: String,
    highlights: Vec<String>,
}

/// Extracts a product image plus a description built from the title and
/// the bullet-point highlights.
pub struct ProductPageExtractor {
    script: String,
}

impl ProductPageExtractor {
    /// Fails on a selector that is not valid CSS, before any page is rendered.
    pub fn new(selectors: &ProductSelectors) -> Result<Self, String> {
        for selector in selectors
            .image
            .iter()
            .chain([&selectors.title, &selectors.highlights])
        {
            Selector::parse(selector)
                .map_err(|e| format!("invalid selector '{}': {}", selector, e))?;
        }

        let embedded = json!({
            "image": selectors.image,
            "title": selectors.title,
            "highlights": selectors.highlights,
        });

        Ok(Self {
            script: PRODUCT_SCRIPT.replace("SELECTORS", &embedded.to_string()),
        })
    }
}

impl Default for ProductPageExtractor {
    fn default() -> Self {
        // The built-in selectors are valid CSS
        Self::new(&ProductSelectors::default()).expect("default selectors must parse")
    }
}

impl PageExtractor for ProductPageExtractor {
    fn script(&self) -> &str {
        &self.script
    }

    fn extract(&self, evaluated: serde_json::Value) -> ExtractionResult {
        let fields: ProductFields = serde_json::from_value(evaluated).unwrap_or_else(|e| {
            debug!("Unexpected extraction result: {}", e);
            ProductFields::default()
        });

        ExtractionResult {
            description: compose_description(&fields.title, &fields.highlights),
            image_url: fields.image_url.trim().to_string(),
        }
    }
}

/// `title`, a blank line, then one highlight per line. Empty parts are dropped.
pub fn compose_description(title: &str, highlights: &[String]) -> String {
    let highlights = highlights
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    [title.trim(), highlights.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_page() {
        let evaluated = json!({
            "imageUrl": "https://img.example/x.jpg",
            "title": "Widget",
            "highlights": ["Great", "Product"],
        });

        let result = ProductPageExtractor::default().extract(evaluated);

        assert_eq!(
            result,
            ExtractionResult {
                description: "Widget\n\nGreat\nProduct".to_string(),
                image_url: "https://img.example/x.jpg".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_image_yields_empty_url() {
        let evaluated = json!({"imageUrl": "", "title": "Widget", "highlights": []});

        let result = ProductPageExtractor::default().extract(evaluated);

        assert!(result.image_url.is_empty());
        assert_eq!(result.description, "Widget");
        assert!(!result.is_complete());
    }

    #[test]
    fn test_highlights_without_title() {
        let evaluated = json!({"title": "", "highlights": [" Only bullets "]});

        let result = ProductPageExtractor::default().extract(evaluated);

        assert_eq!(result.description, "Only bullets");
    }

    #[test]
    fn test_unexpected_value_is_empty_result() {
        for evaluated in [json!(null), json!("text"), json!({"highlights": "not a list"})] {
            let result = ProductPageExtractor::default().extract(evaluated);
            assert_eq!(result.description, "");
            assert_eq!(result.image_url, "");
        }
    }

    #[test]
    fn test_script_embeds_selectors_in_priority_order() {
        let extractor = ProductPageExtractor::default();
        let script = extractor.script();

        assert!(script.contains(r##""image":["#landingImage","#imgTagWrapperId img"]"##));
        assert!(script.contains(r##""title":"#productTitle""##));
        assert!(!script.contains("SELECTORS"));
    }

    #[test]
    fn test_script_reads_resolved_src_and_inner_text() {
        let script = ProductPageExtractor::default().script().to_string();

        assert!(script.contains("image.src"));
        assert!(script.contains("innerText"));
    }

    #[test]
    fn test_custom_selectors_are_quoted() {
        let selectors = ProductSelectors {
            image: vec!["img[alt='hero']".to_string()],
            title: "h1".to_string(),
            highlights: "ul.features li".to_string(),
        };

        let extractor = ProductPageExtractor::new(&selectors).unwrap();

        assert!(extractor.script().contains(r#""image":["img[alt='hero']"]"#));
        assert!(extractor.script().contains(r#""highlights":"ul.features li""#));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let selectors = ProductSelectors {
            title: "###".to_string(),
            ..ProductSelectors::default()
        };
        assert!(ProductPageExtractor::new(&selectors).is_err());
    }

    #[test]
    fn test_compose_description_drops_empty_parts() {
        assert_eq!(compose_description("", &[]), "");
        assert_eq!(compose_description("Title", &[]), "Title");
        assert_eq!(
            compose_description("Title", &["".to_string(), " a ".to_string()]),
            "Title\n\na"
        );
    }
}
