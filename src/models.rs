//! Data models passed between pipeline stages.
//!
//! - [`ProductRecord`]: structured data scraped from one product page
//! - [`ScriptText`]: the narration script
//! - [`AudioArtifact`] / [`VideoArtifact`]: files produced inside the working directory
//!
//! A [`ProductRecord`] is immutable once built. Its constructor enforces the
//! record invariants (non-empty title, bounded description, unique and capped
//! image list), so every record in the program satisfies them.

use crate::utils::{clean_text, truncate_chars};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Maximum number of image URLs kept for one product.
pub const MAX_IMAGES: usize = 12;
/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1200;
/// Title used when the page offers nothing better.
pub const PLACEHOLDER_TITLE: &str = "Product";

/// Structured data extracted from a product page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    url: String,
    title: String,
    price: Option<String>,
    description: String,
    /// Label → value, in document order.
    specs: IndexMap<String, String>,
    /// Absolute image URLs, first-seen order.
    images: Vec<String>,
}

impl ProductRecord {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        price: Option<String>,
        description: impl Into<String>,
        specs: IndexMap<String, String>,
        images: Vec<String>,
    ) -> Self {
        let title = clean_text(&title.into());
        let title = if title.is_empty() {
            PLACEHOLDER_TITLE.to_string()
        } else {
            title
        };
        let description = description.into();
        let description = truncate_chars(&description, MAX_DESCRIPTION_CHARS).to_string();
        let images = images.into_iter().unique().take(MAX_IMAGES).collect();

        Self {
            url: url.into(),
            title,
            price,
            description,
            specs,
            images,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn specs(&self) -> &IndexMap<String, String> {
        &self.specs
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// The first spec pair in document order, if any.
    pub fn first_spec(&self) -> Option<(&str, &str)> {
        self.specs
            .iter()
            .next()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Narration script produced once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptText(String);

impl ScriptText {
    pub fn new(text: impl Into<String>) -> Self {
        ScriptText(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl fmt::Display for ScriptText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScriptText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Narration audio written by the speech stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    /// Name of the backend that produced the file.
    pub backend: &'static str,
}

/// The finished promo video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub clip_count: usize,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_images(images: Vec<String>) -> ProductRecord {
        ProductRecord::new(
            "https://shop.test/p",
            "Widget",
            None,
            "",
            IndexMap::new(),
            images,
        )
    }

    #[test]
    fn test_blank_title_falls_back_to_placeholder() {
        let p = ProductRecord::new("u", "  \n ", None, "", IndexMap::new(), vec![]);
        assert_eq!(p.title(), PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_title_is_whitespace_normalized() {
        let p = ProductRecord::new("u", " Red \n Widget ", None, "", IndexMap::new(), vec![]);
        assert_eq!(p.title(), "Red Widget");
    }

    #[test]
    fn test_description_is_capped() {
        let long = "x".repeat(MAX_DESCRIPTION_CHARS + 50);
        let p = ProductRecord::new("u", "t", None, long, IndexMap::new(), vec![]);
        assert_eq!(p.description().chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_images_are_deduplicated_and_capped() {
        let mut urls: Vec<String> = (0..20)
            .map(|i| format!("https://cdn.test/{i}.jpg"))
            .collect();
        urls.insert(1, "https://cdn.test/0.jpg".to_string());

        let p = record_with_images(urls);
        assert_eq!(p.images().len(), MAX_IMAGES);
        assert_eq!(p.images()[0], "https://cdn.test/0.jpg");
        assert_eq!(p.images()[1], "https://cdn.test/1.jpg");
        assert!(p.images().iter().all_unique());
    }

    #[test]
    fn test_first_spec_follows_insertion_order() {
        let mut specs = IndexMap::new();
        specs.insert("Weight".to_string(), "1kg".to_string());
        specs.insert("Color".to_string(), "Red".to_string());
        let p = ProductRecord::new("u", "t", None, "", specs, vec![]);
        assert_eq!(p.first_spec(), Some(("Weight", "1kg")));
    }

    #[test]
    fn test_product_serialization_keeps_spec_order() {
        let mut specs = IndexMap::new();
        specs.insert("Zeta".to_string(), "1".to_string());
        specs.insert("Alpha".to_string(), "2".to_string());
        let p = ProductRecord::new("u", "t", Some("$5".into()), "", specs, vec![]);

        let json = serde_json::to_string(&p).unwrap();
        let zeta = json.find("Zeta").unwrap();
        let alpha = json.find("Alpha").unwrap();
        assert!(zeta < alpha);
        assert!(json.contains("\"price\":\"$5\""));
    }

    #[test]
    fn test_script_text_word_count() {
        let s = ScriptText::new("Introducing Widget!  Visit the link.");
        assert_eq!(s.word_count(), 5);
        assert_eq!(s.to_string(), "Introducing Widget!  Visit the link.");
    }
}
