//! Field extractors for arbitrary product pages.
//!
//! Five independent heuristics, each a pure function over the parsed
//! document. None of them can fail: missing or malformed markup degrades to
//! an empty or placeholder value, since the markup of the pages we scrape is
//! not under our control.

use crate::models::{MAX_DESCRIPTION_CHARS, MAX_IMAGES, PLACEHOLDER_TITLE};
use crate::utils::{clean_text, truncate_chars};
use indexmap::IndexMap;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static DL: Lazy<Selector> = Lazy::new(|| Selector::parse("dl").unwrap());
static DT: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").unwrap());
static DD: Lazy<Selector> = Lazy::new(|| Selector::parse("dd").unwrap());
static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("table tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static META_PRICE: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        Selector::parse(r#"meta[property="product:price:amount"]"#).unwrap(),
        Selector::parse(r#"meta[itemprop="price"]"#).unwrap(),
    ]
});

static PRICE_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s?\d").unwrap());

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

fn element_text(el: ElementRef<'_>, sep: &str) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(sep))
}

/// Page title, cut at the first `|`; else the first `<h1>`; else `"Product"`.
pub fn extract_title(document: &Html) -> String {
    let from_title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>())
        .map(|t| clean_text(t.split('|').next().unwrap_or_default()))
        .filter(|t| !t.is_empty());
    if let Some(title) = from_title {
        return title;
    }

    document
        .select(&H1)
        .next()
        .map(|h| element_text(h, " "))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string())
}

/// First text node that looks like a dollar amount, else price metadata.
pub fn extract_price(document: &Html) -> Option<String> {
    let from_text = document
        .root_element()
        .text()
        .find(|t| PRICE_TEXT.is_match(t))
        .map(clean_text);
    if from_text.is_some() {
        return from_text;
    }

    META_PRICE.iter().find_map(|sel| {
        document
            .select(sel)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(str::to_string)
    })
}

/// Label/value pairs from definition lists and two-column table rows.
///
/// Definition lists come first; on a key collision the first value seen is kept.
pub fn extract_specs(document: &Html) -> IndexMap<String, String> {
    let mut specs = IndexMap::new();
    let mut insert = |k: String, v: String| {
        if !k.is_empty() && !v.is_empty() && !specs.contains_key(&k) {
            specs.insert(k, v);
        }
    };

    for dl in document.select(&DL) {
        let terms: Vec<_> = dl.select(&DT).collect();
        let defs: Vec<_> = dl.select(&DD).collect();
        if terms.is_empty() || terms.len() != defs.len() {
            continue;
        }
        for (dt, dd) in terms.into_iter().zip(defs) {
            insert(element_text(dt, ":"), element_text(dd, " "));
        }
    }

    for row in document.select(&TABLE_ROW) {
        let cells: Vec<_> = row.select(&CELL).collect();
        if let [key, value] = cells.as_slice() {
            insert(element_text(*key, ":"), element_text(*value, " "));
        }
    }

    specs
}

/// Longest paragraph with more than four words, capped at 1200 characters.
pub fn extract_description(document: &Html) -> String {
    let longest = document
        .select(&PARAGRAPH)
        .map(|p| element_text(p, " "))
        .filter(|p| p.split_whitespace().count() > 4)
        .fold(None::<String>, |best, p| match best {
            Some(b) if b.chars().count() >= p.chars().count() => Some(b),
            _ => Some(p),
        });

    longest
        .map(|p| truncate_chars(&p, MAX_DESCRIPTION_CHARS).to_string())
        .unwrap_or_default()
}

/// `scheme://host[:port]` of the page, used to absolutize root-relative paths.
pub fn page_origin(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    url.has_host().then(|| url.origin().ascii_serialization())
}

fn normalize_image_url(src: &str, origin: Option<&str>) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        return format!("https://{rest}");
    }
    match origin {
        Some(origin) if src.starts_with('/') => format!("{origin}{src}"),
        _ => src.to_string(),
    }
}

fn looks_like_raster(url: &str) -> bool {
    let lower = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

/// Raster image URLs in document order, deduplicated and capped at 12.
///
/// `data-src` (lazy loading) wins over `src`. The extension test is a plain
/// substring match, so query strings such as `?format=.png` are admitted too.
pub fn extract_images(document: &Html, page_url: &str) -> Vec<String> {
    let origin = page_origin(page_url);

    document
        .select(&IMG)
        .filter_map(|img| {
            let attrs = img.value();
            attrs
                .attr("data-src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| attrs.attr("src"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .map(|src| normalize_image_url(src, origin.as_deref()))
        .filter(|url| looks_like_raster(url))
        .unique()
        .take(MAX_IMAGES)
        .collect()
}
