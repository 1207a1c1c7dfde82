//! Product assembler: page fetch plus the five field extractors.

use super::extract::{
    extract_description, extract_images, extract_price, extract_specs, extract_title,
};
use super::fetch::fetch_html;
use crate::error::PipelineError;
use crate::models::ProductRecord;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, instrument};

/// Build a [`ProductRecord`] from already-downloaded HTML.
pub fn assemble(url: &str, html: &str) -> ProductRecord {
    let document = Html::parse_document(html);

    let product = ProductRecord::new(
        url,
        extract_title(&document),
        extract_price(&document),
        extract_description(&document),
        extract_specs(&document),
        extract_images(&document, url),
    );

    info!(
        title = %product.title(),
        price = ?product.price(),
        specs = product.specs().len(),
        images = product.images().len(),
        description_chars = product.description().chars().count(),
        "Assembled product record"
    );
    debug!(images = ?product.images(), "Product images");
    product
}

/// Fetch `url` and extract its product record.
///
/// # Errors
///
/// [`PipelineError::Fetch`] if the page cannot be retrieved. Extraction itself never fails.
#[instrument(level = "info", skip(client))]
pub async fn scrape_product(client: &Client, url: &str) -> Result<ProductRecord, PipelineError> {
    let html = fetch_html(client, url).await?;
    Ok(assemble(url, &html))
}
