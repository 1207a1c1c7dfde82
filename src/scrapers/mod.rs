//! Product page scraping.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Fetching**: download the page HTML ([`fetch`])
//! 2. **Extraction**: run the field heuristics over the parsed document ([`extract`])
//!
//! [`product`] ties both together into a [`crate::models::ProductRecord`].
//!
//! # Extracted fields
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | title | `<title>` up to the first `\|` | first `<h1>`, then `"Product"` |
//! | price | first `$`-amount text node | price `<meta>` tags, then none |
//! | description | longest `<p>` with more than 4 words | empty |
//! | specs | `<dl>` pairs, two-cell table rows | empty |
//! | images | `<img data-src>` / `<img src>` raster URLs | empty |

pub mod extract;
pub mod fetch;
pub mod product;

pub use fetch::build_client;
pub use product::scrape_product;
