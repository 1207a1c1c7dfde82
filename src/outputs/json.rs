//! JSON snapshot of the scraped product.
//!
//! The record is written as `product.json` in the working directory so the
//! extraction results of a run can be inspected next to the media it produced.

use crate::error::PipelineError;
use crate::models::ProductRecord;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const PRODUCT_FILE: &str = "product.json";

/// Write `product` as pretty JSON to `{workdir}/product.json`.
#[instrument(level = "info", skip_all, fields(workdir = %workdir.display()))]
pub async fn write_product(product: &ProductRecord, workdir: &Path) -> Result<PathBuf, PipelineError> {
    let path = workdir.join(PRODUCT_FILE);
    let json = serde_json::to_string_pretty(product).map_err(|e| {
        PipelineError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    fs::write(&path, json)
        .await
        .map_err(|e| PipelineError::io(&path, e))?;
    info!(path = %path.display(), "Wrote product JSON");
    Ok(path)
}
