//! Plain-text script artifact.

use crate::error::PipelineError;
use crate::models::ScriptText;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub const SCRIPT_FILE: &str = "script.txt";

/// Write the script as UTF-8 text to `path`.
pub async fn write_script(script: &ScriptText, path: &Path) -> Result<(), PipelineError> {
    fs::write(path, script.as_str())
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), words = script.word_count(), "Wrote script");
    Ok(())
}
