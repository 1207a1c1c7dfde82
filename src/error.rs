//! Error taxonomy for the promo pipeline.
//!
//! Every fatal variant names the stage that produced it so the message printed
//! on exit tells the user where the run stopped. Recoverable variants
//! ([`PipelineError::ScriptGeneration`], [`PipelineError::Synthesis`] from a
//! non-final backend, [`PipelineError::ImageDecode`]) are logged and swallowed
//! by the stage that raised them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The product page could not be retrieved. Fatal.
    #[error("fetch stage: could not retrieve {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Delegated script generation failed. Always recovered by the template writer.
    #[error("script stage: text generation failed: {0}")]
    ScriptGeneration(String),

    /// A speech backend failed. Fatal only when raised by the placeholder backend.
    #[error("speech stage: backend `{backend}` failed: {reason}")]
    Synthesis { backend: &'static str, reason: String },

    /// Not a single image could be fetched and decoded.
    #[error("video stage: none of the {attempted} image URL(s) produced a usable image")]
    NoUsableImages { attempted: usize },

    /// One image could not be used; the slideshow skips it.
    #[error("video stage: image {url} is unusable: {reason}")]
    ImageDecode { url: String, reason: String },

    #[error("video stage: could not read the duration of {}: {reason}", .path.display())]
    AudioProbe { path: PathBuf, reason: String },

    #[error("video stage: encoder failed: {0}")]
    Encode(String),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
