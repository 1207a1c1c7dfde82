//! Slideshow video assembly.
//!
//! # Submodules
//!
//! - [`images`]: download, decode and resize of the product images
//! - [`slideshow`]: duration law, Ken Burns zoom, and the build sequence
//! - [`ffmpeg`]: `ffprobe` duration probe and `ffmpeg` encoder
//!
//! The media tools sit behind the [`AudioProbe`] and [`VideoEncoder`] traits
//! so the timing logic can run without them.

pub mod ffmpeg;
pub mod images;
pub mod slideshow;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::PipelineError;
use std::path::Path;

pub use ffmpeg::Ffmpeg;
pub use images::{HttpImageSource, ImageSource};
pub use slideshow::{SlideshowBuilder, SlideshowPlan};

/// Reads the playing time of an audio file.
pub trait AudioProbe {
    async fn duration_secs(&self, path: &Path) -> Result<f64, PipelineError>;
}

/// Renders a [`SlideshowPlan`] to its output file.
pub trait VideoEncoder {
    async fn encode(&self, plan: &SlideshowPlan) -> Result<(), PipelineError>;
}
