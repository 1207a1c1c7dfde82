//! Test doubles for the media seams.

use super::images::ImageSource;
use super::slideshow::SlideshowPlan;
use super::{AudioProbe, VideoEncoder};
use crate::error::PipelineError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

/// Encode a solid `width x height` PNG in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Serves PNGs for known URLs, garbage bytes for "broken" ones, and an error otherwise.
#[derive(Debug, Default)]
pub struct StubImages {
    served: HashMap<String, Vec<u8>>,
}

impl StubImages {
    pub fn serving(urls: &[&str]) -> Self {
        let served = urls.iter().map(|u| (u.to_string(), png_bytes(4, 2))).collect();
        Self { served }
    }

    pub fn with_size(mut self, url: &str, width: u32, height: u32) -> Self {
        self.served.insert(url.to_string(), png_bytes(width, height));
        self
    }

    pub fn with_garbage(mut self, url: &str) -> Self {
        self.served.insert(url.to_string(), b"<html>not an image</html>".to_vec());
        self
    }
}

impl ImageSource for StubImages {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        self.served
            .get(url)
            .cloned()
            .ok_or_else(|| PipelineError::ImageDecode {
                url: url.to_string(),
                reason: "404".to_string(),
            })
    }
}

/// Reports a fixed duration for any path.
#[derive(Debug, Clone, Copy)]
pub struct StubProbe(pub f64);

impl AudioProbe for StubProbe {
    async fn duration_secs(&self, _path: &Path) -> Result<f64, PipelineError> {
        Ok(self.0)
    }
}

/// Records every plan it is asked to encode.
#[derive(Debug, Default)]
pub struct RecordingEncoder {
    plans: Mutex<Vec<SlideshowPlan>>,
}

impl RecordingEncoder {
    pub fn calls(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    pub fn single_plan(&self) -> SlideshowPlan {
        let plans = self.plans.lock().unwrap();
        assert_eq!(plans.len(), 1, "expected exactly one encode call");
        plans[0].clone()
    }
}

impl VideoEncoder for RecordingEncoder {
    async fn encode(&self, plan: &SlideshowPlan) -> Result<(), PipelineError> {
        self.plans.lock().unwrap().push(plan.clone());
        Ok(())
    }
}
