//! Slideshow timing and assembly.
//!
//! The audio track fixes the length of the video. Each usable image gets an
//! equal share of it, and the share is computed from the images that actually
//! decoded, so the clips always add up to the audio length no matter how many
//! URLs failed.

use super::images::{ImageSource, Still, load_stills};
use super::{AudioProbe, VideoEncoder};
use crate::config::VideoSettings;
use crate::error::PipelineError;
use crate::models::VideoArtifact;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Largest frame side libx264 encodes.
pub const MAX_FRAME_SIDE: u32 = 16384;

/// Scale factor of a Ken Burns zoom-in at `t` seconds into a clip of
/// `clip_duration` seconds: grows linearly from 1.0 to `1.0 + zoom`.
pub fn zoom_factor(t: f64, clip_duration: f64, zoom: f64) -> f64 {
    if clip_duration <= 0.0 {
        return 1.0;
    }
    1.0 + zoom * (t / clip_duration).clamp(0.0, 1.0)
}

/// Equal share of `total_secs` for each of `clips` clips.
pub fn per_clip_duration(total_secs: f64, clips: usize) -> Option<f64> {
    (clips > 0).then(|| total_secs / clips as f64)
}

/// One still shown for `duration` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlan {
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

/// Everything the encoder needs to render the video.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideshowPlan {
    pub clips: Vec<ClipPlan>,
    pub audio: PathBuf,
    pub output: PathBuf,
    pub fps: u32,
    pub zoom: f64,
    /// Frame size; stills narrower than the widest one are centered.
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl SlideshowPlan {
    fn new(stills: &[Still], audio_secs: f64, audio: &Path, output: &Path, fps: u32, zoom: f64) -> Option<Self> {
        let duration = per_clip_duration(audio_secs, stills.len())?;
        let clips: Vec<ClipPlan> = stills
            .iter()
            .map(|s| ClipPlan {
                image: s.path.clone(),
                width: s.width,
                height: s.height,
                duration,
            })
            .collect();

        let even = |v: u32| v + v % 2;
        let canvas_width = even(clips.iter().map(|c| c.width).max()?);
        let canvas_height = even(clips.iter().map(|c| c.height).max()?);

        Some(Self {
            clips,
            audio: audio.to_path_buf(),
            output: output.to_path_buf(),
            fps,
            zoom,
            canvas_width,
            canvas_height,
        })
    }

    /// Whether the canvas is larger than libx264 will accept.
    pub fn exceeds_encoder_limits(&self) -> bool {
        self.canvas_width > MAX_FRAME_SIDE || self.canvas_height > MAX_FRAME_SIDE
    }

    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }
}

/// Builds the promo video from image URLs and the narration.
#[derive(Debug, Clone)]
pub struct SlideshowBuilder<S, P, E> {
    source: S,
    probe: P,
    encoder: E,
    target_height: u32,
    zoom: f64,
    parallelism: usize,
}

impl<S, P, E> SlideshowBuilder<S, P, E>
where
    S: ImageSource,
    P: AudioProbe,
    E: VideoEncoder,
{
    pub fn new(source: S, probe: P, encoder: E) -> Self {
        let defaults = VideoSettings::default();
        Self {
            source,
            probe,
            encoder,
            target_height: defaults.target_height,
            zoom: defaults.zoom,
            parallelism: defaults.max_parallel_downloads,
        }
    }

    pub fn with_settings(mut self, settings: &VideoSettings) -> Self {
        self.target_height = settings.target_height;
        self.zoom = settings.zoom;
        self.parallelism = settings.max_parallel_downloads;
        self
    }

    #[cfg(test)]
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Render `image_urls` over the audio at `audio_path` into `output_path`.
    ///
    /// Resized stills live in a temporary directory that is removed when this
    /// returns, on success and on failure alike.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AudioProbe`] if the audio duration cannot be read
    /// - [`PipelineError::NoUsableImages`] if no image decodes; the encoder is not run
    /// - [`PipelineError::Encode`] if encoding fails
    #[instrument(level = "info", skip_all, fields(images = image_urls.len(), output = %output_path.display()))]
    pub async fn build(
        &self,
        image_urls: &[String],
        audio_path: &Path,
        output_path: &Path,
        fps: u32,
    ) -> Result<VideoArtifact, PipelineError> {
        let audio_secs = self.probe.duration_secs(audio_path).await?;
        if !(audio_secs.is_finite() && audio_secs > 0.0) {
            return Err(PipelineError::AudioProbe {
                path: audio_path.to_path_buf(),
                reason: format!("unusable duration {audio_secs}"),
            });
        }
        info!(audio_secs, "Read narration duration");

        let scratch = tempfile::Builder::new()
            .prefix("promo_reel_stills")
            .tempdir()
            .map_err(|e| PipelineError::io(std::env::temp_dir(), e))?;

        let stills = load_stills(
            &self.source,
            image_urls,
            self.target_height,
            scratch.path(),
            self.parallelism,
        )
        .await;

        let plan = SlideshowPlan::new(&stills, audio_secs, audio_path, output_path, fps, self.zoom)
            .ok_or(PipelineError::NoUsableImages {
                attempted: image_urls.len(),
            })?;
        info!(
            clips = plan.clips.len(),
            per_clip_secs = plan.clips[0].duration,
            end_scale = zoom_factor(plan.clips[0].duration, plan.clips[0].duration, self.zoom),
            canvas = %format!("{}x{}", plan.canvas_width, plan.canvas_height),
            "Slideshow planned"
        );

        if plan.exceeds_encoder_limits() {
            warn!(
                canvas_width = plan.canvas_width,
                canvas_height = plan.canvas_height,
                max = MAX_FRAME_SIDE,
                "Canvas is larger than the encoder accepts; a very wide image probably set it"
            );
        }

        self.encoder.encode(&plan).await?;
        info!("Video encoded");

        Ok(VideoArtifact {
            path: output_path.to_path_buf(),
            clip_count: plan.clips.len(),
            duration_secs: plan.total_duration(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::{RecordingEncoder, StubImages, StubProbe};

    fn urls(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("https://cdn.test/{n}.png"))
            .collect()
    }

    fn builder(
        source: StubImages,
        audio_secs: f64,
    ) -> SlideshowBuilder<StubImages, StubProbe, RecordingEncoder> {
        SlideshowBuilder::new(source, StubProbe(audio_secs), RecordingEncoder::default()).with_settings(
            &VideoSettings {
                target_height: 24,
                ..VideoSettings::default()
            },
        )
    }

    #[test]
    fn test_zoom_factor_is_linear_and_clamped() {
        assert_eq!(zoom_factor(0.0, 2.0, 0.05), 1.0);
        assert!((zoom_factor(1.0, 2.0, 0.05) - 1.025).abs() < 1e-12);
        assert!((zoom_factor(2.0, 2.0, 0.05) - 1.05).abs() < 1e-12);
        assert!((zoom_factor(5.0, 2.0, 0.05) - 1.05).abs() < 1e-12);
        assert_eq!(zoom_factor(1.0, 0.0, 0.05), 1.0);
    }

    #[test]
    fn test_per_clip_duration() {
        assert_eq!(per_clip_duration(4.0, 2), Some(2.0));
        assert_eq!(per_clip_duration(4.0, 0), None);
    }

    #[tokio::test]
    async fn test_durations_fill_audio_despite_failures() {
        let source = StubImages::serving(&[
            "https://cdn.test/a.png",
            "https://cdn.test/c.png",
            "https://cdn.test/e.png",
        ]);
        let b = builder(source, 7.3);
        let out = PathBuf::from("/tmp/out/promo.mp4");

        let video = b
            .build(&urls(&["a", "b", "c", "d", "e"]), Path::new("voice.mp3"), &out, 30)
            .await
            .unwrap();

        let plan = b.encoder().single_plan();
        assert_eq!(plan.clips.len(), 3);
        assert!((plan.total_duration() - 7.3).abs() < 1e-9);
        assert!(plan.clips.iter().all(|c| (c.duration - 7.3 / 3.0).abs() < 1e-12));
        assert_eq!(video.clip_count, 3);
        assert_eq!(video.path, out);
    }

    #[tokio::test]
    async fn test_no_usable_images_skips_encoder() {
        let b = builder(StubImages::serving(&[]).with_garbage("https://cdn.test/b.png"), 4.0);
        let err = b
            .build(&urls(&["a", "b"]), Path::new("voice.mp3"), Path::new("promo.mp4"), 30)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoUsableImages { attempted: 2 }));
        assert_eq!(b.encoder().calls(), 0);
    }

    #[tokio::test]
    async fn test_canvas_fits_widest_still_and_temp_files_are_removed() {
        let source = StubImages::serving(&["https://cdn.test/wide.png", "https://cdn.test/tall.png"])
            .with_size("https://cdn.test/wide.png", 10, 3)
            .with_size("https://cdn.test/tall.png", 3, 6);
        let b = builder(source, 2.0);

        b.build(&urls(&["wide", "tall"]), Path::new("voice.mp3"), Path::new("promo.mp4"), 24)
            .await
            .unwrap();

        let plan = b.encoder().single_plan();
        assert_eq!((plan.clips[0].width, plan.clips[1].width), (80, 12));
        assert_eq!((plan.canvas_width, plan.canvas_height), (80, 24));
        assert_eq!(plan.fps, 24);
        assert!(plan.clips.iter().all(|c| !c.image.exists()));
    }

    #[tokio::test]
    async fn test_thin_banner_widens_canvas_past_encoder_limit() {
        let source = StubImages::serving(&["https://cdn.test/banner.png", "https://cdn.test/a.png"])
            .with_size("https://cdn.test/banner.png", 2000, 1);
        let b = builder(source, 2.0);

        b.build(&urls(&["banner", "a"]), Path::new("voice.mp3"), Path::new("promo.mp4"), 30)
            .await
            .unwrap();

        let plan = b.encoder().single_plan();
        assert_eq!(plan.canvas_width, 48_000);
        assert!(plan.exceeds_encoder_limits());
    }

    #[test]
    fn test_regular_canvas_is_within_encoder_limits() {
        let plan = SlideshowPlan {
            clips: vec![],
            audio: PathBuf::from("voice.mp3"),
            output: PathBuf::from("promo.mp4"),
            fps: 30,
            zoom: 0.05,
            canvas_width: 1280,
            canvas_height: 720,
        };
        assert!(!plan.exceeds_encoder_limits());
    }

    #[tokio::test]
    async fn test_probe_failure_is_fatal() {
        let b = builder(StubImages::serving(&["https://cdn.test/a.png"]), -1.0);
        let err = b
            .build(&urls(&["a"]), Path::new("voice.mp3"), Path::new("promo.mp4"), 30)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AudioProbe { .. }));
        assert_eq!(b.encoder().calls(), 0);
    }
}
