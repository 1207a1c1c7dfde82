//! Run driver: scrape, script, speech, video.
//!
//! Stages run strictly in order. Each one either hands a value to the next
//! or aborts the run with a [`PipelineError`] naming the stage.

use crate::config::Settings;
use crate::error::PipelineError;
use crate::models::{ProductRecord, VideoArtifact};
use crate::outputs::{json, script::write_script};
use crate::script::{ScriptSource, ScriptWriter, compose};
use crate::scrapers::{build_client, scrape_product};
use crate::tts::Synthesizer;
use crate::utils::ensure_writable_dir;
use crate::video::{AudioProbe, Ffmpeg, HttpImageSource, ImageSource, SlideshowBuilder, VideoEncoder};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

pub use crate::outputs::script::SCRIPT_FILE;
pub const AUDIO_FILE: &str = "voice.mp3";
pub const VIDEO_FILE: &str = "promo.mp4";

/// Everything a single run needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub url: String,
    pub workdir: PathBuf,
    /// Skip the language model even when a credential is configured.
    pub use_template: bool,
    pub settings: Settings,
}

/// The stage implementations used after scraping.
#[derive(Debug)]
pub struct Stages<W, S, P, E> {
    pub writer: W,
    pub synthesizer: Synthesizer,
    pub slideshow: SlideshowBuilder<S, P, E>,
    pub voice: String,
    pub fps: u32,
}

/// Produce `promo.mp4` for `options.url` inside `options.workdir`.
///
/// # Errors
///
/// The first fatal stage failure: an unwritable working directory, an
/// unreachable page, a failed placeholder write, an unreadable audio file,
/// no usable images, or an encoder failure.
#[instrument(level = "info", skip_all, fields(url = %options.url, workdir = %options.workdir.display()))]
pub async fn run(options: &RunOptions) -> Result<VideoArtifact, PipelineError> {
    let settings = &options.settings;
    ensure_writable_dir(&options.workdir).await?;

    let http = build_client(&settings.http)?;
    let product = scrape_product(&http, &options.url).await?;

    let writer = ScriptSource::select(options.use_template, &http, &settings.llm);
    let synthesizer = Synthesizer::from_settings(http.clone(), &settings.tts);
    info!(
        writer = writer.name(),
        speech = ?synthesizer.backends().iter().map(|b| b.name()).collect::<Vec<_>>(),
        "Stages selected"
    );

    let stages = Stages {
        writer,
        synthesizer,
        slideshow: SlideshowBuilder::new(HttpImageSource::new(http), Ffmpeg::default(), Ffmpeg::default())
            .with_settings(&settings.video),
        voice: settings.tts.voice.clone(),
        fps: settings.video.fps,
    };

    produce(&product, &options.workdir, &stages).await
}

/// Run every stage after scraping against an existing `workdir`.
pub async fn produce<W, S, P, E>(
    product: &ProductRecord,
    workdir: &Path,
    stages: &Stages<W, S, P, E>,
) -> Result<VideoArtifact, PipelineError>
where
    W: ScriptWriter,
    S: ImageSource,
    P: AudioProbe,
    E: VideoEncoder,
{
    let script_path = workdir.join(SCRIPT_FILE);
    let audio_path = workdir.join(AUDIO_FILE);
    let video_path = workdir.join(VIDEO_FILE);

    // A leftover video from an earlier run must not pass for this one.
    match fs::remove_file(&video_path).await {
        Ok(()) => debug!(path = %video_path.display(), "Removed previous video"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(PipelineError::io(&video_path, e)),
    }

    info!(url = %product.url(), "Producing promo");
    json::write_product(product, workdir).await?;

    let script = compose(product, &stages.writer).await;
    write_script(&script, &script_path).await?;

    let audio = stages
        .synthesizer
        .synthesize(&script, &audio_path, &stages.voice)
        .await?;
    info!(backend = audio.backend, "Narration ready");

    let video = stages
        .slideshow
        .build(product.images(), &audio.path, &video_path, stages.fps)
        .await?;
    info!(
        path = %video.path.display(),
        clips = video.clip_count,
        duration_secs = video.duration_secs,
        "Promo video ready"
    );
    Ok(video)
}
