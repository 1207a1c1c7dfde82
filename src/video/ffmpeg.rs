//! `ffprobe` / `ffmpeg` command-line backend.
//!
//! Each clip is a looped still. Its zoom is a per-frame `scale` expression
//! over the clip-local time `t`, followed by a centre crop back to the still
//! size and a pad onto the shared canvas. The clips are concatenated and the
//! narration is mapped as the only audio stream.

use super::slideshow::{ClipPlan, SlideshowPlan};
use super::{AudioProbe, VideoEncoder};
use crate::error::PipelineError;
use crate::utils::truncate_for_log;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, error, instrument};

pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";

/// Paths of the ffmpeg executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Parse the bare number printed by `ffprobe -show_entries format=duration`.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
}

/// The scale expression for one axis, rounded up to an even size.
fn zoom_expr(size: u32, zoom: f64, duration: f64) -> String {
    format!("2*ceil({size}*(1+{zoom}*min(t/{duration:.6},1))/2)")
}

/// Offset that keeps the crop window centred on the zoomed frame at time `t`.
fn crop_offset_expr(size: u32, zoom: f64, duration: f64) -> String {
    format!("({}-{size})/2", zoom_expr(size, zoom, duration))
}

fn clip_filter(index: usize, clip: &ClipPlan, plan: &SlideshowPlan) -> String {
    format!(
        "[{index}:v]scale=w='{w_expr}':h='{h_expr}':eval=frame,\
         crop={w}:{h}:x='{x_expr}':y='{y_expr}',\
         pad={cw}:{ch}:(ow-iw)/2:(oh-ih)/2:color=black,\
         setsar=1,fps={fps},format=yuv420p[v{index}]",
        w_expr = zoom_expr(clip.width, plan.zoom, clip.duration),
        h_expr = zoom_expr(clip.height, plan.zoom, clip.duration),
        x_expr = crop_offset_expr(clip.width, plan.zoom, clip.duration),
        y_expr = crop_offset_expr(clip.height, plan.zoom, clip.duration),
        w = clip.width,
        h = clip.height,
        cw = plan.canvas_width,
        ch = plan.canvas_height,
        fps = plan.fps,
    )
}

/// The `-filter_complex` graph: per-clip zoom chains joined by `concat`.
pub fn filter_graph(plan: &SlideshowPlan) -> String {
    let mut parts: Vec<String> = plan
        .clips
        .iter()
        .enumerate()
        .map(|(i, clip)| clip_filter(i, clip, plan))
        .collect();

    let labels: String = (0..plan.clips.len()).map(|i| format!("[v{i}]")).collect();
    parts.push(format!("{labels}concat=n={}:v=1:a=0[vout]", plan.clips.len()));
    parts.join(";")
}

/// Full ffmpeg argument list for `plan`.
pub fn encode_args(plan: &SlideshowPlan) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];

    for clip in &plan.clips {
        args.extend([
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            plan.fps.to_string(),
            "-t".into(),
            format!("{:.6}", clip.duration),
            "-i".into(),
            clip.image.to_string_lossy().into_owned(),
        ]);
    }
    args.extend(["-i".into(), plan.audio.to_string_lossy().into_owned()]);

    args.extend([
        "-filter_complex".into(),
        filter_graph(plan),
        "-map".into(),
        "[vout]".into(),
        "-map".into(),
        format!("{}:a:0", plan.clips.len()),
        "-c:v".into(),
        VIDEO_CODEC.into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        AUDIO_CODEC.into(),
        "-r".into(),
        plan.fps.to_string(),
        "-movflags".into(),
        "+faststart".into(),
        plan.output.to_string_lossy().into_owned(),
    ]);
    args
}

impl AudioProbe for Ffmpeg {
    #[instrument(level = "info", skip(self), fields(path = %path.display()))]
    async fn duration_secs(&self, path: &Path) -> Result<f64, PipelineError> {
        let probe_err = |reason: String| PipelineError::AudioProbe {
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| probe_err(format!("could not run {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_err(truncate_for_log(stderr.trim(), 300)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(&stdout).ok_or_else(|| probe_err(format!("unexpected ffprobe output {stdout:?}")))
    }
}

impl VideoEncoder for Ffmpeg {
    #[instrument(level = "info", skip_all, fields(output = %plan.output.display(), clips = plan.clips.len()))]
    async fn encode(&self, plan: &SlideshowPlan) -> Result<(), PipelineError> {
        let args = encode_args(plan);
        debug!(filter = %truncate_for_log(&filter_graph(plan), 400), "Running ffmpeg");

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .output()
            .await
            .map_err(|e| PipelineError::Encode(format!("could not run {}: {e}", self.ffmpeg)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(8)..].join("\n");
            error!(status = ?output.status.code(), "ffmpeg failed");
            // a half-written file must not look like a result
            let _ = tokio::fs::remove_file(&plan.output).await;
            return Err(PipelineError::Encode(tail));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn plan() -> SlideshowPlan {
        SlideshowPlan {
            clips: vec![
                ClipPlan {
                    image: PathBuf::from("/tmp/s/still_00.png"),
                    width: 1280,
                    height: 720,
                    duration: 2.0,
                },
                ClipPlan {
                    image: PathBuf::from("/tmp/s/still_01.png"),
                    width: 961,
                    height: 720,
                    duration: 2.0,
                },
            ],
            audio: PathBuf::from("out/voice.mp3"),
            output: PathBuf::from("out/promo.mp4"),
            fps: 30,
            zoom: 0.05,
            canvas_width: 1280,
            canvas_height: 720,
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4.000000\n"), Some(4.0));
        assert_eq!(parse_duration("\n 12.5 \n"), Some(12.5));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_zoom_expr() {
        assert_eq!(
            zoom_expr(720, 0.05, 2.0),
            "2*ceil(720*(1+0.05*min(t/2.000000,1))/2)"
        );
    }

    #[test]
    fn test_crop_offset_tracks_zoom() {
        assert_eq!(
            crop_offset_expr(720, 0.05, 2.0),
            "(2*ceil(720*(1+0.05*min(t/2.000000,1))/2)-720)/2"
        );
    }

    #[test]
    fn test_filter_graph_shape() {
        let graph = filter_graph(&plan());
        let chains: Vec<_> = graph.split(';').collect();
        assert_eq!(chains.len(), 3);
        assert!(chains[0].starts_with("[0:v]scale=w='"));
        assert!(chains[1].contains(
            "crop=961:720:\
             x='(2*ceil(961*(1+0.05*min(t/2.000000,1))/2)-961)/2':\
             y='(2*ceil(720*(1+0.05*min(t/2.000000,1))/2)-720)/2',\
             pad=1280:720:(ow-iw)/2:(oh-ih)/2"
        ));
        assert!(chains[1].ends_with("fps=30,format=yuv420p[v1]"));
        assert_eq!(chains[2], "[v0][v1]concat=n=2:v=1:a=0[vout]");
    }

    #[test]
    fn test_encode_args() {
        let args = encode_args(&plan());
        let joined = args.join(" ");

        assert_eq!(args.iter().filter(|a| *a == "-loop").count(), 2);
        assert!(joined.contains("-t 2.000000 -i /tmp/s/still_00.png"));
        assert!(joined.contains("-i out/voice.mp3 -filter_complex"));
        assert!(joined.contains("-map [vout] -map 2:a:0"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert_eq!(args.last().map(String::as_str), Some("out/promo.mp4"));
    }
}
