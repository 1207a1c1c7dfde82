//! Image download, decode and resize for slideshow stills.

use crate::error::PipelineError;
use futures::stream::{self, StreamExt};
use image::imageops::FilterType;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Source of raw image bytes.
pub trait ImageSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Downloads images over HTTP with the shared client.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    http: Client,
}

impl HttpImageSource {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let unusable = |e: reqwest::Error| PipelineError::ImageDecode {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unusable)?
            .bytes()
            .await
            .map_err(unusable)?;
        Ok(bytes.to_vec())
    }
}

/// A decoded image resized and saved as a PNG still.
#[derive(Debug, Clone, PartialEq)]
pub struct Still {
    pub url: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Width after scaling `width x height` to `target_height`, keeping the aspect ratio.
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    let w = (f64::from(width) * f64::from(target_height) / f64::from(height)).floor();
    (w as u32).max(1)
}

/// Decode `bytes`, resize to `target_height` and write the result to `dest`.
pub fn decode_and_resize(
    bytes: &[u8],
    target_height: u32,
    dest: &Path,
) -> Result<(u32, u32), String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err("image has no pixels".to_string());
    }

    let new_w = scaled_width(w, h, target_height);
    img.resize_exact(new_w, target_height, FilterType::Lanczos3)
        .to_rgb8()
        .save(dest)
        .map_err(|e| e.to_string())?;
    Ok((new_w, target_height))
}

async fn load_one<S: ImageSource>(
    source: &S,
    url: &str,
    dest: PathBuf,
    target_height: u32,
) -> Result<Still, PipelineError> {
    let unusable = |reason: String| PipelineError::ImageDecode {
        url: url.to_string(),
        reason,
    };

    let bytes = source.fetch(url).await?;
    let out = dest.clone();
    let (width, height) =
        tokio::task::spawn_blocking(move || decode_and_resize(&bytes, target_height, &out))
            .await
            .map_err(|e| unusable(e.to_string()))?
            .map_err(unusable)?;

    Ok(Still {
        url: url.to_string(),
        path: dest,
        width,
        height,
    })
}

/// Fetch and decode every URL, up to `parallelism` at a time.
///
/// Returns only once every attempt has finished. Stills keep the order of
/// `urls`; failures are logged and left out.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn load_stills<S: ImageSource>(
    source: &S,
    urls: &[String],
    target_height: u32,
    dir: &Path,
    parallelism: usize,
) -> Vec<Still> {
    let results: Vec<Result<Still, PipelineError>> = stream::iter(urls.iter().enumerate())
        .map(|(i, url)| load_one(source, url, dir.join(format!("still_{i:02}.png")), target_height))
        .buffered(parallelism.max(1))
        .collect()
        .await;

    let stills: Vec<Still> = results
        .into_iter()
        .filter_map(|r| match r {
            Ok(still) => {
                debug!(url = %still.url, width = still.width, "Loaded still");
                Some(still)
            }
            Err(e) => {
                warn!(error = %e, "Skipping image");
                None
            }
        })
        .collect();

    info!(
        requested = urls.len(),
        loaded = stills.len(),
        "Image loading finished"
    );
    stills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::{StubImages, png_bytes};

    /// Answer every request on a local port with `status_line` and an empty body.
    async fn serve_status(status_line: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_scaled_width() {
        assert_eq!(scaled_width(1920, 1080, 720), 1280);
        assert_eq!(scaled_width(4, 2, 720), 1440);
        assert_eq!(scaled_width(1, 10_000, 720), 1);
    }

    #[test]
    fn test_decode_and_resize_writes_png() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("still.png");
        let (w, h) = decode_and_resize(&png_bytes(6, 3), 30, &dest).unwrap();
        assert_eq!((w, h), (60, 30));

        let written = image::open(&dest).unwrap();
        assert_eq!((written.width(), written.height()), (60, 30));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(decode_and_resize(b"not an image", 30, &tmp.path().join("x.png")).is_err());
    }

    #[tokio::test]
    async fn test_load_stills_keeps_order_and_skips_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubImages::serving(&["https://cdn.test/a.png", "https://cdn.test/c.png"])
            .with_garbage("https://cdn.test/b.png");
        let urls: Vec<String> = ["a", "missing", "b", "c"]
            .iter()
            .map(|n| format!("https://cdn.test/{n}.png"))
            .collect();

        let stills = load_stills(&source, &urls, 20, tmp.path(), 3).await;
        let loaded: Vec<_> = stills.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(loaded, ["https://cdn.test/a.png", "https://cdn.test/c.png"]);
        assert!(stills.iter().all(|s| s.height == 20 && s.path.exists()));
        assert_eq!(stills[1].path, tmp.path().join("still_03.png"));
    }

    #[tokio::test]
    async fn test_http_source_maps_not_found_to_decode_error() {
        let base = serve_status("404 Not Found").await;
        let url = format!("{base}/front.png");
        let source = HttpImageSource::new(Client::new());

        let err = source.fetch(&url).await.unwrap_err();
        match err {
            PipelineError::ImageDecode { url: failed, reason } => {
                assert_eq!(failed, url);
                assert!(reason.contains("404"), "reason was {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
