//! Speech synthesis with ordered backend fallback.
//!
//! Backends are tried in priority order until one produces audio:
//!
//! | Order | Backend | Needs |
//! |-------|---------|-------|
//! | 1 | Azure neural voices (SSML over REST) | subscription key + region |
//! | 2 | Google Translate speech endpoint | network |
//! | 3 | Placeholder bytes | a writable path |
//!
//! A failing backend is logged and skipped. The placeholder only exists so the
//! pipeline always has an audio file to hand on; if even that cannot be
//! written the run stops.

use crate::config::TtsSettings;
use crate::error::PipelineError;
use crate::models::{AudioArtifact, ScriptText};
use quick_xml::escape::escape;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// Payload written by the last-resort backend.
pub const PLACEHOLDER_AUDIO: &[u8] = b"FAKE_WAV_DATA";

const AZURE_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";
const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";
/// The Google endpoint rejects requests above this many characters.
const GOOGLE_CHUNK_CHARS: usize = 100;

/// One speech strategy in the fallback chain.
#[derive(Clone)]
pub enum SpeechBackend {
    AzureNeural {
        key: Option<String>,
        region: Option<String>,
    },
    GoogleTranslate {
        language: String,
    },
    Placeholder,
}

impl std::fmt::Debug for SpeechBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl SpeechBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SpeechBackend::AzureNeural { .. } => "azure-neural",
            SpeechBackend::GoogleTranslate { .. } => "google-translate",
            SpeechBackend::Placeholder => "placeholder",
        }
    }

    fn failure(&self, reason: impl ToString) -> PipelineError {
        PipelineError::Synthesis {
            backend: self.name(),
            reason: reason.to_string(),
        }
    }

    async fn render(
        &self,
        http: &Client,
        timeout: Duration,
        script: &str,
        voice: &str,
    ) -> Result<Vec<u8>, PipelineError> {
        let audio = match self {
            SpeechBackend::AzureNeural { key, region } => {
                let (Some(key), Some(region)) = (key.as_deref(), region.as_deref()) else {
                    return Err(self.failure("no subscription key or region configured"));
                };
                let url = format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1");
                http.post(url)
                    .header("Ocp-Apim-Subscription-Key", key)
                    .header("X-Microsoft-OutputFormat", AZURE_OUTPUT_FORMAT)
                    .header(CONTENT_TYPE, "application/ssml+xml")
                    .timeout(timeout)
                    .body(build_ssml(script, voice))
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| self.failure(e))?
                    .bytes()
                    .await
                    .map_err(|e| self.failure(e))?
                    .to_vec()
            }
            SpeechBackend::GoogleTranslate { language } => {
                let chunks = chunk_text(script, GOOGLE_CHUNK_CHARS);
                let mut audio = Vec::new();
                for (idx, chunk) in chunks.iter().enumerate() {
                    let url = google_tts_url(chunk, language, idx, chunks.len());
                    let bytes = http
                        .get(url)
                        .timeout(timeout)
                        .send()
                        .await
                        .and_then(|r| r.error_for_status())
                        .map_err(|e| self.failure(e))?
                        .bytes()
                        .await
                        .map_err(|e| self.failure(e))?;
                    audio.extend_from_slice(&bytes);
                }
                audio
            }
            SpeechBackend::Placeholder => PLACEHOLDER_AUDIO.to_vec(),
        };

        if audio.is_empty() {
            return Err(self.failure("backend returned no audio"));
        }
        Ok(audio)
    }
}

/// SSML document for the neural voice service. Script and voice are XML-escaped.
pub fn build_ssml(script: &str, voice: &str) -> String {
    let lang = voice_language(voice);
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{}'>\
         <voice name='{}'>{}</voice></speak>",
        escape(lang),
        escape(voice),
        escape(script)
    )
}

/// `en-US-GuyNeural` → `en-US`; anything unrecognisable → `en-US`.
fn voice_language(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(second)) => &voice[..second],
        _ => "en-US",
    }
}

fn google_tts_url(chunk: &str, language: &str, idx: usize, total: usize) -> String {
    format!(
        "{GOOGLE_TTS_URL}?ie=UTF-8&client=tw-ob&tl={}&q={}&total={total}&idx={idx}&textlen={}",
        urlencoding::encode(language),
        urlencoding::encode(chunk),
        chunk.chars().count()
    )
}

/// Split `text` into pieces of at most `max` characters, breaking between
/// words where possible. Words longer than `max` are split hard.
pub fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let extra = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + extra > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Runs the backend chain and writes the winning audio to disk.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    http: Client,
    backends: Vec<SpeechBackend>,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(http: Client, backends: Vec<SpeechBackend>) -> Self {
        Self {
            http,
            backends,
            timeout: Duration::from_secs(60),
        }
    }

    /// The standard chain: neural voice, Google Translate, placeholder.
    pub fn from_settings(http: Client, settings: &TtsSettings) -> Self {
        let backends = vec![
            SpeechBackend::AzureNeural {
                key: settings.azure_key.clone(),
                region: settings.azure_region.clone(),
            },
            SpeechBackend::GoogleTranslate {
                language: settings.language.clone(),
            },
            SpeechBackend::Placeholder,
        ];
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            ..Self::new(http, backends)
        }
    }

    pub fn backends(&self) -> &[SpeechBackend] {
        &self.backends
    }

    /// Speak `script` with `voice` into `output_path`.
    ///
    /// Returns once the file is fully written and closed.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Synthesis`] only when the placeholder itself cannot be
    /// written, or when the chain is exhausted without one.
    #[instrument(level = "info", skip_all, fields(path = %output_path.display(), %voice))]
    pub async fn synthesize(
        &self,
        script: &ScriptText,
        output_path: &Path,
        voice: &str,
    ) -> Result<AudioArtifact, PipelineError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }

        for backend in &self.backends {
            let written = match backend
                .render(&self.http, self.timeout, script.as_str(), voice)
                .await
            {
                Ok(audio) => write_audio(output_path, &audio)
                    .await
                    .map(|_| audio.len())
                    .map_err(|e| backend.failure(e)),
                Err(e) => Err(e),
            };

            match written {
                Ok(bytes) => {
                    info!(backend = backend.name(), bytes, "Speech synthesized");
                    return Ok(AudioArtifact {
                        path: output_path.to_path_buf(),
                        backend: backend.name(),
                    });
                }
                Err(e) if matches!(backend, SpeechBackend::Placeholder) => return Err(e),
                Err(e) => warn!(backend = backend.name(), error = %e, "Speech backend failed; trying next"),
            }
        }

        Err(PipelineError::Synthesis {
            backend: "chain",
            reason: "every speech backend failed".to_string(),
        })
    }
}

async fn write_audio(path: &Path, audio: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(audio).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_chain() -> Synthesizer {
        Synthesizer::new(
            Client::new(),
            vec![
                SpeechBackend::AzureNeural {
                    key: None,
                    region: None,
                },
                SpeechBackend::Placeholder,
            ],
        )
    }

    #[test]
    fn test_ssml_escapes_script_and_voice() {
        let ssml = build_ssml("Fish & <Chips> for \"$5\"", "en-GB-RyanNeural");
        assert!(ssml.contains("xml:lang='en-GB'"));
        assert!(ssml.contains("<voice name='en-GB-RyanNeural'>"));
        assert!(ssml.contains("Fish &amp; &lt;Chips&gt; for &quot;$5&quot;"));
        assert!(ssml.ends_with("</voice></speak>"));
    }

    #[test]
    fn test_voice_language() {
        assert_eq!(voice_language("en-US-GuyNeural"), "en-US");
        assert_eq!(voice_language("de-DE-KatjaNeural"), "de-DE");
        assert_eq!(voice_language("guy"), "en-US");
    }

    #[test]
    fn test_chunk_text_limits_and_preserves_words() {
        let text = "Introducing the all new widget with a long list of features ".repeat(10);
        let chunks = chunk_text(&text, 40);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_chunk_text_splits_oversized_words() {
        let chunks = chunk_text("ab abcdefghij cd", 4);
        assert_eq!(chunks, ["ab", "abcd", "efgh", "ij", "cd"]);
        assert!(chunk_text("   ", 10).is_empty());
    }

    #[test]
    fn test_google_url_is_encoded() {
        let url = google_tts_url("Fish & chips?", "en", 0, 1);
        assert!(url.contains("q=Fish%20%26%20chips%3F"));
        assert!(url.contains("textlen=13"));
    }

    #[test]
    fn test_default_chain_order() {
        let s = Synthesizer::from_settings(Client::new(), &TtsSettings::default());
        let names: Vec<_> = s.backends().iter().map(SpeechBackend::name).collect();
        assert_eq!(names, ["azure-neural", "google-translate", "placeholder"]);
    }

    #[tokio::test]
    async fn test_falls_through_to_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/voice.mp3");
        let audio = offline_chain()
            .synthesize(&ScriptText::new("Hello there."), &path, "en-US-GuyNeural")
            .await
            .unwrap();

        assert_eq!(audio.backend, "placeholder");
        assert_eq!(audio.path, path);
        assert_eq!(std::fs::read(&path).unwrap(), PLACEHOLDER_AUDIO);
    }

    #[tokio::test]
    async fn test_placeholder_write_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        // a directory where the file should go
        let path = tmp.path().join("voice.mp3");
        std::fs::create_dir(&path).unwrap();

        let err = offline_chain()
            .synthesize(&ScriptText::new("Hi."), &path, "en-US-GuyNeural")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Synthesis {
                backend: "placeholder",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Synthesizer::new(Client::new(), vec![])
            .synthesize(&ScriptText::new("Hi."), &tmp.path().join("v.mp3"), "v")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis { backend: "chain", .. }));
    }
}
