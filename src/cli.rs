//! Command-line interface definitions for promo_reel.
//!
//! Credentials and model overrides can be supplied as flags or through the
//! environment; absent credentials quietly select the offline paths.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for promo_reel.
///
/// # Examples
///
/// ```sh
/// # Offline template script, output in ./output
/// promo_reel https://shop.example/widget
///
/// # Ask the language model for the script, custom working directory
/// OPENAI_API_KEY=sk-... promo_reel https://shop.example/widget --real-llm -o ./widget
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Product page URL
    pub url: String,

    /// Working directory for script.txt, voice.mp3 and promo.mp4
    #[arg(short, long, default_value = "output")]
    pub out: PathBuf,

    /// Generate the script with the language model (falls back to the template on any failure)
    #[arg(long)]
    pub real_llm: bool,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Voice name for speech synthesis
    #[arg(long)]
    pub voice: Option<String>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// API key for the chat completions service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model used in --real-llm mode
    #[arg(long, env = "PROMPT_MODEL")]
    pub prompt_model: Option<String>,

    /// Subscription key for the neural voice service
    #[arg(long, env = "AZURE_SPEECH_KEY", hide_env_values = true)]
    pub azure_speech_key: Option<String>,

    /// Region of the neural voice service (e.g. eastus)
    #[arg(long, env = "AZURE_SPEECH_REGION")]
    pub azure_speech_region: Option<String>,
}
