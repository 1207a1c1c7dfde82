//! # Promo Reel
//!
//! Turns a product page into a short narrated promo video: the page is
//! scraped for its title, price, description, specs and images, a marketing
//! script is written for it, the script is spoken, and the images are cut
//! into a Ken Burns slideshow over the narration.
//!
//! ## Features
//!
//! - Heuristic extraction that works on arbitrary storefront markup
//! - Template script offline, or an OpenAI-compatible model with `--real-llm`
//! - Speech through a neural voice service, Google Translate TTS, or a
//!   placeholder file when both are unavailable
//! - Clip durations computed from the images that actually decoded, so the
//!   video always matches the narration
//!
//! ## Usage
//!
//! ```sh
//! promo_reel https://shop.example/widget -o ./widget
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: fetch the page and assemble a product record
//! 2. **Scripting**: template or delegated script, written to `script.txt`
//! 3. **Speech**: narration written to `voice.mp3`
//! 4. **Video**: stills resized and encoded with the audio to `promo.mp4`

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod script;
mod scrapers;
mod tts;
mod utils;
mod video;

use cli::Cli;
use config::Settings;
use pipeline::RunOptions;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("promo_reel starting up");

    let args = Cli::parse();
    debug!(url = %args.url, out = %args.out.display(), real_llm = args.real_llm, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_cli(&args);
    debug!(?settings, "Effective settings");

    let options = RunOptions {
        url: args.url.clone(),
        workdir: args.out.clone(),
        use_template: !args.real_llm,
        settings,
    };

    let video = match pipeline::run(&options).await {
        Ok(video) => video,
        Err(e) => {
            error!(error = %e, "Run failed");
            return Err(e.to_string().into());
        }
    };

    println!("Video generated: {}", video.path.display());

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
