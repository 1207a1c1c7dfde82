//! Page fetcher.
//!
//! One GET per page, no retries. The shared client carries a desktop browser
//! User-Agent and an `Accept-Language` header because many shops serve a
//! stripped or blocked page to unknown clients.

use crate::config::HttpSettings;
use crate::error::PipelineError;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{info, instrument};

/// Build the HTTP client shared by the page fetcher and the image downloader.
pub fn build_client(settings: &HttpSettings) -> Result<Client, PipelineError> {
    let mut headers = HeaderMap::new();
    let lang = HeaderValue::from_str(&settings.accept_language)
        .map_err(|e| PipelineError::Config(format!("invalid accept_language: {e}")))?;
    headers.insert(ACCEPT_LANGUAGE, lang);

    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| PipelineError::Config(format!("could not build HTTP client: {e}")))
}

/// Download the raw HTML of `url`.
///
/// # Errors
///
/// [`PipelineError::Fetch`] on transport failure, timeout, or a non-2xx status.
#[instrument(level = "info", skip(client))]
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, PipelineError> {
    let fetch_err = |source| PipelineError::Fetch {
        url: url.to_string(),
        source,
    };

    let html = client
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(fetch_err)?
        .text()
        .await
        .map_err(fetch_err)?;

    info!(bytes = html.len(), "Fetched product page");
    Ok(html)
}
