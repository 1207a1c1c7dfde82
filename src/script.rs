//! Marketing script composition.
//!
//! Two [`ScriptWriter`] implementations share one interface:
//!
//! - [`TemplateWriter`]: deterministic, offline interpolation of the product fields
//! - [`DelegatedWriter`]: sends [`build_prompt`] to a language model
//!
//! The template writer is also the forced fallback of the delegated one: a
//! missing credential, a transport error, or an empty reply all produce
//! exactly the template script, without surfacing any error.

use crate::api::{AskAsync, ChatClient, RetryAsk, with_backoff};
use crate::config::LlmSettings;
use crate::error::PipelineError;
use crate::models::{ProductRecord, ScriptText};
use crate::utils::{truncate_chars, truncate_for_log};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

const MAX_PROMPT_SPECS: usize = 12;
const MAX_PROMPT_DESCRIPTION: usize = 600;
const TEMPLATE_DESCRIPTION_CHARS: usize = 80;
const CALL_TO_ACTION: &str = "Visit the link to learn more.";

/// Build the copywriting brief sent in delegated mode.
pub fn build_prompt(product: &ProductRecord) -> String {
    let spec_lines = product
        .specs()
        .iter()
        .take(MAX_PROMPT_SPECS)
        .map(|(k, v)| format!("- {k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    let spec_lines = if spec_lines.is_empty() {
        "- (No structured specs extracted)".to_string()
    } else {
        spec_lines
    };

    format!(
        "Create a concise upbeat 60-90 second promotional script for a product video.\n\
         Use the following structured data:\n\
         Title: {title}\n\
         Price: {price}\n\
         Key Specs:\n\
         {spec_lines}\n\
         Description: {description}\n\
         \n\
         Guidelines:\n\
         - Hook in first sentence.\n\
         - Highlight 4-6 most compelling specs (avoid listing too many numbers).\n\
         - Use persuasive, energetic but credible tone.\n\
         - Include a soft call to action at end (e.g., Visit the link to learn more.).\n\
         - Keep under 180 words.\n\
         Provide ONLY the script lines, no intro labels.",
        title = product.title(),
        price = product.price().unwrap_or("N/A"),
        description = truncate_chars(product.description(), MAX_PROMPT_DESCRIPTION),
    )
}

/// The offline script: title, price, first spec, a slice of the description
/// and a fixed call to action.
pub fn template_script(product: &ProductRecord) -> ScriptText {
    let price_line = product
        .price()
        .map(|p| format!("Priced at {p}, "))
        .unwrap_or_default();
    let spec_line = product
        .first_spec()
        .map(|(k, v)| format!("It features {k} {v}. "))
        .unwrap_or_default();
    let description = truncate_chars(product.description(), TEMPLATE_DESCRIPTION_CHARS);

    ScriptText::new(format!(
        "Introducing {}! {price_line}{spec_line}{description} {CALL_TO_ACTION}",
        product.title()
    ))
}

/// Capability that turns a product record into a narration script.
///
/// Implementations never fail; whatever goes wrong is absorbed internally.
pub trait ScriptWriter {
    async fn write(&self, product: &ProductRecord) -> ScriptText;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateWriter;

impl ScriptWriter for TemplateWriter {
    async fn write(&self, product: &ProductRecord) -> ScriptText {
        template_script(product)
    }
}

/// Script writer backed by a language model, falling back to [`TemplateWriter`].
#[derive(Debug)]
pub struct DelegatedWriter<A> {
    service: A,
    fallback: TemplateWriter,
}

impl<A> DelegatedWriter<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(service: A) -> Self {
        Self {
            service,
            fallback: TemplateWriter,
        }
    }

    async fn generate(&self, product: &ProductRecord) -> Result<ScriptText, PipelineError> {
        let prompt = build_prompt(product);
        debug!(prompt = %truncate_for_log(&prompt, 300), "Sending script prompt");

        let reply = self
            .service
            .ask(&prompt)
            .await
            .map_err(|e| PipelineError::ScriptGeneration(e.to_string()))?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(PipelineError::ScriptGeneration("empty response".into()));
        }
        Ok(ScriptText::new(reply))
    }
}

impl<A> ScriptWriter for DelegatedWriter<A>
where
    A: AskAsync<Response = String>,
{
    async fn write(&self, product: &ProductRecord) -> ScriptText {
        match self.generate(product).await {
            Ok(script) => script,
            Err(e) => {
                warn!(error = %e, "Delegated script generation failed; using template");
                self.fallback.write(product).await
            }
        }
    }
}

/// The writer chosen for a run.
#[derive(Debug)]
pub enum ScriptSource {
    Template(TemplateWriter),
    Delegated(DelegatedWriter<RetryAsk<ChatClient>>),
}

impl ScriptSource {
    /// Delegated mode needs both the `--real-llm` flag and a credential.
    pub fn select(use_template: bool, http: &Client, llm: &LlmSettings) -> Self {
        if use_template {
            return ScriptSource::Template(TemplateWriter);
        }
        if !llm.has_credentials() {
            info!("No API credential configured; using template script");
            return ScriptSource::Template(TemplateWriter);
        }
        let service = with_backoff(ChatClient::new(http.clone(), llm), llm.max_retries);
        info!(model = %service.inner().model(), retries = llm.max_retries, "Using delegated script generation");
        ScriptSource::Delegated(DelegatedWriter::new(service))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptSource::Template(_) => "template",
            ScriptSource::Delegated(_) => "delegated",
        }
    }
}

impl ScriptWriter for ScriptSource {
    async fn write(&self, product: &ProductRecord) -> ScriptText {
        match self {
            ScriptSource::Template(w) => w.write(product).await,
            ScriptSource::Delegated(w) => w.write(product).await,
        }
    }
}

/// Produce the run's script with `writer`.
#[instrument(level = "info", skip_all, fields(title = %product.title()))]
pub async fn compose<W: ScriptWriter>(product: &ProductRecord, writer: &W) -> ScriptText {
    let script = writer.write(product).await;
    info!(
        words = script.word_count(),
        preview = %truncate_for_log(script.as_str(), 120),
        "Composed script"
    );
    script
}
