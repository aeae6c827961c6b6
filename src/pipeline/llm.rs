//! VLM interaction: one chat call per page image, with retry and timeout.
//!
//! Retries use exponential backoff (`retry_backoff_ms * 2^(attempt-1)`); each
//! attempt is bounded by `api_timeout_secs`. A page that still fails becomes a
//! [`PageError`] inside its [`PageResult`], never an `Err`, so one bad page
//! cannot sink the other pages of the document.

use crate::config::EngineConfig;
use crate::error::PageError;
use crate::prompts::{maintain_format_context, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Outcome of converting one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub markdown: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u8,
    pub error: Option<PageError>,
}

impl PageResult {
    /// A page that failed before reaching the VLM (render or encode error).
    pub fn failed(page_num: usize, error: PageError) -> Self {
        Self {
            page_num,
            markdown: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            retries: 0,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Convert a single page image into Markdown via the VLM.
///
/// Message layout: system prompt, then (maintain_format only) the previous
/// page's Markdown as a second system message, then a user turn carrying the
/// page PNG with empty text.
pub async fn process_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    prior_page: Option<&str>,
    config: &EngineConfig,
) -> PageResult {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut messages = vec![ChatMessage::system(system_prompt)];
    if config.maintain_format {
        if let Some(prior) = prior_page.filter(|p| !p.is_empty()) {
            messages.push(ChatMessage::system(maintain_format_context(prior)));
        }
    }
    messages.push(ChatMessage::user_with_images("", vec![image_data]));

    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<PageError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page_num, response.prompt_tokens, response.completion_tokens, duration
                );
                return PageResult {
                    page_num,
                    markdown: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: retry_count(attempt),
                    error: None,
                };
            }
            Ok(Err(e)) => {
                warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                last_err = Some(PageError::LlmFailed {
                    page: page_num,
                    retries: retry_count(config.max_retries),
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Page {}: attempt {} timed out", page_num, attempt + 1);
                last_err = Some(PageError::Timeout {
                    page: page_num,
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    let mut result = PageResult::failed(
        page_num,
        last_err.unwrap_or(PageError::LlmFailed {
            page: page_num,
            retries: retry_count(config.max_retries),
            detail: "Unknown error".into(),
        }),
    );
    result.duration_ms = start.elapsed().as_millis() as u64;
    result.retries = retry_count(config.max_retries);
    result
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn retry_count(n: u32) -> u8 {
    u8::try_from(n).unwrap_or(u8::MAX)
}

/// Build `CompletionOptions` from the engine config.
fn build_options(config: &EngineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
