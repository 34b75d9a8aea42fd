//! Classifier adapter — turns model output into a well-formed classification.
//!
//! The adapter owns the prompt, the body truncation, and the coercion of
//! model output into the closed classification domain. Missing or malformed
//! FIELDS are defaulted one by one; a call that fails outright (transport
//! error, timeout, non-JSON output) surfaces as an error for the
//! orchestrator's fallback to absorb.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::PipelineError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::triage::types::{Category, Classification, Priority, Sentiment};

/// Body prefix sent to the model. Long bodies lose only trailing content.
const MAX_BODY_CHARS: usize = 1000;

/// Max tokens for the classification call (kept tight — runs on every message).
const CLASSIFY_MAX_TOKENS: u32 = 512;

/// Temperature for classification (deterministic-ish).
const CLASSIFY_TEMPERATURE: f32 = 0.3;

const CLASSIFY_SYSTEM_PROMPT: &str = "You are an email classification expert.";

/// Adapter over the external classification model.
pub struct ClassifierAdapter {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl ClassifierAdapter {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Classify a message from its subject, body, and sender.
    ///
    /// Errors from this method are caught by the orchestrator, which
    /// substitutes [`Classification::fallback`] — the fixed
    /// other/medium/0.5/neutral/false tuple — with the error in `reasoning`.
    pub async fn classify(
        &self,
        subject: &str,
        body: &str,
        sender: &str,
    ) -> Result<Classification, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(CLASSIFY_SYSTEM_PROMPT),
            ChatMessage::user(build_classify_prompt(subject, body, sender)),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS)
        .with_json_response();

        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: "classify",
                timeout: self.timeout,
            })?
            .map_err(|e| PipelineError::Classify(format!("model call failed: {e}")))?;

        parse_classification(&response.content).map_err(|e| {
            warn!(
                raw_response = %response.content,
                error = %e,
                "Unparseable classification response"
            );
            PipelineError::Classify(format!("unparseable model output: {e}"))
        })
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the classification user prompt.
fn build_classify_prompt(subject: &str, body: &str, sender: &str) -> String {
    let body_preview: String = body.chars().take(MAX_BODY_CHARS).collect();

    format!(
        "Analyze the following email and provide classification:\n\n\
         Subject: {subject}\n\
         From: {sender}\n\
         Body: {body_preview}\n\n\
         Provide the following classifications:\n\
         1. category (work, personal, marketing, support, finance, other)\n\
         2. priority (urgent, high, medium, low)\n\
         3. urgency_score (0.0 to 1.0)\n\
         4. sentiment (positive, neutral, negative)\n\
         5. requires_action (true/false)\n\
         6. reasoning (brief explanation)\n\n\
         Respond with ONLY a JSON object using exactly those field names."
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse model output into a classification.
///
/// Field-by-field tolerant: each missing or out-of-domain field gets its
/// safe-harbor default. Only a response with no JSON object at all is an
/// error.
fn parse_classification(raw: &str) -> Result<Classification, String> {
    let json_str = extract_json_object(raw);
    let value: serde_json::Value =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;
    let obj = value
        .as_object()
        .ok_or_else(|| "response is not a JSON object".to_string())?;

    Ok(Classification {
        category: obj
            .get("category")
            .and_then(|v| v.as_str())
            .map(Category::parse)
            .unwrap_or(Category::Other),
        priority: obj
            .get("priority")
            .and_then(|v| v.as_str())
            .map(Priority::parse)
            .unwrap_or(Priority::Medium),
        urgency_score: obj
            .get("urgency_score")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.5)
            .clamp(0.0, 1.0) as f32,
        sentiment: obj
            .get("sentiment")
            .and_then(|v| v.as_str())
            .map(Sentiment::parse)
            .unwrap_or(Sentiment::Neutral),
        requires_action: obj
            .get("requires_action")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        reasoning: obj
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
    })
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in a markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds in surrounding prose
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
