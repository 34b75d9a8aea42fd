//! Shared types for the triage pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Message ─────────────────────────────────────────────────────────

/// An inbound message as seen by the triage core.
///
/// Created by the (external) fetch pipeline; the core only ever mutates it
/// to attach an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Opaque unique ID.
    pub id: String,
    /// Sender address.
    pub sender: String,
    /// Human-readable sender name (if available).
    pub sender_name: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body_text: String,
    /// HTML body, when the original message carried one.
    pub body_html: Option<String>,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Embedding vector, attached by the pipeline.
    pub embedding: Option<Vec<f32>>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            sender_name: None,
            subject: subject.into(),
            body_text: body_text.into(),
            body_html: None,
            received_at: Utc::now(),
            embedding: None,
        }
    }
}

// ── Classification enums ────────────────────────────────────────────

/// Message category. Closed set — anything else coerces to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Marketing,
    Support,
    Finance,
    Other,
}

impl Category {
    /// Lenient parse: unknown or empty input coerces to `Other`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Self::Work,
            "personal" => Self::Personal,
            "marketing" => Self::Marketing,
            "support" => Self::Support,
            "finance" => Self::Finance,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Marketing => "marketing",
            Self::Support => "support",
            Self::Finance => "finance",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message priority. Closed ordered set: low < medium < high < urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Lenient parse: unknown or empty input coerces to `Medium`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Medium,
        }
    }

    /// Numeric level for escalation comparisons (low=1 … urgent=4).
    pub fn level(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message sentiment. Closed set — anything else coerces to `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Lenient parse: unknown or empty input coerces to `Neutral`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

// ── Classification ──────────────────────────────────────────────────

/// The triage judgment for a message.
///
/// Always replaced wholesale by the orchestrator, never patched in place.
/// `reasoning` reflects the last stage that touched the classification —
/// the model, a rule stage, or the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub priority: Priority,
    /// Continuous urgency in [0, 1].
    pub urgency_score: f32,
    pub sentiment: Sentiment,
    pub requires_action: bool,
    pub reasoning: String,
}

impl Classification {
    /// The safe-harbor classification returned when a stage fails.
    ///
    /// Downstream components and tests key off this exact tuple; do not
    /// change the values.
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            category: Category::Other,
            priority: Priority::Medium,
            urgency_score: 0.5,
            sentiment: Sentiment::Neutral,
            requires_action: false,
            reasoning: reasoning.into(),
        }
    }
}

// ── User preferences ────────────────────────────────────────────────

/// Per-user rule snapshot, loaded by the caller before the pipeline runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Senders that always escalate to high priority.
    #[serde(default)]
    pub allow_senders: Vec<String>,
    /// Senders that always demote to low priority.
    #[serde(default)]
    pub deny_senders: Vec<String>,
    /// Ordered custom rules; later rules win when several match.
    #[serde(default)]
    pub rules: Vec<CustomRule>,
}

/// A user-authored override rule.
///
/// A rule matches iff every condition it declares holds. A rule with no
/// conditions therefore matches every message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    /// Regex matched against the sender address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_pattern: Option<String>,
    /// Case-insensitive substring required in the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_contains: Option<String>,
    /// Priority to apply when the rule matches.
    pub priority: Priority,
    /// Category to apply when the rule matches, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

// ── Triage result ───────────────────────────────────────────────────

/// The sole output contract of the core. Ephemeral — the caller persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageResult {
    pub classification: Classification,
    /// Derived trust score in [0, 1]; recomputed every run, never cached.
    pub confidence: f32,
    pub requires_review: bool,
    /// IDs of similar previously-seen messages.
    pub similar_messages: Vec<String>,
}

impl TriageResult {
    /// The fixed fallback result for an unrecoverable pipeline failure.
    pub fn safe_harbor(error: impl std::fmt::Display) -> Self {
        Self {
            classification: Classification::fallback(format!("Processing failed: {error}")),
            confidence: 0.0,
            requires_review: true,
            similar_messages: Vec::new(),
        }
    }
}
