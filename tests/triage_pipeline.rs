//! End-to-end pipeline tests with a scripted LLM, stub embedder, and the
//! in-memory vector store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use mail_triage::config::TriageConfig;
use mail_triage::embedding::EmbeddingProvider;
use mail_triage::error::{EmbeddingError, LlmError};
use mail_triage::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use mail_triage::store::{MemoryVectorStore, VectorStore};
use mail_triage::triage::{
    Category, CustomRule, Message, Priority, Sentiment, TriageProcessor, UserPreferences,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ── Test doubles ────────────────────────────────────────────────────

/// LLM that returns a fixed response.
struct ScriptedLlm {
    response: String,
}

impl ScriptedLlm {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: self.response.clone(),
            input_tokens: 100,
            output_tokens: 50,
            finish_reason: FinishReason::Stop,
        })
    }
}

/// LLM that always fails at the transport level.
struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::RequestFailed {
            provider: "failing".to_string(),
            reason: "connection reset".to_string(),
        })
    }
}

/// LLM that never answers within a test-sized timeout.
struct StalledLlm;

#[async_trait]
impl LlmProvider for StalledLlm {
    fn model_name(&self) -> &str {
        "stalled"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        unreachable!("test timeout should fire first")
    }
}

/// Deterministic 4-dimensional embedder.
struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn dimensions(&self) -> usize {
        4
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }
}

/// Embedder that always fails.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn dimensions(&self) -> usize {
        4
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::RequestFailed {
            reason: "quota exhausted".to_string(),
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const WORK_MEDIUM: &str = r#"{"category": "work", "priority": "medium", "urgency_score": 0.4,
    "sentiment": "neutral", "requires_action": false, "reasoning": "routine work email"}"#;

const WORK_LOW: &str = r#"{"category": "work", "priority": "low", "urgency_score": 0.2,
    "sentiment": "neutral", "requires_action": false, "reasoning": "low priority"}"#;

fn processor(llm: Arc<dyn LlmProvider>) -> TriageProcessor {
    TriageProcessor::new(
        llm,
        Arc::new(StubEmbedder),
        Arc::new(MemoryVectorStore::new()),
        TriageConfig::default(),
    )
}

fn message(sender: &str, subject: &str) -> Message {
    Message::new(sender, subject, "Hello, just checking in on the project.")
}

// ── Pipeline behavior ───────────────────────────────────────────────

#[tokio::test]
async fn happy_path_produces_in_domain_result() {
    init_tracing();
    let processor = processor(ScriptedLlm::new(WORK_MEDIUM));
    let mut msg = message("alice@example.com", "Project check-in");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    assert_eq!(result.classification.category, Category::Work);
    assert_eq!(result.classification.priority, Priority::Medium);
    assert!((0.0..=1.0).contains(&result.classification.urgency_score));
    assert!((0.0..=1.0).contains(&result.confidence));
    // rules always count as applied: 0.7 + 0.2
    assert!((result.confidence - 0.9).abs() < 1e-6);
    assert!(!result.requires_review);
}

#[tokio::test]
async fn embedding_attached_to_message() {
    let processor = processor(ScriptedLlm::new(WORK_MEDIUM));
    let mut msg = message("alice@example.com", "Project check-in");

    processor.process(&mut msg, &UserPreferences::default()).await;

    assert_eq!(msg.embedding.as_deref(), Some(&[1.0, 0.0, 0.0, 0.0][..]));
}

// Scenario A: keyword escalation from a low base classification.
#[tokio::test]
async fn urgent_subject_keyword_escalates() {
    let processor = processor(ScriptedLlm::new(WORK_LOW));
    let mut msg = message("ops@x.com", "Urgent: server down");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    assert_eq!(result.classification.priority, Priority::Urgent);
    assert!(result.classification.reasoning.contains("urgent"));
}

// Scenario B: allow-list wins over deny-list.
#[tokio::test]
async fn allow_list_beats_deny_list() {
    let processor = processor(ScriptedLlm::new(WORK_MEDIUM));
    let mut msg = message("both@x.com", "Project check-in");

    let preferences = UserPreferences {
        allow_senders: vec!["both@x.com".to_string()],
        deny_senders: vec!["both@x.com".to_string()],
        rules: Vec::new(),
    };

    let result = processor.process(&mut msg, &preferences).await;
    assert_eq!(result.classification.priority, Priority::High);
}

// Scenario C: classifier failure yields the exact safe-harbor result.
#[tokio::test]
async fn classifier_failure_yields_safe_harbor() {
    init_tracing();
    let processor = processor(Arc::new(FailingLlm));
    let mut msg = message("alice@example.com", "Anything");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    assert_eq!(result.classification.category, Category::Other);
    assert_eq!(result.classification.priority, Priority::Medium);
    assert_eq!(result.classification.urgency_score, 0.5);
    assert_eq!(result.classification.sentiment, Sentiment::Neutral);
    assert!(!result.classification.requires_action);
    assert!(result.classification.reasoning.contains("Processing failed"));
    assert!(result.classification.reasoning.contains("connection reset"));
    assert_eq!(result.confidence, 0.0);
    assert!(result.requires_review);
    assert!(result.similar_messages.is_empty());
}

#[tokio::test]
async fn unparseable_model_output_yields_safe_harbor() {
    let processor = processor(ScriptedLlm::new("I cannot classify this email."));
    let mut msg = message("alice@example.com", "Anything");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    assert_eq!(result.classification.category, Category::Other);
    assert_eq!(result.confidence, 0.0);
    assert!(result.requires_review);
}

#[tokio::test]
async fn stalled_model_hits_timeout_and_safe_harbor() {
    let config = TriageConfig {
        classify_timeout: Duration::from_millis(50),
        ..TriageConfig::default()
    };
    let processor = TriageProcessor::new(
        Arc::new(StalledLlm),
        Arc::new(StubEmbedder),
        Arc::new(MemoryVectorStore::new()),
        config,
    );
    let mut msg = message("alice@example.com", "Anything");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    assert!(result.classification.reasoning.contains("timed out"));
    assert_eq!(result.confidence, 0.0);
    assert!(result.requires_review);
}

// Scenario D: neighbor agreement contributes to confidence.
#[tokio::test]
async fn neighbor_agreement_boosts_confidence() {
    let store = Arc::new(MemoryVectorStore::new());
    store
        .put("n1", Category::Work, vec![1.0, 0.0, 0.0, 0.0])
        .await
        .unwrap();
    store
        .put("n2", Category::Work, vec![0.9, 0.1, 0.0, 0.0])
        .await
        .unwrap();
    store
        .put("n3", Category::Marketing, vec![0.0, 1.0, 0.0, 0.0])
        .await
        .unwrap();

    let processor = TriageProcessor::new(
        ScriptedLlm::new(WORK_MEDIUM),
        Arc::new(StubEmbedder),
        store,
        TriageConfig::default(),
    );
    let mut msg = message("alice@example.com", "Project check-in");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    assert_eq!(result.similar_messages.len(), 3);
    let expected = 0.7 + 0.2 + (2.0 / 3.0) * 0.1;
    assert!((result.confidence - expected).abs() < 1e-6);
    assert!(!result.requires_review);
}

// Scenario E: the later of two matching custom rules wins.
#[tokio::test]
async fn later_custom_rule_wins() {
    let processor = processor(ScriptedLlm::new(WORK_MEDIUM));
    let mut msg = message("reports@x.com", "Monthly numbers");

    let preferences = UserPreferences {
        allow_senders: Vec::new(),
        deny_senders: Vec::new(),
        rules: vec![
            CustomRule {
                sender_pattern: Some(r"@x\.com$".to_string()),
                subject_contains: None,
                priority: Priority::Urgent,
                category: None,
            },
            CustomRule {
                sender_pattern: Some(r"@x\.com$".to_string()),
                subject_contains: None,
                priority: Priority::Low,
                category: Some(Category::Finance),
            },
        ],
    };

    let result = processor.process(&mut msg, &preferences).await;
    assert_eq!(result.classification.priority, Priority::Low);
    assert_eq!(result.classification.category, Category::Finance);
}

#[tokio::test]
async fn embedding_failure_degrades_without_fallback() {
    let processor = TriageProcessor::new(
        ScriptedLlm::new(WORK_MEDIUM),
        Arc::new(FailingEmbedder),
        Arc::new(MemoryVectorStore::new()),
        TriageConfig::default(),
    );
    let mut msg = message("alice@example.com", "Project check-in");

    let result = processor.process(&mut msg, &UserPreferences::default()).await;

    // Zero vector attached, no neighbors, but classification survives
    assert_eq!(msg.embedding.as_deref(), Some(&[0.0, 0.0, 0.0, 0.0][..]));
    assert!(result.similar_messages.is_empty());
    assert_eq!(result.classification.category, Category::Work);
    assert!((result.confidence - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn batch_processes_independently() {
    let processor = processor(ScriptedLlm::new(WORK_MEDIUM));
    let mut messages = vec![
        message("a@x.com", "Project check-in"),
        message("b@x.com", "Urgent: need this today"),
    ];

    let results = processor
        .process_batch(&mut messages, &UserPreferences::default())
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].classification.priority, Priority::Medium);
    assert_eq!(results[1].classification.priority, Priority::Urgent);
}

#[tokio::test]
async fn concurrent_invocations_are_safe() {
    let processor = Arc::new(processor(ScriptedLlm::new(WORK_MEDIUM)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let processor = Arc::clone(&processor);
            tokio::spawn(async move {
                let mut msg = message(&format!("user{i}@x.com"), "Project check-in");
                processor.process(&mut msg, &UserPreferences::default()).await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    for result in results {
        let result = result.expect("task panicked");
        assert_eq!(result.classification.category, Category::Work);
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}

#[tokio::test]
async fn second_message_sees_first_as_neighbor() {
    let store = Arc::new(MemoryVectorStore::new());
    let processor = TriageProcessor::new(
        ScriptedLlm::new(WORK_MEDIUM),
        Arc::new(StubEmbedder),
        store,
        TriageConfig::default(),
    );

    let mut first = message("a@x.com", "Project check-in");
    processor.process(&mut first, &UserPreferences::default()).await;

    let mut second = message("b@x.com", "Project check-in again");
    let result = processor.process(&mut second, &UserPreferences::default()).await;

    assert_eq!(result.similar_messages, vec![first.id.clone()]);
    // One neighbor with the same category: 0.7 + 0.2 + 1.0 * 0.1
    assert!((result.confidence - 1.0).abs() < 1e-6);
}
