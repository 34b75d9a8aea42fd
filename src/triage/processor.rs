//! Triage orchestrator — one pipeline call per message.
//!
//! **Core invariant: every call terminates in a valid, fully-populated
//! `TriageResult`.** Nothing in the pipeline is allowed to be fatal to the
//! caller.
//!
//! Flow:
//! 1. Classifier adapter → raw classification
//! 2. Rule engine → final classification (`rules_applied` set unconditionally)
//! 3. Embed, attach to the message, write to the store, find neighbors
//! 4. Confidence score → review decision
//!
//! Any uncaught stage failure discards partial work and yields the
//! safe-harbor result — no partial credit for stages that succeeded first.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::TriageConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::PipelineError;
use crate::llm::LlmProvider;
use crate::store::VectorStore;
use crate::triage::classifier::ClassifierAdapter;
use crate::triage::confidence::ConfidenceEstimator;
use crate::triage::rules::RuleEngine;
use crate::triage::similarity::SimilarityIndex;
use crate::triage::types::{Message, TriageResult, UserPreferences};

/// The triage pipeline.
///
/// Holds only shared immutable collaborator handles, so one processor can
/// serve concurrent `process` calls for different messages.
pub struct TriageProcessor {
    classifier: ClassifierAdapter,
    rules: RuleEngine,
    similarity: SimilarityIndex,
    confidence: ConfidenceEstimator,
}

impl TriageProcessor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: TriageConfig,
    ) -> Self {
        Self {
            classifier: ClassifierAdapter::new(llm, config.classify_timeout),
            rules: RuleEngine::new(),
            similarity: SimilarityIndex::new(
                embedder,
                store,
                config.embed_timeout,
                config.lookup_timeout,
                config.similar_limit,
            ),
            confidence: ConfidenceEstimator::new(),
        }
    }

    /// Run the full pipeline for one message.
    ///
    /// Never fails: an unrecoverable stage error produces the safe-harbor
    /// result (fallback classification with the error in `reasoning`,
    /// confidence 0.0, review required, no neighbors).
    pub async fn process(
        &self,
        message: &mut Message,
        preferences: &UserPreferences,
    ) -> TriageResult {
        info!(
            id = %message.id,
            sender = %message.sender,
            "Processing message"
        );

        match self.run(message, preferences).await {
            Ok(result) => {
                debug!(
                    id = %message.id,
                    category = %result.classification.category,
                    priority = %result.classification.priority,
                    confidence = result.confidence,
                    requires_review = result.requires_review,
                    "Triage complete"
                );
                result
            }
            Err(e) => {
                error!(id = %message.id, error = %e, "Triage failed, returning safe-harbor result");
                TriageResult::safe_harbor(e)
            }
        }
    }

    async fn run(
        &self,
        message: &mut Message,
        preferences: &UserPreferences,
    ) -> Result<TriageResult, PipelineError> {
        // Stage 1: AI classification
        let raw = self
            .classifier
            .classify(&message.subject, &message.body_text, &message.sender)
            .await?;

        // Stage 2: user rules. "Applied" means the engine was invoked, not
        // that a rule fired; the confidence formula keys off this flag.
        let rules_applied = true;
        let classification = self.rules.apply(message, raw, preferences);

        // Stage 3: embedding + similarity. The attach and the store write
        // happen before the lookup that depends on them.
        let embedding = self.similarity.embed_message(message).await;
        message.embedding = Some(embedding.clone());
        self.similarity
            .remember(&message.id, classification.category, embedding)
            .await;
        let similar = self.similarity.find_similar(&message.id).await;

        // Stage 4: confidence + review decision
        let confidence = self
            .confidence
            .score(&classification, rules_applied, &similar);
        let requires_review = self.confidence.needs_review(confidence);

        Ok(TriageResult {
            classification,
            confidence,
            requires_review,
            similar_messages: similar.into_iter().map(|s| s.id).collect(),
        })
    }

    /// Process a batch of messages with one preference snapshot.
    ///
    /// Messages are independent; each gets its own result and a failure in
    /// one is just that message's safe-harbor result.
    pub async fn process_batch(
        &self,
        messages: &mut [Message],
        preferences: &UserPreferences,
    ) -> Vec<TriageResult> {
        let count = messages.len();
        info!(count, "Processing message batch");

        let mut results = Vec::with_capacity(count);
        for message in messages.iter_mut() {
            results.push(self.process(message, preferences).await);
        }

        info!(processed = results.len(), "Batch processing complete");
        results
    }
}
