//! The triage pipeline: classification, rules, similarity, confidence.

pub mod classifier;
pub mod confidence;
pub mod processor;
pub mod rules;
pub mod similarity;
pub mod types;

pub use classifier::ClassifierAdapter;
pub use confidence::ConfidenceEstimator;
pub use processor::TriageProcessor;
pub use rules::RuleEngine;
pub use similarity::SimilarityIndex;
pub use types::{
    Category, Classification, CustomRule, Message, Priority, Sentiment, TriageResult,
    UserPreferences,
};
