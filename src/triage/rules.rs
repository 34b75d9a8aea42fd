//! Rule engine — deterministic user overrides on top of the AI judgment.
//!
//! Four ordered stages, each free to overwrite what came before
//! (last-write-wins, not highest-priority-wins):
//! 1. Deny list: sender demoted to low
//! 2. Allow list: sender escalated to high (runs after deny — a sender on
//!    both lists ends up high)
//! 3. Custom rules, in list order, no short-circuit: later matches win
//! 4. Keyword escalation over the subject: can only raise priority
//!
//! A custom rule matches iff every condition it declares holds, so a rule
//! with NO conditions matches every message — that is part of the rule
//! format's contract, not an accident callers may rely on being fixed.
//! A malformed sender regex makes that one rule inert; sibling rules still
//! evaluate.

use regex::Regex;
use tracing::debug;

use crate::triage::types::{Classification, CustomRule, Message, Priority, UserPreferences};

/// Subject keywords per escalation bucket, checked case-insensitively.
const PRIORITY_KEYWORDS: &[(Priority, &[&str])] = &[
    (
        Priority::Urgent,
        &["urgent", "asap", "immediate", "critical", "emergency"],
    ),
    (
        Priority::High,
        &["important", "priority", "deadline", "today"],
    ),
    (Priority::Medium, &["please review", "feedback", "update"]),
    (Priority::Low, &["fyi", "newsletter", "notification"]),
];

/// Deterministic override layer over the AI classification.
///
/// Stateless: applying the same inputs twice yields the same output.
#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all four stages over `classification` and return the final value.
    pub fn apply(
        &self,
        message: &Message,
        mut classification: Classification,
        preferences: &UserPreferences,
    ) -> Classification {
        // Stage 1: deny list
        if preferences.deny_senders.iter().any(|s| s == &message.sender) {
            debug!(sender = %message.sender, "Sender deny-listed, demoting to low");
            classification.priority = Priority::Low;
            classification.reasoning =
                format!("Sender '{}' is deny-listed; priority set to low", message.sender);
        }

        // Stage 2: allow list — runs after deny, so allow wins for senders
        // present on both lists.
        if preferences.allow_senders.iter().any(|s| s == &message.sender) {
            debug!(sender = %message.sender, "Sender allow-listed, escalating to high");
            classification.priority = Priority::High;
            classification.reasoning = format!(
                "Sender '{}' is allow-listed; priority set to high",
                message.sender
            );
        }

        // Stage 3: custom rules, in order, later matches overwrite earlier
        for (index, rule) in preferences.rules.iter().enumerate() {
            if !rule_matches(rule, &message.sender, &message.subject) {
                continue;
            }

            debug!(
                rule = index,
                priority = %rule.priority,
                "Custom rule matched"
            );
            classification.priority = rule.priority;
            if let Some(category) = rule.category {
                classification.category = category;
            }
            classification.reasoning = format!(
                "Custom rule #{} matched; priority set to {}",
                index + 1,
                rule.priority
            );
        }

        // Stage 4: keyword escalation — raise-only
        let subject_lower = message.subject.to_lowercase();
        for (priority, keywords) in PRIORITY_KEYWORDS {
            let Some(keyword) = keywords.iter().copied().find(|kw| subject_lower.contains(kw))
            else {
                continue;
            };
            if priority.level() > classification.priority.level() {
                debug!(
                    keyword,
                    from = %classification.priority,
                    to = %priority,
                    "Subject keyword escalated priority"
                );
                classification.priority = *priority;
                classification.reasoning =
                    format!("Subject keyword '{keyword}' escalated priority to {priority}");
            }
        }

        classification
    }
}

/// Check whether a message satisfies every condition a rule declares.
///
/// A malformed `sender_pattern` regex counts as "does not match".
fn rule_matches(rule: &CustomRule, sender: &str, subject: &str) -> bool {
    if let Some(ref pattern) = rule.sender_pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(sender) {
                    return false;
                }
            }
            Err(e) => {
                debug!(pattern = %pattern, error = %e, "Malformed rule pattern, skipping rule");
                return false;
            }
        }
    }

    if let Some(ref needle) = rule.subject_contains
        && !subject.to_lowercase().contains(&needle.to_lowercase())
    {
        return false;
    }

    true
}
