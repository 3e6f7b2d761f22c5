use crate::actions::recommend_actions;
use crate::extract::extract_entities;
use crate::models::{AltLabel, ClassificationResult};
use crate::policy::RoutingPolicy;
use crate::rules::RuleSet;
use crate::scoring::{best_category, keyword_scores, normalize, round_to, top_k};

pub const ALT_LABEL_COUNT: usize = 3;

/// Rule-based email triage.
///
/// Holds only the immutable rule tables, so one engine can serve any number
/// of concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct TriageEngine {
    rules: RuleSet,
}

impl TriageEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classifies one email. Never fails: empty text yields the uniform
    /// distribution and the first declared category.
    pub fn classify(&self, subject: &str, body: &str) -> ClassificationResult {
        let text = format!("{subject}\n{body}");

        let raw = keyword_scores(&text, &self.rules);
        let normalized = normalize(&raw);
        let (label, confidence) = best_category(&normalized);

        let extracted = extract_entities(&text);
        let routing = RoutingPolicy::new(&self.rules).route(label, &text);
        let suggested_actions = recommend_actions(label, &extracted);

        let alt_labels = top_k(&normalized, ALT_LABEL_COUNT)
            .into_iter()
            .map(|(label, score)| AltLabel {
                label,
                score: round_to(score, 4),
            })
            .collect();

        ClassificationResult {
            label,
            confidence: round_to(confidence, 4),
            reasons: vec![format!(
                "Keyword match score = {:.2}",
                round_to(raw.get(label), 2)
            )],
            suggested_actions,
            priority: routing.priority,
            sla_hours: routing.sla_hours,
            routed_queue: routing.queue,
            extracted,
            alt_labels,
        }
    }
}
