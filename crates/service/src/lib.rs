use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use triage_core::{Category, ClassificationResult, EmailInput, TriageEngine};
use triage_observability::AppMetrics;
use triage_storage::{FeedbackRecord, FeedbackRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkClassification {
    pub results: Vec<ClassificationResult>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub subject: String,
    pub body: String,
    pub predicted: Category,
    pub correct: Category,
}

/// Glue between the triage engine, the feedback sink and metrics.
///
/// Feedback flows into the store only; the engine never reads it back.
pub struct TriageService<S>
where
    S: FeedbackRepository,
{
    engine: Arc<TriageEngine>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S> Clone for TriageService<S>
where
    S: FeedbackRepository,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            store: self.store.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S> TriageService<S>
where
    S: FeedbackRepository,
{
    pub fn new(engine: Arc<TriageEngine>, store: Arc<S>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            engine,
            store,
            metrics,
        }
    }

    pub fn engine(&self) -> &TriageEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    pub fn labels(&self) -> &'static [Category] {
        &Category::ALL
    }

    #[instrument(skip_all, fields(subject_len = email.subject.len(), body_len = email.body.len()))]
    pub fn classify(&self, email: &EmailInput) -> ClassificationResult {
        let started = Instant::now();
        let result = self.engine.classify(&email.subject, &email.body);

        self.metrics.record_classification(result.label);
        self.metrics.observe_latency(started.elapsed());
        info!(
            label = %result.label,
            confidence = result.confidence,
            priority = result.priority,
            queue = %result.routed_queue,
            "email classified"
        );

        result
    }

    /// Classifies each email independently, preserving input order.
    pub fn bulk_classify(&self, emails: &[EmailInput]) -> BulkClassification {
        self.metrics.inc_bulk_request();
        let results = emails
            .iter()
            .map(|email| self.classify(email))
            .collect::<Vec<_>>();

        BulkClassification {
            count: results.len(),
            results,
        }
    }

    #[instrument(skip_all, fields(predicted = %input.predicted, correct = %input.correct))]
    pub async fn record_feedback(&self, input: FeedbackInput) -> Result<FeedbackRecord> {
        let record = FeedbackRecord::new(input.subject, input.body, input.predicted, input.correct);

        self.store
            .append(&record)
            .await
            .context("failed to append feedback")?;
        self.metrics.inc_feedback(record.predicted, record.corrected);
        info!(feedback_id = %record.feedback_id, "feedback recorded");

        Ok(record)
    }

    pub async fn recent_feedback(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        self.store.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use triage_storage::MemoryStore;

    use super::*;

    fn service() -> TriageService<MemoryStore> {
        TriageService::new(
            Arc::new(TriageEngine::default()),
            Arc::new(MemoryStore::new()),
            AppMetrics::shared(),
        )
    }

    #[test]
    fn bulk_preserves_order_and_counts() {
        let service = service();
        let bulk = service.bulk_classify(&[
            EmailInput::new("Free bitcoin", "claim now, winner"),
            EmailInput::new("", ""),
            EmailInput::new("VPN broken", "password reset needed for okta"),
        ]);

        assert_eq!(bulk.count, 3);
        assert_eq!(bulk.results[0].label, Category::Spam);
        assert_eq!(bulk.results[1].label, Category::Urgent);
        assert_eq!(bulk.results[2].label, Category::SecurityIt);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.classifications_total, 3);
        assert_eq!(snapshot.bulk_requests_total, 1);
    }

    #[test]
    fn bulk_of_nothing_is_empty() {
        let bulk = service().bulk_classify(&[]);
        assert_eq!(bulk.count, 0);
        assert!(bulk.results.is_empty());
    }

    #[tokio::test]
    async fn feedback_is_stored_but_not_used_for_classification() {
        let service = service();
        let before = service.classify(&EmailInput::new("Team lunch", "family dinner"));

        let record = service
            .record_feedback(FeedbackInput {
                subject: "Team lunch".to_string(),
                body: "family dinner".to_string(),
                predicted: before.label,
                correct: Category::HrRecruiting,
            })
            .await
            .unwrap();

        assert_eq!(record.corrected, Category::HrRecruiting);
        assert_eq!(service.recent_feedback(10).await.unwrap().len(), 1);
        assert_eq!(service.metrics().snapshot().feedback_total, 1);

        let after = service.classify(&EmailInput::new("Team lunch", "family dinner"));
        assert_eq!(before, after);
    }

    #[test]
    fn labels_follow_declared_order() {
        let labels = service().labels().to_vec();
        assert_eq!(labels.first(), Some(&Category::Urgent));
        assert_eq!(labels.last(), Some(&Category::Spam));
        assert_eq!(labels.len(), 9);
    }
}
