use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use triage_core::Category;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    classifications_total: AtomicU64,
    bulk_requests_total: AtomicU64,
    feedback_total: AtomicU64,
    rejected_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub classifications_total: u64,
    pub bulk_requests_total: u64,
    pub feedback_total: u64,
    pub rejected_total: u64,
    pub avg_latency_micros: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classification(&self, label: Category) {
        self.classifications_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("triage_classifications_total", "label" => label.as_str()).increment(1);
    }

    pub fn inc_bulk_request(&self) {
        self.bulk_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_feedback(&self, predicted: Category, corrected: Category) {
        self.feedback_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "triage_feedback_total",
            "agrees" => if predicted == corrected { "true" } else { "false" }
        )
        .increment(1);
    }

    pub fn inc_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        metrics::histogram!("triage_classify_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let classifications = self.classifications_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            classifications_total: classifications,
            bulk_requests_total: self.bulk_requests_total.load(Ordering::Relaxed),
            feedback_total: self.feedback_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            avg_latency_micros: if classifications == 0 {
                0.0
            } else {
                latency as f64 / classifications as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,triage_api=info,triage_service=info,triage_storage=info,tower_http=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
