use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Category;

pub const MAX_BASE_PRIORITY: u8 = 4;
pub const MAX_SLA_HOURS: u32 = 168;

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("failed to read rule set from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule set json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("blank keyword pattern for {0}")]
    BlankPattern(Category),
    #[error("base priority {priority} for {category} is outside 1..=4")]
    BasePriorityOutOfRange { category: Category, priority: u8 },
    #[error("sla of {hours}h for {category} exceeds 168h")]
    SlaOutOfRange { category: Category, hours: u32 },
    #[error("empty queue name for {0}")]
    EmptyQueue(Category),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub queue: String,
    pub base_priority: u8,
    pub sla_hours: u32,
}

impl RoutingEntry {
    pub fn new(queue: &str, base_priority: u8, sla_hours: u32) -> Self {
        Self {
            queue: queue.to_string(),
            base_priority,
            sla_hours,
        }
    }

    /// Used when a category has no row in the routing table.
    pub fn fallback() -> Self {
        Self::new("#inbox", 2, 72)
    }
}

/// Keyword and routing tables for the triage engine.
///
/// Built once at startup and shared read-only. Categories absent from a
/// loaded table score zero and route to [`RoutingEntry::fallback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub keywords: BTreeMap<Category, Vec<String>>,
    #[serde(default)]
    pub routing: BTreeMap<Category, RoutingEntry>,
}

impl RuleSet {
    pub fn from_json_str(raw: &str) -> Result<Self, RuleSetError> {
        let rules: RuleSet = serde_json::from_str(raw)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), RuleSetError> {
        for (category, patterns) in &self.keywords {
            if patterns.iter().any(|pattern| pattern.trim().is_empty()) {
                return Err(RuleSetError::BlankPattern(*category));
            }
        }

        for (category, entry) in &self.routing {
            if entry.queue.trim().is_empty() {
                return Err(RuleSetError::EmptyQueue(*category));
            }
            if !(1..=MAX_BASE_PRIORITY).contains(&entry.base_priority) {
                return Err(RuleSetError::BasePriorityOutOfRange {
                    category: *category,
                    priority: entry.base_priority,
                });
            }
            if entry.sla_hours > MAX_SLA_HOURS {
                return Err(RuleSetError::SlaOutOfRange {
                    category: *category,
                    hours: entry.sla_hours,
                });
            }
        }

        Ok(())
    }

    pub fn keywords_for(&self, category: Category) -> &[String] {
        self.keywords
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn route_for(&self, category: Category) -> RoutingEntry {
        self.routing
            .get(&category)
            .cloned()
            .unwrap_or_else(RoutingEntry::fallback)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let keywords = [
            (
                Category::Urgent,
                &[
                    "urgent",
                    "asap",
                    "immediately",
                    "critical",
                    "prod down",
                    "sev1",
                    "sev-1",
                    "p1",
                ][..],
            ),
            (
                Category::FinanceInvoice,
                &[
                    "invoice",
                    "payment",
                    "po",
                    "purchase order",
                    "remittance",
                    "wire",
                    "accounting",
                    "bill",
                    "due",
                ][..],
            ),
            (
                Category::Support,
                &[
                    "issue",
                    "bug",
                    "error",
                    "not working",
                    "broken",
                    "support",
                    "ticket",
                    "outage",
                    "fails",
                ][..],
            ),
            (
                Category::SalesLead,
                &[
                    "pricing",
                    "quote",
                    "demo",
                    "trial",
                    "subscribe",
                    "licensing",
                    "lead",
                    "sow",
                    "proposal",
                    "renewal",
                ][..],
            ),
            (
                Category::HrRecruiting,
                &[
                    "resume",
                    "cv",
                    "interview",
                    "offer",
                    "benefit",
                    "payroll",
                    "onboarding",
                    "recruit",
                    "career",
                ][..],
            ),
            (
                Category::SecurityIt,
                &[
                    "password",
                    "mfa",
                    "vpn",
                    "phishing",
                    "compromised",
                    "ransomware",
                    "patch",
                    "security",
                    "okta",
                    "single sign-on",
                ][..],
            ),
            (
                Category::NewsletterMarketing,
                &[
                    "unsubscribe",
                    "newsletter",
                    "campaign",
                    "webinar",
                    "blog",
                    "event",
                    "marketing",
                    "ebook",
                ][..],
            ),
            (
                Category::Personal,
                &["birthday", "party", "family", "vacation", "dinner", "lunch"][..],
            ),
            (
                Category::Spam,
                &[
                    "winner",
                    "free",
                    "claim now",
                    "bitcoin",
                    "crypto",
                    "adult",
                    "casino",
                    "viagra",
                ][..],
            ),
        ]
        .into_iter()
        .map(|(category, patterns)| {
            (
                category,
                patterns.iter().map(|pattern| pattern.to_string()).collect(),
            )
        })
        .collect();

        let routing = [
            (Category::Urgent, RoutingEntry::new("#incidents", 4, 4)),
            (Category::FinanceInvoice, RoutingEntry::new("#fin-ops", 3, 48)),
            (Category::Support, RoutingEntry::new("#support", 3, 72)),
            (Category::SalesLead, RoutingEntry::new("#sales", 2, 72)),
            (Category::HrRecruiting, RoutingEntry::new("#people-ops", 2, 72)),
            (Category::SecurityIt, RoutingEntry::new("#secops", 3, 24)),
            (
                Category::NewsletterMarketing,
                RoutingEntry::new("#marketing", 1, 168),
            ),
            (Category::Personal, RoutingEntry::new("(skip/low)", 1, 168)),
            (Category::Spam, RoutingEntry::new("(junk)", 1, 0)),
        ]
        .into_iter()
        .collect();

        Self { keywords, routing }
    }
}
