use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of triage labels.
///
/// Declaration order is significant: it is the tie-break order used when two
/// categories end up with the same normalized score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Urgent")]
    Urgent,
    #[serde(rename = "Finance/Invoice")]
    FinanceInvoice,
    #[serde(rename = "Support")]
    Support,
    #[serde(rename = "Sales/Lead")]
    SalesLead,
    #[serde(rename = "HR/Recruiting")]
    HrRecruiting,
    #[serde(rename = "Security/IT")]
    SecurityIt,
    #[serde(rename = "Newsletter/Marketing")]
    NewsletterMarketing,
    #[serde(rename = "Personal")]
    Personal,
    #[serde(rename = "Spam")]
    Spam,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Urgent,
        Self::FinanceInvoice,
        Self::Support,
        Self::SalesLead,
        Self::HrRecruiting,
        Self::SecurityIt,
        Self::NewsletterMarketing,
        Self::Personal,
        Self::Spam,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::FinanceInvoice => "Finance/Invoice",
            Self::Support => "Support",
            Self::SalesLead => "Sales/Lead",
            Self::HrRecruiting => "HR/Recruiting",
            Self::SecurityIt => "Security/IT",
            Self::NewsletterMarketing => "Newsletter/Marketing",
            Self::Personal => "Personal",
            Self::Spam => "Spam",
        }
    }

    /// Accepts the wire label (any case, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
    }

    /// Position in the declared order.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw or normalized per-category scores, indexed by declared order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreVector {
    values: [f64; 9],
}

impl ScoreVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> f64 {
        self.values[category.index()]
    }

    pub fn add(&mut self, category: Category, amount: f64) {
        self.values[category.index()] += amount;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_or_due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltLabel {
    pub label: Category,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Category,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub priority: u8,
    pub sla_hours: u32,
    pub routed_queue: String,
    pub extracted: ExtractedEntities,
    pub alt_labels: Vec<AltLabel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailInput {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl EmailInput {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_labels() {
        assert_eq!(Category::parse("finance/invoice"), Some(Category::FinanceInvoice));
        assert_eq!(Category::parse(" Spam "), Some(Category::Spam));
        assert_eq!(Category::parse("Billing"), None);
    }

    #[test]
    fn serializes_with_slash_labels() {
        let json = serde_json::to_string(&Category::SecurityIt).unwrap();
        assert_eq!(json, "\"Security/IT\"");
    }

    #[test]
    fn declared_order_matches_indices() {
        for (position, category) in Category::ALL.into_iter().enumerate() {
            assert_eq!(category.index(), position);
        }
    }

    #[test]
    fn absent_entities_are_omitted() {
        let entities = ExtractedEntities {
            amount: Some("10.00".to_string()),
            ..ExtractedEntities::default()
        };
        let json = serde_json::to_value(&entities).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": "10.00" }));
    }
}
