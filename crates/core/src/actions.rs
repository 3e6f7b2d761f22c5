use crate::models::{Category, ExtractedEntities};

pub const FALLBACK_ACTION: &str = "Route to owner";

/// Follow-up actions for the winning label, in a fixed check order.
pub fn recommend_actions(label: Category, entities: &ExtractedEntities) -> Vec<String> {
    let mut actions = Vec::new();

    if label == Category::FinanceInvoice {
        let complete = entities.invoice_number.is_some() && entities.amount.is_some();
        actions.push(if complete {
            "Create AP entry and start 2-way match"
        } else {
            "Request missing invoice details"
        });
    }
    if label == Category::Support {
        actions.push("Open/append to ticket");
    }
    if label == Category::SecurityIt {
        actions.push("Notify SecOps on-call");
    }
    if label == Category::SalesLead {
        actions.push("Push to CRM as Lead");
    }
    if label == Category::Urgent {
        actions.push("Escalate to incident channel");
    }
    if label == Category::NewsletterMarketing {
        actions.push("Consider auto-archive");
    }
    if label == Category::Spam {
        actions.push("Move to Junk");
    }
    if actions.is_empty() {
        actions.push(FALLBACK_ACTION);
    }

    actions.into_iter().map(ToString::to_string).collect()
}
