use crate::models::Category;
use crate::rules::{RoutingEntry, RuleSet};

pub const MAX_PRIORITY: u8 = 5;

const URGENCY_CUES: [&str; 6] = ["sev1", "sev-1", "p1", "critical", "prod down", "outage"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub queue: String,
    pub priority: u8,
    pub sla_hours: u32,
}

/// Maps a winning category and urgency signals to a queue, priority and SLA.
#[derive(Debug, Clone)]
pub struct RoutingPolicy<'a> {
    rules: &'a RuleSet,
}

impl<'a> RoutingPolicy<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    pub fn route(&self, category: Category, text: &str) -> RoutingDecision {
        let RoutingEntry {
            queue,
            base_priority,
            sla_hours,
        } = self.rules.route_for(category);

        RoutingDecision {
            queue,
            priority: MAX_PRIORITY.min(base_priority.saturating_add(urgency_boost(text))),
            sla_hours,
        }
    }
}

pub fn urgency_boost(text: &str) -> u8 {
    let lower = text.to_lowercase();
    u8::from(contains_any(&lower, &URGENCY_CUES))
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
