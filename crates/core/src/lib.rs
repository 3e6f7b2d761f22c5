pub mod actions;
pub mod engine;
pub mod extract;
pub mod models;
pub mod negation;
pub mod policy;
pub mod rules;
pub mod scoring;
pub mod tokenize;

pub use engine::TriageEngine;
pub use models::*;
pub use policy::{RoutingDecision, RoutingPolicy};
pub use rules::{RoutingEntry, RuleSet, RuleSetError};
