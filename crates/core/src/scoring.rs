use crate::models::{Category, ScoreVector};
use crate::negation::is_negated;
use crate::rules::RuleSet;
use crate::tokenize::{token_counts, tokenize};

pub const PHRASE_WEIGHT: f64 = 2.0;
pub const UNSUBSCRIBE_SPAM_BOOST: f64 = 0.5;
pub const SMOOTHING: f64 = 0.01;

/// Raw keyword score per category, net of negated matches.
pub fn keyword_scores(text: &str, rules: &RuleSet) -> ScoreVector {
    let lower = text.to_lowercase();
    let tokens = tokenize(&lower);
    let counts = token_counts(&tokens);

    let mut scores = ScoreVector::new();
    for category in Category::ALL {
        for pattern in rules.keywords_for(category) {
            let pattern = pattern.to_lowercase();
            let words = pattern.split_whitespace().collect::<Vec<_>>();

            if let [word] = words.as_slice() {
                let count = counts.get(word).copied().unwrap_or(0);
                if count > 0 && !is_negated(&lower, word) {
                    scores.add(category, count as f64);
                }
            } else if lower.contains(pattern.as_str()) && !is_negated(&lower, &pattern) {
                scores.add(category, PHRASE_WEIGHT);
            }
        }
    }

    if scores.get(Category::NewsletterMarketing) > 0.0
        && lower.contains("unsubscribe")
        && !lower.contains("invoice")
    {
        scores.add(Category::Spam, UNSUBSCRIBE_SPAM_BOOST);
    }

    scores
}

/// Adds [`SMOOTHING`] to every score and rescales so the values sum to one.
pub fn normalize(raw: &ScoreVector) -> ScoreVector {
    let mut smoothed = ScoreVector::new();
    for (category, score) in raw.iter() {
        smoothed.add(category, score + SMOOTHING);
    }

    let total = smoothed.total();
    let mut normalized = ScoreVector::new();
    for (category, score) in smoothed.iter() {
        normalized.add(category, score / total);
    }
    normalized
}

/// Highest `k` categories, best first. Equal scores keep declared order.
pub fn top_k(scores: &ScoreVector, k: usize) -> Vec<(Category, f64)> {
    let mut ranked = scores.iter().collect::<Vec<_>>();
    ranked.sort_by(|left, right| right.1.total_cmp(&left.1));
    ranked.truncate(k);
    ranked
}

pub fn best_category(scores: &ScoreVector) -> (Category, f64) {
    top_k(scores, 1)
        .into_iter()
        .next()
        .unwrap_or((Category::ALL[0], scores.get(Category::ALL[0])))
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10_f64.powi(digits);
    (value * factor).round() / factor
}
