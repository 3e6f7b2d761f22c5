use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9']+").expect("valid tokenizer regex"));

/// Lower-cases `input` and returns every maximal run of ASCII letters, digits
/// and apostrophes, in order and with repeats.
pub fn tokenize(input: &str) -> Vec<String> {
    let lower = input.to_lowercase();
    WORD.find_iter(&lower)
        .map(|token| token.as_str().to_string())
        .collect()
}

pub fn token_counts(tokens: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}
