/// Characters inspected before a keyword match.
pub const NEGATION_WINDOW: usize = 12;

pub const NEGATION_CUES: [&str; 6] = ["no ", "not ", "without ", "never ", "cannot ", "can't "];

/// Reports whether the first occurrence of `needle` in `lower_text` is
/// preceded by a negation cue.
///
/// Later occurrences are never examined, so "not urgent ... urgent" counts as
/// negated and "urgent ... not urgent" does not.
pub fn is_negated(lower_text: &str, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let Some(start) = lower_text.find(&needle) else {
        return false;
    };

    let mut window = lower_text[..start]
        .chars()
        .rev()
        .take(NEGATION_WINDOW)
        .collect::<Vec<_>>();
    window.reverse();
    let window = window.into_iter().collect::<String>();

    NEGATION_CUES.iter().any(|cue| window.contains(cue))
}
