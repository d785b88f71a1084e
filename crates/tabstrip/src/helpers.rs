use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Current wall-clock time at millisecond precision.
///
/// Persisted records carry millisecond timestamps, so everything the crate
/// stamps goes through here to keep save/load lossless.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Index of the first case-insensitive occurrence of `needle` in `haystack`,
/// as a byte range into `haystack`.
///
/// Compares char by char so the returned range always lands on char
/// boundaries of the original text, even when lowercasing changes lengths.
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();

    for (start, _) in haystack.char_indices() {
        let mut folded = Vec::with_capacity(needle.len());
        let mut end = start;
        for (offset, ch) in haystack[start..].char_indices() {
            folded.extend(ch.to_lowercase());
            end = start + offset + ch.len_utf8();
            if folded.len() >= needle.len() {
                break;
            }
        }
        if folded == needle {
            return Some((start, end));
        }
    }
    None
}
