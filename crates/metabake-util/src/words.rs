//! Helpers for the space-separated word lists kept in metadata variables
//! (`__BBTASKS`, `__BBHANDLERS`, per-task `deps` flags and the like).

use itertools::Itertools;

pub fn contains_word(list: &str, word: &str) -> bool {
    list.split_whitespace().any(|w| w == word)
}

/// Append `word` unless already present. Returns `None` when nothing changed.
pub fn append_unique(list: Option<&str>, word: &str) -> Option<String> {
    let list = list.unwrap_or_default();
    if contains_word(list, word) {
        return None;
    }

    Some(list.split_whitespace().chain(std::iter::once(word)).join(" "))
}

/// Prepend `word` unless already present. Returns `None` when nothing changed.
pub fn prepend_unique(list: Option<&str>, word: &str) -> Option<String> {
    let list = list.unwrap_or_default();
    if contains_word(list, word) {
        return None;
    }

    Some(std::iter::once(word).chain(list.split_whitespace()).join(" "))
}

pub fn words(list: Option<&str>) -> Vec<String> {
    list.unwrap_or_default()
        .split_whitespace()
        .map(String::from)
        .collect()
}
