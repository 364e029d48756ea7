//! Word extraction and frequency ranking shared by the analyzers.

use std::collections::HashMap;
use std::hash::Hash;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A word and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: u64,
}

/// Splits text into `\w+` words.
pub struct WordExtractor {
    word_regex: Regex,
}

impl WordExtractor {
    pub fn new() -> Self {
        Self {
            word_regex: Regex::new(r"\w+").expect("word pattern is valid"),
        }
    }

    /// Words of `text` longer than `min_chars` characters, in order.
    pub fn words<'a>(&'a self, text: &'a str, min_chars: usize) -> impl Iterator<Item = &'a str> + 'a {
        self.word_regex
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(move |w| w.chars().count() > min_chars)
    }
}

impl Default for WordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Count occurrences and rank by frequency. Ties keep first-seen order.
pub fn rank<T, I>(items: I) -> Vec<(T, u64)>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut order: Vec<T> = Vec::new();
    let mut counts: HashMap<T, u64> = HashMap::new();
    for item in items {
        match counts.get_mut(&item) {
            Some(count) => *count += 1,
            None => {
                counts.insert(item.clone(), 1);
                order.push(item);
            }
        }
    }

    let mut ranked: Vec<(T, u64)> = order
        .into_iter()
        .map(|item| {
            let count = counts.get(&item).copied().unwrap_or_default();
            (item, count)
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// [`rank`] for words.
pub fn rank_topics<I>(words: I) -> Vec<TopicCount>
where
    I: IntoIterator<Item = String>,
{
    rank(words)
        .into_iter()
        .map(|(topic, count)| TopicCount { topic, count })
        .collect()
}
