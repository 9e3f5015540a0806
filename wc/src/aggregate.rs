use std::collections::hash_map::{self, HashMap};

use crate::tokenizer;

/// Word -> occurrence count table. Used both as the per-partition partial
/// aggregate and as the final result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts {
    counts: HashMap<String, u64>,
}

impl WordCounts {
    pub fn new() -> Self {
        WordCounts::default()
    }

    pub fn add_word(&mut self, word: &str, count: u64) {
        // avoid allocating a key for words we have already seen
        match self.counts.get_mut(word) {
            Some(total) => *total += count,
            None => {
                self.counts.insert(word.to_string(), count);
            }
        }
    }

    /// Tokenizes the line and adds its words. Returns how many words it had.
    pub fn add_line(&mut self, line: &str) -> u64 {
        let mut words = 0;
        for (word, count) in tokenizer::map_line(line) {
            self.add_word(word, count);
            words += count;
        }
        words
    }

    /// Folds another partial aggregate into this one.
    pub fn merge(&mut self, other: WordCounts) {
        // iterate over the smaller table
        let (mut base, other) = if self.counts.len() >= other.counts.len() {
            (std::mem::take(&mut self.counts), other.counts)
        } else {
            (other.counts, std::mem::take(&mut self.counts))
        };
        for (word, count) in other {
            *base.entry(word).or_insert(0) += count;
        }
        self.counts = base;
    }

    /// Associative, commutative combine of two partials.
    pub fn combine(mut self, other: WordCounts) -> WordCounts {
        self.merge(other);
        self
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.counts.get(word).copied()
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of words seen.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, u64> {
        self.counts.iter()
    }

    pub fn into_sorted_vec(self) -> Vec<(String, u64)> {
        let mut records: Vec<(String, u64)> = self.counts.into_iter().collect();
        records.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        records
    }
}

impl IntoIterator for WordCounts {
    type Item = (String, u64);
    type IntoIter = hash_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<'a> FromIterator<(&'a str, u64)> for WordCounts {
    fn from_iter<T: IntoIterator<Item = (&'a str, u64)>>(iter: T) -> Self {
        let mut counts = WordCounts::new();
        for (word, count) in iter {
            counts.add_word(word, count);
        }
        counts
    }
}

impl FromIterator<WordCounts> for WordCounts {
    fn from_iter<T: IntoIterator<Item = WordCounts>>(iter: T) -> Self {
        iter.into_iter().fold(WordCounts::new(), WordCounts::combine)
    }
}

/// Counts the words of a sequence of lines in one pass, no partitioning.
pub fn count_words<I, S>(lines: I) -> WordCounts
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = WordCounts::new();
    for line in lines {
        counts.add_line(line.as_ref());
    }
    counts
}
