//! Word analysis module
//!
//! Single-pass scan of a text producing word counts, target-word counts and
//! the longest/shortest word. Pure functions only; no shared state.

use std::fmt;
use std::ops::{Index, IndexMut};

/// The fixed set of words counted individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetWord {
    Is,
    Are,
    You,
}

impl TargetWord {
    pub const ALL: [TargetWord; 3] = [TargetWord::Is, TargetWord::Are, TargetWord::You];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetWord::Is => "is",
            TargetWord::Are => "are",
            TargetWord::You => "you",
        }
    }

    /// Case-insensitive match of a token against the target words
    #[inline]
    pub fn matching(token: &str) -> Option<TargetWord> {
        Self::ALL
            .into_iter()
            .find(|target| token.eq_ignore_ascii_case(target.as_str()))
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TargetWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occurrence counts for each target word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetCounts([u64; 3]);

impl TargetCounts {
    pub fn get(&self, word: TargetWord) -> u64 {
        self.0[word.index()]
    }

    /// Sum over all target words
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn add(&mut self, other: &TargetCounts) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine += theirs;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetWord, u64)> + '_ {
        TargetWord::ALL.into_iter().map(move |w| (w, self.get(w)))
    }
}

impl Index<TargetWord> for TargetCounts {
    type Output = u64;

    fn index(&self, word: TargetWord) -> &u64 {
        &self.0[word.index()]
    }
}

impl IndexMut<TargetWord> for TargetCounts {
    fn index_mut(&mut self, word: TargetWord) -> &mut u64 {
        &mut self.0[word.index()]
    }
}

/// Statistics for one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordStats {
    pub word_count: u64,
    pub target_counts: TargetCounts,
    pub longest_word: String,
    pub shortest_word: String,
}

impl fmt::Display for WordStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Words: {}", self.word_count)?;
        for (word, count) in self.target_counts.iter() {
            write!(f, ", '{}': {}", word, count)?;
        }
        write!(
            f,
            ", Longest: '{}', Shortest: '{}'",
            self.longest_word, self.shortest_word
        )
    }
}

/// Iterate the words of `text`: every maximal run of ASCII letters.
///
/// Each word is a slice of the input, so its case is that of its own position.
pub fn words(text: &str) -> Words<'_> {
    Words { rest: text }
}

/// Iterator returned by [`words`]
pub struct Words<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let start = self.rest.find(|c: char| c.is_ascii_alphabetic())?;
        let tail = &self.rest[start..];
        let len = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let (word, rest) = tail.split_at(len);
        self.rest = rest;
        Some(word)
    }
}

/// Analyze a text.
///
/// Ties on longest or shortest keep the first word seen. Any input is valid;
/// text without letters yields the zero value.
pub fn analyze(text: &str) -> WordStats {
    let mut stats = WordStats::default();
    let mut longest: Option<&str> = None;
    let mut shortest: Option<&str> = None;

    for word in words(text) {
        stats.word_count += 1;

        if let Some(target) = TargetWord::matching(word) {
            stats.target_counts[target] += 1;
        }

        // Words are ASCII, so byte length is letter count
        if longest.map_or(true, |l| word.len() > l.len()) {
            longest = Some(word);
        }
        if shortest.map_or(true, |s| word.len() < s.len()) {
            shortest = Some(word);
        }
    }

    stats.longest_word = longest.unwrap_or_default().to_string();
    stats.shortest_word = shortest.unwrap_or_default().to_string();
    stats
}
