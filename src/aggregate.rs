//! Result aggregation module
//!
//! Running cross-file totals, fed one record at a time by a single consumer.
//!
//! Longest/shortest across files keep the first record seen on ties. Records
//! are absorbed in completion order, which varies between runs, so two
//! equal-length candidates from different files may win in different runs.
//! That nondeterminism is accepted.

use std::fmt;

use crate::analyzer::TargetCounts;
use crate::record::FileRecord;

/// Totals across every absorbed record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub files_processed: u64,
    pub total_word_count: u64,
    pub total_target_counts: TargetCounts,
    pub total_bytes_read: u64,
    pub longest_word_seen: String,
    pub shortest_word_seen: String,
    /// Every absorbed record, in completion order
    pub records: Vec<FileRecord>,
}

impl AggregateStats {
    pub fn failed_files(&self) -> u64 {
        self.records.iter().filter(|r| r.failed).count() as u64
    }

    pub fn average_words_per_file(&self) -> f64 {
        if self.files_processed > 0 {
            self.total_word_count as f64 / self.files_processed as f64
        } else {
            0.0
        }
    }
}

impl fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files: {}, Total Words: {}",
            self.files_processed, self.total_word_count
        )?;
        for (word, count) in self.total_target_counts.iter() {
            write!(f, ", {}: {}", word, count)?;
        }
        write!(
            f,
            ", Longest: {}, Shortest: {}",
            self.longest_word_seen, self.shortest_word_seen
        )
    }
}

/// Single-writer accumulator over [`FileRecord`]s
#[derive(Debug, Default)]
pub struct ResultAggregator {
    stats: AggregateStats,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.stats = AggregateStats::default();
    }

    /// Fold one record into the totals.
    ///
    /// Failed records are counted and kept but add nothing to the totals and
    /// never compete for longest/shortest.
    pub fn absorb(&mut self, record: FileRecord) {
        let stats = &mut self.stats;
        stats.files_processed += 1;

        if !record.failed {
            stats.total_word_count += record.word_count;
            stats.total_target_counts.add(&record.target_counts);
            stats.total_bytes_read += record.bytes_read;

            let longest = &record.longest_word;
            if !longest.is_empty()
                && (stats.longest_word_seen.is_empty()
                    || longest.len() > stats.longest_word_seen.len())
            {
                stats.longest_word_seen = longest.clone();
            }

            let shortest = &record.shortest_word;
            if !shortest.is_empty()
                && (stats.shortest_word_seen.is_empty()
                    || shortest.len() < stats.shortest_word_seen.len())
            {
                stats.shortest_word_seen = shortest.clone();
            }
        }

        stats.records.push(record);
    }

    /// Independent copy of the current totals
    pub fn snapshot(&self) -> AggregateStats {
        self.stats.clone()
    }
}
