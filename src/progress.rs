//! Progress display module
//!
//! Styled terminal output and the console [`ProgressSink`] the binary attaches
//! to a session.

use bytesize::ByteSize;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

use crate::aggregate::AggregateStats;
use crate::analyzer::TargetWord;
use crate::record::FileRecord;
use crate::session::ProgressSink;

/// Print the application banner
pub fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════╗
║   W O R D S T A T S                                          ║
║   Concurrent word statistics for directories of text files   ║
╚══════════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner.green());
}

/// Print a section header
pub fn print_header(text: &str) {
    println!("\n{} {}", "▶".green(), text.green().bold());
}

/// Print an info message
pub fn print_info(text: &str) {
    println!("  {} {}", "ℹ".cyan(), text);
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".red(), text.red());
}

/// Create a styled progress bar counting files
pub fn create_progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}

/// Truncate `text` to `width` characters, marking the cut with an ellipsis
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Print the per-file table in completion order
pub fn print_file_table(records: &[FileRecord]) {
    print_header("Files");
    println!(
        "  {:<28} {:>9} {:>6} {:>6} {:>6}  {:<18} {:<12}",
        "File", "Words", "is", "are", "you", "Longest", "Shortest"
    );
    println!("  {}", "─".repeat(92).bright_black());

    for record in records {
        let line = format!(
            "  {:<28} {:>9} {:>6} {:>6} {:>6}  {:<18} {:<12}",
            fit(&record.file_name, 28),
            format_number(record.word_count),
            record.target_counts[TargetWord::Is],
            record.target_counts[TargetWord::Are],
            record.target_counts[TargetWord::You],
            fit(&record.longest_word, 18),
            fit(&record.shortest_word, 12),
        );

        if record.failed {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

/// Print final statistics
pub fn print_summary(stats: &AggregateStats, elapsed: Duration) {
    println!();
    println!("{}", "═".repeat(60).green());
    println!("{}", "                    PROCESSING COMPLETE".green().bold());
    println!("{}", "═".repeat(60).green());
    println!();

    println!("  {} {}", "Files processed:".green(), format_number(stats.files_processed));
    let failed = stats.failed_files();
    if failed > 0 {
        println!("  {} {}", "Failed files:   ".red(), format_number(failed).red());
    }
    println!("  {} {}", "Data processed: ".green(), ByteSize(stats.total_bytes_read));
    println!();

    println!("  {} {}", "Total words:    ".green(), format_number(stats.total_word_count));
    for (word, count) in stats.total_target_counts.iter() {
        println!("  {} {}", format!("{:<16}", format!("\"{}\":", word)).green(), format_number(count));
    }
    println!("  {} {:.2}", "Words per file: ".green(), stats.average_words_per_file());
    println!("  {} {}", "Longest word:   ".green().bold(), stats.longest_word_seen.green().bold());
    println!("  {} {}", "Shortest word:  ".green().bold(), stats.shortest_word_seen.green().bold());

    println!();
    println!("  {} {}", "Duration:       ".green(), format_duration(elapsed));
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        println!("  {} {:.2} files/sec", "Throughput:     ".green(), stats.files_processed as f64 / secs);
    }
    println!();
    println!("{}", "═".repeat(60).green());
}

/// Terminal presentation of a session
pub struct ConsoleSink {
    bar: ProgressBar,
    quiet: bool,
    verbose: bool,
    show_files: bool,
    started: Instant,
}

impl ConsoleSink {
    pub fn new(quiet: bool, verbose: bool, show_files: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet,
            verbose,
            show_files,
            started: Instant::now(),
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn on_started(&mut self, total: usize) {
        self.started = Instant::now();

        if !self.quiet {
            print_info(&format!("Found {} files", format_number(total as u64)));
            print_header("Processing...");
            self.bar = create_progress_bar(total as u64, "Processing...");
        }
    }

    fn on_file_processed(&mut self, record: &FileRecord, done: usize, _total: usize) {
        self.bar.set_position(done as u64);

        if record.failed {
            self.bar.println(format!(
                "  {} {}",
                "⚠".yellow(),
                format!("{}: {}", record.file_name, record.longest_word).yellow()
            ));
        } else if self.verbose {
            self.bar.set_message(record.file_name.clone());
        }
    }

    fn on_progress(&mut self, percent: u8) {
        if percent == 100 {
            self.bar.set_message("Finishing...");
        }
    }

    fn on_complete(&mut self, stats: &AggregateStats) {
        self.bar.finish_with_message("Complete".green().to_string());

        if self.show_files {
            print_file_table(&stats.records);
        }

        if !self.quiet {
            print_summary(stats, self.started.elapsed());
        } else {
            println!("{}", stats);
        }
    }

    fn on_error(&mut self, context: &str, message: &str) {
        self.bar.abandon();
        print_error(&format!("{}: {}", context, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use std::path::Path;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(123), "123");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("exactly10!", 10), "exactly10!");
        assert_eq!(fit("much too long", 5), "much…");
    }

    #[test]
    fn test_console_sink_quiet_run() {
        let mut sink = ConsoleSink::new(true, false, false);
        let record = FileRecord::analyzed(Path::new("a.txt"), analyze("you are"));

        sink.on_started(1);
        sink.on_file_processed(&record, 1, 1);
        sink.on_progress(100);
        sink.on_complete(&AggregateStats::default());
        assert!(sink.bar.is_finished());
    }
}
