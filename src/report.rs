/*!
 * Reporting functionality for ctxscan
 *
 * Summarises a run, including everything the walk left out, as a table
 * rendered with the tabled library.
 */

use std::path::PathBuf;
use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::types::{SkipKind, SkipReport};

/// Summary of one run across all roots
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Where the output went
    pub output: String,
    /// Time taken
    pub duration: Duration,
    /// Number of roots scanned
    pub roots: usize,
    /// Files kept
    pub files: usize,
    /// Directories listed
    pub directories: usize,
    /// What was left out
    pub skipped: SkipReport,
}

/// Report generator for scan results
pub struct Reporter {
    /// How many paths of each skip category to list
    max_listed: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self { max_listed: 10 }
    }
}

impl Reporter {
    /// Create a new reporter
    pub fn new(max_listed: usize) -> Self {
        Self { max_listed }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Print the report to stderr so stdout stays clean for tree and file output
    pub fn print_report(&self, report: &ScanReport) {
        eprintln!("\n{}", self.generate_report(report));
    }

    /// Generate the report string
    pub fn generate_report(&self, report: &ScanReport) -> String {
        let summary = self.create_summary_table(report);
        if report.skipped.is_empty() {
            return format!("✅  SCAN COMPLETE\n{}", summary);
        }

        format!(
            "⚠️  SKIPPED PATHS\n{}\n\n✅  SCAN COMPLETE\n{}",
            self.create_skipped_table(&report.skipped),
            summary
        )
    }

    fn create_summary_table(&self, report: &ScanReport) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: String,

            #[tabled(rename = "Value")]
            value: String,
        }

        let skipped = &report.skipped;
        let mut rows = vec![
            SummaryRow {
                key: "📂 Output".to_string(),
                value: report.output.clone(),
            },
            SummaryRow {
                key: "⏱️ Process Time".to_string(),
                value: format!("{:.4?}", report.duration),
            },
            SummaryRow {
                key: "🌳 Roots".to_string(),
                value: self.format_number(report.roots),
            },
            SummaryRow {
                key: "📄 Files".to_string(),
                value: self.format_number(report.files),
            },
            SummaryRow {
                key: "📁 Directories".to_string(),
                value: self.format_number(report.directories),
            },
        ];

        for (label, kind) in SKIP_LABELS {
            let count = skipped.count(*kind);
            if count > 0 {
                rows.push(SummaryRow {
                    key: label.to_string(),
                    value: self.format_number(count),
                });
            }
        }

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }

    fn create_skipped_table(&self, skipped: &SkipReport) -> String {
        #[derive(Tabled)]
        struct SkipRow {
            #[tabled(rename = "Reason")]
            reason: String,

            #[tabled(rename = "Path")]
            path: String,
        }

        let mut rows = Vec::new();
        let lists: [(&str, &Vec<PathBuf>); 5] = [
            ("too large", &skipped.large_files),
            ("timed out", &skipped.timed_out),
            ("symlink loop", &skipped.symlink_loops),
            ("unreadable", &skipped.unreadable),
            ("binary/media", &skipped.binary_files),
        ];

        for (reason, paths) in lists {
            for path in paths.iter().take(self.max_listed) {
                rows.push(SkipRow {
                    reason: reason.to_string(),
                    path: path.display().to_string(),
                });
            }
            if paths.len() > self.max_listed {
                rows.push(SkipRow {
                    reason: reason.to_string(),
                    path: format!("... and {} more", paths.len() - self.max_listed),
                });
            }
        }
        for pattern in &skipped.malformed_patterns {
            rows.push(SkipRow {
                reason: "literal pattern".to_string(),
                path: pattern.clone(),
            });
        }

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }
}

const SKIP_LABELS: &[(&str, SkipKind)] = &[
    ("📏 Too Large", SkipKind::PathTooLarge),
    ("⌛ Timed Out", SkipKind::DirectoryTimedOut),
    ("🔁 Symlink Loops", SkipKind::SymlinkLoopDetected),
    ("🚫 Unreadable", SkipKind::PathUnreadable),
    ("🖼️ Binary/Media", SkipKind::BinaryOrMedia),
    ("❓ Literal Patterns", SkipKind::PatternMalformed),
];
