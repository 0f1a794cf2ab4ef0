//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns lines; the `print_*`
//! wrappers write them to stdout. Batch events are rendered as they arrive,
//! the record table and summary once the batch is done.
//!
//! ## Batch events
//!
//! ```text
//! Unsupported format, skipped:
//!     notes.pdf (application/pdf)
//! Converting 2 images
//! 001 beach.jpg → beach.webp
//!     4000×3000 → 2000×1500
//!     2.4 MB → 312.5 KB, saved 87.3% at quality 85%
//! 002 IMG_7.HEIC: failed
//!     IMG_7.HEIC: the heic codec is not available
//! 1 image converted, 1 failed
//! ```
//!
//! ## Record table
//!
//! ```text
//! Name                     Dimensions                  Original       WebP  Quality  Savings
//! beach.jpg                4000×3000 → 2000×1500         2.4 MB   312.5 KB      85%    87.3%
//! ```

use crate::batch::BatchEvent;
use crate::convert::display_mime;
use crate::imaging::Dimensions;
use crate::results::{ConversionRecord, Results};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Format a 1-based position as a zero-padded 3-digit index.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte size: `512 B`, `1.5 KB`, `2.4 MB` (1024-based).
pub fn format_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

/// `"1 image converted"` / `"N images converted"`.
pub fn format_count(n: usize) -> String {
    if n == 1 {
        "1 image converted".to_string()
    } else {
        format!("{} images converted", n)
    }
}

/// `W×H` when unchanged, `W×H → W'×H'` when the image was scaled.
pub fn format_dimensions(original: Dimensions, output: Dimensions) -> String {
    if original == output {
        original.to_string()
    } else {
        format!("{} \u{2192} {}", original, output)
    }
}

fn format_savings(savings: Option<&str>) -> String {
    match savings {
        Some(s) => format!("{}%", s),
        None => "n/a".to_string(),
    }
}

// ============================================================================
// Batch events
// ============================================================================

/// Format one batch event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Unsupported { files } => {
            let mut lines = vec!["Unsupported format, skipped:".to_string()];
            for file in files {
                lines.push(format!("    {} ({})", file.name, display_mime(&file.mime)));
            }
            lines
        }
        BatchEvent::Started { total } => match total {
            0 => vec!["Nothing to convert".to_string()],
            1 => vec!["Converting 1 image".to_string()],
            n => vec![format!("Converting {} images", n)],
        },
        BatchEvent::Converted { index, record, .. } => vec![
            format!(
                "{} {} \u{2192} {}",
                format_index(*index),
                record.original_name,
                record.download_name
            ),
            format!(
                "    {}",
                format_dimensions(record.original_dimensions, record.output_dimensions)
            ),
            format!(
                "    {} \u{2192} {}, saved {} at quality {}%",
                format_size(record.original_size),
                format_size(record.output_size),
                format_savings(record.savings_percent.as_deref()),
                record.quality_percent
            ),
        ],
        BatchEvent::Failed { index, failure, .. } => vec![
            format!("{} {}: failed", format_index(*index), failure.name),
            format!("    {}", failure.message),
        ],
        BatchEvent::Finished(summary) => {
            let mut line = format_count(summary.converted);
            if summary.failed > 0 {
                line.push_str(&format!(", {} failed", summary.failed));
            }
            if summary.unsupported > 0 {
                line.push_str(&format!(", {} unsupported", summary.unsupported));
            }
            vec![line]
        }
    }
}

// ============================================================================
// Record table and summary
// ============================================================================

fn table_row(cells: [&str; 6]) -> String {
    format!(
        "{:<24} {:<27} {:>9} {:>10} {:>8} {:>8}",
        cells[0], cells[1], cells[2], cells[3], cells[4], cells[5]
    )
}

/// One row per record: name, dimensions, sizes, quality and savings.
pub fn format_record_table(records: &[ConversionRecord]) -> Vec<String> {
    let mut lines = vec![table_row([
        "Name",
        "Dimensions",
        "Original",
        "WebP",
        "Quality",
        "Savings",
    ])];
    for record in records {
        lines.push(table_row([
            &record.original_name,
            &format_dimensions(record.original_dimensions, record.output_dimensions),
            &format_size(record.original_size),
            &format_size(record.output_size()),
            &format!("{}%", record.quality_percent),
            &format_savings(record.formatted_savings().as_deref()),
        ]));
    }
    lines
}

/// Totals, anomalies and failures of a finished batch.
pub fn format_summary(results: &Results) -> Vec<String> {
    let mut lines = vec![format_count(results.count())];

    if !results.is_empty() {
        let totals = results.totals();
        let savings = totals.savings_percent().map(|s| format!("{:.1}", s));
        lines.push(format!(
            "Total: {} \u{2192} {}, saved {}",
            format_size(totals.original),
            format_size(totals.output),
            format_savings(savings.as_deref())
        ));
    }

    for record in results.anomalies() {
        lines.push(format!(
            "    {}: empty original, savings undefined",
            record.original_name
        ));
    }

    if !results.failures().is_empty() {
        lines.push(format!("Failed ({}):", results.failures().len()));
        for failure in results.failures() {
            lines.push(format!("    {}", failure.message));
        }
    }
    lines
}

pub fn print_record_table(records: &[ConversionRecord]) {
    for line in format_record_table(records) {
        println!("{}", line);
    }
}

pub fn print_summary(results: &Results) {
    for line in format_summary(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchSummary, Rejected};
    use crate::convert::ConvertError;
    use crate::results::FailedFile;
    use crate::results::tests::record;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 / 2), "2.5 MB");
    }

    #[test]
    fn count_label_singular_and_plural() {
        assert_eq!(format_count(0), "0 images converted");
        assert_eq!(format_count(1), "1 image converted");
        assert_eq!(format_count(7), "7 images converted");
    }

    #[test]
    fn dimensions_show_arrow_only_when_changed() {
        let a = Dimensions::new(4000, 1500);
        let b = Dimensions::new(2000, 750);
        assert_eq!(format_dimensions(a, a), "4000×1500");
        assert_eq!(format_dimensions(a, b), "4000×1500 → 2000×750");
    }

    // =========================================================================
    // Batch events
    // =========================================================================

    #[test]
    fn converted_event_lines() {
        let r = record("beach.JPG", 2048, 512);
        let event = BatchEvent::Converted {
            index: 1,
            total: 1,
            record: r.summary(),
        };
        let lines = format_batch_event(&event);
        assert_eq!(lines[0], "001 beach.JPG → beach.webp");
        assert_eq!(lines[1], "    100×50");
        assert_eq!(lines[2], "    2.0 KB → 512 B, saved 75.0% at quality 85%");
    }

    #[test]
    fn converted_event_with_empty_original() {
        let r = record("empty.png", 0, 10);
        let event = BatchEvent::Converted {
            index: 3,
            total: 3,
            record: r.summary(),
        };
        let lines = format_batch_event(&event);
        assert!(lines[2].contains("saved n/a"));
    }

    #[test]
    fn failed_event_lines() {
        let err = ConvertError::CodecUnavailable {
            name: "IMG_7.HEIC".to_string(),
            codec: "heic".to_string(),
        };
        let event = BatchEvent::Failed {
            index: 2,
            total: 2,
            failure: FailedFile::from(&err),
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "002 IMG_7.HEIC: failed",
                "    IMG_7.HEIC: the heic codec is not available"
            ]
        );
    }

    #[test]
    fn unsupported_event_lists_names_and_types() {
        let event = BatchEvent::Unsupported {
            files: vec![
                Rejected {
                    name: "notes.pdf".to_string(),
                    mime: "application/pdf".to_string(),
                },
                Rejected {
                    name: "README".to_string(),
                    mime: String::new(),
                },
            ],
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "Unsupported format, skipped:",
                "    notes.pdf (application/pdf)",
                "    README (no type)",
            ]
        );
    }

    #[test]
    fn started_and_finished_events() {
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 0 }),
            vec!["Nothing to convert"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 1 }),
            vec!["Converting 1 image"]
        );
        let finished = BatchEvent::Finished(BatchSummary {
            converted: 1,
            failed: 1,
            unsupported: 0,
        });
        assert_eq!(
            format_batch_event(&finished),
            vec!["1 image converted, 1 failed"]
        );
    }

    // =========================================================================
    // Record table and summary
    // =========================================================================

    #[test]
    fn record_table_has_header_and_rows() {
        let records = vec![record("a.png", 1000, 250), record("b.png", 0, 10)];
        let lines = format_record_table(&records);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[1].starts_with("a.png"));
        assert!(lines[1].contains("75.0%"));
        assert!(lines[1].contains("85%"));
        assert!(lines[2].trim_end().ends_with("n/a"));
    }

    #[test]
    fn summary_reports_totals_anomalies_and_failures() {
        let mut results = Results::new();
        results.add(record("a.png", 1000, 250));
        results.add(record("empty.png", 0, 50));
        results.record_failure(&ConvertError::EncodeFailed {
            name: "c.gif".to_string(),
            reason: "encoder produced no output".to_string(),
        });

        let lines = format_summary(&results);
        assert_eq!(lines[0], "2 images converted");
        assert_eq!(lines[1], "Total: 1000 B → 300 B, saved 70.0%");
        assert_eq!(lines[2], "    empty.png: empty original, savings undefined");
        assert_eq!(lines[3], "Failed (1):");
        assert!(lines[4].starts_with("    c.gif: could not encode WebP"));
    }

    #[test]
    fn summary_of_empty_results() {
        assert_eq!(format_summary(&Results::new()), vec!["0 images converted"]);
    }
}
