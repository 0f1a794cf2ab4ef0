//! Conversion results: records, failures and derived statistics.
//!
//! [`Results`] is an append-only, ordered list of [`ConversionRecord`]s. The
//! order is the order the batch finished them in. Records are immutable once
//! created. Statistics such as savings are computed on demand and never
//! stored.
//!
//! Files that failed are kept alongside as [`FailedFile`]s so a batch can be
//! summarised after the fact, in addition to the immediate per-file events.

use crate::convert::{ConvertError, FailureKind};
use crate::export::download_filename;
use crate::imaging::{Dimensions, savings_percent};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a conversion record.
///
/// Drawn from a process-wide counter, so two records never share an id even
/// when they are created in the same instant or held by different
/// [`Results`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(u64);

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

impl RecordId {
    pub fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display handle for a record's WebP payload.
///
/// Shares the payload with the record; the bytes are released when the last
/// handle and the record are dropped. Exports read the record's bytes and
/// leave outstanding handles valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle(Arc<[u8]>);

impl PreviewHandle {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn mime(&self) -> &'static str {
        "image/webp"
    }
}

/// Outcome of one successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionRecord {
    pub id: RecordId,
    pub original_name: String,
    /// Size of the decoded input; for HEIC files, the intermediate JPEG.
    pub original_size: u64,
    pub original_dimensions: Dimensions,
    output: Arc<[u8]>,
    /// Quality used for the encode, in percent.
    pub quality_percent: u32,
    pub output_dimensions: Dimensions,
}

impl ConversionRecord {
    pub fn new(
        id: RecordId,
        original_name: String,
        original_size: u64,
        original_dimensions: Dimensions,
        output: Vec<u8>,
        quality_percent: u32,
        output_dimensions: Dimensions,
    ) -> Self {
        Self {
            id,
            original_name,
            original_size,
            original_dimensions,
            output: output.into(),
            quality_percent,
            output_dimensions,
        }
    }

    /// The encoded WebP payload.
    pub fn output_bytes(&self) -> &[u8] {
        &self.output
    }

    pub fn output_size(&self) -> u64 {
        self.output.len() as u64
    }

    pub fn preview(&self) -> PreviewHandle {
        PreviewHandle(Arc::clone(&self.output))
    }

    /// `(original - output) / original * 100`, or `None` for an empty original.
    pub fn savings_percent(&self) -> Option<f64> {
        savings_percent(self.original_size, self.output_size())
    }

    /// Savings rounded to one decimal place, e.g. `"75.0"`.
    pub fn formatted_savings(&self) -> Option<String> {
        self.savings_percent().map(|s| format!("{s:.1}"))
    }

    pub fn dimensions_changed(&self) -> bool {
        self.original_dimensions != self.output_dimensions
    }

    /// Filename for downloading this record on its own.
    pub fn download_name(&self) -> String {
        download_filename(&self.original_name)
    }

    /// Everything about the record except its payload.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id,
            original_name: self.original_name.clone(),
            download_name: self.download_name(),
            original_size: self.original_size,
            output_size: self.output_size(),
            original_dimensions: self.original_dimensions,
            output_dimensions: self.output_dimensions,
            quality_percent: self.quality_percent,
            savings_percent: self.formatted_savings(),
        }
    }
}

/// A file the batch could not convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ConvertError> for FailedFile {
    fn from(err: &ConvertError) -> Self {
        Self {
            name: err.file_name().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Byte totals across all records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub original: u64,
    pub output: u64,
}

impl Totals {
    pub fn savings_percent(&self) -> Option<f64> {
        savings_percent(self.original, self.output)
    }
}

/// Ordered collection of conversion records and failures.
#[derive(Debug, Default)]
pub struct Results {
    records: Vec<ConversionRecord>,
    failures: Vec<FailedFile>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ConversionRecord) {
        self.records.push(record);
    }

    pub fn find_by_id(&self, id: RecordId) -> Option<&ConversionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All records, in completion order.
    pub fn all(&self) -> &[ConversionRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_failure(&mut self, err: &ConvertError) {
        self.failures.push(FailedFile::from(err));
    }

    pub fn failures(&self) -> &[FailedFile] {
        &self.failures
    }

    /// Drop every record and failure.
    pub fn clear(&mut self) {
        self.records.clear();
        self.failures.clear();
    }

    pub fn totals(&self) -> Totals {
        self.records.iter().fold(
            Totals {
                original: 0,
                output: 0,
            },
            |acc, r| Totals {
                original: acc.original + r.original_size,
                output: acc.output + r.output_size(),
            },
        )
    }

    /// Records whose savings are undefined because the original was empty.
    pub fn anomalies(&self) -> impl Iterator<Item = &ConversionRecord> {
        self.records.iter().filter(|r| r.original_size == 0)
    }

    /// Serializable snapshot of the results, without payload bytes.
    pub fn report(&self) -> Report {
        Report {
            records: self.records.iter().map(ConversionRecord::summary).collect(),
            failures: self.failures.clone(),
        }
    }
}

/// JSON report of a batch.
#[derive(Debug, Serialize)]
pub struct Report {
    pub records: Vec<RecordSummary>,
    pub failures: Vec<FailedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub original_name: String,
    pub download_name: String,
    pub original_size: u64,
    pub output_size: u64,
    pub original_dimensions: Dimensions,
    pub output_dimensions: Dimensions,
    pub quality_percent: u32,
    /// One-decimal savings; `null` when the original was empty.
    pub savings_percent: Option<String>,
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Build a record with a payload of `output_size` bytes.
    pub fn record(name: &str, original_size: u64, output_size: usize) -> ConversionRecord {
        ConversionRecord::new(
            RecordId::next(),
            name.to_string(),
            original_size,
            Dimensions::new(100, 50),
            vec![7u8; output_size],
            85,
            Dimensions::new(100, 50),
        )
    }

    #[test]
    fn savings_rounded_to_one_decimal() {
        let r = record("photo.jpg", 1000, 250);
        assert_eq!(r.formatted_savings().as_deref(), Some("75.0"));

        let r = record("photo.jpg", 3, 1);
        assert_eq!(r.formatted_savings().as_deref(), Some("66.7"));
    }

    #[test]
    fn savings_undefined_for_empty_original() {
        let r = record("empty.png", 0, 10);
        assert_eq!(r.savings_percent(), None);
        assert_eq!(r.formatted_savings(), None);
    }

    #[test]
    fn growth_gives_negative_savings() {
        let r = record("tiny.png", 100, 120);
        assert_eq!(r.formatted_savings().as_deref(), Some("-20.0"));
    }

    #[test]
    fn add_preserves_order_and_counts() {
        let mut results = Results::new();
        results.add(record("b.png", 10, 5));
        results.add(record("a.png", 10, 5));

        assert_eq!(results.count(), 2);
        let names: Vec<&str> = results.all().iter().map(|r| r.original_name.as_str()).collect();
        assert_eq!(names, vec!["b.png", "a.png"]);
    }

    #[test]
    fn find_by_id_hits_and_misses() {
        let mut results = Results::new();
        let r = record("a.png", 10, 5);
        let id = r.id;
        results.add(r);

        assert_eq!(results.find_by_id(id).unwrap().original_name, "a.png");
        assert!(results.find_by_id(RecordId::next()).is_none());
    }

    #[test]
    fn record_ids_are_unique() {
        let ids: std::collections::HashSet<RecordId> = (0..1000).map(|_| RecordId::next()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn preview_outlives_clear() {
        let mut results = Results::new();
        results.add(record("a.png", 10, 4));
        let preview = results.all()[0].preview();

        results.clear();
        assert_eq!(results.count(), 0);
        assert_eq!(preview.bytes(), &[7u8; 4]);
        assert_eq!(preview.mime(), "image/webp");
    }

    #[test]
    fn totals_and_anomalies() {
        let mut results = Results::new();
        results.add(record("a.png", 1000, 250));
        results.add(record("b.png", 0, 50));
        results.add(record("c.png", 1000, 700));

        let totals = results.totals();
        assert_eq!(totals.original, 2000);
        assert_eq!(totals.output, 1000);
        assert_eq!(totals.savings_percent(), Some(50.0));

        let anomalies: Vec<&str> = results.anomalies().map(|r| r.original_name.as_str()).collect();
        assert_eq!(anomalies, vec!["b.png"]);
    }

    #[test]
    fn failures_are_tracked() {
        let mut results = Results::new();
        results.record_failure(&ConvertError::DecodeFailed {
            name: "bad.heic".to_string(),
            reason: "corrupt".to_string(),
        });

        assert_eq!(results.failures().len(), 1);
        assert_eq!(results.failures()[0].kind, FailureKind::DecodeFailed);
        assert_eq!(results.failures()[0].name, "bad.heic");
        assert!(results.is_empty());
    }

    #[test]
    fn report_serializes_without_payload() {
        let mut results = Results::new();
        results.add(record("photo.JPG", 1000, 250));
        let json = serde_json::to_value(results.report()).unwrap();

        let entry = &json["records"][0];
        assert_eq!(entry["download_name"], "photo.webp");
        assert_eq!(entry["savings_percent"], "75.0");
        assert_eq!(entry["output_dimensions"]["width"], 100);
        assert!(entry.get("output").is_none());
        assert_eq!(json["failures"].as_array().unwrap().len(), 0);
    }
}
