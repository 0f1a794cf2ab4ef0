//! Sequential batch driver.
//!
//! Takes the candidate files of one batch, filters them through the
//! classifier, and converts the accepted ones one at a time:
//!
//! ```text
//! candidates ──classify──▶ rejected ──▶ one Unsupported event for the batch
//!   (name, MIME)  │
//!                 ▼ accepted, in input order
//!               load bytes
//!   ┌─ NeedsHeicNormalization ──normalize──┐
//!   │                                      ▼
//!   └─ Direct ───────────────────────▶ read quality ──encode──▶ Results::add
//!                                          (by value)
//! ```
//!
//! Classification needs only names and MIME types. Bytes of an on-disk
//! [`Candidate`] are read when the loop reaches it and dropped when its
//! conversion ends, so rejected files are never read and at most one input
//! and one decoded surface are alive at a time. A file that cannot be read
//! fails as `DecodeFailed`.
//!
//! A file is fully finished (record or failure) before the next one starts,
//! and the record order is the input order of the accepted files. Every
//! failure is local to its file: it is recorded in [`Results`], sent as a
//! [`BatchEvent::Failed`] at once, and the loop moves on.
//!
//! The shared [`QualitySetting`] is read once per file, right before its
//! encode step. Updates made while the batch runs reach the files that have
//! not started yet and nothing else.

use crate::classify::{FormatClass, classify};
use crate::convert::{ConvertError, EncodeOptions, encode};
use crate::imaging::{HeicCodec, ImageBackend, QualitySetting};
use crate::normalize::normalize;
use crate::results::{ConversionRecord, FailedFile, RecordSummary, Results};
use crate::types::{Candidate, InputFile};
use std::sync::mpsc::Sender;

/// Progress notifications, sent as they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// Classification is done; `total` files will be converted.
    Started { total: usize },
    /// Files rejected by the classifier, reported once per batch.
    Unsupported { files: Vec<Rejected> },
    /// File `index` (1-based, of `total`) was converted.
    Converted {
        index: usize,
        total: usize,
        record: RecordSummary,
    },
    /// File `index` (1-based, of `total`) failed and was skipped.
    Failed {
        index: usize,
        total: usize,
        failure: FailedFile,
    },
    Finished(BatchSummary),
}

/// A file the classifier turned away, with the MIME type it declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub name: String,
    pub mime: String,
}

/// Counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub converted: usize,
    pub failed: usize,
    pub unsupported: usize,
}

/// Everything a conversion needs besides the pixel backend.
pub struct BatchContext<'a> {
    pub heic: &'a dyn HeicCodec,
    pub quality: &'a QualitySetting,
    pub max_dimension: u32,
}

fn send(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A closed receiver only means nobody is listening.
        tx.send(event).ok();
    }
}

/// Convert one accepted file: normalize if needed, then encode.
pub fn convert_one(
    backend: &impl ImageBackend,
    ctx: &BatchContext<'_>,
    file: &InputFile,
    class: FormatClass,
) -> Result<ConversionRecord, ConvertError> {
    let normalized;
    let decodable = match class {
        FormatClass::Direct => file,
        FormatClass::NeedsHeicNormalization => {
            normalized = normalize(ctx.heic, file)?;
            &normalized
        }
        FormatClass::Unsupported => {
            return Err(ConvertError::UnsupportedFormat {
                name: file.name.clone(),
                mime: file.mime.clone(),
            });
        }
    };

    let options = EncodeOptions {
        quality: ctx.quality.get(),
        max_dimension: ctx.max_dimension,
    };
    encode(backend, decodable, options)
}

/// Read the bytes of an accepted candidate.
fn load(candidate: Candidate) -> Result<InputFile, ConvertError> {
    let name = candidate.name().to_string();
    candidate.load().map_err(|e| ConvertError::DecodeFailed {
        name,
        reason: format!("could not read file: {e}"),
    })
}

/// Convert a batch of files, appending to `results`.
///
/// Accepts in-memory [`InputFile`]s or lazily read [`Candidate`]s.
pub fn convert_batch<C: Into<Candidate>>(
    backend: &impl ImageBackend,
    ctx: &BatchContext<'_>,
    files: impl IntoIterator<Item = C>,
    results: &mut Results,
    events: Option<Sender<BatchEvent>>,
) -> BatchSummary {
    let events = events.as_ref();
    let mut summary = BatchSummary::default();

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for candidate in files {
        let candidate: Candidate = candidate.into();
        match classify(candidate.mime(), candidate.name()) {
            FormatClass::Unsupported => rejected.push(Rejected {
                name: candidate.name().to_string(),
                mime: candidate.mime().to_string(),
            }),
            class => accepted.push((candidate, class)),
        }
    }

    if !rejected.is_empty() {
        summary.unsupported = rejected.len();
        tracing::warn!(count = rejected.len(), "skipping files with unsupported formats");
        for file in &rejected {
            results.record_failure(&ConvertError::UnsupportedFormat {
                name: file.name.clone(),
                mime: file.mime.clone(),
            });
        }
        send(events, BatchEvent::Unsupported { files: rejected });
    }

    let total = accepted.len();
    tracing::info!(total, "starting batch");
    send(events, BatchEvent::Started { total });

    for (i, (candidate, class)) in accepted.into_iter().enumerate() {
        let index = i + 1;
        let name = candidate.name().to_string();
        let outcome = load(candidate).and_then(|file| convert_one(backend, ctx, &file, class));
        match outcome {
            Ok(record) => {
                summary.converted += 1;
                send(
                    events,
                    BatchEvent::Converted {
                        index,
                        total,
                        record: record.summary(),
                    },
                );
                results.add(record);
            }
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(file = %name, kind = ?err.kind(), "{err}");
                results.record_failure(&err);
                send(
                    events,
                    BatchEvent::Failed {
                        index,
                        total,
                        failure: FailedFile::from(&err),
                    },
                );
            }
        }
    }

    tracing::info!(
        converted = summary.converted,
        failed = summary.failed,
        unsupported = summary.unsupported,
        "batch finished"
    );
    send(events, BatchEvent::Finished(summary));
    summary
}
