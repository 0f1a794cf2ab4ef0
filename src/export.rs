//! Output naming and export: single files, whole batches, zip archives.
//!
//! ## Naming
//!
//! - [`download_filename`]: one record on its own. A trailing
//!   `jpg/jpeg/png/gif/bmp/avif/heic/heif` extension (any case) becomes
//!   `.webp`.
//! - [`build_unique_filename`]: many records into one namespace. The base name
//!   (a trailing image extension, `webp` included, stripped) is counted in a
//!   [`NameCounts`] map; the first occurrence is `base.webp`, later ones are
//!   `base-2.webp`, `base-3.webp`, ...
//!
//! ```text
//! photo.JPG  → photo.webp
//! photo.png  → photo-2.webp      (same counter map)
//! photo.webp → photo-3.webp
//! ```
//!
//! A suffixed name can coincide with another file's plain name (`photo-2.jpg`
//! also wants `photo-2.webp`). The map remembers every name it has handed
//! out and keeps counting past taken ones:
//!
//! ```text
//! photo.jpg   → photo.webp
//! photo-2.jpg → photo-2.webp
//! photo.png   → photo-3.webp     (photo-2.webp is taken)
//! ```
//!
//! Every bulk export (archive or directory) starts from a fresh counter map,
//! so names are unique within one export and independent between exports.
//!
//! ## Archive assembly
//!
//! The zip writer sits behind the [`Archiver`] trait because it may be
//! compiled out (`archive` feature). Exports only read record payloads and
//! never invalidate outstanding [`PreviewHandle`](crate::results::PreviewHandle)s.

use crate::results::{ConversionRecord, Results};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name of the bulk archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "imagenes-webp.zip";

/// Extensions stripped before counting names for bulk export.
const BULK_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "avif", "heic", "heif", "webp",
];

/// Extensions replaced for a single download. `webp` is not among them, so
/// `photo.webp` downloads as `photo.webp.webp`.
const DOWNLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "avif", "heic", "heif"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("the {codec} archive codec is not available")]
    CodecUnavailable { codec: String },
    #[error("nothing to export")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive assembly failed: {0}")]
    Archive(String),
}

/// Occurrences of each base name within one bulk export, plus every
/// filename already issued in it.
#[derive(Debug, Default, Clone)]
pub struct NameCounts {
    counts: HashMap<String, u32>,
    issued: HashSet<String>,
}

impl NameCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value of `base`; 0 if it was never seen.
    pub fn count(&self, base: &str) -> u32 {
        self.counts.get(base).copied().unwrap_or(0)
    }

    pub fn is_issued(&self, filename: &str) -> bool {
        self.issued.contains(filename)
    }
}

/// `name` without a trailing extension from `extensions` (case-insensitive).
fn strip_extension<'a>(name: &'a str, extensions: &[&str]) -> &'a str {
    match name.rsplit_once('.') {
        Some((base, ext)) if extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) => base,
        _ => name,
    }
}

/// Filename for downloading one record on its own.
///
/// Names without a recognized extension get `.webp` appended.
pub fn download_filename(original_name: &str) -> String {
    format!("{}.webp", strip_extension(original_name, DOWNLOAD_EXTENSIONS))
}

/// Collision-free filename for a bulk export, counting into `counts`.
pub fn build_unique_filename(original_name: &str, counts: &mut NameCounts) -> String {
    let base = strip_extension(original_name, BULK_EXTENSIONS);
    let count = counts.counts.entry(base.to_string()).or_insert(0);
    let filename = loop {
        *count += 1;
        let candidate = if *count == 1 {
            format!("{base}.webp")
        } else {
            format!("{base}-{count}.webp")
        };
        if !counts.issued.contains(&candidate) {
            break candidate;
        }
    };
    counts.issued.insert(filename.clone());
    filename
}

/// One named payload going into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry<'a> {
    pub name: String,
    pub bytes: &'a [u8],
}

/// Name every record for one bulk export, in record order.
pub fn bulk_entries(records: &[ConversionRecord]) -> Vec<ArchiveEntry<'_>> {
    let mut counts = NameCounts::new();
    records
        .iter()
        .map(|record| ArchiveEntry {
            name: build_unique_filename(&record.original_name, &mut counts),
            bytes: record.output_bytes(),
        })
        .collect()
}

/// Bundles named payloads into a single archive blob.
pub trait Archiver {
    fn name(&self) -> &'static str;

    /// Whether the archiver can be used in this process.
    fn is_available(&self) -> bool;

    fn assemble(&self, entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>, ExportError>;
}

/// Stand-in used when no archive support is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableArchiver;

impl Archiver for UnavailableArchiver {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn assemble(&self, _entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>, ExportError> {
        Err(ExportError::CodecUnavailable {
            codec: self.name().to_string(),
        })
    }
}

/// Zip archiver. Entries are stored uncompressed since WebP payloads are
/// already compressed.
#[cfg(feature = "archive")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

#[cfg(feature = "archive")]
impl Archiver for ZipArchiver {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn assemble(&self, entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>, ExportError> {
        use std::io::Write;
        use zip::CompressionMethod;
        use zip::write::SimpleFileOptions;

        let zip_err = |e: zip::result::ZipError| ExportError::Archive(e.to_string());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(zip_err)?;
            writer.write_all(entry.bytes)?;
        }
        Ok(writer.finish().map_err(zip_err)?.into_inner())
    }
}

/// The archiver compiled into this build.
pub fn default_archiver() -> Box<dyn Archiver> {
    #[cfg(feature = "archive")]
    {
        Box::new(ZipArchiver)
    }
    #[cfg(not(feature = "archive"))]
    {
        Box::new(UnavailableArchiver)
    }
}

/// Assemble every record into one archive blob.
pub fn build_archive(results: &Results, archiver: &dyn Archiver) -> Result<Vec<u8>, ExportError> {
    if results.is_empty() {
        return Err(ExportError::Empty);
    }
    if !archiver.is_available() {
        return Err(ExportError::CodecUnavailable {
            codec: archiver.name().to_string(),
        });
    }
    let entries = bulk_entries(results.all());
    tracing::debug!(entries = entries.len(), archiver = archiver.name(), "assembling archive");
    archiver.assemble(&entries)
}

/// Write the archive of all records to `dir/archive_name`.
pub fn write_archive(
    results: &Results,
    archiver: &dyn Archiver,
    dir: &Path,
    archive_name: &str,
) -> Result<PathBuf, ExportError> {
    let blob = build_archive(results, archiver)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(archive_name);
    std::fs::write(&path, blob)?;
    Ok(path)
}

/// Write one record to `dir` under its download name.
pub fn write_single(record: &ConversionRecord, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(record.download_name());
    std::fs::write(&path, record.output_bytes())?;
    Ok(path)
}

/// Write every record into `dir` as loose files, named like archive entries.
pub fn write_files(results: &Results, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    bulk_entries(results.all())
        .into_iter()
        .map(|entry| {
            let path = dir.join(&entry.name);
            std::fs::write(&path, entry.bytes)?;
            Ok(path)
        })
        .collect()
}
