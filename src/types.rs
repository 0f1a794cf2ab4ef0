//! Types shared across pipeline stages.

use crate::classify::mime_for_name;
use std::path::{Path, PathBuf};

/// One user-supplied image: raw bytes, declared MIME type, and filename.
///
/// The pipeline borrows an `InputFile` for the duration of one conversion
/// and keeps nothing from it except the name, size and dimensions recorded
/// on the resulting [`ConversionRecord`](crate::results::ConversionRecord).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Filename as supplied, e.g. `"IMG_0042.HEIC"`.
    pub name: String,
    /// Declared MIME type; empty when the source did not set one.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        Candidate::on_disk(path).load()
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A batch input before its bytes are needed.
///
/// Files on disk are only read when the batch reaches them, so a batch holds
/// at most one file's bytes at a time and unsupported files are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Bytes already in memory.
    Loaded(InputFile),
    /// A path, with name and MIME type derived from it.
    OnDisk {
        path: PathBuf,
        name: String,
        mime: String,
    },
}

impl Candidate {
    /// Unknown extensions get an empty MIME type, like a browser drop of a
    /// file type it does not recognise.
    pub fn on_disk(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime = mime_for_name(&name).unwrap_or_default().to_string();
        Candidate::OnDisk {
            path: path.to_path_buf(),
            name,
            mime,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Candidate::Loaded(file) => &file.name,
            Candidate::OnDisk { name, .. } => name,
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            Candidate::Loaded(file) => &file.mime,
            Candidate::OnDisk { mime, .. } => mime,
        }
    }

    /// The input with its bytes, reading them from disk if needed.
    pub fn load(self) -> std::io::Result<InputFile> {
        match self {
            Candidate::Loaded(file) => Ok(file),
            Candidate::OnDisk { path, name, mime } => {
                let bytes = std::fs::read(&path)?;
                Ok(InputFile::new(name, mime, bytes))
            }
        }
    }
}

impl From<InputFile> for Candidate {
    fn from(file: InputFile) -> Self {
        Candidate::Loaded(file)
    }
}
