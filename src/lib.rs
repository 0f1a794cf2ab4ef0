//! # webp-batch
//!
//! Batch conversion of raster images (JPEG, PNG, GIF, BMP, AVIF, HEIC/HEIF)
//! to size-constrained lossy WebP, with per-image compression statistics and
//! single-file or zip export.
//!
//! # Pipeline
//!
//! ```text
//! InputFile ─▶ classify ─▶ [normalize: HEIC → JPEG] ─▶ encode ─▶ Results ─▶ export
//!                 │                                      │
//!                 └─ Unsupported                         ├─ plan_dimensions (never upscale)
//!                                                        └─ WebP at the captured quality
//! ```
//!
//! Files are converted one at a time by [`batch::convert_batch`]. Every
//! failure is local to its file: it is recorded, reported immediately, and
//! the batch carries on.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `InputFile`: bytes, declared MIME type, filename; `Candidate`: an input read on demand |
//! | [`classify`] | Direct / needs HEIC pre-conversion / unsupported, from MIME type and name |
//! | [`normalize`] | HEIC/HEIF → JPEG through a [`imaging::HeicCodec`] |
//! | [`imaging`] | Pixel backend (decode, resample, WebP encode), dimension math, quality |
//! | [`convert`] | One file → one [`results::ConversionRecord`]; the per-file error taxonomy |
//! | [`results`] | Ordered records, failures, savings and totals |
//! | [`export`] | Collision-free output names, zip archive, writing files |
//! | [`batch`] | Sequential batch driver and progress events |
//! | [`config`] | `webp-batch.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Settings Are Captured, Not Referenced
//!
//! Quality lives in a shared [`imaging::QualitySetting`] that may change while
//! a batch runs. The batch reads it once per file, right before that file's
//! encode step, and passes the value down in [`convert::EncodeOptions`]. A
//! change reaches the files that have not started yet and never alters a
//! finished record.
//!
//! ## Optional Codecs
//!
//! HEIC decoding (`heic` feature, system libheif) and zip assembly (`archive`
//! feature, on by default) sit behind traits with "unavailable" stand-ins.
//! A build without them still runs; affected files or exports fail with a
//! `CodecUnavailable` error instead.

pub mod batch;
pub mod classify;
pub mod config;
pub mod convert;
pub mod export;
pub mod imaging;
pub mod normalize;
pub mod output;
pub mod results;
pub mod types;
