//! Export of completed batch files.
//!
//! The artifacts are placeholders: a PDF header line and a DWG marker per
//! completed file, bundled in a zip with a small manifest.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;
use crate::model::{base_name, BatchJob, BatchJobFile, ProcessingStatus};

/// Number of artifacts projected per completed file (PDF, DWG, LISP).
const ARTIFACTS_PER_FILE: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFormats {
    pub dwg: u32,
    pub pdf: u32,
    pub lisp: u32,
}

/// What a download of the job would contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub job_id: String,
    pub job_name: String,
    pub total_files: u32,
    pub formats: ExportFormats,
    pub download_url: String,
    pub total_size: u64,
}

/// `manifest.json` inside the archive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveManifest<'a> {
    job_id: &'a str,
    job_name: &'a str,
    count: usize,
    generated_at: DateTime<Utc>,
}

pub fn download_url(job_id: &str) -> String {
    format!("/api/bridge/download/{}", job_id)
}

pub fn archive_file_name(job_id: &str) -> String {
    format!("bridge_exports_{}.zip", job_id)
}

fn completed(files: &[BatchJobFile]) -> impl Iterator<Item = &BatchJobFile> {
    files
        .iter()
        .filter(|f| f.status == ProcessingStatus::Completed)
}

pub fn export_manifest(job: &BatchJob, files: &[BatchJobFile]) -> ExportManifest {
    // Sizes are client-reported, so the totals saturate instead of wrapping.
    let (count, bytes) = completed(files).fold((0u32, 0u64), |(n, size), f| {
        (n + 1, size.saturating_add(f.file_size))
    });

    ExportManifest {
        job_id: job.id.clone(),
        job_name: job.name.clone(),
        total_files: count,
        formats: ExportFormats {
            dwg: count,
            pdf: count,
            lisp: count,
        },
        download_url: download_url(&job.id),
        total_size: bytes.saturating_mul(ARTIFACTS_PER_FILE),
    }
}

pub fn placeholder_pdf(base: &str) -> String {
    format!("%PDF-1.4\n% Placeholder PDF for {}\n", base)
}

pub fn placeholder_dwg(base: &str) -> String {
    format!("Placeholder DWG binary for {}\n", base)
}

/// Reserves an entry stem, suffixing `_2`, `_3`, ... when `base` is taken.
fn unique_stem(used: &mut HashSet<String>, base: &str) -> String {
    let mut stem = base.to_string();
    let mut n = 1;
    while !used.insert(stem.clone()) {
        n += 1;
        stem = format!("{}_{}", base, n);
    }
    stem
}

/// Builds the zip archive for a job's completed files.
///
/// Files sharing a base name get distinct entries in upload order.
pub fn build_archive(job: &BatchJob, files: &[BatchJobFile]) -> Result<Vec<u8>, ExportError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let mut used = HashSet::new();
    let mut count = 0;
    for file in completed(files) {
        let base = base_name(&file.file_name);
        let stem = unique_stem(&mut used, base);

        zip.start_file(format!("{}.pdf", stem), options)?;
        zip.write_all(placeholder_pdf(base).as_bytes())?;

        zip.start_file(format!("{}.dwg", stem), options)?;
        zip.write_all(placeholder_dwg(base).as_bytes())?;

        count += 1;
    }

    let manifest = ArchiveManifest {
        job_id: &job.id,
        job_name: &job.name,
        count,
        generated_at: Utc::now(),
    };
    zip.start_file("manifest.json", options)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

    let cursor = zip.finish()?;
    log::debug!("Built archive for job {} with {} files", job.id, count);
    Ok(cursor.into_inner())
}
