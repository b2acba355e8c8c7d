//! Output shape selection and archive building
//!
//! One found document is delivered verbatim; two or more are bundled into a
//! zip archive. Entry timestamps are pinned so identical inputs produce
//! identical archives.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::types::{
    BatchResult, DocumentId, PDF_MIME_TYPE, Packaged, PackagedContent, ZIP_MIME_TYPE,
};

/// Build the deliverable for a fetched batch
///
/// `now` names multi-document archives; it is a parameter so callers and
/// tests control it.
///
/// # Errors
///
/// * [`Error::AllDocumentsUnavailable`] when no document was found
/// * [`Error::Archive`] / [`Error::Io`] when the zip cannot be written
pub fn package(batch: &BatchResult, now: DateTime<Utc>) -> Result<Packaged> {
    let found = batch.found();
    let missing = batch.missing();

    let content = match found.as_slice() {
        [] => {
            return Err(Error::AllDocumentsUnavailable {
                document_ids: missing,
            });
        }
        [(id, bytes)] => PackagedContent {
            file_name: document_file_name(id),
            bytes: bytes.to_vec(),
            mime_type: PDF_MIME_TYPE,
        },
        documents => PackagedContent {
            file_name: archive_file_name(now),
            bytes: build_archive(documents)?,
            mime_type: ZIP_MIME_TYPE,
        },
    };

    tracing::debug!(
        file_name = %content.file_name,
        size_bytes = content.bytes.len(),
        documents = found.len(),
        missing = missing.len(),
        "Packaged documents"
    );

    Ok(Packaged { content, missing })
}

/// `document_{id}.pdf` with unsafe identifier characters replaced
pub fn document_file_name(id: &DocumentId) -> String {
    format!("document_{}.pdf", sanitize(id.as_str()))
}

/// `documents_{YYYYMMDD_HHMMSS}.zip` in UTC
pub fn archive_file_name(now: DateTime<Utc>) -> String {
    format!("documents_{}.zip", now.format("%Y%m%d_%H%M%S"))
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Zip the documents in the given order, one entry each
fn build_archive(documents: &[(&DocumentId, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut used_names = HashSet::with_capacity(documents.len());
    for (id, bytes) in documents {
        let name = unique_entry_name(document_file_name(id), &mut used_names);
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Suffix `_{n}` onto names already present in the archive
fn unique_entry_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }

    let stem = name.trim_end_matches(".pdf");
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}.pdf");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
