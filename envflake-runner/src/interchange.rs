// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The flat interchange artifact between `collect` and `classify`.
//!
//! The artifact is a CSV file with one row per [`CanonicalRecord`] and the header row
//! [`INTERCHANGE_COLUMNS`]. An empty record set is written as a header-only file. A missing
//! line number is an empty field.

use crate::{
    errors::{
        ArtifactKind, InterchangeReadError, InterchangeReadErrorKind, WriteArtifactError,
    },
    record::CanonicalRecord,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use std::{fs::File, io};
use tracing::debug;

/// The columns of the interchange artifact, in order.
pub const INTERCHANGE_COLUMNS: [&str; 5] =
    ["project", "test_name", "outcome", "lineno", "environment"];

/// Writes records to `path`, replacing any existing file atomically.
pub fn write_interchange(
    path: &Utf8Path,
    records: &[CanonicalRecord],
) -> Result<(), WriteArtifactError> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|file| write_interchange_to(file, records))
        .map_err(|err| WriteArtifactError::new(ArtifactKind::Interchange, path, err))?;

    debug!("wrote {} records to `{path}`", records.len());
    Ok(())
}

/// Writes records as interchange CSV to `writer`.
pub fn write_interchange_to<W: io::Write>(
    writer: W,
    records: &[CanonicalRecord],
) -> Result<(), csv::Error> {
    // The header is written explicitly so that an empty record set still has one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(INTERCHANGE_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads all records from the interchange artifact at `path`.
pub fn read_interchange(path: &Utf8Path) -> Result<Vec<CanonicalRecord>, InterchangeReadError> {
    let file = File::open(path).map_err(|err| {
        InterchangeReadError::new(path, InterchangeReadErrorKind::Open(err))
    })?;
    let records =
        read_interchange_from(file).map_err(|kind| InterchangeReadError::new(path, kind))?;

    debug!("read {} records from `{path}`", records.len());
    Ok(records)
}

/// Reads interchange records from `reader`.
///
/// Column order doesn't matter and extra columns are ignored, but every column in
/// [`INTERCHANGE_COLUMNS`] must be present.
pub fn read_interchange_from<R: io::Read>(
    reader: R,
) -> Result<Vec<CanonicalRecord>, InterchangeReadErrorKind> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader.headers()?;
    let missing: Vec<_> = INTERCHANGE_COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();
    if !missing.is_empty() {
        return Err(InterchangeReadErrorKind::MissingColumns { columns: missing });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<CanonicalRecord>, _>>()
        .map_err(InterchangeReadErrorKind::from)
}
