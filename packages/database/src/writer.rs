//! Transactional batch writes.

use chrono::{NaiveDateTime, Utc};
use duckdb::Connection;
use grid_ingest_database_models::UpsertCounts;
use grid_ingest_transform_models::CanonicalRecord;

use crate::DbError;
use crate::facts::{FactWriter, Upsert};

/// Upserts `records` through `writer` in a single transaction, stamping new
/// rows with the current UTC time.
///
/// # Errors
///
/// Returns the first [`DbError`] encountered. The transaction is rolled
/// back and nothing from the batch is kept.
pub fn upsert_batch(
    conn: &mut Connection,
    writer: &dyn FactWriter,
    records: &[CanonicalRecord],
) -> Result<UpsertCounts, DbError> {
    upsert_batch_at(conn, writer, records, Utc::now().naive_utc())
}

/// [`upsert_batch`] with an explicit `created_at` for new rows.
///
/// # Errors
///
/// See [`upsert_batch`].
pub fn upsert_batch_at(
    conn: &mut Connection,
    writer: &dyn FactWriter,
    records: &[CanonicalRecord],
    now: NaiveDateTime,
) -> Result<UpsertCounts, DbError> {
    let tx = conn.transaction()?;

    let mut counts = UpsertCounts::default();
    let mut skipped = 0_usize;

    for record in records {
        match writer.upsert_one(&tx, record, now)? {
            Upsert::Inserted => counts.inserted += 1,
            Upsert::Updated => counts.updated += 1,
            Upsert::Skipped => skipped += 1,
        }
    }

    tx.commit()?;

    if skipped > 0 {
        log::warn!(
            "{}: skipped {skipped} records without an entity name",
            writer.name()
        );
    }
    log::debug!(
        "{}: {} inserted, {} updated",
        writer.name(),
        counts.inserted,
        counts.updated
    );

    Ok(counts)
}
