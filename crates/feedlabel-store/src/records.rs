//! Queries against the `sorun_bildir` feedback table.
//!
//! Every statement binds its values; nothing user-supplied is formatted into
//! SQL. Rows come back as Arrow batches and are decoded into [`Record`]s.

use arrow::array::{Array, Int64Array, LargeStringArray, StringArray, StringViewArray};
use chrono::{NaiveDate, NaiveDateTime};
use feedlabel_core::{Label, NewRecord, Record};
use tracing::{debug, info};

use crate::{Connect, Param, ResilientStore, RowSet, StoreError};

pub const TABLE: &str = "sorun_bildir";

const CREATE_SEQUENCE: &str = "CREATE SEQUENCE IF NOT EXISTS sorun_bildir_id_seq START 1";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS sorun_bildir (
    id BIGINT PRIMARY KEY DEFAULT nextval('sorun_bildir_id_seq'),
    ogrenciId BIGINT NOT NULL,
    dersId BIGINT NOT NULL,
    secenekId BIGINT NOT NULL,
    icerikId BIGINT NOT NULL,
    sorun VARCHAR NOT NULL,
    durum BIGINT NOT NULL,
    tip VARCHAR NOT NULL,
    mobil BIGINT,
    aciklama BIGINT,
    tarih TIMESTAMP NOT NULL
)";

/// Projection shared by every read. Older rows may lack the category
/// columns, so they default instead of failing the whole result.
const SELECT_RECORD: &str = "SELECT
    id::BIGINT AS id,
    COALESCE(ogrenciId, 0)::BIGINT AS ogrenci_id,
    COALESCE(dersId, 0)::BIGINT AS ders_id,
    COALESCE(secenekId, 0)::BIGINT AS secenek_id,
    COALESCE(icerikId, 0)::BIGINT AS icerik_id,
    sorun::VARCHAR AS sorun,
    COALESCE(durum, 0)::BIGINT AS durum,
    COALESCE(tip, '')::VARCHAR AS tip,
    COALESCE(mobil, 0)::BIGINT AS mobil,
    strftime(tarih, '%Y-%m-%d %H:%M:%S') AS tarih,
    aciklama::BIGINT AS aciklama
FROM sorun_bildir";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Create the feedback table and its id sequence if they do not exist.
pub fn ensure_schema<C: Connect>(store: &ResilientStore<C>) -> Result<(), StoreError> {
    store.execute_write(CREATE_SEQUENCE, &[])?;
    store.execute_write(CREATE_TABLE, &[])?;
    info!(table = TABLE, "schema ready");
    Ok(())
}

/// All records created on `day`, in row order.
pub fn fetch_by_day<C: Connect>(
    store: &ResilientStore<C>,
    day: NaiveDate,
) -> Result<Vec<Record>, StoreError> {
    let sql = format!("{SELECT_RECORD} WHERE CAST(tarih AS DATE) = CAST(? AS DATE) ORDER BY id");
    let rows = store.execute(&sql, &[Param::Text(day.format("%Y-%m-%d").to_string())])?;
    let records = decode_records(&rows)?;
    debug!(%day, count = records.len(), "fetched records for day");
    Ok(records)
}

/// The record with `id`, or `None` if there is no such row.
pub fn fetch_by_id<C: Connect>(
    store: &ResilientStore<C>,
    id: i64,
) -> Result<Option<Record>, StoreError> {
    let sql = format!("{SELECT_RECORD} WHERE id = ?");
    let rows = store.execute(&sql, &[Param::Int(id)])?;
    Ok(decode_records(&rows)?.into_iter().next())
}

/// Insert a record and return it as persisted.
pub fn insert<C: Connect>(
    store: &ResilientStore<C>,
    record: &NewRecord,
    label: Option<Label>,
    created_at: NaiveDateTime,
) -> Result<Record, StoreError> {
    // Not replayed on connection loss: the first attempt may have landed, and
    // a second run would add a duplicate row.
    let rows = store.execute_once(
        "INSERT INTO sorun_bildir
            (ogrenciId, dersId, secenekId, icerikId, sorun, durum, tip, mobil, aciklama, tarih)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))
         RETURNING id::BIGINT AS id",
        &[
            Param::Int(record.student_id),
            Param::Int(record.course_id),
            Param::Int(record.option_id),
            Param::Int(record.content_id),
            Param::Text(record.subject.clone()),
            Param::Int(record.status),
            Param::Text(record.kind.clone()),
            Param::Int(record.mobile),
            label_param(label),
            Param::Text(created_at.format(TIMESTAMP_FORMAT).to_string()),
        ],
    )?;

    let id = rows
        .iter()
        .find(|b| b.num_rows() > 0)
        .and_then(|b| get_i64(b.column(0).as_ref(), 0))
        .ok_or_else(|| StoreError::Decode("insert returned no id".into()))?;

    debug!(id, "inserted record");
    fetch_by_id(store, id)?
        .ok_or_else(|| StoreError::Decode(format!("inserted record {id} not readable")))
}

/// Write a computed label back to an existing record.
pub fn update_label<C: Connect>(
    store: &ResilientStore<C>,
    id: i64,
    label: Label,
) -> Result<(), StoreError> {
    store.execute_write(
        "UPDATE sorun_bildir SET aciklama = ? WHERE id = ?",
        &[label_param(Some(label)), Param::Int(id)],
    )
}

fn label_param(label: Option<Label>) -> Param {
    match label {
        Some(label) => Param::Int(label.index() as i64),
        None => Param::Null,
    }
}

// ── Arrow decoding ──

/// Decode rows produced by [`SELECT_RECORD`].
pub fn decode_records(batches: &RowSet) -> Result<Vec<Record>, StoreError> {
    let mut records = Vec::new();
    for batch in batches {
        let col = |name: &str| {
            batch
                .column_by_name(name)
                .ok_or_else(|| StoreError::Decode(format!("missing '{name}' column")))
        };
        let id = col("id")?;
        let student = col("ogrenci_id")?;
        let course = col("ders_id")?;
        let option = col("secenek_id")?;
        let content = col("icerik_id")?;
        let subject = col("sorun")?;
        let status = col("durum")?;
        let kind = col("tip")?;
        let mobile = col("mobil")?;
        let created = col("tarih")?;
        let label_col = col("aciklama")?;

        for row in 0..batch.num_rows() {
            let req_i64 = |arr: &dyn Array, name: &str| {
                get_i64(arr, row).ok_or_else(|| {
                    StoreError::Decode(format!("null or non-integer '{name}' at row {row}"))
                })
            };
            let req_str = |arr: &dyn Array, name: &str| {
                get_string(arr, row).ok_or_else(|| {
                    StoreError::Decode(format!("null or non-text '{name}' at row {row}"))
                })
            };

            let label = match get_i64(label_col.as_ref(), row) {
                None => None,
                Some(v) => Some(Label(usize::try_from(v).map_err(|_| {
                    StoreError::Decode(format!("negative label {v} at row {row}"))
                })?)),
            };

            records.push(Record {
                id: req_i64(id.as_ref(), "id")?,
                student_id: req_i64(student.as_ref(), "ogrenci_id")?,
                course_id: req_i64(course.as_ref(), "ders_id")?,
                option_id: req_i64(option.as_ref(), "secenek_id")?,
                content_id: req_i64(content.as_ref(), "icerik_id")?,
                subject: req_str(subject.as_ref(), "sorun")?,
                status: req_i64(status.as_ref(), "durum")?,
                kind: req_str(kind.as_ref(), "tip")?,
                mobile: req_i64(mobile.as_ref(), "mobil")?,
                created_at: req_str(created.as_ref(), "tarih")?,
                label,
            });
        }
    }
    Ok(records)
}

fn get_i64(col: &dyn Array, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<Int64Array>()
        .map(|arr| arr.value(row))
}

/// Extract a string value (handles Utf8, LargeUtf8 and Utf8View).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
        .or_else(|| {
            col.as_any()
                .downcast_ref::<StringViewArray>()
                .map(|arr| arr.value(row).to_string())
        })
}
