//! Reassembly of tabular AQL results into typed records.
//!
//! The clinical-data server answers an AQL query with column descriptors and positional row
//! arrays. Each row is zipped with the column names and read by column alias. The reconstructor
//! is deliberately forgiving: a short row, a missing column or a malformed cell degrades that one
//! value and never fails the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use vitals_types::{CompositionUid, PatientId};

use crate::aql::{
    COLUMN_COMPOSITION_ID, COLUMN_DIASTOLIC, COLUMN_PULSE_RATE, COLUMN_RECORDED_AT,
    COLUMN_SYSTOLIC,
};
use crate::values::{parse_store_timestamp, present_magnitude};
use crate::{OpenEhrError, OpenEhrResult, VitalSignsRecord};

/// Aliases accepted for the recording-time column, in order of preference.
const RECORDED_AT_ALIASES: [&str; 3] = [COLUMN_RECORDED_AT, "start_time", "time"];

/// One column of an AQL result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ColumnDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }
}

/// Column descriptors plus positional rows, as returned by the AQL endpoint.
///
/// Other members of the response (`q`, `meta`) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Parses an AQL response body, reporting the JSON path of any structural error.
    pub fn from_json_str(input: &str) -> OpenEhrResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(input);
        serde_path_to_error::deserialize(de)
            .map_err(|e| OpenEhrError::InvalidQueryResult(e.to_string()))
    }

    /// Parses an already decoded AQL response.
    pub fn from_value(value: Value) -> OpenEhrResult<Self> {
        serde_path_to_error::deserialize(value)
            .map_err(|e| OpenEhrError::InvalidQueryResult(e.to_string()))
    }
}

/// A reconstructed record together with the composition it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredVitalSigns {
    /// Absent when the row carried no usable `composition_id` cell.
    pub composition_uid: Option<CompositionUid>,
    pub record: VitalSignsRecord,
}

/// One page of reconstructed records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconstructedPage {
    pub items: Vec<StoredVitalSigns>,
    /// Number of rows the server returned, before paging.
    pub total: usize,
}

/// Rebuilds one page of records from `result`, using the current time as the timestamp fallback.
pub fn reconstruct(
    result: &QueryResult,
    patient_id: &PatientId,
    skip: usize,
    limit: usize,
) -> ReconstructedPage {
    reconstruct_at(result, patient_id, skip, limit, Utc::now())
}

/// Rebuilds one page of records from `result`.
///
/// Every row is reconstructed in server order, then `skip`/`limit` are applied. `total` is the
/// full row count, not the page length.
pub fn reconstruct_at(
    result: &QueryResult,
    patient_id: &PatientId,
    skip: usize,
    limit: usize,
    now: DateTime<Utc>,
) -> ReconstructedPage {
    let items: Vec<StoredVitalSigns> = result
        .rows
        .iter()
        .map(|row| reconstruct_row(&result.columns, row, patient_id, now))
        .collect();
    let total = items.len();

    ReconstructedPage {
        items: items.into_iter().skip(skip).take(limit).collect(),
        total,
    }
}

fn reconstruct_row(
    columns: &[ColumnDescriptor],
    row: &[Value],
    patient_id: &PatientId,
    now: DateTime<Utc>,
) -> StoredVitalSigns {
    if columns.len() != row.len() {
        tracing::warn!(
            columns = columns.len(),
            values = row.len(),
            "query row width does not match columns, truncating"
        );
    }

    // zip stops at the shorter side
    let cells: HashMap<&str, &Value> = columns
        .iter()
        .map(|c| c.name.as_str())
        .zip(row.iter())
        .collect();

    let composition_uid = cells
        .get(COLUMN_COMPOSITION_ID)
        .and_then(|v| v.as_str())
        .and_then(|s| CompositionUid::new(s).ok());

    let recorded_at = RECORDED_AT_ALIASES
        .iter()
        .find_map(|alias| cells.get(alias).copied());

    let record = VitalSignsRecord::from_store(
        patient_id.clone(),
        None,
        parse_store_timestamp(COLUMN_RECORDED_AT, recorded_at, now),
        present_magnitude(COLUMN_SYSTOLIC, cells.get(COLUMN_SYSTOLIC).copied()),
        present_magnitude(COLUMN_DIASTOLIC, cells.get(COLUMN_DIASTOLIC).copied()),
        present_magnitude(COLUMN_PULSE_RATE, cells.get(COLUMN_PULSE_RATE).copied()),
    );

    StoredVitalSigns {
        composition_uid,
        record,
    }
}
