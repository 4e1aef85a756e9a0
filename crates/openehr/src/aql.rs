//! Predefined AQL templates and their selection.
//!
//! The templates are fixed strings with named `$` placeholders. Values are only ever bound through
//! `query_parameters`; nothing here concatenates caller input into query text.
//!
//! Both templates order rows by composition start time, newest first. The result reconstructor
//! relies on that order for paging but does not re-sort.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use vitals_types::EhrId;

use crate::values::format_timestamp;

/// Column alias for the composition uid.
pub const COLUMN_COMPOSITION_ID: &str = "composition_id";
/// Column alias for the recording time.
pub const COLUMN_RECORDED_AT: &str = "recorded_at";
pub const COLUMN_SYSTOLIC: &str = "systolic";
pub const COLUMN_DIASTOLIC: &str = "diastolic";
pub const COLUMN_PULSE_RATE: &str = "pulse_rate";

pub const PARAM_EHR_ID: &str = "ehr_id";
pub const PARAM_FROM_DATE: &str = "from_date";
pub const PARAM_TO_DATE: &str = "to_date";

/// All vital signs (blood pressure and pulse) in one EHR.
pub const VITAL_SIGNS_QUERY: &str = "\
SELECT
    c/uid/value as composition_id,
    c/context/start_time/value as recorded_at,
    bp/data[at0001]/events[at0006]/data[at0003]/items[at0004]/value/magnitude as systolic,
    bp/data[at0001]/events[at0006]/data[at0003]/items[at0005]/value/magnitude as diastolic,
    pulse/data[at0002]/events[at0003]/data[at0001]/items[at0004]/value/magnitude as pulse_rate
FROM EHR e
CONTAINS COMPOSITION c
CONTAINS (
    OBSERVATION bp[openEHR-EHR-OBSERVATION.blood_pressure.v1] OR
    OBSERVATION pulse[openEHR-EHR-OBSERVATION.pulse.v1]
)
WHERE e/ehr_id/value = $ehr_id
ORDER BY c/context/start_time/value DESC
";

/// Vital signs in one EHR within an inclusive recording-time window.
pub const VITAL_SIGNS_DATE_RANGE_QUERY: &str = "\
SELECT
    c/uid/value as composition_id,
    c/context/start_time/value as recorded_at,
    bp/data[at0001]/events[at0006]/data[at0003]/items[at0004]/value/magnitude as systolic,
    bp/data[at0001]/events[at0006]/data[at0003]/items[at0005]/value/magnitude as diastolic,
    pulse/data[at0002]/events[at0003]/data[at0001]/items[at0004]/value/magnitude as pulse_rate
FROM EHR e
CONTAINS COMPOSITION c
CONTAINS (
    OBSERVATION bp[openEHR-EHR-OBSERVATION.blood_pressure.v1] OR
    OBSERVATION pulse[openEHR-EHR-OBSERVATION.pulse.v1]
)
WHERE e/ehr_id/value = $ehr_id
AND c/context/start_time/value >= $from_date
AND c/context/start_time/value <= $to_date
ORDER BY c/context/start_time/value DESC
";

/// A query template with its bound parameters.
///
/// Serialises to the body expected by the openEHR REST `POST /query/aql` endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AqlQuery {
    pub q: &'static str,
    pub query_parameters: Map<String, Value>,
}

impl AqlQuery {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.query_parameters.get(name).and_then(Value::as_str)
    }

    pub fn is_date_bounded(&self) -> bool {
        self.q == VITAL_SIGNS_DATE_RANGE_QUERY
    }
}

/// Chooses the vital-signs query for an EHR and binds its parameters.
///
/// The date-bounded template is used only when both bounds are supplied; a single bound is
/// ignored and the unbounded template is used.
pub fn select_vital_signs_query(
    ehr_id: &EhrId,
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
) -> AqlQuery {
    let mut query_parameters = Map::new();
    query_parameters.insert(PARAM_EHR_ID.into(), Value::String(ehr_id.to_string()));

    let q = match (from_date, to_date) {
        (Some(from), Some(to)) => {
            query_parameters.insert(PARAM_FROM_DATE.into(), Value::String(format_timestamp(from)));
            query_parameters.insert(PARAM_TO_DATE.into(), Value::String(format_timestamp(to)));
            VITAL_SIGNS_DATE_RANGE_QUERY
        }
        _ => VITAL_SIGNS_QUERY,
    };

    tracing::debug!(
        ehr_id = %ehr_id,
        date_bounded = query_parameters.len() == 3,
        "selected vital signs query"
    );

    AqlQuery {
        q,
        query_parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{BLOOD_PRESSURE, CONCEPTS, PULSE};
    use chrono::TimeZone;

    fn ehr() -> EhrId {
        EhrId::new("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap()
    }

    #[test]
    fn test_unbounded_query_binds_only_ehr_id() {
        let query = select_vital_signs_query(&ehr(), None, None);
        assert_eq!(query.q, VITAL_SIGNS_QUERY);
        assert!(!query.is_date_bounded());
        assert_eq!(query.query_parameters.len(), 1);
        assert_eq!(
            query.parameter(PARAM_EHR_ID),
            Some("7d44b88c-4199-4bad-97dc-d78268e01398")
        );
    }

    #[test]
    fn test_single_bound_uses_unbounded_query() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(!select_vital_signs_query(&ehr(), Some(from), None).is_date_bounded());
        assert!(!select_vital_signs_query(&ehr(), None, Some(from)).is_date_bounded());
    }

    #[test]
    fn test_date_range_query_binds_iso_bounds() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let query = select_vital_signs_query(&ehr(), Some(from), Some(to));

        assert!(query.is_date_bounded());
        assert_eq!(query.query_parameters.len(), 3);
        assert_eq!(query.parameter(PARAM_FROM_DATE), Some("2024-01-01T00:00:00Z"));
        assert_eq!(query.parameter(PARAM_TO_DATE), Some("2024-01-31T23:59:59Z"));
    }

    #[test]
    fn test_ehr_id_is_never_spliced_into_query_text() {
        let hostile = EhrId::new("x' OR 1=1 --").unwrap();
        let query = select_vital_signs_query(&hostile, None, None);
        assert!(!query.q.contains("OR 1=1"));
        assert_eq!(query.parameter(PARAM_EHR_ID), Some("x' OR 1=1 --"));
    }

    #[test]
    fn test_templates_select_every_mapped_path_and_archetype() {
        for template in [VITAL_SIGNS_QUERY, VITAL_SIGNS_DATE_RANGE_QUERY] {
            for c in CONCEPTS {
                assert!(template.contains(c.archetype_id), "{}", c.archetype_id);
                for f in c.fields {
                    let selected = format!("{} as {}", f.archetype_path(), f.field);
                    assert!(template.contains(&selected), "{selected}");
                }
            }
            assert!(template.contains("ORDER BY c/context/start_time/value DESC"));
        }
        assert!(VITAL_SIGNS_QUERY.contains(&format!("bp{}", BLOOD_PRESSURE.fields[0].archetype_path())));
        assert!(VITAL_SIGNS_QUERY.contains(&format!("pulse{}", PULSE.fields[0].archetype_path())));
    }

    #[test]
    fn test_serialises_as_rest_query_body() {
        let body = serde_json::to_value(select_vital_signs_query(&ehr(), None, None)).unwrap();
        assert_eq!(body["q"], VITAL_SIGNS_QUERY);
        assert_eq!(body["query_parameters"]["ehr_id"], "7d44b88c-4199-4bad-97dc-d78268e01398");
    }
}
