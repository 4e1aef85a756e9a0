//! Clinical input validation.
//!
//! Runs before any external call. On success the request becomes a [`VitalSignsRecord`], which
//! also enforces the presence rules (a complete blood-pressure pair, at least one vital sign).

use chrono::{DateTime, Utc};
use openehr::VitalSignsRecord;
use std::ops::RangeInclusive;

use crate::constants::{DIASTOLIC_RANGE, PULSE_RATE_RANGE, SYSTOLIC_RANGE};
use crate::models::VitalSignsCreate;
use crate::{VitalsError, VitalsResult};

fn in_range(
    field: &str,
    unit: &str,
    value: Option<i32>,
    range: RangeInclusive<i32>,
) -> VitalsResult<Option<u16>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if !range.contains(&value) {
        return Err(VitalsError::Validation(format!(
            "{field} must be between {} and {} {unit}, got {value}",
            range.start(),
            range.end()
        )));
    }
    u16::try_from(value)
        .map(Some)
        .map_err(|_| VitalsError::Validation(format!("{field} is out of range")))
}

/// Validates `request` against clinical limits and the clock `now`.
pub fn validate_vital_signs(
    request: &VitalSignsCreate,
    now: DateTime<Utc>,
) -> VitalsResult<VitalSignsRecord> {
    if request.recorded_at > now {
        return Err(VitalsError::Validation(
            "recorded_at cannot be in the future".into(),
        ));
    }

    let systolic = in_range("systolic", "mmHg", request.systolic, SYSTOLIC_RANGE)?;
    let diastolic = in_range("diastolic", "mmHg", request.diastolic, DIASTOLIC_RANGE)?;
    let pulse_rate = in_range("pulse_rate", "/min", request.pulse_rate, PULSE_RATE_RANGE)?;

    Ok(VitalSignsRecord::new(
        request.patient_id.clone(),
        request.encounter_id.clone(),
        request.recorded_at,
        systolic,
        diastolic,
        pulse_rate,
    )?)
}
