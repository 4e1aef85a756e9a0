//! Domain-level carrier for one set of vital-sign readings.
//!
//! [`VitalSignsRecord`] is symmetric with both directions of the mapping layer:
//! - [`crate::flat::FlatCompositionBuilder`] renders it into a FLAT composition;
//! - [`crate::result_set::reconstruct`] and [`crate::flat::read_flat_composition`] rebuild it
//!   from what the clinical-data server returns.
//!
//! Records built by callers go through [`VitalSignsRecord::new`] and always satisfy the presence
//! invariant. Records rebuilt from the server are taken as they come: a stored document with only
//! a systolic value is reported as such rather than rejected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vitals_types::PatientId;

use crate::{OpenEhrError, OpenEhrResult};

/// A complete blood-pressure reading in mmHg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

/// One set of vital signs for a patient at a point in time.
///
/// Immutable once built. Corrections are recorded as new records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VitalSignsRecord {
    patient_id: PatientId,
    encounter_id: Option<String>,
    recorded_at: DateTime<Utc>,
    systolic: Option<u16>,
    diastolic: Option<u16>,
    pulse_rate: Option<u16>,
}

impl VitalSignsRecord {
    /// Builds a record from caller input, enforcing the presence invariant.
    ///
    /// # Errors
    ///
    /// Returns [`OpenEhrError::InvalidInput`] if:
    /// - exactly one of `systolic` / `diastolic` is supplied, or
    /// - neither a blood-pressure pair nor a pulse rate is supplied.
    pub fn new(
        patient_id: PatientId,
        encounter_id: Option<String>,
        recorded_at: DateTime<Utc>,
        systolic: Option<u16>,
        diastolic: Option<u16>,
        pulse_rate: Option<u16>,
    ) -> OpenEhrResult<Self> {
        if systolic.is_some() != diastolic.is_some() {
            return Err(OpenEhrError::InvalidInput(
                "both systolic and diastolic must be provided together".into(),
            ));
        }

        if systolic.is_none() && pulse_rate.is_none() {
            return Err(OpenEhrError::InvalidInput(
                "at least one vital sign must be provided".into(),
            ));
        }

        Ok(Self::from_store(
            patient_id,
            encounter_id,
            recorded_at,
            systolic,
            diastolic,
            pulse_rate,
        ))
    }

    /// Builds a record from stored data without checking the presence invariant.
    pub(crate) fn from_store(
        patient_id: PatientId,
        encounter_id: Option<String>,
        recorded_at: DateTime<Utc>,
        systolic: Option<u16>,
        diastolic: Option<u16>,
        pulse_rate: Option<u16>,
    ) -> Self {
        Self {
            patient_id,
            encounter_id: encounter_id.filter(|e| !e.trim().is_empty()),
            recorded_at,
            systolic,
            diastolic,
            pulse_rate,
        }
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn encounter_id(&self) -> Option<&str> {
        self.encounter_id.as_deref()
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn systolic(&self) -> Option<u16> {
        self.systolic
    }

    pub fn diastolic(&self) -> Option<u16> {
        self.diastolic
    }

    pub fn pulse_rate(&self) -> Option<u16> {
        self.pulse_rate
    }

    /// The blood-pressure pair, only when both values are present.
    pub fn blood_pressure(&self) -> Option<BloodPressure> {
        match (self.systolic, self.diastolic) {
            (Some(systolic), Some(diastolic)) => Some(BloodPressure {
                systolic,
                diastolic,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn patient() -> PatientId {
        PatientId::new("P1").unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_accepts_blood_pressure_only() {
        let record = VitalSignsRecord::new(patient(), None, at(), Some(120), Some(80), None)
            .expect("bp-only record should be valid");
        assert_eq!(
            record.blood_pressure(),
            Some(BloodPressure {
                systolic: 120,
                diastolic: 80
            })
        );
        assert_eq!(record.pulse_rate(), None);
    }

    #[test]
    fn test_new_accepts_pulse_only() {
        let record = VitalSignsRecord::new(patient(), None, at(), None, None, Some(72)).unwrap();
        assert_eq!(record.blood_pressure(), None);
        assert_eq!(record.pulse_rate(), Some(72));
    }

    #[test]
    fn test_new_rejects_half_blood_pressure() {
        for (s, d) in [(Some(120), None), (None, Some(80))] {
            let err = VitalSignsRecord::new(patient(), None, at(), s, d, Some(70))
                .expect_err("half a blood pressure pair should be rejected");
            assert!(
                matches!(err, OpenEhrError::InvalidInput(msg) if msg.contains("together"))
            );
        }
    }

    #[test]
    fn test_new_rejects_record_without_vitals() {
        let err = VitalSignsRecord::new(patient(), None, at(), None, None, None)
            .expect_err("empty record should be rejected");
        assert!(matches!(err, OpenEhrError::InvalidInput(msg) if msg.contains("at least one")));
    }

    #[test]
    fn test_blank_encounter_is_absent() {
        let record =
            VitalSignsRecord::new(patient(), Some("  ".into()), at(), None, None, Some(60))
                .unwrap();
        assert_eq!(record.encounter_id(), None);
    }
}
