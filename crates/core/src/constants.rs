//! Constants used throughout the vitals core crate.
//!
//! Defaults for startup configuration live here alongside the clinical limits, so that the
//! binary, the service and the tests agree on one set of values.

use std::ops::RangeInclusive;

/// Default socket address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8000";

/// Default base URL of the EHRbase REST API.
pub const DEFAULT_EHRBASE_URL: &str = "http://localhost:8080/ehrbase/rest";

/// Default timeout, in seconds, for a single call to the clinical-data server.
pub const DEFAULT_EHRBASE_TIMEOUT_SECS: u64 = 30;

/// Default location of the YAML patient registry.
pub const DEFAULT_PATIENT_REGISTRY: &str = "patients.yaml";

/// Prefix marking a composition uid generated locally after a failed write.
pub const PLACEHOLDER_UID_PREFIX: &str = "pending::";

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Accepted systolic pressure, mmHg.
pub const SYSTOLIC_RANGE: RangeInclusive<i32> = 50..=300;
/// Accepted diastolic pressure, mmHg.
pub const DIASTOLIC_RANGE: RangeInclusive<i32> = 30..=200;
/// Accepted pulse rate, beats per minute.
pub const PULSE_RATE_RANGE: RangeInclusive<i32> = 20..=300;
