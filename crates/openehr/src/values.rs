//! Scalar conversions shared by the FLAT reader and the result reconstructor.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Renders an instant the way it is submitted in FLAT compositions and AQL parameters.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses an RFC 3339 instant, reading offset-less values as UTC.
///
/// A trailing `Z` is rewritten to `+00:00` first.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let normalised = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(stem) => format!("{stem}+00:00"),
        None => text.to_string(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&normalised, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses a timestamp returned by the clinical-data server.
///
/// Anything [`parse_timestamp`] rejects falls back to `now`, so one bad cell never fails a whole
/// result set.
pub(crate) fn parse_store_timestamp(
    field: &str,
    raw: Option<&Value>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let Some(text) = raw.and_then(Value::as_str) else {
        tracing::warn!(field, "timestamp missing from stored vital signs, using current time");
        return now;
    };

    parse_timestamp(text).unwrap_or_else(|| {
        tracing::warn!(field, value = text, "unparseable stored timestamp, using current time");
        now
    })
}

/// Converts a stored quantity magnitude into an application integer.
///
/// Presence follows truthiness of the stored value: `null`, `false`, numeric zero and `""` come
/// back as `None`, so a genuine reading of zero is indistinguishable from a missing one. Truthy
/// values are converted afterwards: `true` is 1, fractions are truncated (`0.4` and `"0"` become a
/// present 0), and negative or out-of-range values are dropped.
pub(crate) fn present_magnitude(field: &str, raw: Option<&Value>) -> Option<u16> {
    let number = match raw? {
        Value::Null => return None,
        Value::Bool(false) => {
            tracing::warn!(field, "stored magnitude of false treated as absent");
            return None;
        }
        Value::Bool(true) => 1.0,
        Value::Number(n) => {
            let n = n.as_f64()?;
            if n == 0.0 {
                tracing::warn!(field, "stored magnitude of zero treated as absent");
                return None;
            }
            n
        }
        Value::String(s) => {
            if s.is_empty() {
                tracing::warn!(field, "empty stored magnitude treated as absent");
                return None;
            }
            match s.trim().parse::<f64>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(field, value = %s, "non-numeric stored magnitude dropped");
                    return None;
                }
            }
        }
        Value::Object(map) => return present_magnitude(field, map.get("magnitude")),
        other => {
            tracing::warn!(field, value = %other, "unexpected stored magnitude type dropped");
            return None;
        }
    };

    let truncated = number.trunc();
    if !(0.0..=f64::from(u16::MAX)).contains(&truncated) {
        tracing::warn!(field, value = number, "out-of-range stored magnitude dropped");
        return None;
    }

    Some(truncated as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_timestamp_uses_z_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-01T10:00:00Z");
    }

    #[test]
    fn test_parse_accepts_z_offset_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        for raw in [
            "2024-01-01T10:00:00Z",
            "2024-01-01T10:00:00.000Z",
            "2024-01-01T11:00:00+01:00",
            "2024-01-01T10:00:00",
        ] {
            assert_eq!(parse_store_timestamp("t", Some(&json!(raw)), now()), expected, "{raw}");
        }
    }

    #[test]
    fn test_parse_falls_back_to_now() {
        assert_eq!(parse_store_timestamp("t", Some(&json!("yesterday")), now()), now());
        assert_eq!(parse_store_timestamp("t", Some(&json!(12)), now()), now());
        assert_eq!(parse_store_timestamp("t", None, now()), now());
    }

    #[test]
    fn test_present_magnitude_conversions() {
        assert_eq!(present_magnitude("f", Some(&json!(120))), Some(120));
        assert_eq!(present_magnitude("f", Some(&json!(120.9))), Some(120));
        assert_eq!(present_magnitude("f", Some(&json!("80"))), Some(80));
        assert_eq!(present_magnitude("f", Some(&json!({"magnitude": 72, "units": "/min"}))), Some(72));
    }

    #[test]
    fn test_present_magnitude_treats_falsy_values_as_absent() {
        for raw in [json!(0), json!(0.0), json!(""), json!(null), json!(false)] {
            assert_eq!(present_magnitude("f", Some(&raw)), None, "{raw}");
        }
        assert_eq!(present_magnitude("f", None), None);
    }

    #[test]
    fn test_present_magnitude_keeps_truthy_values_that_truncate_to_zero() {
        assert_eq!(present_magnitude("f", Some(&json!("0"))), Some(0));
        assert_eq!(present_magnitude("f", Some(&json!(0.4))), Some(0));
        assert_eq!(present_magnitude("f", Some(&json!(true))), Some(1));
    }

    #[test]
    fn test_parse_timestamp_reads_naive_values_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-01-01T10:00:00Z "), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01"), None);
    }

    #[test]
    fn test_present_magnitude_drops_invalid_values() {
        for raw in [json!(-5), json!(70000), json!("abc"), json!([1])] {
            assert_eq!(present_magnitude("f", Some(&raw)), None, "{raw}");
        }
    }
}
