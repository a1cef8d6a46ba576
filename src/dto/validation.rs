//! Validation helpers for DTOs.

use serde_json::Value;
use time::{Date, Time, macros::format_description};
use uuid::Uuid;
use validator::ValidationError;

use crate::error::ServiceError;

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects empty or whitespace-only strings.
pub fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "value must not be blank".into()));
    }
    Ok(())
}

/// Accepts calendar dates written `YYYY-MM-DD`.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map(|_| ())
        .map_err(|err| invalid("date_format", format!("`{value}` is not a YYYY-MM-DD date: {err}")))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn validate_time(value: &str) -> Result<(), ValidationError> {
    normalize_time(value)
        .map(|_| ())
        .ok_or_else(|| invalid("time_format", format!("`{value}` is not an HH:MM time")))
}

/// Normalise a start time to `HH:MM`, dropping trailing seconds.
pub fn normalize_time(value: &str) -> Option<String> {
    let value = value.trim();
    let parsed = Time::parse(value, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(value, format_description!("[hour]:[minute]:[second]")))
        .ok()?;
    Some(format!("{:02}:{:02}", parsed.hour(), parsed.minute()))
}

/// Accepts match durations `MM:SS`; minutes may exceed 59.
pub fn validate_duration(value: &str) -> Result<(), ValidationError> {
    let well_formed = value.split_once(':').is_some_and(|(minutes, seconds)| {
        minutes.len() >= 2
            && minutes.bytes().all(|b| b.is_ascii_digit())
            && seconds.len() == 2
            && seconds.parse::<u8>().is_ok_and(|secs| secs < 60)
    });

    if well_formed {
        Ok(())
    } else {
        Err(invalid(
            "duration_format",
            format!("`{value}` is not an MM:SS duration"),
        ))
    }
}

/// Coerce a loosely typed counter to a non-negative integer.
///
/// Negative, non-numeric and missing values become 0; fractions truncate; numeric strings
/// are parsed; values beyond `u32::MAX` saturate.
pub fn coerce_stat_value(value: &Value) -> u32 {
    match value {
        Value::Number(number) => match (number.as_u64(), number.as_f64()) {
            (Some(whole), _) => u32::try_from(whole).unwrap_or(u32::MAX),
            (None, Some(float)) => clamp_float(float),
            (None, None) => 0,
        },
        Value::String(text) => text.trim().parse::<f64>().map_or(0, clamp_float),
        _ => 0,
    }
}

fn clamp_float(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value.trunc() as u32
    }
}

/// Parse a required identifier taken from the query string.
pub fn parse_id(name: &str, value: Option<&str>) -> Result<Uuid, ServiceError> {
    let raw = value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput(format!("missing `{name}`")))?;
    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::InvalidInput(format!("`{name}` is not a valid id: `{raw}`")))
}

/// Parse an optional identifier; blank counts as absent.
pub fn parse_optional_id(name: &str, value: Option<&str>) -> Result<Option<Uuid>, ServiceError> {
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_id(name, Some(raw)).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_strings_rejected() {
        assert!(validate_non_blank("Gym").is_ok());
        assert!(validate_non_blank("   ").is_err());
        assert!(validate_non_blank("").is_err());
    }

    #[test]
    fn dates_and_times() {
        assert!(validate_date("2026-10-18").is_ok());
        assert!(validate_date("2026-13-01").is_err());
        assert!(validate_date("18/10/2026").is_err());

        assert_eq!(normalize_time("18:30").as_deref(), Some("18:30"));
        assert_eq!(normalize_time("18:30:00").as_deref(), Some("18:30"));
        assert!(validate_time("25:00").is_err());
        assert!(validate_time("soon").is_err());
    }

    #[test]
    fn durations() {
        assert!(validate_duration("05:00").is_ok());
        assert!(validate_duration("75:00").is_ok());
        assert!(validate_duration("100:59").is_ok());
        assert!(validate_duration("5:00").is_err());
        assert!(validate_duration("05:60").is_err());
        assert!(validate_duration("05-00").is_err());
    }

    #[test]
    fn stat_values_are_clamped() {
        assert_eq!(coerce_stat_value(&json!(12)), 12);
        assert_eq!(coerce_stat_value(&json!(-4)), 0);
        assert_eq!(coerce_stat_value(&json!(3.9)), 3);
        assert_eq!(coerce_stat_value(&json!("7")), 7);
        assert_eq!(coerce_stat_value(&json!(" 2.5 ")), 2);
        assert_eq!(coerce_stat_value(&json!("many")), 0);
        assert_eq!(coerce_stat_value(&json!(null)), 0);
        assert_eq!(coerce_stat_value(&json!(true)), 0);
        assert_eq!(coerce_stat_value(&json!(10_000_000_000u64)), u32::MAX);
    }

    #[test]
    fn query_ids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("event_id", Some(&id.to_string())).unwrap(), id);
        assert!(matches!(
            parse_id("event_id", None),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(parse_id("event_id", Some("42")).is_err());
        assert_eq!(parse_optional_id("viewer_id", Some(" ")).unwrap(), None);
    }
}
