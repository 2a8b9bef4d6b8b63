//! Ingestion boundary
//!
//! Turns an untrusted JSON payload into a [`TransferEvent`] and renders an
//! [`ApplyOutcome`] for the caller. Everything that reaches the ledger has
//! already passed through here, so the ledger itself never fails.
//!
//! Accepted timestamp forms, all interpreted as UTC unless an offset is given:
//! - RFC 3339 (`2024-01-01T10:00:00Z`, `2024-01-01T12:00:00+02:00`)
//! - ISO 8601 without offset (`2024-01-01T10:00:00`, `2024-01-01T10:00:00.250`)
//! - date only (`2024-01-01`, midnight)

use crate::{
    ledger::{ApplyOutcome, TransferLedger},
    types::{TransferEvent, TransferStatus, Warning},
    Error, Result,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response rendered for the ingestion caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestResponse {
    /// First delivery, with warnings raised by it
    Processed {
        /// Transfer ID
        transfer_id: String,
        /// Warnings raised by this event
        warnings: Vec<Warning>,
    },

    /// Redelivery of an already accepted event
    Duplicate {
        /// Fixed explanation
        message: String,
        /// Transfer ID
        transfer_id: String,
    },
}

impl From<ApplyOutcome> for IngestResponse {
    fn from(outcome: ApplyOutcome) -> Self {
        if outcome.duplicate {
            IngestResponse::Duplicate {
                message: "Event already processed".to_string(),
                transfer_id: outcome.transfer_id,
            }
        } else {
            IngestResponse::Processed {
                transfer_id: outcome.transfer_id,
                warnings: outcome.warnings,
            }
        }
    }
}

/// Parse and validate one JSON event body
pub fn parse_event(body: &str) -> Result<TransferEvent> {
    let value: Value = serde_json::from_str(body)?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidEvent("body must be a JSON object".to_string()))?;

    let transfer_id = required(object, "transfer_id")?;
    let event_id = required(object, "event_id")?;
    let status = required(object, "status")?;
    let timestamp = required(object, "timestamp")?;

    let status: TransferStatus = status.parse()?;
    let timestamp = parse_timestamp(timestamp)?;

    let reason = match object.get("reason") {
        None | Some(Value::Null) => None,
        Some(Value::String(reason)) => Some(reason.clone()),
        Some(_) => return Err(Error::InvalidEvent("reason must be a string".to_string())),
    };

    Ok(TransferEvent {
        transfer_id: transfer_id.to_string(),
        event_id: event_id.to_string(),
        status,
        timestamp,
        reason,
    })
}

/// Parse, validate and apply one JSON event body
pub fn ingest(ledger: &TransferLedger, body: &str) -> Result<IngestResponse> {
    let event = parse_event(body)?;
    Ok(ledger.apply(event).into())
}

/// Offset-carrying ISO 8601 forms outside RFC 3339
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// ISO 8601 forms without an offset, read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an event timestamp
///
/// Accepts RFC 3339, ISO 8601 date-times with or without seconds and with
/// extended (`+00:00`), basic (`+0000`) or `Z` offsets, offset-less
/// date-times (UTC), and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
    {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidTimestamp(raw.to_string()))
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    match object.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        _ => Err(Error::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_valid_event() {
        let event = parse_event(
            r#"{"transfer_id":"tr-1","event_id":"e1","status":"processing",
                "timestamp":"2024-01-01T10:00:00Z","reason":"picked up"}"#,
        )
        .unwrap();

        assert_eq!(event.transfer_id, "tr-1");
        assert_eq!(event.status, TransferStatus::Processing);
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert_eq!(event.reason.as_deref(), Some("picked up"));
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let err = parse_event(r#"{"event_id":"e1","status":"failed","timestamp":"2024-01-01"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::MissingField("transfer_id")));

        let err = parse_event(
            r#"{"transfer_id":"tr","event_id":"","status":"failed","timestamp":"2024-01-01"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingField("event_id")));
    }

    #[test]
    fn test_invalid_status() {
        let err = parse_event(
            r#"{"transfer_id":"tr","event_id":"e1","status":"completed","timestamp":"2024-01-01"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus(ref s) if s == "completed"));
    }

    #[test]
    fn test_invalid_timestamp() {
        let err = parse_event(
            r#"{"transfer_id":"tr","event_id":"e1","status":"failed","timestamp":"yesterday"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp(_)));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse_event("not json").unwrap_err(), Error::Json(_)));
        assert!(matches!(parse_event("[1,2]").unwrap_err(), Error::InvalidEvent(_)));
    }

    #[test]
    fn test_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T12:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-01-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_timestamp_forms_without_seconds_or_colon_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T10:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T12:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00:00.000+0000").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T11:00:00+0100").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01 10:00:00").unwrap(), expected);

        assert!(parse_timestamp("2024-01-01T10").is_err());
        assert!(parse_timestamp("2024-13-01T10:00Z").is_err());
    }

    #[test]
    fn test_ingest_renders_responses() {
        let ledger = TransferLedger::new();
        let body = r#"{"transfer_id":"tr","event_id":"e1","status":"initiated","timestamp":"2024-01-01T00:00:00Z"}"#;

        let first = ingest(&ledger, body).unwrap();
        assert_eq!(
            first,
            IngestResponse::Processed {
                transfer_id: "tr".to_string(),
                warnings: vec![],
            }
        );

        let second = serde_json::to_value(ingest(&ledger, body).unwrap()).unwrap();
        assert_eq!(second["status"], "duplicate");
        assert_eq!(second["message"], "Event already processed");
        assert_eq!(second["transfer_id"], "tr");
    }

    #[test]
    fn test_rejected_payload_never_reaches_ledger() {
        let ledger = TransferLedger::new();
        let body = r#"{"transfer_id":"tr","event_id":"e1","status":"bogus","timestamp":"2024-01-01"}"#;

        assert!(ingest(&ledger, body).is_err());
        assert!(ledger.is_empty());
    }
}
