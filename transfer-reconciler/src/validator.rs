//! Transition validation
//!
//! Given the transfer's current state and an incoming event, report every
//! anomaly the event exhibits. Validation never mutates anything and never
//! blocks: the ledger decides what to do with the result.

use crate::types::{TransferStatus, Warning, WarningKind};
use chrono::{DateTime, SecondsFormat, Utc};

/// Validate an incoming status against the current state, stamped with `Utc::now()`
pub fn validate_transition(
    current_status: TransferStatus,
    new_status: TransferStatus,
    current_timestamp: DateTime<Utc>,
    new_timestamp: DateTime<Utc>,
    event_id: &str,
) -> Vec<Warning> {
    validate_transition_at(
        current_status,
        new_status,
        current_timestamp,
        new_timestamp,
        event_id,
        Utc::now(),
    )
}

/// Validate with an explicit detection time
///
/// Checks run in a fixed order and fire independently:
/// 1. `out_of_order` when the event is strictly older than the current state
/// 2. `conflicting_terminal` when both statuses are terminal and differ
/// 3. `missing_transition` when the edge is not in the table, unless (2)
///    already classifies it
pub fn validate_transition_at(
    current_status: TransferStatus,
    new_status: TransferStatus,
    current_timestamp: DateTime<Utc>,
    new_timestamp: DateTime<Utc>,
    event_id: &str,
    detected_at: DateTime<Utc>,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let warning = |kind: WarningKind, message: String| Warning {
        kind,
        message,
        event_id: event_id.to_string(),
        detected_at,
    };

    if new_timestamp < current_timestamp {
        warnings.push(warning(
            WarningKind::OutOfOrder,
            format!(
                "Event timestamp {} is earlier than current state timestamp {}",
                new_timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                current_timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
        ));
    }

    let both_terminal = current_status.is_terminal() && new_status.is_terminal();

    if both_terminal && current_status != new_status {
        warnings.push(warning(
            WarningKind::ConflictingTerminal,
            format!(
                "Transfer already {} but received {}",
                current_status, new_status
            ),
        ));
    }

    if !current_status.can_transition_to(new_status) && !both_terminal {
        warnings.push(warning(
            WarningKind::MissingTransition,
            format!(
                "Invalid transition from {} to {}",
                current_status, new_status
            ),
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use TransferStatus::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn kinds(warnings: &[Warning]) -> Vec<WarningKind> {
        warnings.iter().map(|w| w.kind).collect()
    }

    #[test]
    fn test_valid_ordered_transition_is_clean() {
        let warnings = validate_transition(Initiated, Processing, t0(), t0() + Duration::seconds(1), "e2");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_tie_is_not_out_of_order() {
        let warnings = validate_transition(Initiated, Processing, t0(), t0(), "e2");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_out_of_order_fires_even_for_valid_transition() {
        let warnings = validate_transition(Initiated, Processing, t0(), t0() - Duration::seconds(5), "e2");
        assert_eq!(kinds(&warnings), vec![WarningKind::OutOfOrder]);
        assert!(warnings[0].message.contains("is earlier than current state timestamp"));
    }

    #[test]
    fn test_out_of_order_message_keeps_sub_millisecond_precision() {
        let current = t0() + Duration::nanoseconds(500);
        let warnings = validate_transition(Initiated, Processing, current, t0(), "e2");
        assert_eq!(kinds(&warnings), vec![WarningKind::OutOfOrder]);
        assert_eq!(
            warnings[0].message,
            "Event timestamp 2024-03-01T12:00:00Z is earlier than current state timestamp 2024-03-01T12:00:00.000000500Z"
        );
    }

    #[test]
    fn test_skipped_processing_is_missing_transition() {
        let warnings = validate_transition(Initiated, Settled, t0(), t0() + Duration::seconds(1), "e2");
        assert_eq!(kinds(&warnings), vec![WarningKind::MissingTransition]);
        assert_eq!(warnings[0].message, "Invalid transition from initiated to settled");
    }

    #[test]
    fn test_conflicting_terminal_suppresses_missing_transition() {
        let warnings = validate_transition(Settled, Failed, t0(), t0() + Duration::seconds(1), "e3");
        assert_eq!(kinds(&warnings), vec![WarningKind::ConflictingTerminal]);
        assert_eq!(warnings[0].message, "Transfer already settled but received failed");
    }

    #[test]
    fn test_same_terminal_repeated_is_silent() {
        // Both terminal and equal: neither conflicting nor missing_transition
        let warnings = validate_transition(Settled, Settled, t0(), t0() + Duration::seconds(1), "e3");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_out_of_terminal_into_non_terminal() {
        let warnings = validate_transition(Failed, Processing, t0(), t0() + Duration::seconds(1), "e3");
        assert_eq!(kinds(&warnings), vec![WarningKind::MissingTransition]);
    }

    #[test]
    fn test_multiple_warnings_in_detection_order() {
        let warnings = validate_transition(Processing, Initiated, t0(), t0() - Duration::seconds(1), "e4");
        assert_eq!(
            kinds(&warnings),
            vec![WarningKind::OutOfOrder, WarningKind::MissingTransition]
        );

        let warnings = validate_transition(Failed, Settled, t0(), t0() - Duration::seconds(1), "e5");
        assert_eq!(
            kinds(&warnings),
            vec![WarningKind::OutOfOrder, WarningKind::ConflictingTerminal]
        );
    }

    #[test]
    fn test_warnings_share_detection_time_and_event_id() {
        let detected_at = t0() + Duration::hours(1);
        let warnings = validate_transition_at(
            Processing,
            Initiated,
            t0(),
            t0() - Duration::seconds(1),
            "evt-9",
            detected_at,
        );

        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.detected_at == detected_at));
        assert!(warnings.iter().all(|w| w.event_id == "evt-9"));
    }
}
