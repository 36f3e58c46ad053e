//! Output formatting for CLI display.

use std::fmt::Display;

use crate::join::{JoinOutcome, SortViolation, SortedStream};

/// One-line summary of a merge, e.g. `events: 3, matched: 2, unmatched: 1 (forward engine)`.
pub(super) fn format_merge_summary(outcome: &JoinOutcome) -> String {
    let total = outcome.pairing.len();
    let matched = outcome.matched();
    let mut summary = format!(
        "events: {total}, matched: {matched}, unmatched: {} ({} engine)",
        total - matched,
        outcome.engine
    );
    if let Some(err) = &outcome.fallback {
        summary.push_str(&format!("; forward join fell back: {err}"));
    }
    summary
}

/// Report for `verify`: either the first problem found or a success line.
///
/// Positions count records, not file lines; blank lines are not records.
pub(super) fn format_verify_report<K: Ord + Display>(
    stream: &SortedStream<'_, K>,
    violation: Option<&SortViolation>,
    key_regression: Option<usize>,
) -> String {
    if let Some(violation) = violation {
        return violation.to_string();
    }
    if let Some(position) = key_regression {
        let key = &stream.entries()[position].key;
        return format!("key `{key}` at record {} is out of key order", position + 1);
    }
    format!(
        "ordered: {} records in {} key groups",
        stream.len(),
        stream.runs().count()
    )
}
