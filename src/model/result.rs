//! Match result: one per event, produced by the join.

use jiff::Timestamp;

/// The outcome of matching a single event.
///
/// Borrows from the slices handed to the join; nothing is copied.
/// `observation` and `matched_time` are either both present or both absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a, E, O> {
    pub event: &'a E,
    pub observation: Option<&'a O>,
    pub matched_time: Option<Timestamp>,
}
