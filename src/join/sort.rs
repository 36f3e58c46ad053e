//! Grouped sort and order certification.
//!
//! The forward sweep is only correct when every key group is in
//! non-decreasing time order. This module establishes that order and
//! then checks it, so a broken sort fails loudly here instead of
//! producing wrong matches later.

use std::fmt::Display;

use jiff::Timestamp;

/// A non-decreasing time was expected within a key group but not found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "sort violation at position {position}: key `{key}` goes from {previous} back to {current}"
)]
pub struct SortViolation {
    /// Position in the sorted stream where time went backwards.
    pub position: usize,
    pub key: String,
    pub previous: Timestamp,
    pub current: Timestamp,
}

/// One record's view inside a sorted stream.
#[derive(Debug, Clone, Copy)]
pub struct SortedEntry<'a, K> {
    /// Position of the record in the caller's original slice.
    pub index: usize,
    pub key: &'a K,
    pub time: Timestamp,
}

/// Records reordered by `(key, time)`, each remembering where it came from.
///
/// Only constructed through [`sort_and_validate`] (certified) or
/// [`SortedStream::as_given`] (input order, uncertified).
#[derive(Debug, Clone)]
pub struct SortedStream<'a, K> {
    entries: Vec<SortedEntry<'a, K>>,
}

impl<'a, K: Ord> SortedStream<'a, K> {
    /// View records in their input order, without sorting or checking.
    pub fn as_given<T>(
        records: &'a [T],
        key_of: impl Fn(&'a T) -> &'a K,
        time_of: impl Fn(&'a T) -> Timestamp,
    ) -> Self {
        let entries = records
            .iter()
            .enumerate()
            .map(|(index, record)| SortedEntry {
                index,
                key: key_of(record),
                time: time_of(record),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SortedEntry<'a, K>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Contiguous runs of equal key, in stream order.
    pub fn runs(&self) -> impl Iterator<Item = &[SortedEntry<'a, K>]> {
        self.entries.chunk_by(|a, b| a.key == b.key)
    }

    /// Position of the first run whose key sorts before the previous run's key.
    ///
    /// `None` means every key appears in exactly one contiguous, ascending run.
    pub fn first_key_regression(&self) -> Option<usize> {
        let mut position = 0;
        let mut previous: Option<&K> = None;
        for run in self.runs() {
            let key = run[0].key;
            if previous.is_some_and(|p| key <= p) {
                return Some(position);
            }
            previous = Some(key);
            position += run.len();
        }
        None
    }
}

/// Stable-sort records by `(key, time)` and certify the result.
///
/// Ties keep their input order, which is what makes tie-breaking on equal
/// timestamps deterministic downstream.
pub fn sort_and_validate<'a, T, K: Ord + Display>(
    records: &'a [T],
    key_of: impl Fn(&'a T) -> &'a K,
    time_of: impl Fn(&'a T) -> Timestamp,
) -> Result<SortedStream<'a, K>, SortViolation> {
    let mut stream = SortedStream::as_given(records, key_of, time_of);
    stream
        .entries
        .sort_by(|a, b| a.key.cmp(b.key).then(a.time.cmp(&b.time)));
    validate_order(&stream)?;
    Ok(stream)
}

/// Walk a stream once and check time never decreases within a key.
///
/// A key change resets the tracker, so this certifies grouping order only
/// together with a key sort; use [`SortedStream::first_key_regression`] to
/// check the key order itself.
pub fn validate_order<K: PartialEq + Display>(
    stream: &SortedStream<'_, K>,
) -> Result<(), SortViolation> {
    let mut last: Option<(&K, Timestamp)> = None;
    for (position, entry) in stream.entries.iter().enumerate() {
        if let Some((key, time)) = last
            && key == entry.key
            && entry.time < time
        {
            return Err(SortViolation {
                position,
                key: key.to_string(),
                previous: time,
                current: entry.time,
            });
        }
        last = Some((entry.key, entry.time));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: i8, minute: i8) -> Timestamp {
        format!("2021-06-01T{hour:02}:{minute:02}:00Z").parse().unwrap()
    }

    type Row = (&'static str, Timestamp);

    fn key(row: &Row) -> &&'static str {
        &row.0
    }

    fn time(row: &Row) -> Timestamp {
        row.1
    }

    #[test]
    fn sorts_by_key_then_time() {
        let rows = vec![
            ("002", at(9, 0)),
            ("001", at(11, 0)),
            ("001", at(10, 0)),
            ("002", at(8, 0)),
        ];

        let stream = sort_and_validate(&rows, key, time).unwrap();
        let order: Vec<usize> = stream.entries().iter().map(|e| e.index).collect();

        assert_eq!(order, vec![2, 1, 3, 0]);
    }

    #[test]
    fn keeps_input_order_on_ties() {
        let rows = vec![
            ("001", at(10, 0)),
            ("001", at(9, 0)),
            ("001", at(10, 0)),
            ("001", at(10, 0)),
        ];

        let stream = sort_and_validate(&rows, key, time).unwrap();
        let order: Vec<usize> = stream.entries().iter().map(|e| e.index).collect();

        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn empty_input_is_valid() {
        let rows: Vec<Row> = Vec::new();
        let stream = sort_and_validate(&rows, key, time).unwrap();
        assert_eq!(stream.len(), 0);
        assert_eq!(stream.runs().count(), 0);
    }

    #[test]
    fn detects_time_going_backwards_within_a_key() {
        let rows = vec![
            ("001", at(10, 0)),
            ("001", at(11, 0)),
            ("001", at(10, 30)),
        ];

        let stream = SortedStream::as_given(&rows, key, time);
        let err = validate_order(&stream).unwrap_err();

        assert_eq!(err.position, 2);
        assert_eq!(err.key, "001");
        assert_eq!(err.previous, at(11, 0));
        assert_eq!(err.current, at(10, 30));
    }

    #[test]
    fn key_change_resets_the_time_tracker() {
        let rows = vec![("001", at(12, 0)), ("002", at(8, 0)), ("002", at(9, 0))];

        let stream = SortedStream::as_given(&rows, key, time);
        assert!(validate_order(&stream).is_ok());
    }

    #[test]
    fn equal_times_are_not_a_violation() {
        let rows = vec![("001", at(10, 0)), ("001", at(10, 0))];

        let stream = SortedStream::as_given(&rows, key, time);
        assert!(validate_order(&stream).is_ok());
    }

    #[test]
    fn runs_split_on_key_changes() {
        let rows = vec![
            ("001", at(10, 0)),
            ("001", at(11, 0)),
            ("002", at(9, 0)),
            ("003", at(9, 0)),
        ];

        let stream = sort_and_validate(&rows, key, time).unwrap();
        let sizes: Vec<usize> = stream.runs().map(<[_]>::len).collect();

        assert_eq!(sizes, vec![2, 1, 1]);
    }

    #[test]
    fn finds_interleaved_key_groups() {
        let rows = vec![("001", at(10, 0)), ("002", at(9, 0)), ("001", at(11, 0))];

        let stream = SortedStream::as_given(&rows, key, time);

        // Time order holds within each contiguous run, but key 001 reappears.
        assert!(validate_order(&stream).is_ok());
        assert_eq!(stream.first_key_regression(), Some(2));
    }

    #[test]
    fn sorted_stream_has_no_key_regression() {
        let rows = vec![("003", at(10, 0)), ("001", at(9, 0)), ("002", at(11, 0))];

        let stream = sort_and_validate(&rows, key, time).unwrap();
        assert_eq!(stream.first_key_regression(), None);
    }

    #[test]
    fn certified_streams_are_monotonic_per_key() {
        use std::collections::HashMap;

        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        const KEYS: [&str; 4] = ["001", "002", "003", "004"];

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let rows: Vec<Row> = (0..rng.gen_range(0..60))
                .map(|_| {
                    let minutes: i64 = rng.gen_range(0..600);
                    (
                        KEYS[rng.gen_range(0..KEYS.len())],
                        at(0, 0) + jiff::SignedDuration::from_mins(minutes),
                    )
                })
                .collect();

            let stream = sort_and_validate(&rows, key, time).unwrap();

            // Independent recheck: bucket by key in stream order.
            let mut last: HashMap<&str, Timestamp> = HashMap::new();
            for entry in stream.entries() {
                if let Some(previous) = last.insert(*entry.key, entry.time) {
                    assert!(previous <= entry.time);
                }
            }
            assert_eq!(stream.len(), rows.len());
        }
    }
}
