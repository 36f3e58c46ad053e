//! Brute-force matcher: the fallback path and the test oracle.
//!
//! Makes no ordering assumptions at all. Every event scans every
//! observation with its key.

use std::collections::HashMap;
use std::hash::Hash;

use jiff::{SignedDuration, Timestamp};

use super::{Pairing, within_window};

/// Match each event by scanning all same-key observations.
///
/// Picks the minimum time inside `[event, event + tolerance]`. On equal
/// times the observation that comes first in `observations` wins, which is
/// the same answer the forward sweep gives on stably sorted input.
pub fn match_brute_force<'a, E, O, K>(
    events: &'a [E],
    observations: &'a [O],
    key_of_event: impl Fn(&'a E) -> &'a K,
    key_of_obs: impl Fn(&'a O) -> &'a K,
    time_of_event: impl Fn(&'a E) -> Timestamp,
    time_of_obs: impl Fn(&'a O) -> Timestamp,
    tolerance: SignedDuration,
) -> Pairing
where
    K: Eq + Hash + 'a,
{
    // Buckets hold original indices in input order.
    let mut by_key: HashMap<&K, Vec<usize>> = HashMap::new();
    for (index, observation) in observations.iter().enumerate() {
        by_key.entry(key_of_obs(observation)).or_default().push(index);
    }

    events
        .iter()
        .map(|event| {
            let event_time = time_of_event(event);
            let candidates = by_key.get(key_of_event(event))?;

            let mut best: Option<(usize, Timestamp)> = None;
            for &index in candidates {
                let time = time_of_obs(&observations[index]);
                if !within_window(event_time, time, tolerance) {
                    continue;
                }
                if best.is_none_or(|(_, best_time)| time < best_time) {
                    best = Some((index, time));
                }
            }
            best.map(|(index, _)| index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: i8, minute: i8) -> Timestamp {
        format!("2021-06-01T{hour:02}:{minute:02}:00Z").parse().unwrap()
    }

    type Row = (&'static str, Timestamp);

    fn brute(events: &[Row], observations: &[Row], tolerance: SignedDuration) -> Pairing {
        match_brute_force(
            events,
            observations,
            |e| &e.0,
            |o| &o.0,
            |e| e.1,
            |o| o.1,
            tolerance,
        )
    }

    const TWO_HOURS: SignedDuration = SignedDuration::from_hours(2);

    #[test]
    fn matches_within_tolerance() {
        let pairing = brute(&[("001", at(10, 0))], &[("001", at(10, 30))], TWO_HOURS);
        assert_eq!(pairing, vec![Some(0)]);
    }

    #[test]
    fn ignores_other_keys() {
        let pairing = brute(&[("001", at(10, 0))], &[("002", at(10, 5))], TWO_HOURS);
        assert_eq!(pairing, vec![None]);
    }

    #[test]
    fn rejects_observations_past_tolerance() {
        let pairing = brute(&[("001", at(10, 0))], &[("001", at(13, 0))], TWO_HOURS);
        assert_eq!(pairing, vec![None]);
    }

    #[test]
    fn picks_the_earliest_candidate_in_unsorted_input() {
        let pairing = brute(
            &[("001", at(10, 0))],
            &[
                ("001", at(11, 50)),
                ("001", at(9, 0)),
                ("001", at(10, 40)),
                ("001", at(10, 10)),
            ],
            TWO_HOURS,
        );
        assert_eq!(pairing, vec![Some(3)]);
    }

    #[test]
    fn equal_times_break_ties_by_input_order() {
        let pairing = brute(
            &[("001", at(10, 0))],
            &[("001", at(10, 20)), ("002", at(10, 0)), ("001", at(10, 20))],
            TWO_HOURS,
        );
        assert_eq!(pairing, vec![Some(0)]);
    }

    #[test]
    fn reuses_an_observation_across_events() {
        let pairing = brute(
            &[("001", at(9, 5)), ("001", at(9, 0))],
            &[("001", at(9, 10))],
            SignedDuration::from_hours(1),
        );
        assert_eq!(pairing, vec![Some(0), Some(0)]);
    }

    #[test]
    fn keeps_one_slot_per_event() {
        let events = [
            ("003", at(10, 0)),
            ("001", at(10, 0)),
            ("003", at(10, 0)),
            ("009", at(10, 0)),
        ];
        let pairing = brute(&events, &[("001", at(10, 0))], TWO_HOURS);
        assert_eq!(pairing, vec![None, Some(0), None, None]);
    }
}
