//! Forward as-of matcher: the fast path.
//!
//! One linear sweep per key group. Within a group, event times never
//! decrease, so an observation older than the current event is older than
//! every later event too and the cursor can leave it behind for good.

use std::fmt::{self, Display};

use jiff::{SignedDuration, Timestamp};
use rayon::prelude::*;

use super::sort::{SortedEntry, SortedStream};
use super::{Pairing, within_window};

/// Which input stream a fast-path failure was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Events,
    Observations,
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Events => f.write_str("events"),
            Self::Observations => f.write_str("observations"),
        }
    }
}

/// The fast path found its ordering precondition broken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinEngineError {
    #[error("{side} key `{key}` is out of order at sorted position {position}")]
    KeyOutOfOrder {
        side: Side,
        key: String,
        position: usize,
    },

    #[error("{side} time decreases within key `{key}` ({previous} then {current})")]
    TimeOutOfOrder {
        side: Side,
        key: String,
        previous: Timestamp,
        current: Timestamp,
    },
}

type Run<'s, 'a, K> = &'s [SortedEntry<'a, K>];

/// Match every event to the earliest observation in its forward window.
///
/// Both streams must come from [`super::sort_and_validate`]. The ordering is
/// still rechecked group by group as the sweep goes; a breach aborts with
/// [`JoinEngineError`] rather than returning wrong matches.
///
/// With `parallel`, key groups are swept on the rayon pool. Each group only
/// produces slots for its own events, so the result is the same either way.
pub fn match_forward<K: Ord + Display + Sync>(
    events: &SortedStream<'_, K>,
    observations: &SortedStream<'_, K>,
    tolerance: SignedDuration,
    parallel: bool,
) -> Result<Pairing, JoinEngineError> {
    let groups = pair_groups(events, observations)?;

    let swept: Vec<Vec<(usize, Option<usize>)>> = if parallel {
        groups
            .par_iter()
            .map(|(group_events, group_observations)| {
                sweep(group_events, group_observations, tolerance)
            })
            .collect::<Result<_, _>>()?
    } else {
        groups
            .iter()
            .map(|(group_events, group_observations)| {
                sweep(group_events, group_observations, tolerance)
            })
            .collect::<Result<_, _>>()?
    };

    let mut pairing = vec![None; events.len()];
    for (event, observation) in swept.into_iter().flatten() {
        pairing[event] = observation;
    }
    Ok(pairing)
}

/// Pair each event key run with the observation run of the same key.
///
/// Both streams are key-sorted, so a single merge walk lines them up.
/// Event keys with no observations get an empty run.
fn pair_groups<'s, 'a, K: Ord + Display>(
    events: &'s SortedStream<'a, K>,
    observations: &'s SortedStream<'a, K>,
) -> Result<Vec<(Run<'s, 'a, K>, Run<'s, 'a, K>)>, JoinEngineError> {
    let event_runs = key_runs(events, Side::Events)?;
    let mut observation_runs = key_runs(observations, Side::Observations)?
        .into_iter()
        .peekable();

    let mut groups = Vec::with_capacity(event_runs.len());
    for run in event_runs {
        let key = run[0].key;
        while observation_runs.next_if(|o| o[0].key < key).is_some() {}
        let matching = observation_runs
            .next_if(|o| o[0].key == key)
            .unwrap_or_default();
        groups.push((run, matching));
    }
    Ok(groups)
}

/// Split a stream into key runs, checking keys strictly ascend between runs.
fn key_runs<'s, 'a, K: Ord + Display>(
    stream: &'s SortedStream<'a, K>,
    side: Side,
) -> Result<Vec<Run<'s, 'a, K>>, JoinEngineError> {
    let mut runs: Vec<Run<'s, 'a, K>> = Vec::new();
    let mut position = 0;
    for run in stream.runs() {
        if let Some(previous) = runs.last()
            && run[0].key <= previous[0].key
        {
            return Err(JoinEngineError::KeyOutOfOrder {
                side,
                key: run[0].key.to_string(),
                position,
            });
        }
        position += run.len();
        runs.push(run);
    }
    Ok(runs)
}

/// Sweep one key group with a single forward cursor.
///
/// Returns `(event index, matched observation index)` for every event in
/// the group.
fn sweep<K: Display>(
    events: Run<'_, '_, K>,
    observations: Run<'_, '_, K>,
    tolerance: SignedDuration,
) -> Result<Vec<(usize, Option<usize>)>, JoinEngineError> {
    check_times(events, Side::Events)?;
    check_times(observations, Side::Observations)?;

    let mut cursor = 0;
    let mut slots = Vec::with_capacity(events.len());
    for event in events {
        while cursor < observations.len() && observations[cursor].time < event.time {
            cursor += 1;
        }
        let matched = observations
            .get(cursor)
            .filter(|o| within_window(event.time, o.time, tolerance))
            .map(|o| o.index);
        slots.push((event.index, matched));
    }
    Ok(slots)
}

fn check_times<K: Display>(run: Run<'_, '_, K>, side: Side) -> Result<(), JoinEngineError> {
    match run.windows(2).find(|pair| pair[1].time < pair[0].time) {
        Some(pair) => Err(JoinEngineError::TimeOutOfOrder {
            side,
            key: pair[0].key.to_string(),
            previous: pair[0].time,
            current: pair[1].time,
        }),
        None => Ok(()),
    }
}
