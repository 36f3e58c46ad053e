//! Forward as-of join of events onto observations.
//!
//! For every event, find the earliest observation with the same key whose
//! time falls in `[event.time, event.time + tolerance]`. Every event gets
//! exactly one result, matched or not.
//!
//! Two engines produce that answer:
//!
//! - `forward`: sort, certify, then one linear sweep per key group.
//! - `brute`: scan every same-key observation per event. No ordering needed.
//!
//! [`run`] sorts and tries the forward engine, and falls back to brute force
//! on the original inputs if sorting or the sweep report a broken precondition.

mod brute;
mod forward;
mod sort;

use std::fmt::{self, Display};
use std::hash::Hash;
use std::path::PathBuf;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

use crate::model::MatchResult;

pub use brute::match_brute_force;
pub use forward::{JoinEngineError, match_forward};
pub use sort::{SortViolation, SortedStream, sort_and_validate, validate_order};

/// Matched observation index per event, in original event order.
pub type Pairing = Vec<Option<usize>>;

/// A caller handed the join something it cannot work with.
///
/// Unlike fast-path failures, these are never recovered from.
#[derive(Debug, thiserror::Error)]
pub enum InputTypeError {
    #[error("tolerance must not be negative (got {0})")]
    NegativeTolerance(SignedDuration),

    #[error("{}:{line}: {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Why the forward engine could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FastPathError {
    #[error(transparent)]
    Sort(#[from] SortViolation),

    #[error(transparent)]
    Engine(#[from] JoinEngineError),
}

/// Engine requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineChoice {
    /// Forward sweep, falling back to brute force if it fails.
    #[default]
    Forward,

    /// Brute force only. Slow, but needs no sort.
    BruteForce,
}

/// Engine that actually produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Forward,
    BruteForce,
}

impl Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => f.write_str("forward"),
            Self::BruteForce => f.write_str("brute-force"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOptions {
    /// Maximum gap from event to matched observation. Must be non-negative.
    pub tolerance: SignedDuration,
    pub engine: EngineChoice,
    /// Sweep key groups on the rayon pool.
    pub parallel: bool,
}

/// The pairing plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub pairing: Pairing,
    pub engine: Engine,
    /// The forward-engine failure that forced brute force, if any.
    pub fallback: Option<FastPathError>,
}

impl JoinOutcome {
    pub fn matched(&self) -> usize {
        self.pairing.iter().flatten().count()
    }

    /// Resolve the pairing against the inputs it was computed from.
    pub fn results<'a, E, O>(
        &self,
        events: &'a [E],
        observations: &'a [O],
        time_of_obs: impl Fn(&O) -> Timestamp,
    ) -> Vec<MatchResult<'a, E, O>> {
        events
            .iter()
            .zip(&self.pairing)
            .map(|(event, slot)| {
                let observation = slot.map(|index| &observations[index]);
                MatchResult {
                    event,
                    observation,
                    matched_time: observation.map(&time_of_obs),
                }
            })
            .collect()
    }
}

/// Join `events` onto `observations`.
///
/// Returns one slot per event, in event input order. Only a negative
/// tolerance is an error; fast-path failures are logged and absorbed by
/// the brute-force engine, and surface in [`JoinOutcome::fallback`].
#[allow(clippy::too_many_arguments)]
pub fn run<'a, E, O, K>(
    events: &'a [E],
    observations: &'a [O],
    key_of_event: impl Fn(&'a E) -> &'a K + Copy,
    key_of_obs: impl Fn(&'a O) -> &'a K + Copy,
    time_of_event: impl Fn(&'a E) -> Timestamp + Copy,
    time_of_obs: impl Fn(&'a O) -> Timestamp + Copy,
    options: &JoinOptions,
) -> Result<JoinOutcome, InputTypeError>
where
    K: Ord + Hash + Display + Sync + 'a,
{
    if options.tolerance.is_negative() {
        return Err(InputTypeError::NegativeTolerance(options.tolerance));
    }

    let brute_force = || {
        match_brute_force(
            events,
            observations,
            key_of_event,
            key_of_obs,
            time_of_event,
            time_of_obs,
            options.tolerance,
        )
    };

    tracing::debug!(
        events = events.len(),
        observations = observations.len(),
        tolerance = %options.tolerance,
        engine = ?options.engine,
        "starting join"
    );

    let outcome = match options.engine {
        EngineChoice::BruteForce => JoinOutcome {
            pairing: brute_force(),
            engine: Engine::BruteForce,
            fallback: None,
        },
        EngineChoice::Forward => {
            let fast = sort_and_validate(events, key_of_event, time_of_event)
                .and_then(|sorted_events| {
                    let sorted_observations =
                        sort_and_validate(observations, key_of_obs, time_of_obs)?;
                    Ok((sorted_events, sorted_observations))
                })
                .map_err(FastPathError::from)
                .and_then(|(sorted_events, sorted_observations)| {
                    Ok(match_forward(
                        &sorted_events,
                        &sorted_observations,
                        options.tolerance,
                        options.parallel,
                    )?)
                });
            resolve(fast, brute_force)
        }
    };

    tracing::info!(
        events = events.len(),
        matched = outcome.matched(),
        engine = %outcome.engine,
        "join complete"
    );
    Ok(outcome)
}

/// Take the fast result, or run the fallback if the fast path failed.
fn resolve(
    fast: Result<Pairing, FastPathError>,
    fallback: impl FnOnce() -> Pairing,
) -> JoinOutcome {
    match fast {
        Ok(pairing) => JoinOutcome {
            pairing,
            engine: Engine::Forward,
            fallback: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "forward join unusable; falling back to brute force");
            JoinOutcome {
                pairing: fallback(),
                engine: Engine::BruteForce,
                fallback: Some(err),
            }
        }
    }
}

/// Whether `observation` lies in the forward window of `event`.
///
/// Both ends are inclusive.
fn within_window(event: Timestamp, observation: Timestamp, tolerance: SignedDuration) -> bool {
    observation >= event && observation.duration_since(event) <= tolerance
}
