//! Core data model for stormjoin.
//!
//! Rows from both input files become [`Record`]s: a join key, a UTC
//! timestamp, and the untouched source fields. The join pairs them up and
//! hands back one [`MatchResult`] per event.

mod key;
mod record;
mod result;

pub use key::Key;
pub use record::{Event, Observation, Record};
pub use result::MatchResult;
