//! Record: one row from either side of the join.

use jiff::Timestamp;
use serde_json::{Map, Value};

use super::Key;

/// A keyed, timestamped row.
///
/// `fields` holds the complete source row, including the columns the key
/// and time were read from. The join never looks at it; it is carried
/// through to the merged output untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: Key,
    pub time: Timestamp,
    pub fields: Map<String, Value>,
}

/// Left-side record: a storm event, timed by its end.
pub type Event = Record;

/// Right-side record: a single outage report.
pub type Observation = Record;

impl Record {
    pub fn new(key: Key, time: Timestamp, fields: Map<String, Value>) -> Self {
        Self { key, time, fields }
    }

    /// Key accessor, shaped for passing to the join as `Record::key`.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Time accessor, shaped for passing to the join as `Record::time`.
    pub fn time(&self) -> Timestamp {
        self.time
    }
}
