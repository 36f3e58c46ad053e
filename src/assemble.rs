//! Result assembly: turn match results into flat output rows.

use serde_json::{Map, Value};

use crate::model::{Event, MatchResult, Observation};

/// How observation fields and the match marker are named in output rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Prepended to every observation column name.
    pub observation_prefix: String,
    pub matched_column: String,
    pub matched_time_column: String,
}

/// Build one output row per result, in result order.
pub fn assemble(
    results: &[MatchResult<'_, Event, Observation>],
    layout: &Layout,
) -> Vec<Map<String, Value>> {
    results.iter().map(|result| row(result, layout)).collect()
}

/// Event fields, then prefixed observation fields, then the match marker.
///
/// Later columns overwrite earlier ones of the same name.
fn row(result: &MatchResult<'_, Event, Observation>, layout: &Layout) -> Map<String, Value> {
    let mut row = result.event.fields.clone();

    if let Some(observation) = result.observation {
        for (name, value) in &observation.fields {
            row.insert(format!("{}{name}", layout.observation_prefix), value.clone());
        }
    }

    row.insert(
        layout.matched_column.clone(),
        Value::Bool(result.observation.is_some()),
    );
    row.insert(
        layout.matched_time_column.clone(),
        result
            .matched_time
            .map_or(Value::Null, |time| Value::String(time.to_string())),
    );
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use serde_json::json;

    use crate::model::{Key, Record};

    fn layout() -> Layout {
        Layout {
            observation_prefix: "obs_".into(),
            matched_column: "matched".into(),
            matched_time_column: "matched_time".into(),
        }
    }

    fn record(fields: Value) -> Record {
        let fields = fields.as_object().unwrap().clone();
        Record::new(
            Key::new("01001"),
            "2021-06-01T10:00:00Z".parse().unwrap(),
            fields,
        )
    }

    #[test]
    fn matched_row_carries_prefixed_observation_fields() {
        let event = record(json!({"fips": "01001", "EVENT_TYPE": "Hail"}));
        let observation = record(json!({"fips_code": "01001", "customers_out": 120}));
        let matched_time: Timestamp = "2021-06-01T10:30:00Z".parse().unwrap();

        let rows = assemble(
            &[MatchResult {
                event: &event,
                observation: Some(&observation),
                matched_time: Some(matched_time),
            }],
            &layout(),
        );

        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({
                "fips": "01001",
                "EVENT_TYPE": "Hail",
                "obs_fips_code": "01001",
                "obs_customers_out": 120,
                "matched": true,
                "matched_time": "2021-06-01T10:30:00Z",
            })
        );
    }

    #[test]
    fn unmatched_row_keeps_event_fields_only() {
        let event = record(json!({"fips": "01001", "EVENT_TYPE": "Hail"}));

        let rows = assemble(
            &[MatchResult {
                event: &event,
                observation: None,
                matched_time: None,
            }],
            &layout(),
        );

        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({
                "fips": "01001",
                "EVENT_TYPE": "Hail",
                "matched": false,
                "matched_time": null,
            })
        );
    }

    #[test]
    fn empty_prefix_lets_observation_fields_win() {
        let event = record(json!({"fips": "01001", "state": "event"}));
        let observation = record(json!({"state": "observation"}));
        let layout = Layout {
            observation_prefix: String::new(),
            ..layout()
        };

        let rows = assemble(
            &[MatchResult {
                event: &event,
                observation: Some(&observation),
                matched_time: Some(observation.time),
            }],
            &layout,
        );

        assert_eq!(rows[0]["state"], json!("observation"));
        assert_eq!(rows[0]["fips"], json!("01001"));
    }
}
