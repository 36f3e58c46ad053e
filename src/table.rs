//! Reading and writing row files.
//!
//! Both inputs and the merged output are JSON Lines: one JSON object per
//! line. A `.zst` extension means the file is zstd-compressed.
//!
//! ```text
//! {"full_fips_code": "01001", "END_DT_UTC": "2021-06-01T10:00:00", ...}
//! {"full_fips_code": "01003", "END_DT_UTC": "2021-06-01T11:30:00Z", ...}
//! ```

use std::{
    fs,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    str,
};

use jiff::{Timestamp, civil, tz::TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::join::InputTypeError;
use crate::model::{Key, Record};

/// Errors that can occur while reading or writing row files.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Input(#[from] InputTypeError),
}

pub type Result<T> = core::result::Result<T, TableError>;

/// Which columns of a row hold the join key and the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    pub key: String,
    pub time: String,
}

/// Load every row of a JSON Lines file as a [`Record`].
///
/// Blank lines are skipped. Any malformed row aborts the load with an
/// [`InputTypeError::MalformedRow`] naming its 1-based line.
pub fn load(path: &Path, columns: &Columns, key_width: Option<usize>) -> Result<Vec<Record>> {
    let reader = open(path)?;

    let mut records = Vec::new();
    for (number, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|source| io_error(path, source))?;
        let malformed = |reason: String| InputTypeError::MalformedRow {
            path: path.to_path_buf(),
            line: number + 1,
            reason,
        };

        let text = str::from_utf8(&line).map_err(|e| malformed(format!("invalid UTF-8: {e}")))?;
        if text.trim().is_empty() {
            continue;
        }
        records.push(parse_row(text, columns, key_width).map_err(malformed)?);
    }

    tracing::debug!(path = %path.display(), rows = records.len(), "loaded table");
    Ok(records)
}

/// Write rows as JSON Lines to `path`, compressing for `.zst` paths.
pub fn write(path: &Path, rows: &[Map<String, Value>]) -> Result<()> {
    let file = fs::File::create(path).map_err(|source| io_error(path, source))?;

    if is_zstd(path) {
        let mut encoder = zstd::Encoder::new(file, 0).map_err(|source| io_error(path, source))?;
        write_to(&mut encoder, rows).map_err(|source| io_error(path, source))?;
        encoder.finish().map_err(|source| io_error(path, source))?;
    } else {
        let mut writer = BufWriter::new(file);
        write_to(&mut writer, rows).map_err(|source| io_error(path, source))?;
        writer.flush().map_err(|source| io_error(path, source))?;
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Write rows as JSON Lines to any writer, one object per line.
pub fn write_to(mut writer: impl Write, rows: &[Map<String, Value>]) -> io::Result<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = fs::File::open(path).map_err(|source| io_error(path, source))?;
    if is_zstd(path) {
        let decoder = zstd::Decoder::new(file).map_err(|source| io_error(path, source))?;
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn is_zstd(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

fn io_error(path: &Path, source: io::Error) -> TableError {
    TableError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse one line into a record, or explain what is wrong with it.
fn parse_row(
    line: &str,
    columns: &Columns,
    key_width: Option<usize>,
) -> core::result::Result<Record, String> {
    let fields = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => return Err(format!("expected a JSON object, found {}", kind(&other))),
        Err(e) => return Err(format!("invalid JSON: {e}")),
    };

    let key = match fields.get(&columns.key) {
        Some(value) => match key_code(value) {
            Some(code) => Key::padded(&code, key_width),
            None => {
                return Err(format!(
                    "key column `{}` must be a string or non-negative whole number, found {}",
                    columns.key,
                    kind(value)
                ));
            }
        },
        None => return Err(format!("missing key column `{}`", columns.key)),
    };

    let time = match fields.get(&columns.time) {
        Some(Value::String(text)) => parse_time(text)?,
        Some(other) => {
            return Err(format!(
                "time column `{}` must be a string, found {}",
                columns.time,
                kind(other)
            ));
        }
        None => return Err(format!("missing time column `{}`", columns.time)),
    };

    Ok(Record::new(key, time, fields))
}

/// Text form of a key cell: a string as is, a non-negative whole number in
/// decimal.
///
/// Floats with no fractional part count (`1001.0` is `1001`): numeric key
/// columns often come out of dataframe exports as floats.
fn key_code(value: &Value) -> Option<String> {
    match value {
        Value::String(code) => Some(code.clone()),
        Value::Number(n) => match n.as_u64() {
            Some(n) => Some(n.to_string()),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
                .map(|f| (f as u64).to_string()),
        },
        _ => None,
    }
}

/// Parse a timestamp, normalizing to UTC.
///
/// Strings with an offset are converted; strings without one are read as
/// UTC wall-clock time.
fn parse_time(text: &str) -> core::result::Result<Timestamp, String> {
    if let Ok(timestamp) = text.parse::<Timestamp>() {
        return Ok(timestamp);
    }
    text.parse::<civil::DateTime>()
        .and_then(|datetime| datetime.to_zoned(TimeZone::UTC))
        .map(|zoned| zoned.timestamp())
        .map_err(|e| format!("unparseable timestamp `{text}`: {e}"))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
