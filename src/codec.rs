//! Current on-store encoding of [`EventState`].
//!
//! Records are JSON objects tagged with a format name and version:
//!
//! ```text
//! {
//!   "format": "eventtally/event-state",
//!   "version": 1,
//!   "name": "app_launch",
//!   "first_occurrence": 1700000000.25,
//!   "last_occurrence": 1700003600.5,
//!   "raw_count": 12,
//!   "disabled": false
//! }
//! ```
//!
//! Only `format` and `name` are required. Missing counters and timestamps
//! read as zero and unknown fields are ignored, so records written by newer
//! or older builds of the same version stay readable.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
use crate::state::EventState;

/// Format tag written into every record.
pub const FORMAT: &str = "eventtally/event-state";

/// Highest record version this build understands.
pub const VERSION: u32 = 1;

#[derive(Serialize)]
struct RecordOut<'a> {
    format: &'static str,
    version: u32,
    name: &'a str,
    first_occurrence: f64,
    last_occurrence: f64,
    raw_count: i64,
    disabled: bool,
}

#[derive(Deserialize)]
struct RecordIn {
    format: Option<String>,
    version: Option<u32>,
    name: Option<String>,
    #[serde(default)]
    first_occurrence: f64,
    #[serde(default)]
    last_occurrence: f64,
    #[serde(default)]
    raw_count: i64,
    #[serde(default)]
    disabled: bool,
}

/// Encode a state in the current format.
pub fn encode(state: &EventState) -> Result<Vec<u8>, EncodeError> {
    let record = RecordOut {
        format: FORMAT,
        version: VERSION,
        name: state.name(),
        first_occurrence: state.first_occurrence(),
        last_occurrence: state.last_occurrence(),
        raw_count: state.raw_count(),
        disabled: state.is_disabled(),
    };
    Ok(serde_json::to_vec(&record)?)
}

/// Decode a state written in the current format.
///
/// Anything else (including legacy records) is a [`DecodeError`].
pub fn decode(bytes: &[u8]) -> Result<EventState, DecodeError> {
    let record: RecordIn = serde_json::from_slice(bytes)?;

    match record.format.as_deref() {
        Some(FORMAT) => {}
        Some(other) => return Err(DecodeError::UnknownFormat(other.to_string())),
        None => return Err(DecodeError::MissingField("format")),
    }

    let version = record.version.unwrap_or(VERSION);
    if version > VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let name = record.name.ok_or(DecodeError::MissingField("name"))?;

    Ok(EventState::from_parts(
        name,
        check_timestamp("first_occurrence", record.first_occurrence)?,
        check_timestamp("last_occurrence", record.last_occurrence)?,
        record.raw_count,
        record.disabled,
    ))
}

/// Reject timestamps no clock could have produced.
pub(crate) fn check_timestamp(field: &'static str, value: f64) -> Result<f64, DecodeError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DecodeError::InvalidField {
            field,
            reason: format!("{value} is not a valid timestamp"),
        });
    }
    Ok(value)
}
