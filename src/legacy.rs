//! Read-only decoder for the previous-generation record encoding.
//!
//! Older builds wrote each state as a keyed archive tagged with the class
//! name of the type that produced it:
//!
//! ```text
//! {
//!   "$class": "EventEngine.EventStateImpl",
//!   "EventState_NameKey": "app_launch",
//!   "EventState_FirstOccurenceKey": 721692800.0,
//!   "EventState_LastOccurrenceKey": 721696400.0,
//!   "EventState_CountKey": 5,
//!   "EventState_DisabledKey": false
//! }
//! ```
//!
//! (`FirstOccurenceKey` is spelled that way on disk.) Legacy timestamps
//! count seconds from the 2001-01-01 reference date; they are shifted by
//! [`REFERENCE_DATE_OFFSET`] onto the Unix epoch, except `0.0`, which
//! still means "never recorded". Missing numeric and
//! boolean keys decode as zero / `false`, matching how the archive reader
//! treated absent keys. There is no encoder: states decoded
//! here are rewritten in the current format by the next synchronize.

use serde::Deserialize;

use crate::codec::check_timestamp;
use crate::error::DecodeError;
use crate::state::EventState;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
pub const REFERENCE_DATE_OFFSET: f64 = 978_307_200.0;

/// Class tags accepted in the `$class` field.
pub const CLASS_NAMES: &[&str] = &["EventEngine.EventStateImpl", "EventStateImpl"];

#[derive(Deserialize)]
struct LegacyRecord {
    #[serde(rename = "$class")]
    class: Option<String>,
    #[serde(rename = "EventState_NameKey")]
    name: Option<String>,
    #[serde(rename = "EventState_FirstOccurenceKey", default)]
    first_occurrence: f64,
    #[serde(rename = "EventState_LastOccurrenceKey", default)]
    last_occurrence: f64,
    #[serde(rename = "EventState_CountKey", default)]
    count: i64,
    #[serde(rename = "EventState_DisabledKey", default)]
    disabled: bool,
}

/// Decode a legacy record.
pub fn decode(bytes: &[u8]) -> Result<EventState, DecodeError> {
    let record: LegacyRecord = serde_json::from_slice(bytes)?;

    let class = record.class.ok_or(DecodeError::MissingField("$class"))?;
    if !CLASS_NAMES.contains(&class.as_str()) {
        return Err(DecodeError::UnknownFormat(class));
    }

    let name = record
        .name
        .ok_or(DecodeError::MissingField("EventState_NameKey"))?;

    Ok(EventState::from_parts(
        name,
        to_unix("EventState_FirstOccurenceKey", record.first_occurrence)?,
        to_unix("EventState_LastOccurrenceKey", record.last_occurrence)?,
        record.count,
        record.disabled,
    ))
}

fn to_unix(field: &'static str, value: f64) -> Result<f64, DecodeError> {
    let value = check_timestamp(field, value)?;
    if value == 0.0 {
        return Ok(0.0);
    }
    Ok(value + REFERENCE_DATE_OFFSET)
}
