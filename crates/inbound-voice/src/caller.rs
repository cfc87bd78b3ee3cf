//! Caller identification for inbound SIP calls.
//!
//! SIP dispatch names each room `<prefix>_<caller>_<suffix>`, for example
//! `call_+905535235961_mMAhVe4E6hTs`. The caller's number is the second
//! segment.

use crate::error::VoiceError;
use inbound_types::UNKNOWN_CALLER;
use serde::Deserialize;

const ROOM_NAME_DELIMITER: char = '_';
const MIN_ROOM_NAME_SEGMENTS: usize = 3;
const CALLER_SEGMENT: usize = 1;

/// Derives the caller identifier from a room name, falling back to
/// [`UNKNOWN_CALLER`] when the name does not have the expected shape.
pub fn caller_id_from_room(room_name: &str) -> String {
    let segments: Vec<&str> = room_name.split(ROOM_NAME_DELIMITER).collect();

    match segments.get(CALLER_SEGMENT) {
        Some(caller) if segments.len() >= MIN_ROOM_NAME_SEGMENTS && !caller.is_empty() => {
            (*caller).to_string()
        }
        _ => {
            tracing::debug!(room = room_name, "room name carries no caller id");
            UNKNOWN_CALLER.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoomMetadata {
    #[serde(default)]
    caller_number: Option<String>,
}

/// Reads `caller_number` from JSON room metadata.
///
/// Empty metadata and an empty number both yield `Ok(None)`.
pub fn caller_number_from_metadata(metadata: &str) -> Result<Option<String>, VoiceError> {
    if metadata.trim().is_empty() {
        return Ok(None);
    }

    let parsed: RoomMetadata = serde_json::from_str(metadata)?;
    Ok(parsed.caller_number.filter(|n| !n.is_empty()))
}
