//! Topic names and MQTT-style filter matching for the broker backend.
//!
//! Every room owns the namespace `room/{ROOMID}/`:
//!
//! ```text
//! room/AB12CD/presence   connect/disconnect events, and the last-will
//! room/AB12CD/events     room, move and reset events
//! room/AB12CD/#          what a session subscribes to
//! ```

use duel_protocol::RoomCode;

use crate::RelayError;

pub fn presence_topic(room_id: &RoomCode) -> String {
    format!("room/{room_id}/presence")
}

pub fn events_topic(room_id: &RoomCode) -> String {
    format!("room/{room_id}/events")
}

/// The filter matching every topic of one room.
pub fn room_filter(room_id: &RoomCode) -> String {
    format!("room/{room_id}/#")
}

/// Returns `true` if `topic` matches `filter`.
///
/// `+` matches exactly one level and `#` matches all remaining levels,
/// including none (so `room/A/#` matches `room/A`).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Checks a topic a message is published to.
pub fn validate_topic(topic: &str) -> Result<(), RelayError> {
    if topic.is_empty() || topic.contains(['+', '#']) {
        return Err(RelayError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

/// Checks a subscription filter.
pub fn validate_filter(filter: &str) -> Result<(), RelayError> {
    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    let valid = !filter.is_empty()
        && levels.iter().enumerate().all(|(i, level)| match *level {
            "#" => i == last,
            "+" => true,
            other => !other.contains(['+', '#']),
        });
    if valid {
        Ok(())
    } else {
        Err(RelayError::InvalidFilter(filter.to_string()))
    }
}
