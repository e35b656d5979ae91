//! Transport message envelope
//!
//! Inbound messages are JSON objects tagged by a `type` field:
//! - `gait`: a peak/trough sample, fed to the filter
//! - `gesture`: a recognized hand gesture, logged only
//!
//! Outbound messages are command snapshots and the greeting sent when a
//! listener connects.

use crate::error::GaitError;
use crate::types::{Command, Sample};
use serde::{Deserialize, Serialize};

/// Greeting sent to every newly connected listener
pub const GREETING_MESSAGE: &str = "connection opened";

/// Hand gestures reported by the armband
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    Rest,
    Fist,
    WaveIn,
    WaveOut,
    FingersSpread,
    DoubleTap,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Gesture notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureMessage {
    #[serde(default)]
    pub gesture: Gesture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Gait(Sample),
    Gesture(GestureMessage),
}

/// Greeting payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

/// Decode one inbound JSON message
pub fn parse_message(json: &str) -> Result<InboundMessage, GaitError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GaitError::ParseError("missing message type".to_string()))?
        .to_string();

    match kind.as_str() {
        "gait" => Ok(InboundMessage::Gait(serde_json::from_value(value)?)),
        "gesture" => Ok(InboundMessage::Gesture(serde_json::from_value(value)?)),
        _ => Err(GaitError::UnsupportedMessage(kind)),
    }
}

/// Decode newline-delimited inbound messages, skipping blank lines
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<InboundMessage>, GaitError> {
    let mut messages = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_message(trimmed) {
            Ok(message) => messages.push(message),
            Err(e) => {
                return Err(GaitError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(messages)
}

/// Encode a command for listeners
pub fn encode_command(command: &Command) -> Result<String, GaitError> {
    Ok(serde_json::to_string(command)?)
}

/// Encoded greeting for a new listener
pub fn greeting() -> Result<String, GaitError> {
    let greeting = Greeting {
        message: GREETING_MESSAGE.to_string(),
    };
    Ok(serde_json::to_string(&greeting)?)
}
