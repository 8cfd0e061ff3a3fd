use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Event types the dashboard understands. Anything else on the wire is
/// ignored so newer agents can add message kinds without breaking old
/// dashboards.
const KNOWN_EVENT_TYPES: &[&str] = &["state", "status", "speaker", "vad", "audio"];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("frame has no type field")]
    MissingType,
}

/// Inbound signal events pushed from the hub to every dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Full snapshot of the agent signals, sent on connect and on demand.
    State {
        running: bool,
        speaker_verified: bool,
        speaker_score: f64,
        vad_speaking: bool,
    },
    /// Agent lifecycle flip only.
    Status { running: bool },
    /// Speaker verification outcome with its confidence score.
    Speaker { verified: bool, score: f64 },
    /// Voice-activity flip.
    Vad { speaking: bool },
    /// Audio level in a dBFS-like scale, roughly -80..0.
    Audio { level: f64 },
}

/// Control intents a dashboard may send back to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    Start,
    Stop,
}

impl ControlCommand {
    pub fn to_json(self) -> String {
        // Unit variants with a tag field cannot fail to serialize.
        serde_json::to_string(&self).unwrap_or_default()
    }
}

/// Tolerant event dispatch: `Ok(Some(_))` for a known event, `Ok(None)`
/// for an unknown `type` tag, `Err` for malformed or schema-violating
/// frames. Callers log and drop the `Err` case; the connection stays up.
pub fn parse_event(text: &str) -> Result<Option<AgentEvent>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if !KNOWN_EVENT_TYPES.contains(&kind) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

/// Same tolerance for the command direction, used by the hub.
pub fn parse_command(text: &str) -> Result<Option<ControlCommand>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if kind != "start" && kind != "stop" {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}
