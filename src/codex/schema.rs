//! Serde model of Codex rollout JSONL records
//!
//! Rollout files are append-only; each line is one JSON object discriminated
//! by `type`. Only the record shapes the HUD cares about are modeled; every
//! enum carries an `Unknown` catch-all so new record types never break the
//! tailer.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RolloutRecord {
    SessionMeta(SessionMetaRecord),
    ResponseItem(ResponseItemRecord),
    EventMsg(EventMsgRecord),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionMetaRecord {
    pub payload: SessionMetaPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionMetaPayload {
    pub id: String,
    #[serde(default)]
    pub cwd: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseItemRecord {
    pub payload: ResponseItemPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseItemPayload {
    FunctionCall {
        call_id: String,
        name: String,
        /// JSON-encoded argument object, verbatim from the model
        #[serde(default)]
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMsgRecord {
    pub payload: EventMsgPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMsgPayload {
    TaskComplete,
    RequestUserInput,
    ContextCompacted,
    TurnStarted {
        #[serde(default)]
        preview: Option<String>,
    },
    #[serde(other)]
    Unknown,
}
