//! Normalized agent events and the socket wire protocol
//!
//! Every adapter (Claude Code hook parser, Codex rollout watcher) either emits
//! an [`AgentEvent`] or discards its input. No raw vendor JSON flows past this
//! module; the registry only ever sees the closed variant set below.

pub mod input;
pub mod socket;

use serde::{Deserialize, Serialize};

/// Which agent produced a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    #[default]
    ClaudeCode,
    Codex,
}

/// A normalized event that drives the session registry.
///
/// Each event names the session it touches; the payload determines the state
/// transition per the registry's transition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub session_id: String,
    #[serde(default)]
    pub agent_kind: AgentKind,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// The closed set of things that can happen to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Session became known; creates the registry entry if absent
    SessionStarted {
        #[serde(default)]
        cwd: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// A tool invocation began
    ToolStarted {
        tool_id: String,
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_label: Option<String>,
    },
    /// A tool invocation finished (idempotent by tool_id)
    ToolCompleted { tool_id: String },
    /// The agent did something that proves it is alive and working
    Activity,
    /// The agent finished its turn and is idle
    Idle,
    /// The agent is blocked on a human permission decision
    NeedsAttention {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The agent explicitly asked for user text input
    WaitingForInput,
    /// The agent is compacting its context window
    Compacting,
    /// Display name changed (no state transition)
    SessionNameUpdated { name: String },
    /// Session is gone; the registry entry is removed
    SessionEnded,
}

impl AgentEvent {
    pub fn new(session_id: impl Into<String>, agent_kind: AgentKind, payload: EventPayload) -> Self {
        Self {
            session_id: session_id.into(),
            agent_kind,
            payload,
        }
    }
}

/// One newline-terminated frame on the daemon socket.
///
/// Senders write `{"msg":"event",…}` frames, one per line; `ping` gets a
/// `pong` reply. Frames with an unknown `msg` or event `type` fail to decode
/// and are skipped without dropping the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum WireFrame {
    Ping,
    Pong,
    Event {
        #[serde(flatten)]
        event: AgentEvent,
    },
}

impl WireFrame {
    /// Encode as a single newline-terminated line
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}
