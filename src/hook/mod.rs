//! Claude Code hook adapter
//!
//! Claude Code pipes one JSON object to `aura hook --agent claude-code` per
//! lifecycle hook. This module parses that object into zero or more
//! normalized events and forwards them to the daemon socket. The adapter is a
//! short-lived process: parse, connect, write, exit. A missing daemon is a
//! silent success; the host agent never depends on aura being up.

mod label;

pub use label::tool_label;

use crate::event::{AgentEvent, AgentKind, EventPayload, WireFrame};
use crate::notify;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Matches the quoted name in `aura set-name "…"` (BDR-0001: the name rides
/// in on the Bash PreToolUse hook, not through the daemon).
static SET_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*aura\s+set-name\s+"(.+)"\s*$"#).expect("static regex"));

/// Raw hook payload from Claude Code stdin.
///
/// Every field except the discriminator is optional; hooks only send what
/// applies to them and unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    pub hook_event_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Map one parsed hook object to its ordered event sequence.
///
/// Total over every accepted hook JSON: hooks without a `session_id` are
/// dropped whole, unknown hook names produce no events, and nothing panics.
fn map_hook(hook: HookInput) -> Vec<AgentEvent> {
    let Some(session_id) = hook.session_id.clone().filter(|s| !s.is_empty()) else {
        tracing::debug!(hook = %hook.hook_event_name, "Hook without session_id, dropping");
        return Vec::new();
    };

    let ev = |payload: EventPayload| AgentEvent::new(&session_id, AgentKind::ClaudeCode, payload);

    match hook.hook_event_name.as_str() {
        "SessionStart" => vec![ev(EventPayload::SessionStarted {
            cwd: hook.cwd.unwrap_or_default(),
            name: None,
        })],
        "PreToolUse" => pre_tool_use(&hook, &ev),
        "PostToolUse" | "PostToolUseFailure" => match hook.tool_use_id {
            Some(tool_id) if !tool_id.is_empty() => {
                vec![ev(EventPayload::ToolCompleted { tool_id })]
            }
            _ => vec![ev(EventPayload::Activity)],
        },
        "Notification" => match hook.notification_type.as_deref() {
            Some("permission_prompt") => vec![ev(EventPayload::NeedsAttention {
                message: hook.tool_name.or(hook.message),
            })],
            Some("idle_prompt") => vec![ev(EventPayload::WaitingForInput)],
            _ => vec![ev(EventPayload::NeedsAttention {
                message: hook.message,
            })],
        },
        "PermissionRequest" => vec![ev(EventPayload::NeedsAttention {
            message: hook.tool_name,
        })],
        "Stop" => vec![ev(EventPayload::Idle)],
        "PreCompact" => vec![ev(EventPayload::Compacting)],
        "UserPromptSubmit" | "SubagentStart" | "SubagentStop" => vec![ev(EventPayload::Activity)],
        "SessionEnd" => vec![ev(EventPayload::SessionEnded)],
        other => {
            tracing::debug!(hook = %other, "Unknown hook, ignoring");
            Vec::new()
        }
    }
}

fn pre_tool_use(
    hook: &HookInput,
    ev: &impl Fn(EventPayload) -> AgentEvent,
) -> Vec<AgentEvent> {
    let (Some(tool_name), Some(tool_id)) = (hook.tool_name.clone(), hook.tool_use_id.clone())
    else {
        // Tool hooks without correlation ids still prove liveness
        return vec![ev(EventPayload::Activity)];
    };

    let tool_label = tool_label(&tool_name, hook.tool_input.as_ref());
    let mut events = vec![ev(EventPayload::ToolStarted {
        tool_id,
        tool_name: tool_name.clone(),
        tool_label,
    })];

    // `aura set-name "…"` run through Bash names the session; the ToolStarted
    // above is still emitted so the tool roundtrip stays balanced.
    if tool_name == "Bash" {
        if let Some(name) = hook
            .tool_input
            .as_ref()
            .and_then(|i| i.get("command"))
            .and_then(|c| c.as_str())
            .and_then(extract_set_name)
        {
            events.push(ev(EventPayload::SessionNameUpdated { name }));
        }
    }

    events
}

/// Pull the display name out of an `aura set-name "…"` command line
pub fn extract_set_name(command: &str) -> Option<String> {
    SET_NAME_RE
        .captures(command)
        .map(|caps| caps[1].to_string())
}

/// Body of `aura hook --agent claude-code`: read stdin, parse, forward.
///
/// Exit behavior per the CLI contract: parse failure propagates (non-zero),
/// an unreachable daemon does not.
pub async fn run(socket_path: &Path, should_notify: bool) -> crate::errors::Result<()> {
    use std::io::Read;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        return Ok(());
    }

    let hook: HookInput = serde_json::from_str(&input)?;
    let project = hook
        .cwd
        .as_deref()
        .and_then(|c| Path::new(c).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let events = map_hook(hook);

    if events.is_empty() {
        return Ok(());
    }

    if should_notify {
        notify_attention(&events, &project);
    }

    send_events(socket_path, &events).await;
    Ok(())
}

/// Best-effort delivery; the daemon being down is not an error
async fn send_events(socket_path: &Path, events: &[AgentEvent]) {
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;
    use tokio::time::{timeout, Duration};

    if !socket_path.exists() {
        tracing::debug!("Daemon socket missing, dropping {} event(s)", events.len());
        return;
    }

    let connect = timeout(Duration::from_millis(500), UnixStream::connect(socket_path)).await;
    let Ok(Ok(mut stream)) = connect else {
        tracing::debug!("Daemon unreachable at {:?}", socket_path);
        return;
    };

    for event in events {
        let frame = WireFrame::Event {
            event: event.clone(),
        };
        let Ok(line) = frame.to_line() else { continue };
        if timeout(Duration::from_millis(500), stream.write_all(line.as_bytes()))
            .await
            .is_err()
        {
            tracing::debug!("Write to daemon timed out");
            return;
        }
    }
    let _ = stream.shutdown().await;
}

fn notify_attention(events: &[AgentEvent], project: &str) {
    for event in events {
        match &event.payload {
            EventPayload::NeedsAttention { message } => {
                let tool = message.as_deref().unwrap_or("A tool");
                notify::send("Aura", &format!("{tool} needs permission in {project}"));
            }
            EventPayload::WaitingForInput => {
                notify::send("Aura", &format!("Input needed in {project}"));
            }
            _ => {}
        }
    }
}
