//! Codex rollout watcher
//!
//! Codex writes append-only JSONL session files under
//! `$CODEX_HOME/sessions/`. This adapter discovers them, bootstraps the
//! recently-active ones, and tails every file by byte offset, translating
//! rollout records into normalized events applied straight to the registry
//! (in-process; no socket hop).
//!
//! Filesystem notifications are best-effort: a periodic rescan re-lists the
//! tree and re-reads from recorded offsets, so dropped notifications delay
//! updates but never corrupt state. The watcher never removes sessions;
//! abandoned Codex sessions go Stale through the registry's own timers.

mod schema;

use crate::config::{BOOTSTRAP_REPLAY_MAX, BOOTSTRAP_WINDOW, RESCAN_INTERVAL};
use crate::event::{AgentEvent, AgentKind, EventPayload};
use crate::hook::extract_set_name;
use crate::registry::Registry;
use notify::{RecursiveMode, Watcher};
use schema::{EventMsgPayload, ResponseItemPayload, RolloutRecord};
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// Rollout root: `$CODEX_HOME/sessions`, defaulting to `~/.codex/sessions`
pub fn sessions_root() -> PathBuf {
    let codex_home = std::env::var("CODEX_HOME").map_or_else(
        |_| {
            directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".codex"))
                .unwrap_or_else(|| PathBuf::from("/tmp/.codex"))
        },
        PathBuf::from,
    );
    codex_home.join("sessions")
}

/// Per-file tail state
#[derive(Debug, Default)]
struct FileState {
    /// Byte offset of the next unread byte
    offset: u64,
    /// Trailing partial line buffered until its newline arrives
    partial: String,
    /// Session identity from the file's `session_meta` line
    session_id: Option<String>,
    /// Once a name was set (set-name or preview), previews stop applying
    name_seen: bool,
}

pub struct RolloutWatcher {
    registry: Registry,
    root: PathBuf,
    files: HashMap<PathBuf, FileState>,
}

impl RolloutWatcher {
    pub fn new(registry: Registry, root: PathBuf) -> Self {
        Self {
            registry,
            root,
            files: HashMap::new(),
        }
    }

    /// Watch until cancelled. Notification loss is tolerated via the rescan
    /// tick; a missing root directory is tolerated until it appears.
    pub async fn run(mut self, cancel: CancellationToken) -> crate::errors::Result<()> {
        self.initial_scan();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })?;

        let mut watching = false;
        if self.root.exists() {
            watcher.watch(&self.root, RecursiveMode::Recursive)?;
            watching = true;
        }
        tracing::info!(root = ?self.root, watching, "Rollout watcher started");

        let mut rescan = tokio::time::interval(RESCAN_INTERVAL);
        rescan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Rollout watcher cancelled");
                    break;
                }
                Some(event) = rx.recv() => self.handle_fs_event(&event),
                _ = rescan.tick() => {
                    if !watching && self.root.exists() {
                        if watcher.watch(&self.root, RecursiveMode::Recursive).is_ok() {
                            watching = true;
                            tracing::info!(root = ?self.root, "Rollout root appeared, watching");
                        }
                    }
                    self.rescan();
                }
            }
        }
        Ok(())
    }

    fn handle_fs_event(&mut self, event: &notify::Event) {
        use notify::EventKind;
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                for path in &event.paths {
                    if is_rollout_file(path) {
                        self.process_file(path);
                    }
                }
            }
            // Deleted files stop being tailed; their sessions stay (and go
            // Stale through the registry timers)
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.files.remove(path);
                }
            }
            _ => {}
        }
    }

    /// Startup pass: bootstrap recently-modified files, register the rest
    /// passively at end-of-file so they activate on first append.
    fn initial_scan(&mut self) {
        for path in list_rollout_files(&self.root) {
            let fresh = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
                .is_some_and(|age| age <= BOOTSTRAP_WINDOW);

            if fresh {
                self.bootstrap(&path);
            } else {
                let offset = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                self.files.insert(
                    path,
                    FileState {
                        offset,
                        ..FileState::default()
                    },
                );
            }
        }
        tracing::info!(files = self.files.len(), "Rollout discovery complete");
    }

    /// Fallback for dropped notifications: re-list and re-read from offsets
    fn rescan(&mut self) {
        for path in list_rollout_files(&self.root) {
            self.process_file(&path);
        }
    }

    /// Seed the registry from an active file: the session itself plus at
    /// most the last few response-item / event-msg records, regardless of
    /// file size.
    fn bootstrap(&mut self, path: &Path) {
        let Ok(text) = std::fs::read_to_string(path) else {
            tracing::debug!(?path, "Unreadable rollout file, skipping bootstrap");
            return;
        };

        let mut state = FileState {
            offset: text.len() as u64,
            ..FileState::default()
        };
        let mut tail: VecDeque<&str> = VecDeque::with_capacity(BOOTSTRAP_REPLAY_MAX);

        for line in text.lines() {
            match serde_json::from_str::<RolloutRecord>(line) {
                Ok(RolloutRecord::SessionMeta(meta)) => {
                    if state.session_id.is_none() {
                        state.session_id = Some(meta.payload.id.clone());
                        self.registry.apply(AgentEvent::new(
                            meta.payload.id,
                            AgentKind::Codex,
                            EventPayload::SessionStarted {
                                cwd: meta.payload.cwd,
                                name: None,
                            },
                        ));
                    }
                }
                Ok(RolloutRecord::ResponseItem(_) | RolloutRecord::EventMsg(_)) => {
                    if tail.len() >= BOOTSTRAP_REPLAY_MAX {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                _ => {}
            }
        }

        if state.session_id.is_none() {
            // No identity yet; stay passive until the meta line appears
            self.files.insert(path.to_path_buf(), state);
            return;
        }

        for line in tail {
            for event in map_line(&mut state, line) {
                self.registry.apply(event);
            }
        }
        self.files.insert(path.to_path_buf(), state);
    }

    /// Read appended bytes from the recorded offset and apply every complete
    /// line; a trailing partial line waits for the rest of its bytes.
    fn process_file(&mut self, path: &Path) {
        let Ok(meta) = std::fs::metadata(path) else {
            return;
        };
        let len = meta.len();

        let state = self.files.entry(path.to_path_buf()).or_default();
        if len < state.offset {
            // Truncated or rotated underneath us; start over
            state.offset = 0;
            state.partial.clear();
        }
        if len == state.offset {
            return;
        }

        let Ok(mut file) = std::fs::File::open(path) else {
            return;
        };
        if file.seek(SeekFrom::Start(state.offset)).is_err() {
            return;
        }
        let mut appended = String::new();
        if file.read_to_string(&mut appended).is_err() {
            tracing::debug!(?path, "Non-UTF-8 rollout append, skipping");
            state.offset = len;
            state.partial.clear();
            return;
        }
        state.offset = len;

        // Passive file producing its first append: recover identity from the
        // header before mapping anything.
        if state.session_id.is_none() {
            if let Some((id, cwd)) = read_header(path) {
                state.session_id = Some(id.clone());
                self.registry.apply(AgentEvent::new(
                    id,
                    AgentKind::Codex,
                    EventPayload::SessionStarted { cwd, name: None },
                ));
            }
        }

        let mut buffer = std::mem::take(&mut state.partial);
        buffer.push_str(&appended);

        let mut events = Vec::new();
        let mut rest = buffer.as_str();
        while let Some(nl) = rest.find('\n') {
            let (line, remainder) = rest.split_at(nl);
            events.extend(map_line(state, line));
            rest = &remainder[1..];
        }
        state.partial = rest.to_string();

        for event in events {
            self.registry.apply(event);
        }
    }
}

/// Map one complete rollout line to its events. Malformed lines are skipped
/// individually; lines before the file's `session_meta` carry no session
/// identity and are dropped.
fn map_line(state: &mut FileState, line: &str) -> Vec<AgentEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    let record: RolloutRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed rollout line, skipping");
            return Vec::new();
        }
    };

    if let RolloutRecord::SessionMeta(meta) = &record {
        state.session_id = Some(meta.payload.id.clone());
        return vec![AgentEvent::new(
            meta.payload.id.clone(),
            AgentKind::Codex,
            EventPayload::SessionStarted {
                cwd: meta.payload.cwd.clone(),
                name: None,
            },
        )];
    }

    let Some(session_id) = state.session_id.clone() else {
        return Vec::new();
    };
    let ev = |payload: EventPayload| AgentEvent::new(&session_id, AgentKind::Codex, payload);

    match record {
        RolloutRecord::ResponseItem(item) => match item.payload {
            ResponseItemPayload::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                let args: Option<serde_json::Value> = serde_json::from_str(&arguments).ok();
                let mut events = vec![ev(EventPayload::ToolStarted {
                    tool_id: call_id,
                    tool_name: name,
                    tool_label: args.as_ref().and_then(call_label),
                })];
                if let Some(command) = args.as_ref().and_then(command_string) {
                    if let Some(name) = extract_set_name(&command) {
                        state.name_seen = true;
                        events.push(ev(EventPayload::SessionNameUpdated { name }));
                    }
                }
                events
            }
            ResponseItemPayload::FunctionCallOutput { call_id } => {
                vec![ev(EventPayload::ToolCompleted { tool_id: call_id })]
            }
            ResponseItemPayload::Unknown => Vec::new(),
        },
        RolloutRecord::EventMsg(msg) => match msg.payload {
            EventMsgPayload::TaskComplete => vec![ev(EventPayload::Idle)],
            EventMsgPayload::RequestUserInput => vec![ev(EventPayload::WaitingForInput)],
            EventMsgPayload::ContextCompacted => vec![ev(EventPayload::Compacting)],
            EventMsgPayload::TurnStarted { preview } => {
                match preview.filter(|p| !p.is_empty() && !state.name_seen) {
                    Some(preview) => {
                        state.name_seen = true;
                        vec![ev(EventPayload::SessionNameUpdated { name: preview })]
                    }
                    None => Vec::new(),
                }
            }
            EventMsgPayload::Unknown => Vec::new(),
        },
        RolloutRecord::SessionMeta(_) | RolloutRecord::Unknown => Vec::new(),
    }
}

/// Best-effort tool label from a function call's argument object
fn call_label(args: &serde_json::Value) -> Option<String> {
    if let Some(command) = command_string(args) {
        return Some(command);
    }
    ["description", "file_path", "pattern", "url", "query"]
        .iter()
        .find_map(|key| {
            args.get(key)?
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
}

/// Shell-style `command` argument, either an argv array or a plain string
fn command_string(args: &serde_json::Value) -> Option<String> {
    match args.get("command")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(parts) => {
            let words: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
            if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            }
        }
        _ => None,
    }
}

/// Scan the first lines of a rollout file for its `session_meta` identity
fn read_header(path: &Path) -> Option<(String, String)> {
    let file = std::fs::File::open(path).ok()?;
    let reader = BufReader::new(file);
    for line in reader.lines().take(10).map_while(Result::ok) {
        if let Ok(RolloutRecord::SessionMeta(meta)) = serde_json::from_str(&line) {
            return Some((meta.payload.id, meta.payload.cwd));
        }
    }
    None
}

fn is_rollout_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

fn list_rollout_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_rollout_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionState;
    use serde_json::json;
    use std::io::Write;

    const META: &str = r#"{"type":"session_meta","payload":{"id":"c-1","cwd":"/u/dev/app","originator":"codex","cli_version":"0.5.0"}}"#;

    fn call(id: &str, name: &str, args: serde_json::Value) -> String {
        serde_json::json!({
            "type": "response_item",
            "payload": {
                "type": "function_call",
                "call_id": id,
                "name": name,
                "arguments": args.to_string(),
            }
        })
        .to_string()
    }

    fn output(id: &str) -> String {
        format!(
            r#"{{"type":"response_item","payload":{{"type":"function_call_output","call_id":"{id}"}}}}"#
        )
    }

    fn watcher() -> (RolloutWatcher, Registry, tempfile::TempDir) {
        let registry = Registry::new();
        let dir = tempfile::tempdir().unwrap();
        let watcher = RolloutWatcher::new(registry.clone(), dir.path().to_path_buf());
        (watcher, registry, dir)
    }

    #[test]
    fn test_map_line_session_then_tools() {
        let mut state = FileState::default();

        let events = map_line(&mut state, META);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, "c-1");
        assert_eq!(events[0].agent_kind, AgentKind::Codex);

        let events = map_line(&mut state, &call("call_1", "shell", json!({"command":["cargo","check"]})));
        assert_eq!(
            events[0].payload,
            EventPayload::ToolStarted {
                tool_id: "call_1".to_string(),
                tool_name: "shell".to_string(),
                tool_label: Some("cargo check".to_string()),
            }
        );

        let events = map_line(&mut state, &output("call_1"));
        assert_eq!(
            events[0].payload,
            EventPayload::ToolCompleted {
                tool_id: "call_1".to_string()
            }
        );
    }

    #[test]
    fn test_lines_before_session_meta_are_dropped() {
        let mut state = FileState::default();
        assert!(map_line(&mut state, &call("c1", "shell", json!({}))).is_empty());
        assert!(map_line(&mut state, r#"{"type":"event_msg","payload":{"type":"task_complete"}}"#).is_empty());
    }

    #[test]
    fn test_event_msg_mapping() {
        let mut state = FileState {
            session_id: Some("c-1".to_string()),
            ..FileState::default()
        };
        let cases = [
            (r#"{"type":"event_msg","payload":{"type":"task_complete"}}"#, EventPayload::Idle),
            (
                r#"{"type":"event_msg","payload":{"type":"request_user_input"}}"#,
                EventPayload::WaitingForInput,
            ),
            (
                r#"{"type":"event_msg","payload":{"type":"context_compacted"}}"#,
                EventPayload::Compacting,
            ),
        ];
        for (line, expected) in cases {
            let events = map_line(&mut state, line);
            assert_eq!(events[0].payload, expected, "{line}");
        }
    }

    #[test]
    fn test_set_name_via_shell_command() {
        let mut state = FileState {
            session_id: Some("c-1".to_string()),
            ..FileState::default()
        };
        let events = map_line(
            &mut state,
            &call("c9", "shell", json!({"command":["aura","set-name","\"Deploy\""]})),
        );
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].payload,
            EventPayload::SessionNameUpdated {
                name: "Deploy".to_string()
            }
        );
        assert!(state.name_seen);
    }

    #[test]
    fn test_turn_preview_names_only_once() {
        let mut state = FileState {
            session_id: Some("c-1".to_string()),
            ..FileState::default()
        };
        let preview =
            r#"{"type":"event_msg","payload":{"type":"turn_started","preview":"First turn"}}"#;
        let events = map_line(&mut state, preview);
        assert_eq!(
            events[0].payload,
            EventPayload::SessionNameUpdated {
                name: "First turn".to_string()
            }
        );

        let second =
            r#"{"type":"event_msg","payload":{"type":"turn_started","preview":"Second turn"}}"#;
        assert!(map_line(&mut state, second).is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped_individually() {
        let mut state = FileState {
            session_id: Some("c-1".to_string()),
            ..FileState::default()
        };
        assert!(map_line(&mut state, "{ not json").is_empty());
        assert!(map_line(&mut state, "").is_empty());
        let events = map_line(&mut state, &output("c1"));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_bootstrap_caps_replay_regardless_of_file_size() {
        let (mut watcher, registry, dir) = watcher();
        let path = dir.path().join("big.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{META}").unwrap();
        for i in 0..10_000 {
            writeln!(file, "{}", call(&format!("call_{i}"), "shell", json!({"command":["ls"]}))).unwrap();
        }
        drop(file);

        watcher.bootstrap(&path);

        let sessions = registry.snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "c-1");
        assert_eq!(sessions[0].cwd, "/u/dev/app");
        // Only the tail was replayed: at most 4 events past SessionStarted
        assert_eq!(sessions[0].running_tools.len(), BOOTSTRAP_REPLAY_MAX);
        assert_eq!(sessions[0].running_tools[0].tool_id, "call_9996");
    }

    #[test]
    fn test_tailing_buffers_partial_lines() {
        let (mut watcher, registry, dir) = watcher();
        let path = dir.path().join("live.jsonl");
        std::fs::write(&path, format!("{META}\n")).unwrap();
        watcher.process_file(&path);
        assert_eq!(registry.len(), 1);

        // Half a line: nothing applies yet
        let full = call("call_1", "shell", json!({"command":["ls"]}));
        let (head, rest) = full.split_at(30);
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{head}").unwrap();
        file.flush().unwrap();
        watcher.process_file(&path);
        assert!(registry.snapshot()[0].running_tools.is_empty());

        // The remainder arrives and the line completes
        writeln!(file, "{rest}").unwrap();
        drop(file);
        watcher.process_file(&path);
        assert_eq!(registry.snapshot()[0].running_tools.len(), 1);
    }

    #[test]
    fn test_passive_file_activates_on_append() {
        let (mut watcher, registry, dir) = watcher();
        let path = dir.path().join("old.jsonl");
        std::fs::write(&path, format!("{META}\n")).unwrap();

        // Registered passively at end-of-file, as for stale-mtime files
        let len = std::fs::metadata(&path).unwrap().len();
        watcher.files.insert(
            path.clone(),
            FileState {
                offset: len,
                ..FileState::default()
            },
        );
        assert!(registry.is_empty());

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{}", call("call_1", "shell", json!({"command":["make"]}))).unwrap();
        drop(file);
        watcher.process_file(&path);

        let sessions = registry.snapshot();
        assert_eq!(sessions.len(), 1, "header read recovered the session");
        assert_eq!(sessions[0].state, SessionState::Running);
        assert_eq!(sessions[0].running_tools.len(), 1);
    }

    #[test]
    fn test_truncated_file_restarts_from_zero() {
        let (mut watcher, registry, dir) = watcher();
        let path = dir.path().join("rotate.jsonl");
        std::fs::write(&path, format!("{META}\n{}\n", call("a", "shell", json!({})))).unwrap();
        watcher.process_file(&path);
        assert_eq!(registry.snapshot()[0].running_tools.len(), 1);

        std::fs::write(&path, format!("{META}\n")).unwrap();
        watcher.process_file(&path);
        // No crash, offset reset; session restarted with tools cleared
        assert!(registry.snapshot()[0].running_tools.is_empty());
    }
}
