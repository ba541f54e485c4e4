//! Tool-label extraction from hook `tool_input` payloads
//!
//! Labels are a best-effort, human-scannable hint of what a tool is doing
//! ("main.rs", "npm test"). Extraction never fails; a tool with no usable
//! field simply has no label and the UI falls back to the tool name.

use serde_json::Value;
use std::path::Path;

/// Extract the display label for a starting tool, per tool kind
pub fn tool_label(tool_name: &str, tool_input: Option<&Value>) -> Option<String> {
    let input = tool_input?;

    if tool_name.starts_with("mcp__") {
        return mcp_label(input);
    }

    match tool_name {
        "Bash" => field(input, "description").or_else(|| field(input, "command")),
        "Read" | "Write" | "Edit" => field(input, "file_path").map(|p| file_basename(&p)),
        "NotebookEdit" => field(input, "notebook_path").map(|p| file_basename(&p)),
        "Glob" | "Grep" => field(input, "pattern"),
        "WebFetch" => field(input, "url"),
        "WebSearch" => field(input, "query"),
        "Task" => field(input, "description"),
        "Skill" => field(input, "skill"),
        _ => None,
    }
}

/// MCP tool inputs have server-defined shapes; probe the common fields
fn mcp_label(input: &Value) -> Option<String> {
    ["description", "query", "url", "file_path", "pattern", "command"]
        .iter()
        .find_map(|key| field(input, key))
}

fn field(input: &Value, key: &str) -> Option<String> {
    input
        .get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn file_basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
