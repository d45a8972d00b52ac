//! MCP server over stdio: newline-delimited JSON-RPC 2.0.
//!
//! Requests are handled one at a time in arrival order. Tool failures are
//! reported inside a successful result with `isError` set; protocol failures
//! use JSON-RPC error objects.

use std::io::{BufRead, Write};

use serde_json::{Value, json};

use crate::error::Error;
use crate::tools;

/// Protocol revision announced during `initialize`.
const PROTOCOL_VERSION: &str = "2025-06-18";

/// Shared description of the `project_path` argument.
const PROJECT_PATH: &str = "Absolute path to the project root";

/// Shared description of the `response_format` argument.
const RESPONSE_FORMAT: &str = "Output format: markdown (default) or json";

/// Answer one request line. `None` for notifications, which get no response.
pub fn handle_line(line: &str) -> Option<Value> {
    let Ok(message) = serde_json::from_str::<Value>(line) else {
        return Some(json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": { "code": -32700, "message": "Parse error" }
        }));
    };

    let method = message.get("method").and_then(Value::as_str).unwrap_or_default();
    if method.starts_with("notifications/") {
        return None;
    }
    let id = message.get("id").cloned().unwrap_or(Value::Null);
    log::debug!("request {id}: {method}");

    let result = match method {
        "initialize" => json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "docmgr", "version": env!("CARGO_PKG_VERSION") }
        }),
        "ping" => json!({}),
        "tools/call" => {
            let params = message.get("params").cloned().unwrap_or_else(|| return json!({}));
            let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| return json!({}));
            let text = tools::call(name, arguments);
            let is_error = text.starts_with("Error:");
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": is_error
            })
        },
        "tools/list" => json!({ "tools": tool_definitions() }),
        _ => {
            return Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            }));
        },
    };
    return Some(json!({ "jsonrpc": "2.0", "id": id, "result": result }));
}

/// Serve requests from `input` until it closes, one response line each.
///
/// # Errors
///
/// Returns `Error::Io` when reading a request or writing a response fails.
pub fn serve(input: impl BufRead, mut output: impl Write) -> Result<(), Error> {
    log::info!("MCP server ready ({} tools)", tool_definitions().as_array().map_or(0, Vec::len));
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_line(&line) {
            writeln!(output, "{response}")?;
            output.flush()?;
        }
    }
    log::info!("input closed, MCP server stopping");
    return Ok(());
}

/// Tool catalogue returned by `tools/list`.
#[allow(clippy::too_many_lines, reason = "declarative catalogue, one entry per tool")]
pub fn tool_definitions() -> Value {
    return json!([
        {
            "name": tools::INITIALIZE_CONFIG,
            "description": "Create .doc-manager.yml with the detected platform, docs directory, language and exclude patterns. Does nothing if the file already exists.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "platform": { "type": "string", "enum": platform_names(), "description": "Documentation platform; detected when omitted" },
                    "exclude_patterns": { "type": "array", "items": { "type": "string" }, "description": "Glob patterns to exclude (max 50)" }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::INITIALIZE_MEMORY,
            "description": "Create .doc-manager/ with a checksum baseline of the repository, a documentation conventions template and an empty asset manifest.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::DETECT_PLATFORM,
            "description": "Detect documentation platforms from their configuration files and recommend one for the project.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "response_format": { "type": "string", "enum": ["markdown", "json"], "description": RESPONSE_FORMAT }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::ASSESS_QUALITY,
            "description": "Score documentation against seven criteria: relevance, accuracy, purposefulness, uniqueness, consistency, clarity and structure.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "docs_path": { "type": "string", "description": "Documentation directory relative to the project root" },
                    "criteria": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["relevance", "accuracy", "purposefulness", "uniqueness", "consistency", "clarity", "structure"] },
                        "description": "Criteria to assess; all when omitted"
                    },
                    "response_format": { "type": "string", "enum": ["markdown", "json"], "description": RESPONSE_FORMAT }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::VALIDATE_DOCS,
            "description": "Check documentation for broken links, missing images, missing alt text and code blocks that do not parse. Optionally check function and class mentions against the code.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "docs_path": { "type": "string", "description": "Documentation directory relative to the project root" },
                    "check_links": { "type": "boolean", "description": "Check relative links (default true)" },
                    "check_assets": { "type": "boolean", "description": "Check images and alt text (default true)" },
                    "check_snippets": { "type": "boolean", "description": "Parse tagged code blocks (default true)" },
                    "validate_symbols": { "type": "boolean", "description": "Check function and class mentions (default false)" },
                    "response_format": { "type": "string", "enum": ["markdown", "json"], "description": RESPONSE_FORMAT }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::MAP_CHANGES,
            "description": "List files changed since a commit or since the memory baseline, and the documents that reference them.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "since_commit": { "type": "string", "description": "Commit hash (7-40 hex characters); the memory baseline when omitted" },
                    "response_format": { "type": "string", "enum": ["markdown", "json"], "description": RESPONSE_FORMAT }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::TRACK_DEPENDENCIES,
            "description": "Extract code references from the documentation, resolve them against the project and write the dependency graph to .doc-manager/dependencies.json.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "docs_path": { "type": "string", "description": "Documentation directory relative to the project root" },
                    "response_format": { "type": "string", "enum": ["markdown", "json"], "description": RESPONSE_FORMAT }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::BOOTSTRAP,
            "description": "Create a starter documentation set (overview, getting started and API reference) in an empty directory.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "platform": { "type": "string", "enum": platform_names(), "description": "Documentation platform; recommended when omitted" },
                    "docs_path": { "type": "string", "description": "Directory to create (default docs)" }
                },
                "required": ["project_path"]
            }
        },
        {
            "name": tools::MIGRATE,
            "description": "Move an existing documentation tree to a new directory, with git mv when possible so history follows.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "existing_docs_path": { "type": "string", "description": "Current documentation directory" },
                    "new_docs_path": { "type": "string", "description": "Destination directory (default docs-new)" },
                    "target_platform": { "type": "string", "enum": platform_names(), "description": "Platform recorded for the new layout" },
                    "preserve_history": { "type": "boolean", "description": "Use git mv (default true)" },
                    "dry_run": { "type": "boolean", "description": "Report the plan without moving anything (default false)" }
                },
                "required": ["project_path", "existing_docs_path"]
            }
        },
        {
            "name": tools::SYNC,
            "description": "Report changes since the baseline, the docs that need review and their validation issues. Proactive mode also rebuilds the dependency graph and refreshes the baseline.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_path": { "type": "string", "description": PROJECT_PATH },
                    "mode": { "type": "string", "enum": ["reactive", "proactive"], "description": "reactive (default) reports only" },
                    "response_format": { "type": "string", "enum": ["markdown", "json"], "description": RESPONSE_FORMAT }
                },
                "required": ["project_path"]
            }
        }
    ]);
}

/// Lowercase names accepted for platform arguments.
fn platform_names() -> Value {
    return json!(["hugo", "docusaurus", "mkdocs", "sphinx", "vitepress", "jekyll", "gitbook"]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_has_null_id() {
        let response = handle_line("{not json").unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());
    }

    #[test]
    fn notifications_get_no_response() {
        assert!(handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
    }

    #[test]
    fn initialize_and_ping() {
        let response = handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "docmgr");

        let response = handle_line(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).unwrap();
        assert_eq!(response["id"], "p");
        assert!(response["result"].as_object().unwrap().is_empty());
    }

    #[test]
    fn lists_all_tools_with_schemas() {
        let response = handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).unwrap();
        let listed = response["result"]["tools"].as_array().unwrap();
        assert_eq!(listed.len(), 10);
        for tool in listed {
            assert!(tool["name"].as_str().unwrap().starts_with("docmgr_"));
            assert_eq!(tool["inputSchema"]["required"][0], "project_path");
        }
    }

    #[test]
    fn tool_failure_sets_is_error() {
        let line = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"docmgr_sync","arguments":{"project_path":"relative"}}}"#;
        let response = handle_line(line).unwrap();
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: InvalidPath:"));
    }

    #[test]
    fn unknown_method() {
        let response = handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#).unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], 4);
    }

    #[test]
    fn serve_answers_each_request_in_order() {
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n\
                     {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\
                     {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let mut output = Vec::new();
        serve(input.as_bytes(), &mut output).unwrap();
        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
    }
}
