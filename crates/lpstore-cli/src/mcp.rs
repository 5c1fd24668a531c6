//! MCP (Model Context Protocol) server for `lpstore`.
//!
//! Implements a JSON-RPC 2.0 server over stdio that exposes the storage proxy
//! operations as MCP tools, so AI coding assistants can check how much space a
//! project uses and which files it holds.
//!
//! Protocol: newline-delimited JSON-RPC 2.0 messages on stdin/stdout. Stdout
//! carries protocol messages only; diagnostics go through `tracing` to stderr.

use anyhow::{Context, Result};
use lpstore_client::{ProxyOperation, StorageClient};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";

// ── JSON-RPC 2.0 types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

// ── MCP protocol types ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct McpToolDefinition {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

// ── Tool definitions ─────────────────────────────────────────────────

/// MCP tool name mapped to the proxy operation it runs.
const TOOLS: [(&str, ProxyOperation); 2] = [
    ("get_storage_usage", ProxyOperation::Usage),
    ("list_project_files", ProxyOperation::List),
];

fn tool_definitions() -> Vec<McpToolDefinition> {
    vec![
        McpToolDefinition {
            name: "get_storage_usage",
            description: "Get storage quota and usage statistics for the project. Returns total_bytes, file_count, and quota_bytes. Use this to check how much storage space is available.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        McpToolDefinition {
            name: "list_project_files",
            description: "List all files in project storage. Returns array of file metadata including filename, size, content_type, and public URL if applicable. Use this to see what files have been uploaded.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

// ── Tool dispatch ────────────────────────────────────────────────────

async fn dispatch_tool(client: &StorageClient, name: &str) -> Value {
    let result = match TOOLS.iter().find(|(tool, _)| *tool == name) {
        Some((_, op)) => client
            .call_storage_proxy(*op)
            .await
            .map_err(anyhow::Error::from),
        None => Err(anyhow::anyhow!("unknown tool: {name}")),
    };

    match result {
        Ok(content) => json!({
            "content": [{
                "type": "text",
                "text": content
            }]
        }),
        Err(e) => {
            warn!(tool = name, error = %e, "tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {e:#}")
                }],
                "isError": true
            })
        }
    }
}

// ── MCP server main loop ─────────────────────────────────────────────

fn rpc_ok(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: Some(result),
        error: None,
    }
}

fn rpc_err(id: Value, code: i64, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(JsonRpcError { code, message }),
    }
}

/// Handle a single JSON-RPC request and return a response.
async fn handle_request(client: &StorageClient, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = req.id.clone().unwrap_or(Value::Null);

    match req.method.as_str() {
        "initialize" => {
            let result = json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lpstore-mcp",
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            Some(rpc_ok(id, result))
        }

        // Sent by the client after the handshake, carries no id.
        "notifications/initialized" => None,

        "ping" => Some(rpc_ok(id, json!({}))),

        "tools/list" => {
            let tools = tool_definitions();
            Some(rpc_ok(id, json!({ "tools": tools })))
        }

        "tools/call" => {
            // A call without an id is a notification and gets no response.
            req.id.as_ref()?;
            let params = req.params.unwrap_or(Value::Null);
            let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
            debug!(tool = tool_name, "tool call");

            let result = dispatch_tool(client, tool_name).await;
            Some(rpc_ok(id, result))
        }

        _ => {
            // Notifications (no id) are ignored.
            req.id.as_ref()?;
            Some(rpc_err(
                id,
                -32601,
                format!("method not found: {}", req.method),
            ))
        }
    }
}

/// Handle one line of input and return the serialized response, if any.
async fn handle_line(client: &StorageClient, line: &str) -> Result<Option<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let resp = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
        Ok(req) => handle_request(client, req).await,
        Err(e) => Some(rpc_err(Value::Null, -32700, format!("parse error: {e}"))),
    };

    resp.map(|r| serde_json::to_string(&r).context("failed to serialize response"))
        .transpose()
}

/// Serve MCP requests read from `reader`, writing responses to `writer`,
/// until the reader reaches EOF.
///
/// # Errors
///
/// Returns `Err` if reading or writing fails.
pub async fn serve<R, W>(client: &StorageClient, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if let Some(out) = handle_line(client, &line).await? {
            writer
                .write_all(out.as_bytes())
                .await
                .context("failed to write response")?;
            writer
                .write_all(b"\n")
                .await
                .context("failed to write response")?;
            writer.flush().await.context("failed to flush response")?;
        }
    }

    Ok(())
}

/// Entry point: run the MCP server on stdin/stdout.
///
/// # Errors
///
/// Returns `Err` if stdin/stdout I/O fails.
pub async fn run_mcp_server(client: StorageClient) -> Result<()> {
    info!(
        project = %client.config().project_id,
        endpoint = %client.endpoint(),
        "mcp server started, reading from stdin"
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(&client, stdin, tokio::io::stdout()).await?;

    info!("stdin closed, shutting down");
    Ok(())
}
