//! Minimal stdio MCP server used by the integration tests
//!
//! Advertises a single `say_hello` tool. Behaviour switches, read from the
//! environment:
//!
//! - `MOCK_MCP_NOISE=1`: precede every response with a notification and a
//!   response carrying an unrelated id
//! - `MOCK_MCP_EXIT_ON_CALL=1`: exit without answering `tools/call`
//! - `MOCK_MCP_NO_INIT_RESULT=1`: answer `initialize` without a `result`
//!
//! A `delay_ms` argument to `say_hello` delays its response.

use std::time::Duration;

use multillm_mcp::{FrameReader, FrameWriter, McpError};
use serde_json::{Value, json};

struct Flags {
    noise: bool,
    exit_on_call: bool,
    no_init_result: bool,
}

impl Flags {
    fn from_env() -> Self {
        let on = |name: &str| std::env::var(name).is_ok_and(|v| v == "1");
        Self {
            noise: on("MOCK_MCP_NOISE"),
            exit_on_call: on("MOCK_MCP_EXIT_ON_CALL"),
            no_init_result: on("MOCK_MCP_NO_INIT_RESULT"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::from_env();
    let mut reader = FrameReader::new(tokio::io::stdin());
    let mut writer = FrameWriter::new(tokio::io::stdout());
    let mut initialized = false;

    eprintln!("mock-mcp-server ready");

    loop {
        let frame = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(McpError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let message: Value = serde_json::from_slice(&frame)?;
        let method = message["method"].as_str().unwrap_or_default();

        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            if method == "notifications/initialized" {
                initialized = true;
            }
            continue;
        };

        let params = &message["params"];
        let reply = match method {
            "initialize" if flags.no_init_result => json!({"jsonrpc": "2.0", "id": id}),
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": params["protocolVersion"],
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "mcp-demo-server", "version": "1.0.0"},
                    "_meta": {"clientInfo": params["clientInfo"]},
                },
            }),
            "tools/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": [{
                        "name": "say_hello",
                        "description": "Returns greeting",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"name": {"type": "string"}},
                            "required": ["name"],
                        },
                    }],
                    "_meta": {"requestId": id, "initialized": initialized},
                },
            }),
            "tools/call" if flags.exit_on_call => return Ok(()),
            "tools/call" => call_tool(id, params, initialized).await,
            other => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("Method not found: {other}")},
            }),
        };

        if flags.noise {
            writer
                .write_json(&json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}}))
                .await?;
            writer
                .write_json(&json!({"jsonrpc": "2.0", "id": id + 1000, "result": {"stray": true}}))
                .await?;
        }
        writer.write_json(&reply).await?;
    }
}

async fn call_tool(id: u64, params: &Value, initialized: bool) -> Value {
    let tool = params["name"].as_str().unwrap_or_default();
    let arguments = &params["arguments"];

    if tool != "say_hello" {
        return json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32602, "message": format!("Unknown tool: {tool}")},
        });
    }

    if let Some(delay) = arguments["delay_ms"].as_u64() {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let (text, is_error) = match arguments["name"].as_str() {
        Some(name) => (format!("Hello, {name}!"), false),
        None => ("missing required argument: name".to_owned(), true),
    };

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [{"type": "text", "text": text}],
            "isError": is_error,
            "_meta": {"requestId": id, "initialized": initialized},
        },
    })
}
