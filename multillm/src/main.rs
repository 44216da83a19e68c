#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use args::{Args, Command, ToolsCommand};
use clap::Parser;
use multillm_config::Config;
use multillm_mcp::{McpClient, StdioMcpClient};
use serde_json::{Value, json};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    multillm_telemetry::init(Some(&config.telemetry), "warn")?;

    tracing::debug!(config_path = %args.config.display(), "configuration loaded");

    let registry = config.mcp.registry()?;

    let Command::Tools(command) = args.command;
    let (server, output) = match command {
        ToolsCommand::List { server } => {
            let client = registry.client(&server)?;
            let outcome = client.list_tools().await;
            client.shutdown().await;

            let tools = outcome?;
            let listed: Vec<Value> = tools
                .into_iter()
                .map(|tool| json!({ "name": tool.name, "description": tool.description, "inputSchema": tool.input_schema }))
                .collect();
            (server, Value::Array(listed))
        }
        ToolsCommand::Call {
            server,
            tool,
            arguments,
        } => {
            let arguments: Value = serde_json::from_str(&arguments)
                .map_err(|e| anyhow::anyhow!("--arguments is not valid JSON: {e}"))?;

            let client = registry.client(&server)?;
            let outcome = call(&client, &tool, arguments).await;
            client.shutdown().await;

            (server, outcome?)
        }
    };

    tracing::debug!(server = %server, "MCP command finished");
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn call(client: &StdioMcpClient, tool: &str, arguments: Value) -> anyhow::Result<Value> {
    let result = client.call_tool(tool, arguments).await?;

    Ok(json!({
        "tool": result.tool_name,
        "isError": result.is_error,
        "result": result.result,
    }))
}
