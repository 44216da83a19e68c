mod harness;

use std::sync::Arc;
use std::time::Duration;

use harness::mcp::{mock_server, mock_server_with, spawn};
use multillm_core::MessagePart;
use multillm_mcp::{McpClient, McpError, McpServerRegistry};
use serde_json::json;

#[tokio::test]
async fn lists_the_declared_tool() {
    let client = spawn(mock_server());

    let tools = client.list_tools().await.unwrap();

    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "say_hello");
    assert_eq!(tools[0].description, "Returns greeting");
    assert_eq!(tools[0].input_schema["required"], json!(["name"]));

    client.shutdown().await;
}

#[tokio::test]
async fn calls_say_hello() {
    let client = spawn(mock_server());

    let result = client.call_tool("say_hello", json!({"name": "World"})).await.unwrap();

    assert_eq!(result.tool_name, "say_hello");
    assert!(!result.is_error);
    assert_eq!(result.text(), "Hello, World!");

    client.shutdown().await;
}

#[tokio::test]
async fn handshake_precedes_first_request_and_ids_start_at_one() {
    let client = spawn(mock_server());

    let first = client.call_tool("say_hello", json!({"name": "a"})).await.unwrap();
    let second = client.call_tool("say_hello", json!({"name": "b"})).await.unwrap();

    // id 1 went to initialize
    assert_eq!(first.result["_meta"], json!({"requestId": 2, "initialized": true}));
    assert_eq!(second.result["_meta"]["requestId"], 3);

    client.shutdown().await;
}

#[tokio::test]
async fn unrelated_messages_are_skipped() {
    let client = spawn(mock_server_with("MOCK_MCP_NOISE"));

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);

    let result = client.call_tool("say_hello", json!({"name": "noise"})).await.unwrap();
    assert_eq!(result.text(), "Hello, noise!");
    assert!(result.result.get("stray").is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn tool_level_failure_is_a_result_not_an_error() {
    let client = spawn(mock_server());

    let result = client.call_tool("say_hello", json!(null)).await.unwrap();
    assert!(result.is_error);
    assert_eq!(result.text(), "missing required argument: name");

    match result.into_tool_result_part("call-9") {
        MessagePart::ToolResult { call_id, is_error, result } => {
            assert_eq!(call_id, "call-9");
            assert!(is_error);
            assert_eq!(result["content"][0]["type"], "text");
        }
        other => panic!("unexpected part {other:?}"),
    }

    client.shutdown().await;
}

#[tokio::test]
async fn rpc_error_carries_raw_payload_and_keeps_connection() {
    let client = spawn(mock_server());

    let err = client.call_tool("nope", json!({})).await.unwrap_err();
    match err {
        McpError::Rpc { method, error } => {
            assert_eq!(method, "tools/call");
            assert_eq!(error, json!({"code": -32602, "message": "Unknown tool: nope"}));
        }
        other => panic!("unexpected error {other}"),
    }

    assert_eq!(client.list_tools().await.unwrap().len(), 1);
    client.shutdown().await;
}

#[tokio::test]
async fn timeout_fails_only_that_call() {
    let client = spawn(mock_server().request_timeout(Duration::from_millis(300)));
    client.list_tools().await.unwrap();

    let err = client
        .call_tool("say_hello", json!({"name": "late", "delay_ms": 1000}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Timeout { ref method, .. } if method == "tools/call"), "{err}");

    // The late answer arrives first and is discarded
    let client = Arc::new(client);
    let follow_up = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.call_tool("say_hello", json!({"name": "next"})).await {
                Err(McpError::Timeout { .. }) => {}
                other => break other,
            }
        }
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(follow_up.text(), "Hello, next!");

    client.shutdown().await;
}

#[tokio::test]
async fn server_exit_fails_the_in_flight_call_and_closes() {
    let client = spawn(mock_server_with("MOCK_MCP_EXIT_ON_CALL"));
    client.list_tools().await.unwrap();

    let err = client.call_tool("say_hello", json!({"name": "x"})).await.unwrap_err();
    assert!(matches!(err, McpError::ConnectionClosed), "{err}");
    assert!(matches!(client.list_tools().await, Err(McpError::Closed)));

    client.shutdown().await;
    client.shutdown().await;
}

#[tokio::test]
async fn initialize_without_result_is_fatal() {
    let client = spawn(mock_server_with("MOCK_MCP_NO_INIT_RESULT"));

    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, McpError::Handshake(_)), "{err}");
    assert!(matches!(client.list_tools().await, Err(McpError::Closed)));

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_before_any_request_is_quiet() {
    let client = spawn(mock_server());
    client.shutdown().await;
    client.shutdown().await;

    assert!(matches!(client.call_tool("say_hello", json!({})).await, Err(McpError::Closed)));
}

#[tokio::test]
async fn concurrent_callers_share_one_connection() {
    let client = Arc::new(spawn(mock_server()));

    let calls = (0..8).map(|i| {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.call_tool("say_hello", json!({"name": i.to_string()})).await })
    });
    let mut texts = Vec::new();
    for call in calls.collect::<Vec<_>>() {
        texts.push(call.await.unwrap().unwrap().text());
    }

    assert_eq!(texts.len(), 8);
    assert!(texts.contains(&"Hello, 7!".to_owned()));

    client.shutdown().await;
}

#[tokio::test]
async fn registry_starts_named_servers() {
    let registry = McpServerRegistry::default().with_server("demo", mock_server());

    let client = registry.client("demo").unwrap();
    assert_eq!(client.list_tools().await.unwrap()[0].name, "say_hello");
    client.shutdown().await;

    assert!(matches!(registry.client("other"), Err(McpError::ServerNotFound { .. })));
}
