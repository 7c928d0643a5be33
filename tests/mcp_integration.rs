#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! MCP Server Integration Tests
//!
//! Drive complete sessions through the server loop, with both
//! storage backends, and check the exact sequence of responses written back.

use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use todo_mcp::mcp::McpServer;
use todo_mcp::mcp::protocol::error_codes;
use todo_mcp::storage::{FileStore, MemoryStore, SharedStore};

fn memory_server() -> McpServer {
    McpServer::new(Arc::new(MemoryStore::new()))
}

/// Feed `lines` to the server and collect every response line
async fn run_session(server: &McpServer, lines: &[Value]) -> Vec<Value> {
    let input: String = lines.iter().map(|line| format!("{line}\n")).collect();
    run_raw_session(server, input.as_bytes()).await
}

async fn run_raw_session(server: &McpServer, input: &[u8]) -> Vec<Value> {
    let mut output = Vec::new();
    server
        .serve(input, &mut output)
        .await
        .expect("session should complete");

    let output = String::from_utf8(output).expect("output should be utf-8");
    output
        .lines()
        .map(|line| serde_json::from_str(line).expect("each output line is one JSON value"))
        .collect()
}

fn call_tool(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn tool_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result has text content")
}

fn is_tool_error(response: &Value) -> bool {
    response["result"]["isError"] == json!(true)
}

/// Decode the JSON document that follows a success prefix
fn json_after(text: &str, prefix: &str) -> Value {
    let body = text
        .strip_prefix(prefix)
        .unwrap_or_else(|| panic!("expected prefix {prefix:?} in {text:?}"));
    serde_json::from_str(body).expect("body should be JSON")
}

#[tokio::test]
async fn complete_todo_session() {
    let server = memory_server();

    let responses = run_session(
        &server,
        &[
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "integration", "version": "1.0"}
                }
            }),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            call_tool(3, "create_todo", json!({"title": "Buy milk"})),
            call_tool(4, "get_todos", json!({"status": "pending"})),
            call_tool(5, "update_todo", json!({"id": 1, "status": "completed"})),
            json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "resources/read",
                "params": {"uri": "todo://todos/completed"}
            }),
            call_tool(7, "delete_todo", json!({"id": 1})),
            call_tool(8, "get_todo", json!({"id": 1})),
        ],
    )
    .await;

    // The notification is not answered.
    assert_eq!(responses.len(), 8);
    let ids: Vec<Value> = responses.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, (1..=8).map(|id| json!(id)).collect::<Vec<_>>());
    for response in &responses {
        assert_eq!(response["jsonrpc"], "2.0");
        assert!(response.get("error").is_none(), "unexpected error: {response}");
    }

    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(
        responses[0]["result"]["serverInfo"]["name"],
        "todo-mcp-server"
    );

    let tools = responses[1]["result"]["tools"]
        .as_array()
        .expect("tools array");
    assert_eq!(tools.len(), 5);
    assert_eq!(tools[0]["name"], "create_todo");
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == "object"));

    let created = json_after(tool_text(&responses[2]), "Todo created successfully:\n");
    assert_eq!(created["id"], 1);
    assert_eq!(created["title"], "Buy milk");
    assert_eq!(created["status"], "pending");

    let pending: Value = serde_json::from_str(tool_text(&responses[3])).expect("listing");
    assert_eq!(pending["count"], 1);
    assert_eq!(pending["todos"][0]["title"], "Buy milk");

    let updated = json_after(tool_text(&responses[4]), "Todo updated successfully:\n");
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["created_at"], created["created_at"]);

    let contents = &responses[5]["result"]["contents"][0];
    assert_eq!(contents["uri"], "todo://todos/completed");
    assert_eq!(contents["mimeType"], "application/json");
    let completed: Value =
        serde_json::from_str(contents["text"].as_str().expect("text")).expect("listing");
    assert_eq!(completed["count"], 1);

    assert_eq!(
        tool_text(&responses[6]),
        "Todo with ID 1 deleted successfully"
    );

    assert!(is_tool_error(&responses[7]));
    assert_eq!(tool_text(&responses[7]), "Todo with ID 1 not found");
}

#[tokio::test]
async fn unknown_method_gets_method_not_found() {
    let responses = run_session(
        &memory_server(),
        &[json!({"jsonrpc": "2.0", "id": "abc", "method": "todos/archive"})],
    )
    .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], "abc");
    assert_eq!(
        responses[0]["error"]["code"],
        error_codes::METHOD_NOT_FOUND
    );
    assert_eq!(
        responses[0]["error"]["message"],
        "Method not found: todos/archive"
    );
    assert!(responses[0].get("result").is_none());
}

#[tokio::test]
async fn initialized_produces_no_output() {
    let responses = run_session(
        &memory_server(),
        &[json!({"jsonrpc": "2.0", "method": "initialized"})],
    )
    .await;

    assert!(responses.is_empty());
}

#[tokio::test]
async fn responses_follow_request_order() {
    let responses = run_session(
        &memory_server(),
        &[
            json!({"jsonrpc": "2.0", "id": 10, "method": "ping"}),
            json!({"jsonrpc": "2.0", "id": 11, "method": "resources/list"}),
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 10);
    assert_eq!(responses[0]["result"], json!({"message": "pong"}));
    assert_eq!(responses[1]["id"], 11);
    assert_eq!(
        responses[1]["result"]["resources"]
            .as_array()
            .map(Vec::len),
        Some(3)
    );
}

#[tokio::test]
async fn session_recovers_after_parse_error() {
    let input = concat!(
        "{\"jsonrpc\": \"2.0\", \"id\": 1, \"method\": ping}\n",
        "\n",
        "   \n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
    );

    let responses = run_raw_session(&memory_server(), input.as_bytes()).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], error_codes::PARSE_ERROR);
    assert_eq!(responses[0]["error"]["message"], "Parse error");
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[1]["result"]["message"], "pong");
}

#[tokio::test]
async fn invalid_utf8_line_does_not_end_session() {
    let mut input = Vec::new();
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\",\"x\":\"\xff\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");

    let responses = run_raw_session(&memory_server(), &input).await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["message"], "pong");
    assert_eq!(responses[1]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], error_codes::PARSE_ERROR);
    assert_eq!(responses[2]["id"], 3);
    assert_eq!(responses[2]["result"]["message"], "pong");
}

#[tokio::test]
async fn pretty_printed_request_spans_lines() {
    let input = concat!(
        "{\n",
        "  \"jsonrpc\": \"2.0\",\n",
        "  \"id\": 7,\n",
        "  \"method\": \"ping\"\n",
        "}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":8,\n",
        "\"method\":\"resources/list\"}\n",
    );

    let responses = run_raw_session(&memory_server(), input.as_bytes()).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 7);
    assert_eq!(responses[0]["result"], json!({"message": "pong"}));
    assert_eq!(responses[1]["id"], 8);
    assert!(responses[1].get("error").is_none());
}

#[tokio::test]
async fn file_backed_sessions_share_state() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("data").join("todos.json");

    let first = McpServer::new(Arc::new(FileStore::new(&path)));
    let responses = run_session(
        &first,
        &[
            call_tool(1, "create_todo", json!({"title": "a", "description": "first"})),
            call_tool(2, "create_todo", json!({"title": "b"})),
        ],
    )
    .await;
    assert_eq!(responses.len(), 2);
    assert!(path.exists());

    let second = McpServer::new(Arc::new(FileStore::new(&path)));
    let responses = run_session(&second, &[call_tool(1, "get_todos", json!({}))]).await;

    let listing: Value = serde_json::from_str(tool_text(&responses[0])).expect("listing");
    assert_eq!(listing["count"], 2);
    assert_eq!(listing["todos"][0]["description"], "first");
    assert_eq!(listing["todos"][1]["id"], 2);
}

#[tokio::test]
async fn concurrent_clients_get_unique_ids() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let mut tasks = Vec::new();

    for client in 0..8 {
        let server = McpServer::new(SharedStore::clone(&store));
        tasks.push(tokio::spawn(async move {
            let lines: Vec<Value> = (0..5)
                .map(|n| call_tool(n, "create_todo", json!({"title": format!("{client}-{n}")})))
                .collect();
            run_session(&server, &lines).await
        }));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        for response in task.await.expect("client task should finish") {
            let created = json_after(tool_text(&response), "Todo created successfully:\n");
            assert!(ids.insert(created["id"].as_i64().expect("numeric id")));
        }
    }

    assert_eq!(ids.len(), 40);
    assert_eq!(ids, (1..=40).collect::<HashSet<i64>>());
}
