//! End-to-end scenarios driving the dispatcher/registry/shell-provider stack
//! together, the way a transport would, without going through any one
//! transport's I/O.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_core::dispatch::{process_message, Dispatcher, ServerInfo};
use mcp_core::providers::{Content, Cursor, ProviderError, ProviderRegistry, Tool, ToolProvider, ToolResult};
use mcp_core::session::SessionStore;
use mcp_core::shell::{ShellProviderConfig, ShellToolProvider};
use serde_json::Value;

struct EchoTool;

#[async_trait]
impl ToolProvider for EchoTool {
    fn tool_names(&self) -> Vec<String> {
        vec!["echo".to_string()]
    }

    async fn list_tools(&self, _cursor: Option<&str>) -> Result<(Vec<Tool>, Option<Cursor>), ProviderError> {
        let tool = Tool {
            name: "echo".to_string(),
            description: "echoes its message argument".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"],
            }),
        };
        Ok((vec![tool], None))
    }

    async fn call_tool(&self, name: &str, args: &Value) -> Result<ToolResult, ProviderError> {
        debug_assert_eq!(name, "echo");
        let message = args
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::InvalidParams("message".to_string()))?;
        Ok(ToolResult {
            content: vec![Content::text(message)],
            is_error: false,
        })
    }
}

fn dispatcher_with(registry: ProviderRegistry) -> Dispatcher {
    Dispatcher::new(
        registry,
        ServerInfo {
            name: "test-server".to_string(),
            version: "0.0.0".to_string(),
        },
    )
}

#[tokio::test]
async fn scenario_1_ping() {
    let dispatcher = dispatcher_with(ProviderRegistry::new());
    let session = SessionStore::new().get_or_create(None);

    let response = process_message(&dispatcher, &session, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
        .await
        .unwrap();

    assert_eq!(response, serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": {} }));
}

#[tokio::test]
async fn scenario_2_unknown_method() {
    let dispatcher = dispatcher_with(ProviderRegistry::new());
    let session = SessionStore::new().get_or_create(None);

    let response = process_message(&dispatcher, &session, r#"{"jsonrpc":"2.0","id":2,"method":"foo"}"#)
        .await
        .unwrap();

    assert_eq!(response["error"]["code"], serde_json::json!(-32601));
}

#[tokio::test]
async fn scenario_3_empty_tool_list() {
    let dispatcher = dispatcher_with(ProviderRegistry::new());
    let session = SessionStore::new().get_or_create(None);

    let response = process_message(&dispatcher, &session, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#)
        .await
        .unwrap();

    assert_eq!(response["result"]["tools"], serde_json::json!([]));
}

#[tokio::test]
async fn scenario_4_echo_tool_call() {
    let mut registry = ProviderRegistry::new();
    registry.register_tool_provider(Arc::new(EchoTool)).unwrap();
    let dispatcher = dispatcher_with(registry);
    let session = SessionStore::new().get_or_create(None);

    let raw = r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"echo","arguments":{"message":"hi"}}}"#;
    let response = process_message(&dispatcher, &session, raw).await.unwrap();

    assert_eq!(response["result"]["isError"], serde_json::json!(false));
    assert_eq!(response["result"]["content"][0]["text"], serde_json::json!("hi"));
}

#[tokio::test]
async fn scenario_5_missing_required_argument() {
    let mut registry = ProviderRegistry::new();
    registry.register_tool_provider(Arc::new(EchoTool)).unwrap();
    let dispatcher = dispatcher_with(registry);
    let session = SessionStore::new().get_or_create(None);

    let raw = r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"echo","arguments":{}}}"#;
    let response = process_message(&dispatcher, &session, raw).await.unwrap();

    assert_eq!(response["error"]["code"], serde_json::json!(-32602));
    assert_eq!(response["error"]["data"]["field"], serde_json::json!("message"));
}

#[tokio::test]
async fn scenario_6_shell_tool_nonzero_exit_captures_stderr() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("fail.yaml"),
        "name: fail\ncommand: [\"sh\", \"-c\", \"echo boom 1>&2; exit 3\"]\ncapture-stderr: true\n",
    )
    .unwrap();

    let provider = ShellToolProvider::load(ShellProviderConfig {
        tool_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();

    let mut registry = ProviderRegistry::new();
    registry.register_tool_provider(provider).unwrap();
    let dispatcher = dispatcher_with(registry);
    let session = SessionStore::new().get_or_create(None);

    let raw = r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"fail","arguments":{}}}"#;
    let response = process_message(&dispatcher, &session, raw).await.unwrap();

    assert_eq!(response["result"]["isError"], serde_json::json!(true));
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("boom"), "expected captured stderr to contain 'boom', got: {text}");
}

#[tokio::test]
async fn scenario_7_concurrent_timed_out_calls_are_killed_promptly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("slow.yaml"),
        "name: slow\nshell-script: |\n  sleep 30\ntimeout_seconds: 1\n",
    )
    .unwrap();

    let provider = ShellToolProvider::load(ShellProviderConfig {
        tool_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();

    let started = std::time::Instant::now();
    let calls = (0..5).map(|_| {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.call_tool("slow", &Value::Null).await })
    });

    let results = futures::future::join_all(calls).await;
    assert!(
        started.elapsed() < std::time::Duration::from_secs(20),
        "all five calls should be killed well before their 30s sleep completes"
    );
    for result in results {
        let tool_result = result.unwrap().unwrap();
        assert!(tool_result.is_error, "a killed process should exit non-zero");
    }
}

#[tokio::test]
async fn batch_request_excludes_notification_responses_and_preserves_ids() {
    let dispatcher = dispatcher_with(ProviderRegistry::new());
    let session = SessionStore::new().get_or_create(None);

    let raw = r#"[
        {"jsonrpc":"2.0","id":1,"method":"ping"},
        {"jsonrpc":"2.0","method":"notifications/initialized"},
        {"jsonrpc":"2.0","id":2,"method":"ping"}
    ]"#;
    let response = process_message(&dispatcher, &session, raw).await.unwrap();
    let responses = response.as_array().unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], serde_json::json!(1));
    assert_eq!(responses[1]["id"], serde_json::json!(2));
}

#[tokio::test]
async fn session_lifecycle_cleanup_runs_once_on_delete() {
    let store = SessionStore::new();
    let session = store.get_or_create(None);
    let id = session.id;

    let ran = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let ran_clone = Arc::clone(&ran);
    session.register_cleanup(move || {
        ran_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });
    drop(session);

    store.delete(id);
    assert_eq!(ran.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(store.get(id).is_none());
    assert!(store.is_empty());
}

fn write_tool(dir: &std::path::Path, file_name: &str, contents: &str) {
    let mut file = std::fs::File::create(dir.join(file_name)).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

#[tokio::test]
async fn hot_reload_add_modify_and_remove_a_shell_tool() {
    let dir = tempfile::tempdir().unwrap();
    write_tool(dir.path(), "greet.yaml", "name: greet\ncommand: [\"echo\", \"hello\"]\n");

    let provider = ShellToolProvider::load(ShellProviderConfig {
        tool_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();
    provider.spawn_watch();

    // initial load
    assert_eq!(provider.tool_names(), vec!["greet".to_string()]);

    // add a new tool
    write_tool(dir.path(), "wave.yaml", "name: wave\ncommand: [\"echo\", \"hi\"]\n");
    wait_until(|| provider.tool_names().len() == 2).await;
    let mut names = provider.tool_names();
    names.sort();
    assert_eq!(names, vec!["greet".to_string(), "wave".to_string()]);

    // modify an existing tool's command
    write_tool(dir.path(), "greet.yaml", "name: greet\ncommand: [\"echo\", \"hello again\"]\n");
    let mut text = String::new();
    for _ in 0..100 {
        let result = provider.call_tool("greet", &Value::Null).await.unwrap();
        if let mcp_core::providers::Content::Text { text: t } = &result.content[0] {
            text = t.clone();
        }
        if text.contains("hello again") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(text.contains("hello again"), "expected reload to pick up modified command, got: {text}");

    // remove a tool
    std::fs::remove_file(dir.path().join("wave.yaml")).unwrap();
    wait_until(|| provider.tool_names().len() == 1).await;
    assert_eq!(provider.tool_names(), vec!["greet".to_string()]);

    provider.stop_watch();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("condition not met within timeout");
}
