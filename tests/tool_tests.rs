//! Tests for the tool system.

use std::sync::Arc;

use colloquy::error::ColloquyError;
use colloquy::service::{ToolCallRequest, ToolDefinition};
use colloquy::tools::*;
use tokio_util::sync::CancellationToken;

fn args(value: serde_json::Value) -> ToolArguments {
    ToolArguments::parse(&value.to_string()).unwrap()
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        call_id: id.to_string(),
        qualified_name: name.to_string(),
        arguments_json: arguments.to_string(),
    }
}

fn greet_tool() -> FunctionTool {
    FunctionTool::new(
        "greet",
        "Greet a person",
        ToolParameters::object().string("name", "Name", true).build(),
        |args, _ctx| async move {
            let name = args.get_str("name")?;
            Ok(serde_json::json!({"greeting": format!("Hello, {}!", name)}))
        },
    )
}

#[test]
fn parameter_builder_constructs_schema() {
    let params = ToolParameters::object()
        .string("query", "Search query", true)
        .number("limit", "Max results", false)
        .boolean("verbose", "Enable verbose output", false)
        .build();

    let schema = &params.schema;
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["query"]["type"], "string");
    assert_eq!(schema["properties"]["limit"]["type"], "number");
    assert_eq!(schema["required"].as_array().unwrap().len(), 1);
}

#[test]
fn parameter_builder_string_enum() {
    let params = ToolParameters::object()
        .string_enum("format", "Output format", &["json", "text", "csv"], true)
        .build();

    let enums = params.schema["properties"]["format"]["enum"]
        .as_array()
        .unwrap();
    assert_eq!(enums.len(), 3);
}

#[test]
fn empty_parameters() {
    let params = ToolParameters::empty();
    assert_eq!(params.schema["type"], "object");
}

#[test]
fn tool_arguments_coerce_to_strings() {
    let args = args(serde_json::json!({"name": "Alice", "age": 30, "admin": false}));
    assert_eq!(args.get_str("name").unwrap(), "Alice");
    assert_eq!(args.get_str("age").unwrap(), "30");
    assert!(args.get_str("missing").is_err());
    assert_eq!(args.get_str_opt("missing"), None);

    let all = args.to_string_map();
    assert_eq!(all["admin"], "false");
    assert_eq!(all.len(), 3);
}

#[test]
fn tool_arguments_typed_accessors() {
    let args = args(serde_json::json!({"count": 42, "quoted": "7", "active": true}));
    assert_eq!(args.get_i64("count").unwrap(), 42);
    assert_eq!(args.get_i64("quoted").unwrap(), 7);
    assert!(args.get_bool("active").unwrap());
    assert!(matches!(
        args.get_bool("count"),
        Err(ColloquyError::InvalidArgument(_))
    ));
}

#[test]
fn tool_arguments_deserialize() {
    #[derive(serde::Deserialize, PartialEq, Debug)]
    struct Params {
        query: String,
        limit: Option<u32>,
    }

    let args = args(serde_json::json!({"query": "rust", "limit": 10}));
    let params: Params = args.deserialize().unwrap();
    assert_eq!(params.query, "rust");
    assert_eq!(params.limit, Some(10));
}

#[tokio::test]
async fn function_tool_executes() {
    let tool = greet_tool();

    assert_eq!(tool.name(), "greet");
    assert_eq!(tool.description(), "Greet a person");

    let result = tool
        .execute(
            &args(serde_json::json!({"name": "World"})),
            &ToolExecutionContext::default(),
        )
        .await
        .unwrap();
    assert_eq!(result["greeting"], "Hello, World!");
}

#[test]
fn qualified_names_join_with_a_hyphen() {
    assert_eq!(qualified_name("math", "add"), "math-add");
    assert_eq!(qualified_name("files", "read-all"), "files-read-all");
}

#[tokio::test]
async fn invoker_serializes_structured_results() {
    let invoker = ToolInvoker::new([("greet".to_string(), Arc::new(greet_tool()) as Arc<dyn Tool>)])
        .unwrap();

    let output = invoker
        .execute(&call("call_1", "greet", r#"{"name":"Ada"}"#), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.tool_call_id, "call_1");
    assert_eq!(output.output, r#"{"greeting":"Hello, Ada!"}"#);

    let definitions = invoker.definitions();
    assert!(matches!(
        &definitions[0],
        ToolDefinition::Function { function } if function.name == "greet"
    ));
}

#[tokio::test]
async fn invoker_reports_malformed_arguments_and_tool_failures() {
    let invoker = ToolInvoker::new([("greet".to_string(), Arc::new(greet_tool()) as Arc<dyn Tool>)])
        .unwrap();
    let cancel = CancellationToken::new();

    let err = invoker
        .execute(&call("call_1", "greet", "not json"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::MalformedArguments { tool_name, .. } if tool_name == "greet"));

    let err = invoker
        .execute(&call("call_2", "greet", "{}"), &cancel)
        .await
        .unwrap_err();
    match err {
        ColloquyError::ToolExecution { tool_name, message } => {
            assert_eq!(tool_name, "greet");
            assert!(message.contains("Missing argument: name"));
        }
        other => panic!("expected tool execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn tool_set_dispatches_by_function_name() {
    let set = ToolSet::new("people").with_tool(greet_tool());

    let listed = set.list_tools().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "greet");

    let value = set
        .execute_tool(
            "greet",
            &args(serde_json::json!({"name": "Bo"})),
            &ToolExecutionContext::default(),
        )
        .await
        .unwrap();
    assert_eq!(value["greeting"], "Hello, Bo!");

    let err = set
        .execute_tool("wave", &ToolArguments::default(), &ToolExecutionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::UnknownTool(name) if name == "people-wave"));
}
