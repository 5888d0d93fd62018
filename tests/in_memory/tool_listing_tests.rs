//! Tool discovery tests over the in-memory transport.

use super::helpers::{TestContext, context, descriptor, server};
use rstest::rstest;
use serde_json::json;
use switchboard::tool_server::ports::RemoteTool;

fn remote_tool(name: &str, description: &str) -> RemoteTool {
    RemoteTool {
        name: name.to_owned(),
        description: Some(description.to_owned()),
        input_schema: Some(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_tools_maps_remote_catalogue(context: TestContext) {
    context.transport.set_tool_catalog(
        server("github"),
        vec![
            remote_tool("search_issues", "Search issues"),
            remote_tool("create_issue", "Create an issue"),
        ],
    );
    context
        .service
        .connect(descriptor("github"))
        .await
        .expect("connect should succeed");

    let tools = context.service.list_tools("github").await;

    let names: Vec<&str> = tools.iter().map(|tool| tool.name()).collect();
    assert_eq!(names, vec!["search_issues", "create_issue"]);
    let schema = tools
        .first()
        .and_then(|tool| tool.input_schema())
        .expect("schema should be mapped");
    assert_eq!(schema.schema_type, "object");
    assert_eq!(schema.required.as_deref(), Some(&["query".to_owned()][..]));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_tools_for_unknown_server_is_empty(context: TestContext) {
    assert!(context.service.list_tools("github").await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_failure_yields_empty_list(context: TestContext) {
    context
        .transport
        .set_tool_catalog(server("slack"), vec![remote_tool("post", "Post")]);
    context
        .transport
        .fail_tool_listing(server("slack"), "Method not found");
    context
        .service
        .connect(descriptor("slack"))
        .await
        .expect("connect should succeed");

    assert!(context.service.list_tools("slack").await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_all_tools_covers_every_registered_server(context: TestContext) {
    context
        .transport
        .set_tool_catalog(server("github"), vec![remote_tool("search_issues", "Search")]);
    context
        .transport
        .set_tool_catalog(server("browser"), vec![remote_tool("navigate", "Navigate")]);
    for name in ["github", "browser"] {
        context
            .service
            .connect(descriptor(name))
            .await
            .expect("connect should succeed");
    }
    context.transport.sever(&server("browser"));
    context
        .service
        .invoke("browser", "navigate", &json!({}))
        .await;

    let catalogue = context.service.list_all_tools().await;

    let names: Vec<&str> = catalogue.keys().map(|name| name.as_str()).collect();
    assert_eq!(names, vec!["browser", "github"]);
    assert!(catalogue.get("browser").is_some_and(Vec::is_empty));
    assert_eq!(catalogue.get("github").map(Vec::len), Some(1));
}
