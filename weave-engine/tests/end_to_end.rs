//! End-to-end execution scenarios (§8), driven entirely through the public
//! `weave_engine` API plus in-test fake handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use weave_engine::{
    AgentError, AgentHandler, AgentRegistry, AgentRequest, AgentResult, Edge, ExecutionEngine,
    Node, NodeType, RetryPolicy, Workflow,
};
use weave_stream::Event;

struct UpperCaseHandler;

#[async_trait]
impl AgentHandler for UpperCaseHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        Ok(AgentResult::text(request.user_message.to_uppercase()))
    }
}

/// Reads whatever the upload node extracted into `context.uploaded_content`
/// and publishes it as `final_answer`, the way a summarization handler would
/// surface its result for the response node to pick up.
struct EchoUploadHandler;

#[async_trait]
impl AgentHandler for EchoUploadHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let content = request
            .context
            .get("uploaded_content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let mut patch = HashMap::new();
        patch.insert("final_answer".to_string(), json!(content.clone()));
        Ok(AgentResult { content, context_patch: patch, ..Default::default() })
    }
}

struct FailsOnceThenSucceeds {
    attempts: AtomicU32,
}

#[async_trait]
impl AgentHandler for FailsOnceThenSucceeds {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AgentError::Recoverable("transient".into()));
        }
        Ok(AgentResult::text(request.user_message))
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::DEFAULT
    }
}

struct SelectsToolHandler;

#[async_trait]
impl AgentHandler for SelectsToolHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let mut patch = HashMap::new();
        patch.insert(
            weave_engine::SELECTED_TOOLS_KEY.to_string(),
            json!(["search"]),
        );
        Ok(AgentResult {
            content: request.user_message,
            context_patch: patch,
            ..Default::default()
        })
    }
}

async fn run_to_done(workflow: &Workflow, registry: AgentRegistry) -> weave_stream::DoneResult {
    let engine = ExecutionEngine::new(registry, vec![]);
    let (tx, mut rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    engine.run(workflow, tx, cancel).await.unwrap();

    let mut done = None;
    while let Some(ev) = rx.recv().await {
        if let Event::Done { result } = ev {
            done = Some(result);
        }
    }
    done.expect("engine always sends a Done event on success")
}

#[tokio::test]
async fn upload_node_text_flows_into_downstream_handler_and_out_to_the_response() {
    let mut w = Workflow::new("ignored for upload-only runs");
    let mut upload = Node::new("doc", NodeType::Upload);
    upload.uploaded_files.push(weave_engine::UploadedFile {
        name: "notes.txt".into(),
        size: 11,
        mime_type: "text/plain".into(),
        content: Some("hello world".into()),
    });
    w.nodes.push(upload);
    w.nodes.push(Node::new("reader", NodeType::Summarization));
    w.nodes.push(Node::new("out", NodeType::Response));
    w.edges.push(Edge { source: "doc".into(), target: "reader".into() });
    w.edges.push(Edge { source: "reader".into(), target: "out".into() });

    let mut registry = AgentRegistry::new();
    registry.register("summarization", Arc::new(EchoUploadHandler));

    let result = run_to_done(&w, registry).await;
    assert!(result.final_answer.contains("hello world"));
}

#[tokio::test]
async fn recoverable_error_is_retried_and_eventually_succeeds() {
    let mut w = Workflow::new("hi");
    w.nodes.push(Node::new("p", NodeType::Prompt));
    w.nodes.push(Node::new("flaky", NodeType::Sampler));
    w.nodes.push(Node::new("out", NodeType::Response));
    w.edges.push(Edge { source: "p".into(), target: "flaky".into() });
    w.edges.push(Edge { source: "flaky".into(), target: "out".into() });

    let mut registry = AgentRegistry::new();
    registry.register("sampler", Arc::new(FailsOnceThenSucceeds { attempts: AtomicU32::new(0) }));

    let result = run_to_done(&w, registry).await;
    assert_eq!(result.final_answer, "hi");
    let flaky_step = result.steps.iter().find(|s| s.node_id == "flaky").unwrap();
    assert!(flaky_step.error.is_none());
}

#[tokio::test]
async fn orchestrator_selected_tool_runs_while_unselected_peer_is_excluded() {
    let mut w = Workflow::new("hi");
    w.nodes.push(Node::new("p", NodeType::Prompt));
    w.nodes.push(Node::new("orch", NodeType::Orchestrator));
    w.nodes.push(Node::new("search", NodeType::SemanticSearch));
    w.nodes.push(Node::new("image", NodeType::ImageGenerator));
    w.nodes.push(Node::new("out", NodeType::Response));
    w.edges.push(Edge { source: "p".into(), target: "orch".into() });
    w.edges.push(Edge { source: "orch".into(), target: "search".into() });
    w.edges.push(Edge { source: "orch".into(), target: "image".into() });
    w.edges.push(Edge { source: "search".into(), target: "out".into() });
    w.edges.push(Edge { source: "image".into(), target: "out".into() });

    let mut registry = AgentRegistry::new();
    registry.register("orchestrator", Arc::new(SelectsToolHandler));
    registry.register("semantic_search", Arc::new(UpperCaseHandler));
    registry.register("image_generator", Arc::new(UpperCaseHandler));

    let result = run_to_done(&w, registry).await;
    let search_step = result.steps.iter().find(|s| s.node_id == "search").unwrap();
    let image_step = result.steps.iter().find(|s| s.node_id == "image").unwrap();
    assert!(!search_step.excluded);
    assert!(image_step.excluded);
}

#[tokio::test]
async fn malformed_workflow_with_dangling_edge_is_rejected_before_any_node_runs() {
    let mut w = Workflow::new("hi");
    w.nodes.push(Node::new("p", NodeType::Prompt));
    w.nodes.push(Node::new("out", NodeType::Response));
    w.edges.push(Edge { source: "p".into(), target: "ghost".into() });

    let engine = ExecutionEngine::new(AgentRegistry::new(), vec![]);
    let (tx, _rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let outcome = engine.run(&w, tx, cancel).await;
    assert!(outcome.is_err());
}
