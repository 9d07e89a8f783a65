//! The Execution Engine (§4.7): drives a compiled [`ExecutionPlan`] node by
//! node, evaluating the exclusion policy, dispatching agent handlers through
//! the retry/middleware chain, and assembling the terminal `Done` event.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use weave_gateway::ModelClass;
use weave_stream::{AgentStep, DoneResult, Event, ToolOutputs};

use crate::context::{Context, SELECTED_TOOLS_KEY, USER_MESSAGE_KEY};
use crate::error::{AgentError, EngineError};
use crate::middleware::{build_chain, AgentMiddleware};
use crate::node::{Node, NodeCategory, NodeType, UploadedFile, Workflow};
use crate::planner::{compile, ExecutionPlan};
use crate::registry::{AgentRegistry, AgentRequest};
use crate::retry::RetryPolicy;
use crate::state::{ExecutionState, NodeStatus};

pub struct ExecutionEngine {
    registry: AgentRegistry,
    middlewares: Vec<Arc<dyn AgentMiddleware>>,
}

impl ExecutionEngine {
    pub fn new(registry: AgentRegistry, middlewares: Vec<Arc<dyn AgentMiddleware>>) -> Self {
        Self { registry, middlewares }
    }

    /// Compiles and runs `workflow` to completion, emitting wire events on
    /// `events` as it goes (§4.7, §6.1). Returns once a `Done` or `Error`
    /// event has been sent (or the send fails because the receiver dropped).
    pub async fn run(
        &self,
        workflow: &Workflow,
        events: Sender<Event>,
        cancel: CancellationToken,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let plan = compile(workflow)?;
        if plan.no_reachable_output {
            tracing::warn!("no output-category node is reachable from any input node");
        }

        let reachable = crate::planner::reachable_from_inputs(&plan);

        let context = Context::new();
        context.set(USER_MESSAGE_KEY, json!(workflow.user_message));
        if let Some(kb) = &workflow.knowledge_base {
            context.set("knowledge_base", json!(kb));
        }
        let mut state = ExecutionState::new();
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut tool_outputs = ToolOutputs::default();
        let mut last_agent_content: Option<String> = None;
        let mut final_answer = String::new();
        let mut output_format = "text".to_string();

        let extraction_oriented = plan.nodes.values().any(|n| {
            matches!(n.node_type, NodeType::Transformer | NodeType::Spreadsheet)
        });

        for node_id in &plan.order {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let node = plan.node(node_id).expect("node id came from plan.order");

            if node.node_type.category() == NodeCategory::Input {
                apply_input_node(node, &context, extraction_oriented);
                state.set(node_id.clone(), NodeStatus::Executed);
                continue;
            }

            if !reachable.contains(node_id) {
                state.set(node_id.clone(), NodeStatus::Excluded);
                steps.push(AgentStep {
                    node_id: node_id.clone(),
                    model: None,
                    action: node.node_type.as_str().to_string(),
                    content: String::new(),
                    excluded: true,
                    error: None,
                    metadata: json!({ "reason": "unreachable from any input node" }),
                });
                continue;
            }

            if let Some(excluded_by) = self.exclusion_reason(node, &plan, &state, &context) {
                state.set(node_id.clone(), NodeStatus::Excluded);
                steps.push(AgentStep {
                    node_id: node_id.clone(),
                    model: None,
                    action: node.node_type.as_str().to_string(),
                    content: String::new(),
                    excluded: true,
                    error: None,
                    metadata: json!({ "reason": excluded_by }),
                });
                continue;
            }

            let _ = events.send(Event::AgentStart { node_id: node_id.clone() }).await;

            if node.node_type.category() == NodeCategory::Output {
                let (content, format) = finalize_output(node, &context, &last_agent_content);
                final_answer = content.clone();
                output_format = format;
                state.set(node_id.clone(), NodeStatus::Executed);

                let step = AgentStep {
                    node_id: node_id.clone(),
                    model: None,
                    action: node.node_type.as_str().to_string(),
                    content,
                    excluded: false,
                    error: None,
                    metadata: Value::Null,
                };
                steps.push(step.clone());
                let _ = events.send(Event::AgentComplete { step }).await;
                continue;
            }

            match self.dispatch(node, &context).await {
                Ok(result) => {
                    context.merge(result.context_patch.clone());
                    state.set(node_id.clone(), NodeStatus::Executed);

                    if matches!(
                        node.node_type,
                        NodeType::Synthesis | NodeType::Sampler | NodeType::Transformer
                    ) {
                        last_agent_content = Some(result.content.clone());
                    }

                    merge_tool_outputs(&mut tool_outputs, result.tool_outputs);

                    let step = AgentStep {
                        node_id: node_id.clone(),
                        model: result.model.clone(),
                        action: node.node_type.as_str().to_string(),
                        content: result.content,
                        excluded: false,
                        error: None,
                        metadata: Value::Null,
                    };
                    steps.push(step.clone());
                    let _ = events.send(Event::AgentComplete { step }).await;
                }
                Err(AgentError::Fatal(message)) => {
                    let _ = events.send(Event::Error { message: message.clone() }).await;
                    return Err(EngineError::NodeFailed(node_id.clone(), message));
                }
                Err(err @ AgentError::Recoverable(_)) => {
                    state.set(node_id.clone(), NodeStatus::Failed);
                    let step = AgentStep {
                        node_id: node_id.clone(),
                        model: None,
                        action: node.node_type.as_str().to_string(),
                        content: String::new(),
                        excluded: false,
                        error: Some(err.message().to_string()),
                        metadata: Value::Null,
                    };
                    steps.push(step.clone());
                    let _ = events.send(Event::AgentComplete { step }).await;
                }
            }
        }

        let result = DoneResult {
            final_answer,
            output_format,
            tool_outputs,
            steps,
            latency_ms: started.elapsed().as_millis() as u64,
        };
        let _ = events.send(Event::Done { result }).await;

        Ok(())
    }

    /// §4.7.2 / §9: a node is excluded when every non-input predecessor is
    /// itself bad (excluded or failed) — so a node with no predecessors, or
    /// with at least one executed non-input predecessor, always runs. A
    /// `Tool` node additionally excludes itself when the run has a
    /// `selected_tools` decision that does not name it.
    fn exclusion_reason(
        &self,
        node: &Node,
        plan: &ExecutionPlan,
        state: &ExecutionState,
        context: &Context,
    ) -> Option<&'static str> {
        let predecessors = &plan.predecessors[&node.id];
        let non_input_preds: Vec<&String> = predecessors
            .iter()
            .filter(|id| plan.nodes[*id].node_type.category() != NodeCategory::Input)
            .collect();

        if !non_input_preds.is_empty()
            && non_input_preds.iter().all(|id| state.status(id).is_bad())
        {
            return Some("all non-input predecessors were excluded or failed");
        }

        if node.node_type.category() == NodeCategory::Tool {
            if let Some(selected) = context.get(SELECTED_TOOLS_KEY) {
                let selected: Vec<String> = selected
                    .as_array()
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                if !selected.iter().any(|id| id == &node.id) {
                    return Some("not selected by the upstream orchestrator");
                }
            }
        }

        None
    }

    async fn dispatch(
        &self,
        node: &Node,
        context: &Context,
    ) -> Result<crate::registry::AgentResult, AgentError> {
        let handler = self.registry.get(node.node_type.as_str()).ok_or_else(|| {
            AgentError::Fatal(format!("no handler registered for '{}'", node.node_type.as_str()))
        })?;

        let policy = handler.retry_policy();
        let user_message = context
            .get(USER_MESSAGE_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let request = AgentRequest {
            node_id: node.id.clone(),
            user_message,
            context: context.snapshot(),
            settings: node.settings.clone(),
            model_class: effective_model_class(node),
        };

        run_with_retry(handler, &self.middlewares, request, policy).await
    }
}

/// §4.7.5 step 3: "the effective `model_class` ... from node settings and
/// type defaults." An explicit `settings.modelClass` (`"small"`/`"large"`)
/// always wins; otherwise nodes whose job is open-ended generation
/// (synthesis, translation, summarization, code, the supervisor's planning)
/// default to the large class, and the rest — narrowly scoped or
/// structured-output steps (orchestrator routing, sampling, formatting,
/// transforming, retrieval, image prompts) — default to small.
fn effective_model_class(node: &Node) -> ModelClass {
    if let Some(explicit) = node.settings.get("modelClass").and_then(Value::as_str) {
        match explicit {
            "large" => return ModelClass::Large,
            "small" => return ModelClass::Small,
            _ => {}
        }
    }

    match node.node_type {
        NodeType::Synthesis
        | NodeType::Translator
        | NodeType::Summarization
        | NodeType::Code
        | NodeType::Supervisor => ModelClass::Large,
        NodeType::Orchestrator
        | NodeType::Sampler
        | NodeType::Transformer
        | NodeType::Formatting
        | NodeType::SemanticSearch
        | NodeType::ImageGenerator => ModelClass::Small,
        NodeType::Prompt | NodeType::Upload | NodeType::Response | NodeType::Spreadsheet => {
            ModelClass::Small
        }
    }
}

/// Retries a recoverable failure per `policy`'s backoff schedule (§4.8),
/// default: one retry at 100ms then 500ms. `Next` is consumed on each call,
/// so every attempt rebuilds the middleware chain fresh.
async fn run_with_retry(
    handler: Arc<dyn crate::registry::AgentHandler>,
    middlewares: &[Arc<dyn AgentMiddleware>],
    request: AgentRequest,
    policy: RetryPolicy,
) -> Result<crate::registry::AgentResult, AgentError> {
    let mut attempt = 0;
    loop {
        let chain = build_chain(handler.clone(), middlewares);
        match chain(request.clone()).await {
            Ok(result) => return Ok(result),
            Err(AgentError::Fatal(message)) => return Err(AgentError::Fatal(message)),
            Err(AgentError::Recoverable(message)) => {
                if attempt >= policy.max_retries {
                    return Err(AgentError::Recoverable(message));
                }
                tokio::time::sleep(policy.backoff_for_attempt(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// §4.7.4: a prompt node overwrites `context.user_message`; an upload node
/// decodes and extracts its files into `context.uploaded_content` and, only
/// if no explicit instruction is already in play, derives one from whether
/// the graph looks extraction-oriented (has a transformer or spreadsheet
/// output node) or summary-oriented.
fn apply_input_node(node: &Node, context: &Context, extraction_oriented: bool) {
    match node.node_type {
        NodeType::Prompt => {
            if let Some(text) = &node.prompt_text {
                context.set(USER_MESSAGE_KEY, json!(text));
            }
        }
        NodeType::Upload => {
            let extracted: Vec<String> = node.uploaded_files.iter().map(decode_upload).collect();
            context.set("uploaded_content", json!(extracted.join("\n\n---\n\n")));

            let explicit = node
                .upload_instruction
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| {
                    context
                        .get(USER_MESSAGE_KEY)
                        .and_then(|v| v.as_str().map(str::to_string))
                        .filter(|s| !s.trim().is_empty())
                });

            let instruction = explicit.unwrap_or_else(|| {
                if extraction_oriented {
                    "Extract and return the full text content of the uploaded document(s)."
                        .to_string()
                } else {
                    "Summarize the uploaded document(s).".to_string()
                }
            });
            context.set(USER_MESSAGE_KEY, json!(instruction));
        }
        _ => unreachable!("apply_input_node only called for Input-category nodes"),
    }
}

/// Decodes one uploaded file per §6.2's `__PDF_BASE64__` / `__DOCX_BASE64__`
/// prefix convention, falling back to plain text content.
fn decode_upload(file: &UploadedFile) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let Some(content) = &file.content else {
        return format!("[{}: no content provided]", file.name);
    };

    let extracted = if let Some(encoded) = content.strip_prefix("__PDF_BASE64__") {
        STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| weave_retrieval::extract::extract_pdf(&bytes).ok())
    } else if let Some(encoded) = content.strip_prefix("__DOCX_BASE64__") {
        STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| weave_retrieval::extract::extract_docx(&bytes).ok())
    } else {
        Some(content.clone())
    };

    match extracted {
        Some(text) => format!("# {}\n{}", file.name, text),
        None => format!("[{}: failed to extract content]", file.name),
    }
}

/// §4.7.6: output nodes never call the Model Gateway. A response node
/// prefers, in order, `final_answer`, `translated_content`,
/// `transformed_content`, the most recently executed synthesis/sampler/
/// transformer node's content, then the effective user message. A
/// spreadsheet node prefers `transformed_content` (or a CSV coercion of the
/// response preference chain) and tags the output format by CSV-shape.
fn finalize_output(
    node: &Node,
    context: &Context,
    last_agent_content: &Option<String>,
) -> (String, String) {
    let preferred = context
        .get("final_answer")
        .and_then(|v| v.as_str().map(str::to_string))
        .or_else(|| context.get("translated_content").and_then(|v| v.as_str().map(str::to_string)))
        .or_else(|| context.get("transformed_content").and_then(|v| v.as_str().map(str::to_string)))
        .or_else(|| last_agent_content.clone())
        .or_else(|| {
            context
                .get(USER_MESSAGE_KEY)
                .and_then(|v| v.as_str().map(str::to_string))
        })
        .unwrap_or_default();

    match node.node_type {
        NodeType::Spreadsheet => {
            let content = context
                .get("transformed_content")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or(preferred);
            let format = if looks_like_csv(&content) { "csv" } else { "text" };
            (content, format.to_string())
        }
        _ => (preferred, "text".to_string()),
    }
}

/// Heuristic CSV-shape detector (§4.7.6): has at least one newline, has
/// commas, and every non-empty line has the same comma count.
fn looks_like_csv(content: &str) -> bool {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 || !content.contains(',') {
        return false;
    }
    let first_count = lines[0].matches(',').count();
    first_count > 0 && lines.iter().all(|l| l.matches(',').count() == first_count)
}

fn merge_tool_outputs(aggregate: &mut ToolOutputs, contribution: ToolOutputs) {
    aggregate.images.extend(contribution.images);
    aggregate.web_results.extend(contribution.web_results);
    aggregate.docs.extend(contribution.docs);
    if contribution.calculations.is_some() {
        aggregate.calculations = contribution.calculations;
    }
}
