//! Data model (§3): node types, categories, edges, and the workflow graph
//! submitted by a caller.

use std::str::FromStr;

use serde_json::Value;

use crate::error::ValidationError;

/// The closed set of node types a workflow may contain (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Prompt,
    Upload,
    Supervisor,
    Orchestrator,
    SemanticSearch,
    Sampler,
    Synthesis,
    Transformer,
    Translator,
    ImageGenerator,
    Summarization,
    Formatting,
    Code,
    Response,
    Spreadsheet,
}

/// Category derived from [`NodeType`] (§3). Drives the exclusion policy (§4.7.2)
/// and input/output handling (§4.7.4, §4.7.6).
///
/// `Tool` nodes are the ones an orchestrator can select among via
/// `selected_tools`: `semantic_search`, `image_generator`, `code`. Every other
/// non-input, non-output type is `Agent`. This split is not spelled out
/// verbatim in the node-type table; it is the resolution of an open question,
/// recorded in `DESIGN.md`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeCategory {
    Input,
    Agent,
    Tool,
    Output,
}

impl NodeType {
    pub fn category(self) -> NodeCategory {
        match self {
            NodeType::Prompt | NodeType::Upload => NodeCategory::Input,
            NodeType::SemanticSearch | NodeType::ImageGenerator | NodeType::Code => {
                NodeCategory::Tool
            }
            NodeType::Response | NodeType::Spreadsheet => NodeCategory::Output,
            NodeType::Supervisor
            | NodeType::Orchestrator
            | NodeType::Sampler
            | NodeType::Synthesis
            | NodeType::Transformer
            | NodeType::Translator
            | NodeType::Summarization
            | NodeType::Formatting => NodeCategory::Agent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Prompt => "prompt",
            NodeType::Upload => "upload",
            NodeType::Supervisor => "supervisor",
            NodeType::Orchestrator => "orchestrator",
            NodeType::SemanticSearch => "semantic_search",
            NodeType::Sampler => "sampler",
            NodeType::Synthesis => "synthesis",
            NodeType::Transformer => "transformer",
            NodeType::Translator => "translator",
            NodeType::ImageGenerator => "image_generator",
            NodeType::Summarization => "summarization",
            NodeType::Formatting => "formatting",
            NodeType::Code => "code",
            NodeType::Response => "response",
            NodeType::Spreadsheet => "spreadsheet",
        }
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "prompt" => NodeType::Prompt,
            "upload" => NodeType::Upload,
            "supervisor" => NodeType::Supervisor,
            "orchestrator" => NodeType::Orchestrator,
            "semantic_search" => NodeType::SemanticSearch,
            "sampler" => NodeType::Sampler,
            "synthesis" => NodeType::Synthesis,
            "transformer" => NodeType::Transformer,
            "translator" => NodeType::Translator,
            "image_generator" => NodeType::ImageGenerator,
            "summarization" => NodeType::Summarization,
            "formatting" => NodeType::Formatting,
            "code" => NodeType::Code,
            "response" => NodeType::Response,
            "spreadsheet" => NodeType::Spreadsheet,
            other => return Err(ValidationError::UnknownNodeType(other.to_string())),
        })
    }
}

/// One uploaded file attached to an `upload`-type node (§6.2).
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// Raw text, or base64 prefixed with `__PDF_BASE64__` / `__DOCX_BASE64__` (§6.2).
    pub content: Option<String>,
}

/// A workflow node (§3). `settings` is opaque to the engine and interpreted
/// by the agent handler; `prompt_text` / `uploaded_files` / `upload_instruction`
/// carry input payloads for `prompt` / `upload` nodes respectively.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub node_type: NodeType,
    pub label: String,
    pub settings: Value,
    pub prompt_text: Option<String>,
    pub uploaded_files: Vec<UploadedFile>,
    pub upload_instruction: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: String::new(),
            settings: Value::Null,
            prompt_text: None,
            uploaded_files: Vec::new(),
            upload_instruction: None,
        }
    }
}

/// A directed edge (§3). Multigraph allowed; self-loops are rejected at plan time.
#[derive(Clone, Debug)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Nodes + edges + top-level user message + optional knowledge-base identifier (§3).
#[derive(Clone, Debug, Default)]
pub struct Workflow {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub user_message: String,
    pub knowledge_base: Option<String>,
}

impl Workflow {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            user_message: user_message.into(),
            knowledge_base: None,
        }
    }
}
