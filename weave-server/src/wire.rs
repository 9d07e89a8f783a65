//! Request-side wire format (§6.1): the JSON body a caller posts to
//! `/execute`, and its conversion into the engine's [`Workflow`] domain
//! type. Response-side wire types (the SSE payloads) already live in
//! `weave_stream`; nothing here duplicates them.

use serde::Deserialize;
use serde_json::Value;
use weave_engine::{Edge, Node, NodeType, UploadedFile, ValidationError, Workflow};

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub message: String,
    pub workflow_nodes: Vec<WireNode>,
    #[serde(default)]
    pub workflow_edges: Vec<WireEdge>,
    pub knowledge_base: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireNode {
    pub id: String,
    #[serde(rename = "type")]
    pub outer_type: Option<String>,
    pub data: WireNodeData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNodeData {
    pub node_type: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub settings: Value,
    pub prompt_text: Option<String>,
    #[serde(default)]
    pub uploaded_files: Vec<WireUploadedFile>,
    pub upload_instruction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireUploadedFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

/// §3/§6.1: a node's effective type comes from `data.nodeType`, falling back
/// to the envelope's own `type` (graph-editor libraries commonly carry a
/// generic React-Flow `type` alongside a domain-specific one nested in
/// `data`; we accept either so the same request shape works regardless of
/// which the caller populated).
fn effective_type(node: &WireNode) -> Result<NodeType, ValidationError> {
    let raw = node
        .data
        .node_type
        .as_deref()
        .or(node.outer_type.as_deref())
        .unwrap_or("");
    raw.parse()
}

pub fn to_workflow(request: ExecuteRequest) -> Result<Workflow, ValidationError> {
    let mut workflow = Workflow::new(request.message);
    workflow.knowledge_base = request.knowledge_base;

    for wire_node in &request.workflow_nodes {
        let node_type = effective_type(wire_node)?;
        let mut node = Node::new(wire_node.id.clone(), node_type);
        node.label = wire_node.data.label.clone();
        node.settings = wire_node.data.settings.clone();
        node.prompt_text = wire_node.data.prompt_text.clone();
        node.upload_instruction = wire_node.data.upload_instruction.clone();
        node.uploaded_files = wire_node
            .data
            .uploaded_files
            .iter()
            .map(|f| UploadedFile {
                name: f.name.clone(),
                size: f.size,
                mime_type: f.mime_type.clone(),
                content: f.content.clone(),
            })
            .collect();
        workflow.nodes.push(node);
    }

    for wire_edge in request.workflow_edges {
        workflow.edges.push(Edge { source: wire_edge.source, target: wire_edge.target });
    }

    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_request() -> ExecuteRequest {
        serde_json::from_value(serde_json::json!({
            "message": "Hello",
            "workflow_nodes": [
                {
                    "id": "p1",
                    "type": "input",
                    "position": {"x": 0, "y": 0},
                    "data": { "nodeType": "prompt", "label": "Prompt", "promptText": "Hello" }
                },
                {
                    "id": "r1",
                    "type": "output",
                    "position": {"x": 1, "y": 0},
                    "data": { "nodeType": "response", "label": "Response" }
                }
            ],
            "workflow_edges": [
                { "id": "e1", "source": "p1", "target": "r1" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn converts_a_minimal_request_into_a_workflow() {
        let workflow = to_workflow(minimal_request()).unwrap();
        assert_eq!(workflow.nodes.len(), 2);
        assert_eq!(workflow.edges.len(), 1);
        assert_eq!(workflow.user_message, "Hello");
    }

    #[test]
    fn missing_workflow_edges_defaults_to_empty() {
        let request: ExecuteRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "workflow_nodes": []
        }))
        .unwrap();
        let workflow = to_workflow(request).unwrap();
        assert!(workflow.edges.is_empty());
    }

    #[test]
    fn unknown_node_type_is_a_validation_error() {
        let request: ExecuteRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "workflow_nodes": [
                { "id": "x", "type": "input", "position": {"x":0,"y":0}, "data": { "nodeType": "not-a-real-type" } }
            ]
        }))
        .unwrap();
        assert!(matches!(to_workflow(request), Err(ValidationError::UnknownNodeType(_))));
    }

    #[test]
    fn falls_back_to_outer_type_when_data_node_type_absent() {
        let request: ExecuteRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "workflow_nodes": [
                { "id": "p1", "type": "prompt", "position": {"x":0,"y":0}, "data": {} }
            ]
        }))
        .unwrap();
        let workflow = to_workflow(request).unwrap();
        assert_eq!(workflow.nodes[0].node_type.as_str(), "prompt");
    }

    #[test]
    fn uploaded_files_carry_their_content_through() {
        let request: ExecuteRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "workflow_nodes": [
                {
                    "id": "u1",
                    "type": "input",
                    "position": {"x":0,"y":0},
                    "data": {
                        "nodeType": "upload",
                        "uploadedFiles": [
                            { "name": "a.txt", "size": 3, "type": "text/plain", "content": "abc" }
                        ]
                    }
                }
            ]
        }))
        .unwrap();
        let workflow = to_workflow(request).unwrap();
        assert_eq!(workflow.nodes[0].uploaded_files.len(), 1);
        assert_eq!(workflow.nodes[0].uploaded_files[0].content.as_deref(), Some("abc"));
    }
}
