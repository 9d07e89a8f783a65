//! Compiles a [`Workflow`] into an [`ExecutionPlan`]: validates the graph and
//! computes a deterministic topological order (§4.7.1, §4.7.3).
//!
//! Ordering follows the teacher's planner: Kahn's algorithm over an
//! in-degree count, breaking ties on ascending node id via a `BTreeSet` so
//! two equivalent graphs always compile to the same run order.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::ValidationError;
use crate::node::{Node, NodeCategory, Workflow};

pub struct ExecutionPlan {
    pub nodes: HashMap<String, Node>,
    /// Topological run order, ties broken by ascending node id.
    pub order: Vec<String>,
    pub predecessors: HashMap<String, Vec<String>>,
    pub successors: HashMap<String, Vec<String>>,
    /// §4.6 `NoReachableOutput`: true when no output-category node is
    /// reachable from any input-category node. A warning, not a validation
    /// failure — the plan still compiles and runs (producing an empty
    /// final answer).
    pub no_reachable_output: bool,
}

impl ExecutionPlan {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }
}

pub fn compile(workflow: &Workflow) -> Result<ExecutionPlan, ValidationError> {
    let mut nodes = HashMap::new();
    for node in &workflow.nodes {
        if nodes.insert(node.id.clone(), node.clone()).is_some() {
            return Err(ValidationError::DuplicateNodeId(node.id.clone()));
        }
    }

    let mut predecessors: HashMap<String, Vec<String>> =
        nodes.keys().map(|id| (id.clone(), Vec::new())).collect();
    let mut successors: HashMap<String, Vec<String>> =
        nodes.keys().map(|id| (id.clone(), Vec::new())).collect();

    for edge in &workflow.edges {
        if edge.source == edge.target {
            return Err(ValidationError::SelfLoop(edge.source.clone()));
        }
        if !nodes.contains_key(&edge.source) {
            return Err(ValidationError::DanglingEdge(edge.source.clone()));
        }
        if !nodes.contains_key(&edge.target) {
            return Err(ValidationError::DanglingEdge(edge.target.clone()));
        }
        successors.get_mut(&edge.source).unwrap().push(edge.target.clone());
        predecessors.get_mut(&edge.target).unwrap().push(edge.source.clone());
    }

    let order = topological_order(&nodes, &predecessors, &successors)?;

    let plan = ExecutionPlan { nodes, order, predecessors, successors, no_reachable_output: false };
    let reachable = reachable_from_inputs(&plan);
    let no_reachable_output = !plan
        .nodes
        .values()
        .any(|n| n.node_type.category() == NodeCategory::Output && reachable.contains(&n.id));

    Ok(ExecutionPlan { no_reachable_output, ..plan })
}

fn topological_order(
    nodes: &HashMap<String, Node>,
    predecessors: &HashMap<String, Vec<String>>,
    successors: &HashMap<String, Vec<String>>,
) -> Result<Vec<String>, ValidationError> {
    let mut in_degree: HashMap<String, usize> = predecessors
        .iter()
        .map(|(id, preds)| (id.clone(), preds.len()))
        .collect();

    let mut ready: BTreeSet<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| id.clone())
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(id) = ready.iter().next().cloned() {
        ready.remove(&id);
        visited.insert(id.clone());
        order.push(id.clone());

        for succ in &successors[&id] {
            let degree = in_degree.get_mut(succ).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.insert(succ.clone());
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = nodes
            .keys()
            .find(|id| !visited.contains(*id))
            .cloned()
            .unwrap_or_default();
        return Err(ValidationError::Cycle(stuck));
    }

    Ok(order)
}

/// Nodes forward-reachable from any input-category node (§4.7.3's BFS from
/// input nodes, used to prune nodes that can never run in this graph shape).
pub fn reachable_from_inputs(plan: &ExecutionPlan) -> HashSet<String> {
    let mut frontier: VecDeque<String> = plan
        .nodes
        .values()
        .filter(|n| n.node_type.category() == NodeCategory::Input)
        .map(|n| n.id.clone())
        .collect();

    let mut seen: HashSet<String> = frontier.iter().cloned().collect();

    while let Some(id) = frontier.pop_front() {
        for succ in &plan.successors[&id] {
            if seen.insert(succ.clone()) {
                frontier.push_back(succ.clone());
            }
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Edge, NodeType};

    fn wf(nodes: Vec<(&str, NodeType)>, edges: Vec<(&str, &str)>) -> Workflow {
        let mut w = Workflow::new("hi");
        for (id, t) in nodes {
            w.nodes.push(Node::new(id, t));
        }
        for (s, t) in edges {
            w.edges.push(Edge { source: s.into(), target: t.into() });
        }
        w
    }

    #[test]
    fn compiles_a_linear_chain_in_order() {
        let w = wf(
            vec![("a", NodeType::Prompt), ("b", NodeType::Synthesis), ("c", NodeType::Response)],
            vec![("a", "b"), ("b", "c")],
        );
        let plan = compile(&w).unwrap();
        assert_eq!(plan.order, vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_break_on_ascending_node_id() {
        let w = wf(
            vec![
                ("z", NodeType::Prompt),
                ("a", NodeType::Prompt),
                ("out", NodeType::Response),
            ],
            vec![("z", "out"), ("a", "out")],
        );
        let plan = compile(&w).unwrap();
        assert_eq!(plan.order, vec!["a", "z", "out"]);
    }

    #[test]
    fn rejects_self_loop() {
        let w = wf(vec![("a", NodeType::Prompt)], vec![("a", "a")]);
        assert!(matches!(compile(&w), Err(ValidationError::SelfLoop(_))));
    }

    #[test]
    fn rejects_dangling_edge() {
        let w = wf(vec![("a", NodeType::Prompt)], vec![("a", "ghost")]);
        assert!(matches!(compile(&w), Err(ValidationError::DanglingEdge(_))));
    }

    #[test]
    fn rejects_cycle() {
        let w = wf(
            vec![("a", NodeType::Prompt), ("b", NodeType::Synthesis), ("c", NodeType::Response)],
            vec![("a", "b"), ("b", "c"), ("c", "b")],
        );
        assert!(matches!(compile(&w), Err(ValidationError::Cycle(_))));
    }

    #[test]
    fn compiling_with_no_output_node_still_succeeds_but_flags_the_warning() {
        let w = wf(vec![("a", NodeType::Prompt)], vec![]);
        let plan = compile(&w).unwrap();
        assert!(plan.no_reachable_output);
    }

    #[test]
    fn compiling_with_an_unreachable_output_node_flags_the_warning() {
        let w = wf(
            vec![("a", NodeType::Prompt), ("disconnected", NodeType::Response)],
            vec![],
        );
        let plan = compile(&w).unwrap();
        assert!(plan.no_reachable_output);
    }

    #[test]
    fn compiling_with_a_reachable_output_node_clears_the_warning() {
        let w = wf(
            vec![("a", NodeType::Prompt), ("out", NodeType::Response)],
            vec![("a", "out")],
        );
        let plan = compile(&w).unwrap();
        assert!(!plan.no_reachable_output);
    }

    #[test]
    fn rejects_duplicate_node_id() {
        let mut w = Workflow::new("hi");
        w.nodes.push(Node::new("a", NodeType::Prompt));
        w.nodes.push(Node::new("a", NodeType::Response));
        assert!(matches!(compile(&w), Err(ValidationError::DuplicateNodeId(_))));
    }

    #[test]
    fn reachable_from_inputs_excludes_disconnected_branch() {
        let w = wf(
            vec![
                ("a", NodeType::Prompt),
                ("b", NodeType::Response),
                ("orphan", NodeType::Synthesis),
                ("orphan_out", NodeType::Response),
            ],
            vec![("a", "b"), ("orphan", "orphan_out")],
        );
        let plan = compile(&w).unwrap();
        let reachable = reachable_from_inputs(&plan);
        assert!(reachable.contains("a"));
        assert!(reachable.contains("b"));
        assert!(!reachable.contains("orphan"));
        assert!(!reachable.contains("orphan_out"));
    }
}
