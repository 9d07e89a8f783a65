//! Graph visualization (§4.7.1 supplement — SPEC_FULL.md). Renders a
//! compiled plan as Graphviz DOT or as an indented text outline, for
//! debugging and the `/healthz`-adjacent inspection surface.

use crate::planner::ExecutionPlan;

/// Graphviz DOT source. Node labels carry both id and type so a rendered
/// graph is self-describing without cross-referencing the request.
pub fn to_dot(plan: &ExecutionPlan) -> String {
    let mut out = String::from("digraph workflow {\n");
    for id in &plan.order {
        let node = &plan.nodes[id];
        out.push_str(&format!(
            "  \"{}\" [label=\"{} ({})\"];\n",
            id,
            id,
            node.node_type.as_str()
        ));
    }
    for id in &plan.order {
        for succ in &plan.successors[id] {
            out.push_str(&format!("  \"{id}\" -> \"{succ}\";\n"));
        }
    }
    out.push_str("}\n");
    out
}

/// Indented text outline following each node's run-order position, with its
/// direct predecessors listed inline for quick scanning.
pub fn to_text(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    for (index, id) in plan.order.iter().enumerate() {
        let node = &plan.nodes[id];
        let preds = plan.predecessors[id].join(", ");
        out.push_str(&format!(
            "{:>3}. {} [{}]{}\n",
            index + 1,
            id,
            node.node_type.as_str(),
            if preds.is_empty() { String::new() } else { format!(" <- {preds}") }
        ));
    }
    out
}
