//! Per-run node status tracking, used by the exclusion policy (§4.7.2) to
//! decide whether a not-yet-visited node can still run.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Executed,
    Excluded,
    Failed,
}

impl NodeStatus {
    /// A "bad" predecessor per §4.7.2/§9: one that never produced output,
    /// whether because it was skipped or because it errored out.
    pub fn is_bad(self) -> bool {
        matches!(self, NodeStatus::Excluded | NodeStatus::Failed)
    }
}

#[derive(Default)]
pub struct ExecutionState {
    statuses: HashMap<String, NodeStatus>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self { statuses: HashMap::new() }
    }

    pub fn status(&self, node_id: &str) -> NodeStatus {
        self.statuses.get(node_id).copied().unwrap_or(NodeStatus::Pending)
    }

    pub fn set(&mut self, node_id: impl Into<String>, status: NodeStatus) {
        self.statuses.insert(node_id.into(), status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvisited_node_defaults_to_pending() {
        let state = ExecutionState::new();
        assert_eq!(state.status("x"), NodeStatus::Pending);
    }

    #[test]
    fn excluded_and_failed_are_bad_executed_and_pending_are_not() {
        assert!(NodeStatus::Excluded.is_bad());
        assert!(NodeStatus::Failed.is_bad());
        assert!(!NodeStatus::Executed.is_bad());
        assert!(!NodeStatus::Pending.is_bad());
    }
}
