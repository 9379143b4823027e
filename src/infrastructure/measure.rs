/// Call counting for edges.
///
/// Stand-in for the timing collaborator: counts how often each edge was
/// entered and left.
use std::collections::HashMap;

use crate::domain::method_node::{CallEdge, EdgeId};
use crate::ports::EdgeMeasurer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCounts {
    pub calls: u64,
    pub returns: u64,
}

#[derive(Debug, Default)]
pub struct CallCounter {
    counts: HashMap<EdgeId, EdgeCounts>,
}

impl CallCounter {
    pub fn calls(&self, id: EdgeId) -> u64 {
        self.counts.get(&id).map_or(0, |c| c.calls)
    }

    pub fn returns(&self, id: EdgeId) -> u64 {
        self.counts.get(&id).map_or(0, |c| c.returns)
    }

    pub fn total_calls(&self) -> u64 {
        self.counts.values().map(|c| c.calls).sum()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

impl EdgeMeasurer for CallCounter {
    fn on_enter(&mut self, id: EdgeId, _edge: &CallEdge) {
        self.counts.entry(id).or_default().calls += 1;
    }

    fn on_exit(&mut self, id: EdgeId, _edge: &CallEdge) {
        self.counts.entry(id).or_default().returns += 1;
    }
}
