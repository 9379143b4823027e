// Call graph session for the method profiler.
// One session per execution context: a method registry, an arena of nodes and
// edges, and the live call stack.

use tracing::{debug, warn};

use crate::domain::error::{GraphError, GraphResult};
use crate::domain::method_key::{MethodId, MethodKey, MethodTable, TypeRef};
use crate::domain::method_node::{CallEdge, EdgeId, MethodNode, NodeId};
use crate::ports::{EdgeMeasurer, HostTypes};

/// How the host entered a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    /// Interpreted method; has a source location.
    #[default]
    Call,
    /// Native/builtin method; never records a source file.
    NativeCall,
}

/// A call-entry observation reported by the instrumentation layer.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub kind: EventKind,
    pub owner: Option<TypeRef>,
    pub method: Option<MethodId>,
    pub source_file: Option<&'a str>,
    pub line: u32,
}

impl<'a> Observation<'a> {
    pub fn call(owner: Option<TypeRef>, method: Option<MethodId>) -> Self {
        Self {
            kind: EventKind::Call,
            owner,
            method,
            source_file: None,
            line: 0,
        }
    }

    pub fn native(owner: Option<TypeRef>, method: Option<MethodId>) -> Self {
        Self {
            kind: EventKind::NativeCall,
            ..Self::call(owner, method)
        }
    }

    pub fn at(mut self, source_file: &'a str, line: u32) -> Self {
        self.source_file = Some(source_file);
        self.line = line;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    edge: EdgeId,
}

/// A profiling session's call graph.
///
/// Owns every node and edge in two arenas; tables and edges refer to each other
/// by handle only, so releasing the session is dropping the arenas.
#[derive(Debug, Default)]
pub struct MethodGraph {
    generation: u64,
    registry: MethodTable<NodeId>,
    nodes: Vec<MethodNode>,
    edges: Vec<CallEdge>,
    stack: Vec<Frame>,
}

impl MethodGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a method entry and return its node.
    pub fn on_call(
        &mut self,
        host: &dyn HostTypes,
        observation: Observation<'_>,
        measurer: &mut dyn EdgeMeasurer,
    ) -> NodeId {
        let key = MethodKey::new(host, observation.owner, observation.method);
        let source_file = match observation.kind {
            EventKind::Call => observation.source_file,
            EventKind::NativeCall => None,
        };
        let id = self.get_or_create(key, source_file, observation.line);

        let caller = self.stack.last().map(|frame| frame.node);
        if caller.is_none() {
            self.nodes[id.index as usize].root = true;
        }
        if self.stack.iter().any(|frame| frame.node == id) {
            self.nodes[id.index as usize].recursive = true;
        }

        let edge = self.edge_between_or_create(caller, id);
        self.stack.push(Frame { node: id, edge });
        measurer.on_enter(edge, &self.edges[edge.index as usize]);
        id
    }

    /// Record a method exit. Returns the node that was left, if any was active.
    pub fn on_return(&mut self, measurer: &mut dyn EdgeMeasurer) -> Option<NodeId> {
        let Some(frame) = self.stack.pop() else {
            warn!("return observed with an empty call stack");
            return None;
        };
        measurer.on_exit(frame.edge, &self.edges[frame.edge.index as usize]);
        Some(frame.node)
    }

    /// Create (or mark) a node that takes part in edges but is never enumerated.
    pub fn create_excluded(
        &mut self,
        host: &dyn HostTypes,
        owner: Option<TypeRef>,
        method: Option<MethodId>,
    ) -> NodeId {
        let key = MethodKey::new(host, owner, method);
        match self.registry.get(&key) {
            Some(id) => {
                self.nodes[id.index as usize].excluded = true;
                id
            }
            None => {
                let id = self.push_node(MethodNode::excluded(key));
                debug!(index = id.index, "created excluded method node");
                id
            }
        }
    }

    pub fn lookup(&self, key: &MethodKey) -> Option<NodeId> {
        self.registry.get(key)
    }

    pub fn node(&self, id: NodeId) -> GraphResult<&MethodNode> {
        if id.generation != self.generation {
            return Err(GraphError::NodeReleased { index: id.index });
        }
        self.nodes
            .get(id.index as usize)
            .ok_or(GraphError::UnknownHandle { index: id.index })
    }

    pub fn edge(&self, id: EdgeId) -> GraphResult<&CallEdge> {
        if id.generation != self.generation {
            return Err(GraphError::EdgeReleased { index: id.index });
        }
        self.edges
            .get(id.index as usize)
            .ok_or(GraphError::UnknownHandle { index: id.index })
    }

    /// Edges into `id`.
    pub fn callers(&self, id: NodeId) -> GraphResult<Vec<EdgeId>> {
        let node = self.node(id)?;
        Ok(node
            .root_edge
            .into_iter()
            .chain(node.caller_edges.values().copied())
            .collect())
    }

    /// Edges out of `id`.
    pub fn callees(&self, id: NodeId) -> GraphResult<Vec<EdgeId>> {
        Ok(self.node(id)?.callee_edges.values().copied().collect())
    }

    /// The edge from `caller` (or a root call when `None`) to `callee`.
    pub fn find_edge(&self, caller: Option<NodeId>, callee: NodeId) -> GraphResult<Option<EdgeId>> {
        let callee = self.node(callee)?;
        match caller {
            Some(id) => Ok(callee.caller_edges.get(self.node(id)?.key())),
            None => Ok(callee.root_edge),
        }
    }

    /// Every node that is not excluded.
    pub fn methods(&self) -> impl Iterator<Item = (NodeId, &MethodNode)> + '_ {
        let generation = self.generation;
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.excluded)
            .map(move |(index, node)| {
                (
                    NodeId {
                        index: index as u32,
                        generation,
                    },
                    node,
                )
            })
    }

    /// Number of nodes, excluded ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Depth of the live call stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Release every node and edge. Handles issued before this call are dead.
    pub fn release(&mut self) {
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "releasing method graph"
        );
        self.registry.clear();
        self.nodes.clear();
        self.edges.clear();
        self.stack.clear();
        self.generation += 1;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Arena helpers
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn get_or_create(
        &mut self,
        key: MethodKey,
        source_file: Option<&str>,
        line: u32,
    ) -> NodeId {
        if let Some(id) = self.registry.get(&key) {
            return id;
        }
        let id = self.push_node(MethodNode::new(key, source_file, line));
        debug!(index = id.index, ?key, "created method node");
        id
    }

    fn push_node(&mut self, node: MethodNode) -> NodeId {
        let id = NodeId {
            index: self.nodes.len() as u32,
            generation: self.generation,
        };
        self.registry.insert(*node.key(), id);
        self.nodes.push(node);
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut MethodNode {
        &mut self.nodes[id.index as usize]
    }

    /// Fetch or create the single edge for (caller, callee), indexed from both ends.
    pub(crate) fn edge_between_or_create(&mut self, caller: Option<NodeId>, callee: NodeId) -> EdgeId {
        let caller_key = caller.map(|id| *self.nodes[id.index as usize].key());
        let callee_key = *self.nodes[callee.index as usize].key();

        let existing = match &caller_key {
            Some(key) => self.nodes[callee.index as usize].caller_edges.get(key),
            None => self.nodes[callee.index as usize].root_edge,
        };
        if let Some(id) = existing {
            return id;
        }

        let id = EdgeId {
            index: self.edges.len() as u32,
            generation: self.generation,
        };
        self.edges.push(CallEdge { caller, callee });
        match (caller, caller_key) {
            (Some(caller), Some(caller_key)) => {
                self.nodes[callee.index as usize]
                    .caller_edges
                    .insert(caller_key, id);
                self.nodes[caller.index as usize]
                    .callee_edges
                    .insert(callee_key, id);
            }
            _ => self.nodes[callee.index as usize].root_edge = Some(id),
        }
        debug!(index = id.index, ?caller_key, ?callee_key, "created call edge");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{CallCounter, StaticTypeTable};

    struct Fixture {
        host: StaticTypeTable,
        foo: TypeRef,
        a: MethodId,
        b: MethodId,
        c: MethodId,
    }

    fn fixture() -> Fixture {
        let mut host = StaticTypeTable::new();
        let foo = host.add_class("Foo", None);
        let a = host.intern_method("a");
        let b = host.intern_method("b");
        let c = host.intern_method("c");
        Fixture { host, foo, a, b, c }
    }

    #[test]
    fn test_edge_symmetry() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)).at("foo.rb", 1), &mut counter);
        let b = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.b)).at("foo.rb", 5), &mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);

        let a_node = graph.node(a).unwrap();
        let b_node = graph.node(b).unwrap();
        assert_eq!(a_node.callee_edges().len(), 1);
        assert_eq!(b_node.caller_edges().len(), 1);

        let forward = a_node.callee_edges().get(b_node.key()).unwrap();
        let backward = b_node.caller_edges().get(a_node.key()).unwrap();
        assert_eq!(forward, backward);

        let edge = graph.edge(forward).unwrap();
        assert_eq!(edge.caller, Some(a));
        assert_eq!(edge.callee, b);
        assert_eq!(counter.calls(forward), 1);
        assert_eq!(counter.returns(forward), 1);
    }

    #[test]
    fn test_repeated_calls_share_one_edge() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        for _ in 0..3 {
            graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.b)), &mut counter);
            graph.on_return(&mut counter);
        }
        graph.on_return(&mut counter);

        assert_eq!(graph.node_count(), 2);
        // one root edge into `a`, one edge a -> b
        assert_eq!(graph.edge_count(), 2);
        let ab = graph.callees(a).unwrap()[0];
        assert_eq!(counter.calls(ab), 3);
    }

    #[test]
    fn test_root_flag() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        let b = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.b)), &mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);

        assert!(graph.node(a).unwrap().is_root());
        assert!(!graph.node(b).unwrap().is_root());
        let root_edge = graph.find_edge(None, a).unwrap().unwrap();
        assert_eq!(graph.edge(root_edge).unwrap().caller, None);
        assert_eq!(graph.node(a).unwrap().root_edge(), Some(root_edge));
        assert!(graph.node(a).unwrap().caller_edges().is_empty());
        assert_eq!(graph.callers(a).unwrap(), vec![root_edge]);
    }

    #[test]
    fn test_recursive_flag_is_sticky() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        let b = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.b)), &mut counter);
        graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        assert!(graph.node(a).unwrap().is_recursive());
        assert!(!graph.node(b).unwrap().is_recursive());
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);

        graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        graph.on_return(&mut counter);
        assert!(graph.node(a).unwrap().is_recursive());
        assert_eq!(graph.depth(), 0);
    }

    #[test]
    fn test_nameless_global_caller_is_not_a_root_call() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let c = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.c)), &mut counter);
        graph.on_return(&mut counter);
        let x = graph.on_call(&f.host, Observation::native(None, None), &mut counter);
        graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.c)), &mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);

        let x_node = graph.node(x).unwrap();
        let c_node = graph.node(c).unwrap();
        assert!(x_node.key().is_blank());
        assert_eq!(x_node.callee_edges().len(), 1);
        assert_eq!(c_node.caller_edges().len(), 1);

        let forward = x_node.callee_edges().get(c_node.key()).unwrap();
        assert_eq!(c_node.caller_edges().get(x_node.key()), Some(forward));
        assert_eq!(graph.edge(forward).unwrap().caller, Some(x));

        let root = graph.find_edge(None, c).unwrap().unwrap();
        assert_ne!(root, forward);
        assert_eq!(graph.edge(root).unwrap().caller, None);
        assert_eq!(graph.find_edge(Some(x), c).unwrap(), Some(forward));
        assert_eq!(graph.callers(c).unwrap().len(), 2);
        // root -> c, root -> x, x -> c
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_self_recursion_edge() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);

        let node = graph.node(a).unwrap();
        assert!(node.is_recursive());
        let self_edge = node.callee_edges().get(node.key()).unwrap();
        assert_eq!(node.caller_edges().get(node.key()), Some(self_edge));
    }

    #[test]
    fn test_first_observation_keeps_source() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)).at("foo.rb", 10), &mut counter);
        graph.on_return(&mut counter);
        graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)).at("bar.rb", 99), &mut counter);
        graph.on_return(&mut counter);

        let node = graph.node(a).unwrap();
        assert_eq!(node.source_file(), Some("foo.rb"));
        assert_eq!(node.line(), 10);
    }

    #[test]
    fn test_native_call_has_no_source() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let c = graph.on_call(&f.host, Observation::native(Some(f.foo), Some(f.c)).at("foo.rb", 4), &mut counter);
        let node = graph.node(c).unwrap();
        assert_eq!(node.source_file(), None);
        assert_eq!(node.line(), 0);
    }

    #[test]
    fn test_excluded_nodes_are_hidden_but_connected() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let hidden = graph.create_excluded(&f.host, Some(f.foo), Some(f.b));
        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        let b = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.b)), &mut counter);
        let c = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.c)), &mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);
        graph.on_return(&mut counter);

        assert_eq!(hidden, b);
        assert!(graph.find_edge(Some(a), b).unwrap().is_some());
        assert!(graph.find_edge(Some(b), c).unwrap().is_some());

        let listed: Vec<NodeId> = graph.methods().map(|(id, _)| id).collect();
        assert_eq!(listed, vec![a, c]);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_unbalanced_return() {
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();
        assert_eq!(graph.on_return(&mut counter), None);
    }

    #[test]
    fn test_released_node_access_fails() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        let root_edge = graph.find_edge(None, a).unwrap().unwrap();
        graph.on_return(&mut counter);
        graph.release();

        assert_eq!(graph.node(a).unwrap_err(), GraphError::NodeReleased { index: a.index() });
        assert!(matches!(graph.callers(a), Err(GraphError::NodeReleased { .. })));
        assert!(matches!(graph.edge(root_edge), Err(GraphError::EdgeReleased { .. })));
        assert_eq!(graph.methods().count(), 0);

        // A new node may reuse the index; the stale handle must still fail.
        let again = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        assert_eq!(again.index(), a.index());
        assert!(graph.node(again).is_ok());
        assert!(graph.node(a).is_err());
    }

    #[test]
    fn test_generation_does_not_wrap_at_u32() {
        let f = fixture();
        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();
        graph.generation = u64::from(u32::MAX);

        let a = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        graph.on_return(&mut counter);
        graph.release();

        assert_eq!(graph.generation, u64::from(u32::MAX) + 1);
        let again = graph.on_call(&f.host, Observation::call(Some(f.foo), Some(f.a)), &mut counter);
        assert!(graph.node(again).is_ok());
        assert_eq!(graph.node(a).unwrap_err(), GraphError::NodeReleased { index: a.index() });
    }
}
