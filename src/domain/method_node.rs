//! Per-method profiling records and the call edges between them.

use std::sync::OnceLock;

use crate::domain::method_key::{MethodId, MethodKey, MethodTable, TypeRef};
use crate::domain::resolver::{self, Relation, Resolved};
use crate::ports::HostTypes;

/// Handle to a [`MethodNode`] inside one session.
///
/// Carries the session generation it was issued under so handles that outlive
/// a release are rejected instead of aliasing new nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u64,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Handle to a [`CallEdge`] inside one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId {
    pub(crate) index: u32,
    pub(crate) generation: u64,
}

impl EdgeId {
    pub fn index(self) -> u32 {
        self.index
    }
}

/// A caller -> callee relationship. One per distinct pair per session.
///
/// `caller == None` is a root call made from outside any tracked method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    pub caller: Option<NodeId>,
    pub callee: NodeId,
}

/// Profiling record for one distinct method.
#[derive(Debug)]
pub struct MethodNode {
    key: MethodKey,
    source_file: Option<String>,
    line: u32,
    pub(crate) root: bool,
    pub(crate) recursive: bool,
    pub(crate) excluded: bool,
    pub(crate) root_edge: Option<EdgeId>,
    pub(crate) caller_edges: MethodTable<EdgeId>,
    pub(crate) callee_edges: MethodTable<EdgeId>,
    resolved: OnceLock<Resolved>,
}

impl MethodNode {
    pub(crate) fn new(key: MethodKey, source_file: Option<&str>, line: u32) -> Self {
        let mut node = Self {
            key,
            source_file: None,
            line: 0,
            root: false,
            recursive: false,
            excluded: false,
            root_edge: None,
            caller_edges: MethodTable::new(),
            callee_edges: MethodTable::new(),
            resolved: OnceLock::new(),
        };
        node.set_source_info(source_file, line);
        node
    }

    /// Structurally present, never enumerated, no source location.
    pub(crate) fn excluded(key: MethodKey) -> Self {
        let mut node = Self::new(key, None, 0);
        node.excluded = true;
        node
    }

    /// Line is only kept alongside a file; native methods have neither.
    pub(crate) fn set_source_info(&mut self, source_file: Option<&str>, line: u32) {
        match source_file {
            Some(file) => {
                self.source_file = Some(file.to_string());
                self.line = line;
            }
            None => {
                self.source_file = None;
                self.line = 0;
            }
        }
    }

    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    pub fn owner(&self) -> Option<TypeRef> {
        self.key.owner()
    }

    pub fn method(&self) -> Option<MethodId> {
        self.key.method()
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// Source file, or `native_label` for methods without one.
    pub fn source_label<'a>(&'a self, native_label: &'a str) -> &'a str {
        self.source_file.as_deref().unwrap_or(native_label)
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Incoming edge from outside any tracked method.
    pub fn root_edge(&self) -> Option<EdgeId> {
        self.root_edge
    }

    /// Incoming edges from tracked methods, keyed by the caller's key.
    ///
    /// The root edge is not in this table, so a method whose key is
    /// [`MethodKey::BLANK`] is an ordinary caller here.
    pub fn caller_edges(&self) -> &MethodTable<EdgeId> {
        &self.caller_edges
    }

    /// Outgoing edges keyed by the callee's key.
    pub fn callee_edges(&self) -> &MethodTable<EdgeId> {
        &self.callee_edges
    }

    /// Canonical owner and relation, computed on first use and cached.
    pub fn resolved(&self, host: &dyn HostTypes) -> &Resolved {
        self.resolved
            .get_or_init(|| resolver::resolve_source_owner(host, self.key.owner()))
    }

    pub fn resolved_source_owner(&self, host: &dyn HostTypes) -> Option<TypeRef> {
        self.resolved(host).owner
    }

    pub fn relation(&self, host: &dyn HostTypes) -> Relation {
        self.resolved(host).relation
    }

    pub fn owner_display_name(&self, host: &dyn HostTypes) -> String {
        resolver::owner_display_name(host, self.key.owner())
    }

    pub fn method_display_name(&self, host: &dyn HostTypes) -> String {
        resolver::method_display_name(host, self.key.method())
    }

    pub fn full_name(&self, host: &dyn HostTypes) -> String {
        resolver::full_name(host, self.key.owner(), self.key.method())
    }

    pub fn call_tree_name(&self, host: &dyn HostTypes) -> String {
        let resolved = *self.resolved(host);
        resolver::call_tree_name(host, &resolved, self.key.method())
    }
}
