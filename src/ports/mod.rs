use serde::{Deserialize, Serialize};

use crate::domain::method_key::{MethodId, TypeRef};
use crate::domain::method_node::{CallEdge, EdgeId};

/// The entity a singleton wrapper holds methods for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Attached {
    /// A class; the wrapper is its metaclass.
    Class(TypeRef),
    /// A module carrying module-level methods.
    Module(TypeRef),
    /// A plain instance.
    Object,
    /// Anything else, e.g. a builtin literal with singleton methods.
    Other,
}

/// Read-only queries over the host's type metadata.
///
/// The resolver and the display helpers depend on nothing else, so a fake
/// hierarchy is enough to drive them.
pub trait HostTypes {
    fn is_singleton_wrapper(&self, ty: TypeRef) -> bool;

    /// What `ty` is attached to. Only meaningful for singleton wrappers.
    fn wrapped_entity_of(&self, ty: TypeRef) -> Attached;

    fn is_mixin_inclusion_proxy(&self, ty: TypeRef) -> bool;

    /// Module a proxy stands in for. Non-proxies map to themselves.
    fn target_module_of(&self, proxy: TypeRef) -> TypeRef;

    fn supertype_of(&self, ty: TypeRef) -> Option<TypeRef>;

    /// Namespaced name, e.g. `Outer::Inner`.
    fn namespaced_name_of(&self, ty: TypeRef) -> String;

    fn is_module(&self, ty: TypeRef) -> bool;

    fn is_class(&self, ty: TypeRef) -> bool;

    /// Generic string conversion for shapes nothing else recognises.
    fn inspect(&self, ty: TypeRef) -> String;

    fn method_name_of(&self, method: MethodId) -> String;
}

/// Measurement collaborator notified as calls enter and leave an edge.
///
/// Timing and counting live behind this trait; the graph only creates and
/// finds edges.
pub trait EdgeMeasurer {
    fn on_enter(&mut self, id: EdgeId, edge: &CallEdge);
    fn on_exit(&mut self, id: EdgeId, edge: &CallEdge);
}
