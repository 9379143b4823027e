// Main library entry point for methodgraph.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::callgraph::{EventKind, MethodGraph, Observation};
pub use domain::error::{GraphError, GraphResult};
pub use domain::method_key::{MethodId, MethodKey, MethodTable, TypeRef};
pub use domain::method_node::{CallEdge, EdgeId, MethodNode, NodeId};
pub use domain::resolver::{Relation, Resolved};
