// Core call-graph model: method identity, nodes and edges, identity
// resolution, sessions and record round trips.

pub mod callgraph;
pub mod error;
pub mod method_key;
pub mod method_node;
pub mod resolver;
pub mod serializer;
pub mod store;
