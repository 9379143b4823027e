//! Dump/load of method nodes.
//!
//! Edges are written as the peer keys on each side and re-indexed under the
//! peer's key on load, so lookups by peer identity behave exactly as they did
//! in the live session.

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::dto::{EdgeRecord, KeyRecord, MethodRecord};
use crate::domain::callgraph::MethodGraph;
use crate::domain::error::{GraphError, GraphResult};
use crate::domain::method_key::MethodKey;
use crate::domain::method_node::{EdgeId, NodeId};
use crate::ports::HostTypes;

impl MethodGraph {
    /// Portable record for one node.
    pub fn dump(&self, id: NodeId) -> GraphResult<MethodRecord> {
        let node = self.node(id)?;
        let own = KeyRecord::from(node.key());

        let mut callers = self.edge_records(
            node.root_edge()
                .into_iter()
                .chain(node.caller_edges().values().copied()),
        )?;
        let mut callees = self.edge_records(node.callee_edges().values().copied())?;
        callers.sort();
        callees.sort();

        Ok(MethodRecord {
            owner: own.owner,
            method: own.method,
            recursive: node.is_recursive(),
            source_file: node.source_file().map(str::to_string),
            line: node.line(),
            callers,
            callees,
        })
    }

    /// Records for every non-excluded node, built in parallel.
    pub fn dump_all(&self) -> GraphResult<Vec<MethodRecord>> {
        let ids: Vec<NodeId> = self.methods().map(|(id, _)| id).collect();
        ids.par_iter().map(|id| self.dump(*id)).collect()
    }

    /// Load a record given as loosely typed JSON.
    ///
    /// Every field is checked before the session is touched.
    pub fn load_value(&mut self, host: &dyn HostTypes, value: &Value) -> GraphResult<NodeId> {
        let map = value
            .as_object()
            .ok_or_else(|| GraphError::malformed("<record>", "expected a mapping"))?;

        let record = MethodRecord {
            owner: field(map, "owner")?,
            method: field(map, "method")?,
            recursive: required(map, "recursive")?,
            source_file: field(map, "source_file")?,
            line: required(map, "line")?,
            callers: required(map, "callers")?,
            callees: required(map, "callees")?,
        };
        self.load(host, &record)
    }

    /// Rebuild the node described by `record`, creating peer nodes as needed.
    ///
    /// Fails without mutating the session when an edge does not touch the
    /// record's own node.
    pub fn load(&mut self, host: &dyn HostTypes, record: &MethodRecord) -> GraphResult<NodeId> {
        let key = MethodKey::new(host, record.owner, record.method);

        let mut caller_peers = Vec::with_capacity(record.callers.len());
        for (i, edge) in record.callers.iter().enumerate() {
            if to_key(host, &edge.callee) != key {
                return Err(GraphError::malformed(
                    format!("callers[{i}].callee"),
                    "caller edge does not point at this method",
                ));
            }
            caller_peers.push(edge.caller.map(|k| to_key(host, &k)));
        }

        let mut callee_peers = Vec::with_capacity(record.callees.len());
        for (i, edge) in record.callees.iter().enumerate() {
            match edge.caller {
                Some(caller) if to_key(host, &caller) == key => {}
                _ => {
                    return Err(GraphError::malformed(
                        format!("callees[{i}].caller"),
                        "callee edge does not start at this method",
                    ))
                }
            }
            callee_peers.push(to_key(host, &edge.callee));
        }

        let id = self.get_or_create(key, None, 0);
        {
            let node = self.node_mut(id);
            node.set_source_info(record.source_file.as_deref(), record.line);
            node.recursive |= record.recursive;
        }

        for peer in caller_peers {
            match peer {
                Some(peer) => {
                    let peer_id = self.get_or_create(peer, None, 0);
                    self.edge_between_or_create(Some(peer_id), id);
                }
                None => {
                    self.node_mut(id).root = true;
                    self.edge_between_or_create(None, id);
                }
            }
        }
        for peer in callee_peers {
            let peer_id = self.get_or_create(peer, None, 0);
            self.edge_between_or_create(Some(id), peer_id);
        }

        debug!(
            index = id.index(),
            callers = record.callers.len(),
            callees = record.callees.len(),
            "loaded method record"
        );
        Ok(id)
    }

    fn edge_records(&self, edges: impl Iterator<Item = EdgeId>) -> GraphResult<Vec<EdgeRecord>> {
        edges
            .map(|id| -> GraphResult<EdgeRecord> {
                let edge = self.edge(id)?;
                let caller = match edge.caller {
                    Some(caller) => Some(KeyRecord::from(self.node(caller)?.key())),
                    None => None,
                };
                Ok(EdgeRecord {
                    caller,
                    callee: KeyRecord::from(self.node(edge.callee)?.key()),
                })
            })
            .collect()
    }
}

fn to_key(host: &dyn HostTypes, record: &KeyRecord) -> MethodKey {
    MethodKey::new(host, record.owner, record.method)
}

/// Optional field: missing and `null` both mean absent.
fn field<T: DeserializeOwned>(map: &Map<String, Value>, name: &str) -> GraphResult<T>
where
    T: Default,
{
    match map.get(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| GraphError::malformed(name, e)),
    }
}

fn required<T: DeserializeOwned>(map: &Map<String, Value>, name: &str) -> GraphResult<T> {
    let value = map
        .get(name)
        .ok_or_else(|| GraphError::malformed(name, "missing required field"))?;
    serde_json::from_value(value.clone()).map_err(|e| GraphError::malformed(name, e))
}
