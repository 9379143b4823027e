use serde::{Deserialize, Serialize};

use crate::domain::method_key::{MethodId, MethodKey, TypeRef};

/// Key fields identifying a peer node inside an edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyRecord {
    pub owner: Option<TypeRef>,
    pub method: Option<MethodId>,
}

impl From<&MethodKey> for KeyRecord {
    fn from(key: &MethodKey) -> Self {
        Self {
            owner: key.owner(),
            method: key.method(),
        }
    }
}

/// One call edge as seen from the node being dumped.
///
/// `caller == None` is a root call; on load its peer is the blank key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub caller: Option<KeyRecord>,
    pub callee: KeyRecord,
}

/// Portable form of a method node and its edge sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub owner: Option<TypeRef>,
    pub method: Option<MethodId>,
    pub recursive: bool,
    pub source_file: Option<String>,
    pub line: u32,
    pub callers: Vec<EdgeRecord>,
    pub callees: Vec<EdgeRecord>,
}

impl MethodRecord {
    pub fn key_record(&self) -> KeyRecord {
        KeyRecord {
            owner: self.owner,
            method: self.method,
        }
    }
}
