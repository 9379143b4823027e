/// Trace Loader
///
/// Reads recorded traces: a host type description plus the call/return event
/// stream observed for one execution context.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::callgraph::{EventKind, Observation};
use crate::domain::method_key::{MethodId, TypeRef};
use crate::infrastructure::type_table::{MethodEntry, StaticTypeTable, TypeEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFile {
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Call {
        #[serde(default)]
        owner: Option<TypeRef>,
        #[serde(default)]
        method: Option<MethodId>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        line: u32,
        #[serde(default)]
        native: bool,
    },
    Return,
}

impl TraceEvent {
    /// Entry observation for a call event; `None` for returns.
    pub fn observation(&self) -> Option<Observation<'_>> {
        match self {
            TraceEvent::Call {
                owner,
                method,
                file,
                line,
                native,
            } => Some(Observation {
                kind: if *native {
                    EventKind::NativeCall
                } else {
                    EventKind::Call
                },
                owner: *owner,
                method: *method,
                source_file: file.as_deref(),
                line: *line,
            }),
            TraceEvent::Return => None,
        }
    }
}

impl TraceFile {
    pub fn type_table(&self) -> StaticTypeTable {
        StaticTypeTable::from_entries(&self.types, &self.methods)
    }
}

pub struct TraceLoader;

impl TraceLoader {
    pub fn load(path: &Path) -> Result<TraceFile> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid trace {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<TraceFile> {
        Ok(serde_json::from_str(content)?)
    }
}
