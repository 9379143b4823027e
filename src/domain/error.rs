//! Errors raised by the call-graph core.

use thiserror::Error;

/// Errors surfaced by [`MethodGraph`](crate::domain::callgraph::MethodGraph) queries
/// and record loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The node handle outlived the session that owned it.
    #[error("method node {index} has already been released, likely because its session was released")]
    NodeReleased { index: u32 },

    /// The edge handle outlived the session that owned it.
    #[error("call edge {index} has already been released, likely because its session was released")]
    EdgeReleased { index: u32 },

    /// The handle was never issued by this session.
    #[error("handle {index} does not belong to this session")]
    UnknownHandle { index: u32 },

    /// A method record is missing a required field or carries the wrong type.
    #[error("malformed method record: field `{field}`: {reason}")]
    MalformedRecord { field: String, reason: String },
}

impl GraphError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        GraphError::MalformedRecord {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
