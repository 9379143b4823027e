// Infrastructure implementations: a data-driven host type system, the call
// counting measurer, configuration, trace loading and session bookkeeping.

pub mod concurrency;
pub mod config;
pub mod measure;
pub mod sessions;
pub mod trace_loader;
pub mod type_table;

pub use config::ProfilerConfig;
pub use measure::{CallCounter, EdgeCounts};
pub use sessions::{ContextId, SessionRegistry};
pub use trace_loader::{TraceEvent, TraceFile, TraceLoader};
pub use type_table::{StaticTypeTable, TypeShape};
