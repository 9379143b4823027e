/// Per-context session registry.
///
/// Every execution context gets its own independent graph; nothing is shared
/// between contexts.
use dashmap::DashMap;
use tracing::debug;

use crate::api::dto::MethodRecord;
use crate::domain::callgraph::MethodGraph;
use crate::domain::error::GraphResult;

pub type ContextId = u64;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ContextId, MethodGraph>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the context's graph, creating it on first use.
    ///
    /// The context's entry stays locked for the duration of `f`.
    pub fn with_session<R>(&self, context: ContextId, f: impl FnOnce(&mut MethodGraph) -> R) -> R {
        let mut entry = self.sessions.entry(context).or_default();
        f(entry.value_mut())
    }

    /// Drop a context's graph and everything it owns.
    pub fn discard(&self, context: ContextId) -> bool {
        let removed = self.sessions.remove(&context).is_some();
        if removed {
            debug!(context, "discarded session");
        }
        removed
    }

    pub fn contexts(&self) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Records of every context, ordered by context id.
    pub fn dump_all(&self) -> GraphResult<Vec<(ContextId, Vec<MethodRecord>)>> {
        self.contexts()
            .into_iter()
            .filter_map(|context| {
                self.sessions
                    .get(&context)
                    .map(|graph| graph.dump_all().map(|records| (context, records)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::Observation;
    use crate::infrastructure::{CallCounter, StaticTypeTable};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_contexts_are_independent() {
        let mut host = StaticTypeTable::new();
        let foo = host.add_class("Foo", None);
        let run = host.intern_method("run");
        let stop = host.intern_method("stop");

        let registry = SessionRegistry::new();
        let mut counter = CallCounter::default();
        registry.with_session(1, |graph| {
            graph.on_call(&host, Observation::call(Some(foo), Some(run)), &mut counter);
        });
        registry.with_session(2, |graph| {
            graph.on_call(&host, Observation::call(Some(foo), Some(stop)), &mut counter);
            graph.on_call(&host, Observation::call(Some(foo), Some(run)), &mut counter);
        });

        assert_eq!(registry.with_session(1, |g| g.node_count()), 1);
        assert_eq!(registry.with_session(2, |g| g.node_count()), 2);
        assert_eq!(registry.with_session(1, |g| g.depth()), 1);

        let dumps = registry.dump_all().unwrap();
        assert_eq!(dumps.iter().map(|(c, _)| *c).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(dumps[1].1.len(), 2);

        assert!(registry.discard(1));
        assert!(!registry.discard(1));
        assert_eq!(registry.contexts(), vec![2]);
    }

    #[test]
    fn test_concurrent_contexts() {
        let mut host = StaticTypeTable::new();
        let foo = host.add_class("Foo", None);
        let run = host.intern_method("run");
        let host = Arc::new(host);
        let registry = Arc::new(SessionRegistry::new());

        let handles: Vec<_> = (0..4u64)
            .map(|context| {
                let host = Arc::clone(&host);
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let mut counter = CallCounter::default();
                    for _ in 0..10 {
                        registry.with_session(context, |graph| {
                            graph.on_call(host.as_ref(), Observation::call(Some(foo), Some(run)), &mut counter);
                            graph.on_return(&mut counter);
                        });
                    }
                    counter.total_calls()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 10);
        }
        assert_eq!(registry.len(), 4);
        for context in registry.contexts() {
            assert_eq!(registry.with_session(context, |g| g.edge_count()), 1);
        }
    }
}
