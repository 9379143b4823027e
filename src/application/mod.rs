use tracing::{info, warn};

use crate::domain::callgraph::MethodGraph;
use crate::domain::method_key::{MethodId, TypeRef};
use crate::infrastructure::TraceEvent;
use crate::ports::{EdgeMeasurer, HostTypes};

/// Counts gathered while replaying one event stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub calls: usize,
    pub returns: usize,
    /// Returns seen with nothing on the stack.
    pub unbalanced_returns: usize,
    /// Frames still open when the stream ended.
    pub open_frames: usize,
}

/// Drives a session from a recorded event stream.
pub struct ReplayUsecase<'a> {
    pub host: &'a dyn HostTypes,
}

impl<'a> ReplayUsecase<'a> {
    /// Create excluded nodes before any event is seen.
    pub fn exclude(&self, graph: &mut MethodGraph, methods: &[(Option<TypeRef>, Option<MethodId>)]) {
        for (owner, method) in methods {
            graph.create_excluded(self.host, *owner, *method);
        }
    }

    pub fn run(
        &self,
        graph: &mut MethodGraph,
        measurer: &mut dyn EdgeMeasurer,
        events: &[TraceEvent],
    ) -> ReplaySummary {
        let mut summary = ReplaySummary::default();

        for event in events {
            match event.observation() {
                Some(observation) => {
                    graph.on_call(self.host, observation, measurer);
                    summary.calls += 1;
                }
                None => match graph.on_return(measurer) {
                    Some(_) => summary.returns += 1,
                    None => summary.unbalanced_returns += 1,
                },
            }
        }

        summary.open_frames = graph.depth();
        if summary.open_frames > 0 {
            warn!(open_frames = summary.open_frames, "trace ended with open frames");
        }
        info!(
            calls = summary.calls,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "replay finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{CallCounter, StaticTypeTable};

    fn call(owner: TypeRef, method: MethodId) -> TraceEvent {
        TraceEvent::Call {
            owner: Some(owner),
            method: Some(method),
            file: Some("app.rb".to_string()),
            line: 1,
            native: false,
        }
    }

    #[test]
    fn test_replay_summary() {
        let mut host = StaticTypeTable::new();
        let app = host.add_class("App", None);
        let main = host.intern_method("main");
        let step = host.intern_method("step");

        let events = vec![
            call(app, main),
            call(app, step),
            TraceEvent::Return,
            call(app, step),
            TraceEvent::Return,
            TraceEvent::Return,
            TraceEvent::Return,
            call(app, main),
        ];

        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();
        let usecase = ReplayUsecase { host: &host };
        let summary = usecase.run(&mut graph, &mut counter, &events);

        assert_eq!(
            summary,
            ReplaySummary { calls: 4, returns: 3, unbalanced_returns: 1, open_frames: 1 }
        );
        assert_eq!(graph.node_count(), 2);
        assert_eq!(counter.total_calls(), 4);
    }

    #[test]
    fn test_exclusions_applied_first() {
        let mut host = StaticTypeTable::new();
        let app = host.add_class("App", None);
        let main = host.intern_method("main");
        let hook = host.intern_method("hook");

        let mut graph = MethodGraph::new();
        let mut counter = CallCounter::default();
        let usecase = ReplayUsecase { host: &host };
        usecase.exclude(&mut graph, &[(Some(app), Some(hook))]);
        usecase.run(
            &mut graph,
            &mut counter,
            &[call(app, main), call(app, hook), TraceEvent::Return, TraceEvent::Return],
        );

        let names: Vec<String> = graph.methods().map(|(_, n)| n.full_name(&host)).collect();
        assert_eq!(names, vec!["App#main".to_string()]);
        assert_eq!(graph.edge_count(), 2);
    }
}
