//! Planning trace boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! planning semantics.

///
/// PlanTraceSink
///

pub trait PlanTraceSink: Send + Sync {
    fn on_event(&self, event: PlanTraceEvent);
}

///
/// PlanTraceEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlanTraceEvent {
    /// Atom counts per bucket after classification.
    Classified {
        partition: u32,
        clustering: u32,
        regular: u32,
        not_null: u32,
    },

    /// Outcome of index selection.
    IndexSelection {
        chosen: Option<String>,
        score: u32,
    },

    /// Final scan-strategy verdicts.
    Decided {
        is_key_range: bool,
        uses_secondary_indexing: bool,
        needs_filtering: bool,
    },
}

pub(crate) fn emit(sink: Option<&dyn PlanTraceSink>, event: PlanTraceEvent) {
    if let Some(sink) = sink {
        sink.on_event(event);
    }
}
