//! Scan tracing boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect scan semantics.

use crate::{error::ErrorClass, obs::sink::ScanKind};

///
/// ScanTraceSink
///

pub trait ScanTraceSink: Send + Sync {
    fn on_event(&self, event: ScanTraceEvent);
}

///
/// ScanTraceEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanTraceEvent {
    Start {
        kind: ScanKind,
        entity_path: &'static str,
    },
    Finish {
        kind: ScanKind,
        entity_path: &'static str,
        rows: u64,
        roots: u64,
    },
    Error {
        kind: ScanKind,
        entity_path: &'static str,
        rows: u64,
        class: ErrorClass,
    },
}

///
/// TraceScope
///

pub(crate) struct TraceScope {
    sink: &'static dyn ScanTraceSink,
    kind: ScanKind,
    entity_path: &'static str,
}

impl TraceScope {
    fn new(sink: &'static dyn ScanTraceSink, kind: ScanKind, entity_path: &'static str) -> Self {
        sink.on_event(ScanTraceEvent::Start { kind, entity_path });

        Self {
            sink,
            kind,
            entity_path,
        }
    }

    pub(crate) fn finish(self, rows: u64, roots: u64) {
        self.sink.on_event(ScanTraceEvent::Finish {
            kind: self.kind,
            entity_path: self.entity_path,
            rows,
            roots,
        });
    }

    pub(crate) fn error(self, rows: u64, class: ErrorClass) {
        self.sink.on_event(ScanTraceEvent::Error {
            kind: self.kind,
            entity_path: self.entity_path,
            rows,
            class,
        });
    }
}

pub(crate) fn start_scan_trace(
    sink: Option<&'static dyn ScanTraceSink>,
    kind: ScanKind,
    entity_path: &'static str,
) -> Option<TraceScope> {
    let sink = sink?;
    Some(TraceScope::new(sink, kind, entity_path))
}
