//! Observability: scan telemetry (metrics), trace hooks and sink abstractions.
//!
//! Scan logic never touches `obs::metrics` directly; all instrumentation
//! flows through `MetricsEvent` and `MetricsSink`.

pub(crate) mod metrics;
pub(crate) mod sink;
pub(crate) mod trace;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, ScanKind, metrics_report, metrics_reset_all};
pub use trace::{ScanTraceEvent, ScanTraceSink};
