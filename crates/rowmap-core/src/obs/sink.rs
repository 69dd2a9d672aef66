//! Metrics sink boundary.
//!
//! Scan logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between scan logic and the
//! thread-local metrics state.
use crate::{error::ErrorClass, obs::metrics, traits::Entity};
use std::{cell::Cell, marker::PhantomData};

thread_local! {
    static SINK_OVERRIDE: Cell<Option<&'static dyn MetricsSink>> = const { Cell::new(None) };
}

///
/// ScanKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanKind {
    One,
    Many,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ScanStart {
        kind: ScanKind,
        entity_path: &'static str,
    },
    ScanFinish {
        kind: ScanKind,
        entity_path: &'static str,
        roots: u64,
    },
    RowsScanned {
        entity_path: &'static str,
        rows_scanned: u64,
    },
    EntityMaterialized {
        entity_path: &'static str,
        created: bool,
    },
    DescriptorAnalyzed {
        entity_path: &'static str,
    },
    ScanError {
        entity_path: &'static str,
        class: ErrorClass,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Sync {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ScanStart { kind, entity_path } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ScanKind::One => m.ops.map_one_calls = m.ops.map_one_calls.saturating_add(1),
                        ScanKind::Many => {
                            m.ops.map_many_calls = m.ops.map_many_calls.saturating_add(1);
                        }
                    }

                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.scans = entry.scans.saturating_add(1);
                });
            }

            MetricsEvent::ScanFinish {
                kind: _,
                entity_path,
                roots,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.roots_mapped = m.ops.roots_mapped.saturating_add(roots);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.roots_mapped = entry.roots_mapped.saturating_add(roots);
                });
            }

            MetricsEvent::RowsScanned {
                entity_path,
                rows_scanned,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
                });
            }

            MetricsEvent::EntityMaterialized {
                entity_path,
                created,
            } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    if created {
                        m.ops.entities_created = m.ops.entities_created.saturating_add(1);
                        entry.entities_created = entry.entities_created.saturating_add(1);
                    } else {
                        m.ops.entities_merged = m.ops.entities_merged.saturating_add(1);
                        entry.entities_merged = entry.entities_merged.saturating_add(1);
                    }
                });
            }

            MetricsEvent::DescriptorAnalyzed { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.descriptors_analyzed = m.ops.descriptors_analyzed.saturating_add(1);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.analyzed = true;
                });
            }

            MetricsEvent::ScanError { entity_path, class } => {
                metrics::with_state_mut(|m| {
                    m.ops.scan_errors = m.ops.scan_errors.saturating_add(1);
                    *m.errors.entry(class.to_string()).or_default() += 1;
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.scan_errors = entry.scan_errors.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    match SINK_OVERRIDE.with(Cell::get) {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state for endpoint/test plumbing.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub(crate) fn with_metrics_sink<T>(sink: &'static dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<&'static dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.replace(Some(sink)));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish metrics events for one scan.
/// Ensures finish accounting happens even on error or unwind.

pub(crate) struct Span<E: Entity> {
    kind: ScanKind,
    rows: u64,
    roots: u64,
    finished: bool,
    _marker: PhantomData<E>,
}

impl<E: Entity> Span<E> {
    #[must_use]
    /// Start a metrics span for a specific root entity and scan kind.
    pub(crate) fn new(kind: ScanKind) -> Self {
        record(MetricsEvent::ScanStart {
            kind,
            entity_path: E::PATH,
        });

        Self {
            kind,
            rows: 0,
            roots: 0,
            finished: false,
            _marker: PhantomData,
        }
    }

    pub(crate) const fn add_row(&mut self) {
        self.rows = self.rows.saturating_add(1);
    }

    pub(crate) const fn set_roots(&mut self, roots: u64) {
        self.roots = roots;
    }

    pub(crate) const fn rows(&self) -> u64 {
        self.rows
    }

    /// Record a classified failure for the root entity.
    pub(crate) fn error(&self, class: ErrorClass) {
        record(MetricsEvent::ScanError {
            entity_path: E::PATH,
            class,
        });
    }

    fn finish_inner(&self) {
        record(MetricsEvent::RowsScanned {
            entity_path: E::PATH,
            rows_scanned: self.rows,
        });
        record(MetricsEvent::ScanFinish {
            kind: self.kind,
            entity_path: E::PATH,
            roots: self.roots,
        });
    }
}

impl<E: Entity> Drop for Span<E> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish_inner();
            self.finished = true;
        }
    }
}

///
/// TESTS
///
