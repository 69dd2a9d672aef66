use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for scans on the current thread.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    /// Failed scans keyed by error class label.
    pub errors: BTreeMap<String, u64>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            errors: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Orchestrator entrypoints
    pub map_one_calls: u64,
    pub map_many_calls: u64,

    // Rows and results
    pub rows_scanned: u64,
    pub roots_mapped: u64,

    // Identity map
    pub entities_created: u64,
    pub entities_merged: u64,

    // Metadata
    pub descriptors_analyzed: u64,

    pub scan_errors: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub scans: u64,
    pub rows_scanned: u64,
    pub roots_mapped: u64,
    pub entities_created: u64,
    pub entities_merged: u64,
    pub scan_errors: u64,
    pub analyzed: bool,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and open a new window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
/// Event/counter report for the current thread.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters and averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub scans: u64,
    pub rows_scanned: u64,
    pub roots_mapped: u64,
    pub entities_created: u64,
    pub entities_merged: u64,
    pub scan_errors: u64,
    pub avg_rows_per_scan: f64,
    /// Share of materializations absorbed by the identity map.
    pub merge_ratio: f64,
}

/// Build a report, or an empty one if the caller's window starts after the
/// current one.
#[must_use]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.window_start_ms) {
        return EventReport::default();
    }

    report_from(snap)
}

#[expect(clippy::cast_precision_loss)]
fn report_from(snap: EventState) -> EventReport {
    let mut entity_counters: Vec<EntitySummary> = Vec::new();
    for (path, ops) in &snap.entities {
        let avg_rows = if ops.scans > 0 {
            ops.rows_scanned as f64 / ops.scans as f64
        } else {
            0.0
        };
        let touched = ops.entities_created.saturating_add(ops.entities_merged);
        let merge_ratio = if touched > 0 {
            ops.entities_merged as f64 / touched as f64
        } else {
            0.0
        };

        entity_counters.push(EntitySummary {
            path: path.clone(),
            scans: ops.scans,
            rows_scanned: ops.rows_scanned,
            roots_mapped: ops.roots_mapped,
            entities_created: ops.entities_created,
            entities_merged: ops.entities_merged,
            scan_errors: ops.scan_errors,
            avg_rows_per_scan: avg_rows,
            merge_ratio,
        });
    }

    entity_counters.sort_by(|a, b| {
        match b
            .avg_rows_per_scan
            .partial_cmp(&a.avg_rows_per_scan)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.rows_scanned.cmp(&a.rows_scanned) {
                Ordering::Equal => a.path.cmp(&b.path),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

///
/// TESTS
///
