use crate::{
    error::MapError,
    obs::{
        MetricsSink, ScanTraceSink,
        sink::{ScanKind, Span, with_metrics_sink},
        trace::start_scan_trace,
    },
    registry::Registry,
    row::{Row, RowSource},
    scan::{ScanState, materialize},
    traits::Entity,
};
use std::{collections::HashSet, fmt, sync::Arc};

///
/// Mapper
///
/// Scan handle with policy (debug, metrics, tracing) and a shared registry.
/// Cheap to clone; clones share the registry.
///

#[derive(Clone)]
pub struct Mapper {
    registry: Arc<Registry>,
    debug: bool,
    metrics: Option<&'static dyn MetricsSink>,
    trace: Option<&'static dyn ScanTraceSink>,
}

impl Mapper {
    /// Mapper over the process-wide registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Registry::global())
    }

    /// Mapper over an explicit registry.
    #[must_use]
    pub const fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            debug: false,
            metrics: None,
            trace: None,
        }
    }

    /// Enable debug logging for scans run through this handle.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Override the metrics sink for scans run through this handle.
    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Attach a trace sink for scans run through this handle.
    #[must_use]
    pub const fn trace_sink(mut self, sink: &'static dyn ScanTraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Analyze `E` and its relation graph up front.
    pub fn register<E: Entity>(&self) -> Result<(), MapError> {
        self.registry.descriptor_with::<E>(self.debug)?;

        Ok(())
    }

    /// Map the rows into `dest` in place.
    ///
    /// Mapped columns are written over the current value of `dest`; untagged
    /// fields and fields whose column is missing or NULL keep what they held,
    /// and related entities are attached to the existing relation fields.
    /// `dest` is only written on success.
    pub fn map_one<E, S>(&self, rows: S, dest: &mut E) -> Result<(), MapError>
    where
        E: Entity,
        S: RowSource,
    {
        *dest = self.run::<E, S, _>(ScanKind::One, rows, Some(dest.clone()), |mut roots| {
            roots.pop().ok_or(MapError::NoRows)
        })?;

        Ok(())
    }

    /// Map the rows into distinct root entities in first-seen order,
    /// replacing the contents of `dest`.
    pub fn map_many<E, S>(&self, rows: S, dest: &mut Vec<E>) -> Result<(), MapError>
    where
        E: Entity,
        S: RowSource,
    {
        *dest = self.many(rows)?;

        Ok(())
    }

    /// Map the rows into a single entity.
    ///
    /// `NoRows` if no row carries a root entity; `TooManyRows` if rows carry
    /// two distinct roots.
    pub fn one<E, S>(&self, rows: S) -> Result<E, MapError>
    where
        E: Entity,
        S: RowSource,
    {
        self.run::<E, S, _>(ScanKind::One, rows, None, |mut roots| {
            roots.pop().ok_or(MapError::NoRows)
        })
    }

    /// Map the rows into distinct root entities in first-seen order.
    pub fn many<E, S>(&self, rows: S) -> Result<Vec<E>, MapError>
    where
        E: Entity,
        S: RowSource,
    {
        self.run::<E, S, _>(ScanKind::Many, rows, None, Ok)
    }

    fn debug_log(&self, s: impl AsRef<str>) {
        if self.debug {
            println!("[debug] {}", s.as_ref());
        }
    }

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }

    fn run<E, S, T>(
        &self,
        kind: ScanKind,
        rows: S,
        seed: Option<E>,
        finish: impl FnOnce(Vec<E>) -> Result<T, MapError>,
    ) -> Result<T, MapError>
    where
        E: Entity,
        S: RowSource,
    {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(kind);
            let trace = start_scan_trace(self.trace, kind, E::PATH);

            let result = self.scan::<E, S>(kind, rows, seed, &mut span).and_then(|roots| {
                let count = u64::try_from(roots.len()).unwrap_or(u64::MAX);
                finish(roots).map(|out| (out, count))
            });

            match result {
                Ok((out, roots)) => {
                    span.set_roots(roots);
                    if let Some(trace) = trace {
                        trace.finish(span.rows(), roots);
                    }
                    self.debug_log(format!(
                        "{kind:?} scan of entity(name={}) -> {} rows, {roots} roots",
                        E::ENTITY_NAME,
                        span.rows(),
                    ));

                    Ok(out)
                }
                Err(err) => {
                    span.error(err.class());
                    if let Some(trace) = trace {
                        trace.error(span.rows(), err.class());
                    }
                    self.debug_log(format!(
                        "{kind:?} scan of entity(name={}) failed after {} rows: {}",
                        E::ENTITY_NAME,
                        span.rows(),
                        err.display_with_class(),
                    ));

                    Err(err)
                }
            }
        })
    }

    // Consume every row into one identity map, then assemble the roots in
    // first-seen order.
    fn scan<E, S>(
        &self,
        kind: ScanKind,
        rows: S,
        seed: Option<E>,
        span: &mut Span<E>,
    ) -> Result<Vec<E>, MapError>
    where
        E: Entity,
        S: RowSource,
    {
        let mut rows = CloseOnDrop(rows);

        let mut state = ScanState::new(&self.registry, self.debug);
        if let Some(seed) = seed {
            state = state.with_seed(seed);
        }

        // schema errors surface even when the result set is empty
        state.descriptor::<E>()?;
        let mut order = Vec::new();
        let mut seen = HashSet::new();

        while let Some(row) = rows.next_row()? {
            span.add_row();

            let Some(root) = materialize::<E>(&mut state, &row)? else {
                continue;
            };
            if seen.insert(root.node) {
                order.push(root.node);
            } else {
                debug_assert!(root.existed);
            }
        }
        drop(rows);

        if kind == ScanKind::One && order.len() > 1 {
            return Err(MapError::TooManyRows {
                entity: E::ENTITY_NAME,
            });
        }

        self.debug_log(format!(
            "identity map for entity(name={}): {} nodes ({} created, {} merged), {} descriptor lookups",
            E::ENTITY_NAME,
            state.identity.len(),
            state.created,
            state.merged,
            state.descriptors.misses(),
        ));

        let mut assembler = state.assembler();
        order
            .into_iter()
            .map(|node| assembler.assemble::<E>(node))
            .collect()
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("debug", &self.debug)
            .field("metrics_sink", &self.metrics.is_some())
            .field("trace_sink", &self.trace.is_some())
            .finish_non_exhaustive()
    }
}

///
/// CloseOnDrop
/// Closes the row source on every exit path, unwinding included.
///

struct CloseOnDrop<S: RowSource>(S);

impl<S: RowSource> CloseOnDrop<S> {
    fn next_row(&mut self) -> Result<Option<Row>, MapError> {
        self.0.next_row().map_err(MapError::upstream)
    }
}

impl<S: RowSource> Drop for CloseOnDrop<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}
