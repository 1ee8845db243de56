//! Runtime dispatch tracing infrastructure.
//!
//! Provides a trait-based tracing system for the object runtime. The runtime owns its tracer as a
//! `Box<dyn RuntimeTracer>` because slot functions are plain `fn` pointers that receive the runtime
//! by reference and cannot be generic over a tracer type.
//!
//! # Architecture
//!
//! The [`RuntimeTracer`] trait defines hook points at key runtime events (slot dispatch,
//! function calls/returns, type creation, slot re-derivation, recursion overflow). Concrete
//! implementations collect different kinds of data:
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (production default) |
//! | [`StderrTracer`] | Human-readable dispatch log to stderr |
//! | [`ProfilingTracer`] | Slot frequency counters and call depth tracking |
//! | [`RecordingTracer`] | Full event recording for post-mortem analysis |
//!
//! # Usage
//!
//! ```ignore
//! // Production:
//! let mut rt = Runtime::new()?;
//!
//! // Debugging:
//! let mut rt = Runtime::with_tracer(Box::new(StderrTracer::new()))?;
//!
//! // Profiling:
//! let mut rt = Runtime::with_tracer(Box::new(ProfilingTracer::new()))?;
//! // ... run ...
//! let report = rt.tracer_as::<ProfilingTracer>().map(ProfilingTracer::report);
//! ```

use std::{any::Any, collections::HashMap};

use crate::slot::Slot;

/// Trace event emitted by the runtime.
///
/// Used by [`RecordingTracer`] to capture a full trace for post-mortem analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A slot was invoked on an object of the given type.
    SlotDispatch {
        /// Name of the type whose slot table was consulted.
        type_name: String,
        /// The slot that was invoked.
        slot: Slot,
    },
    /// A function call pushed a new frame.
    Call {
        func_name: String,
        /// Frame stack depth after the push.
        depth: usize,
    },
    /// A function return popped a frame.
    Return {
        /// Frame stack depth after the pop.
        depth: usize,
    },
    /// A new type object was created.
    TypeCreated { name: String },
    /// A dunder edit caused a type's slot table to be re-derived.
    SlotsUpdated {
        /// Name of the type whose slots were recomputed.
        type_name: String,
        /// The special method whose binding changed.
        method: String,
    },
    /// The recursion limit was hit.
    RecursionOverflow { depth: usize, limit: usize },
}

/// Trait for runtime tracing.
///
/// All methods have default no-op implementations, so [`NoopTracer`] requires
/// zero lines of code. Implementations only override the hooks they care about.
pub trait RuntimeTracer: std::fmt::Debug + Any {
    /// Called whenever a non-empty slot is about to be invoked.
    ///
    /// This is the hottest hook: every operator, attribute access and call passes through it.
    ///
    /// # Arguments
    /// * `type_name` - Name of the type whose slot is dispatched
    /// * `slot` - The slot being invoked
    #[inline]
    fn on_slot_dispatch(&mut self, _type_name: &str, _slot: Slot) {}

    /// Called when a function frame is pushed.
    ///
    /// # Arguments
    /// * `func_name` - Qualified name of the function
    /// * `depth` - Frame stack depth after the push
    #[inline]
    fn on_call(&mut self, _func_name: &str, _depth: usize) {}

    /// Called when a function frame is popped.
    #[inline]
    fn on_return(&mut self, _depth: usize) {}

    /// Called after a type object has been fully initialised.
    #[inline]
    fn on_type_created(&mut self, _name: &str) {}

    /// Called when assigning or deleting a special method re-derives a type's slots.
    #[inline]
    fn on_slots_updated(&mut self, _type_name: &str, _method: &str) {}

    /// Called when a thread context exceeds its recursion limit.
    #[inline]
    fn on_recursion_overflow(&mut self, _depth: usize, _limit: usize) {}
}

// ============================================================================
// NoopTracer: production default
// ============================================================================

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl RuntimeTracer for NoopTracer {}

// ============================================================================
// StderrTracer: human-readable dispatch log
// ============================================================================

/// Tracer that prints a human-readable dispatch log to stderr.
///
/// Output format:
/// ```text
///   ... SLOT  int.Add
///   >>> CALL f                    depth=1
///   ... SLOT  function.Vectorcall
///   <<< RETURN              depth=0
/// ```
#[derive(Debug)]
pub struct StderrTracer {
    /// Maximum number of slot dispatches to trace before stopping. None = unlimited.
    limit: Option<usize>,
    count: usize,
    stopped: bool,
}

impl StderrTracer {
    /// Creates a new stderr tracer with no dispatch limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            count: 0,
            stopped: false,
        }
    }

    /// Creates a new stderr tracer that stops after `limit` slot dispatches.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
            stopped: false,
        }
    }
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl StderrTracer {
    /// Renders `event` as the lines to print, honouring the dispatch limit.
    ///
    /// Recursion overflows are reported even after the limit is reached.
    fn lines(&mut self, event: &TraceEvent) -> Vec<String> {
        let overflow = matches!(event, TraceEvent::RecursionOverflow { .. });
        if self.stopped && !overflow {
            return Vec::new();
        }
        let mut lines = vec![format_event(event)];
        if matches!(event, TraceEvent::SlotDispatch { .. }) {
            self.count += 1;
            if let Some(limit) = self.limit
                && self.count >= limit
            {
                lines.push(format!("--- trace limit reached ({limit} dispatches) ---"));
                self.stopped = true;
            }
        }
        lines
    }

    fn emit(&mut self, event: &TraceEvent) {
        for line in self.lines(event) {
            eprintln!("{line}");
        }
    }
}

fn format_event(event: &TraceEvent) -> String {
    match event {
        TraceEvent::SlotDispatch { type_name, slot } => format!("  ... SLOT  {type_name}.{slot:?}"),
        TraceEvent::Call { func_name, depth } => format!("  >>> CALL {func_name:<20} depth={depth}"),
        TraceEvent::Return { depth } => format!("  <<< RETURN              depth={depth}"),
        TraceEvent::TypeCreated { name } => format!("  +++ TYPE {name}"),
        TraceEvent::SlotsUpdated { type_name, method } => format!("  ~~~ SLOTS {type_name} ({method})"),
        TraceEvent::RecursionOverflow { depth, limit } => format!("  !!! RECURSION depth={depth} limit={limit}"),
    }
}

impl RuntimeTracer for StderrTracer {
    fn on_slot_dispatch(&mut self, type_name: &str, slot: Slot) {
        if !self.stopped {
            self.emit(&TraceEvent::SlotDispatch {
                type_name: type_name.to_owned(),
                slot,
            });
        }
    }

    fn on_call(&mut self, func_name: &str, depth: usize) {
        if !self.stopped {
            self.emit(&TraceEvent::Call {
                func_name: func_name.to_owned(),
                depth,
            });
        }
    }

    fn on_return(&mut self, depth: usize) {
        self.emit(&TraceEvent::Return { depth });
    }

    fn on_type_created(&mut self, name: &str) {
        if !self.stopped {
            self.emit(&TraceEvent::TypeCreated { name: name.to_owned() });
        }
    }

    fn on_slots_updated(&mut self, type_name: &str, method: &str) {
        if !self.stopped {
            self.emit(&TraceEvent::SlotsUpdated {
                type_name: type_name.to_owned(),
                method: method.to_owned(),
            });
        }
    }

    fn on_recursion_overflow(&mut self, depth: usize, limit: usize) {
        self.emit(&TraceEvent::RecursionOverflow { depth, limit });
    }
}

// ============================================================================
// ProfilingTracer: slot frequency and call depth tracking
// ============================================================================

/// Tracer that collects dispatch statistics for profiling.
///
/// Tracks:
/// - Per-slot dispatch counts (which slots are hot)
/// - Maximum frame depth reached
/// - Total number of function calls
/// - Recursion overflows
///
/// Retrieve results via [`ProfilingTracer::report`] after execution.
#[derive(Debug)]
pub struct ProfilingTracer {
    slot_counts: HashMap<Slot, u64>,
    total_dispatches: u64,
    max_depth: usize,
    total_calls: u64,
    types_created: u64,
    slot_updates: u64,
    overflows: u64,
}

/// Summary report from a profiling trace.
#[derive(Debug)]
pub struct ProfilingReport {
    /// Per-slot dispatch counts, sorted by frequency (highest first).
    pub slot_counts: Vec<(Slot, u64)>,
    pub total_dispatches: u64,
    pub max_depth: usize,
    pub total_calls: u64,
    pub types_created: u64,
    /// Number of slot re-derivations caused by dunder edits.
    pub slot_updates: u64,
    pub recursion_overflows: u64,
}

impl ProfilingTracer {
    /// Creates a new profiling tracer with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot_counts: HashMap::new(),
            total_dispatches: 0,
            max_depth: 0,
            total_calls: 0,
            types_created: 0,
            slot_updates: 0,
            overflows: 0,
        }
    }

    /// Generates a profiling report from the collected data.
    ///
    /// Slot counts are sorted by frequency (most dispatched first), ties by slot order.
    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        let mut slot_counts: Vec<_> = self.slot_counts.iter().map(|(&k, &v)| (k, v)).collect();
        slot_counts.sort_by(|a, b| b.1.cmp(&a.1).then((a.0 as usize).cmp(&(b.0 as usize))));
        ProfilingReport {
            slot_counts,
            total_dispatches: self.total_dispatches,
            max_depth: self.max_depth,
            total_calls: self.total_calls,
            types_created: self.types_created,
            slot_updates: self.slot_updates,
            recursion_overflows: self.overflows,
        }
    }
}

impl Default for ProfilingTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeTracer for ProfilingTracer {
    #[inline]
    fn on_slot_dispatch(&mut self, _type_name: &str, slot: Slot) {
        *self.slot_counts.entry(slot).or_insert(0) += 1;
        self.total_dispatches += 1;
    }

    #[inline]
    fn on_call(&mut self, _func_name: &str, depth: usize) {
        self.total_calls += 1;
        if depth > self.max_depth {
            self.max_depth = depth;
        }
    }

    fn on_type_created(&mut self, _name: &str) {
        self.types_created += 1;
    }

    fn on_slots_updated(&mut self, _type_name: &str, _method: &str) {
        self.slot_updates += 1;
    }

    fn on_recursion_overflow(&mut self, _depth: usize, _limit: usize) {
        self.overflows += 1;
    }
}

impl std::fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Runtime Profiling Report ===")?;
        writeln!(f, "Slot dispatches:    {}", self.total_dispatches)?;
        writeln!(f, "Total calls:        {}", self.total_calls)?;
        writeln!(f, "Max call depth:     {}", self.max_depth)?;
        writeln!(f, "Types created:      {}", self.types_created)?;
        writeln!(f, "Slot updates:       {}", self.slot_updates)?;
        writeln!(f, "Recursion overflows: {}", self.recursion_overflows)?;
        writeln!(f)?;
        writeln!(f, "--- Slot Frequency ---")?;
        for (slot, count) in &self.slot_counts {
            let pct = (*count as f64 / self.total_dispatches as f64) * 100.0;
            writeln!(f, "  {slot:<20?} {count:>10}  ({pct:>5.1}%)")?;
        }
        Ok(())
    }
}

// ============================================================================
// RecordingTracer: full event recording
// ============================================================================

/// Tracer that records all events for post-mortem analysis.
///
/// Captures every trace event into a `Vec<TraceEvent>`. This is the most
/// expensive tracer (allocates per event), so use it only for debugging
/// specific issues or in tests that assert on dispatch order.
#[derive(Debug)]
pub struct RecordingTracer {
    /// All recorded events in chronological order.
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    /// Creates a new recording tracer with no event limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            limit: None,
        }
    }

    /// Creates a new recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Consumes the tracer and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn at_limit(&self) -> bool {
        self.limit.is_some_and(|l| self.events.len() >= l)
    }

    fn push(&mut self, event: TraceEvent) {
        if !self.at_limit() {
            self.events.push(event);
        }
    }
}

impl Default for RecordingTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeTracer for RecordingTracer {
    fn on_slot_dispatch(&mut self, type_name: &str, slot: Slot) {
        self.push(TraceEvent::SlotDispatch {
            type_name: type_name.to_owned(),
            slot,
        });
    }

    fn on_call(&mut self, func_name: &str, depth: usize) {
        self.push(TraceEvent::Call {
            func_name: func_name.to_owned(),
            depth,
        });
    }

    fn on_return(&mut self, depth: usize) {
        self.push(TraceEvent::Return { depth });
    }

    fn on_type_created(&mut self, name: &str) {
        self.push(TraceEvent::TypeCreated { name: name.to_owned() });
    }

    fn on_slots_updated(&mut self, type_name: &str, method: &str) {
        self.push(TraceEvent::SlotsUpdated {
            type_name: type_name.to_owned(),
            method: method.to_owned(),
        });
    }

    fn on_recursion_overflow(&mut self, depth: usize, limit: usize) {
        self.push(TraceEvent::RecursionOverflow { depth, limit });
    }
}
