//! Per-thread execution state.
//!
//! Each thread that drives the runtime owns one [`ThreadContext`]: its chain of
//! active frames and the recursion counter guarding it. The context is passed
//! explicitly to every operation that may call back into user code.

use std::rc::Rc;

use crate::{
    exception_private::{ExcType, RunError, RunResult, SimpleException},
    resource::{ResourceError, ResourceLimits},
    tracer::RuntimeTracer,
};

/// Record of one active function call.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Qualified name of the function executing in this frame.
    pub name: Rc<str>,
}

#[derive(Debug, Clone)]
struct RecursionState {
    depth: usize,
    /// Working limit, raised by the headroom while an overflow is being handled.
    limit: usize,
    /// Limit configured by the user.
    recursion_limit: usize,
    headroom: usize,
    overflowed: bool,
}

/// Frame chain and recursion state of one thread.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    frames: Vec<FrameRecord>,
    recursion: RecursionState,
}

impl ThreadContext {
    #[must_use]
    pub fn new(limits: &ResourceLimits) -> Self {
        Self {
            frames: Vec::new(),
            recursion: RecursionState {
                depth: 0,
                limit: limits.max_recursion_depth,
                recursion_limit: limits.max_recursion_depth,
                headroom: limits.recursion_headroom,
                overflowed: false,
            },
        }
    }

    /// Current recursion depth.
    #[must_use]
    pub fn recursion_depth(&self) -> usize {
        self.recursion.depth
    }

    #[must_use]
    pub fn recursion_limit(&self) -> usize {
        self.recursion.recursion_limit
    }

    /// True while a recursion overflow is being unwound.
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.recursion.overflowed
    }

    /// Changes the recursion limit of this thread.
    ///
    /// The new limit must be positive and above the current depth.
    pub fn set_recursion_limit(&mut self, limit: usize) -> RunResult<()> {
        if limit < 1 {
            return Err(ExcType::value_error("recursion limit must be greater or equal than 1"));
        }
        let depth = self.recursion.depth;
        if depth >= limit {
            return Err(SimpleException::new_msg(
                ExcType::RecursionError,
                format!("cannot set the recursion limit to {limit} at depth {depth}: the limit is too low"),
            )
            .into());
        }
        self.recursion.recursion_limit = limit;
        self.recursion.limit = if self.recursion.overflowed {
            limit + self.recursion.headroom
        } else {
            limit
        };
        Ok(())
    }

    /// Counts one more nested call, failing once the limit is exceeded.
    ///
    /// The first overflow raises `RecursionError` and grants the headroom so the
    /// error can be handled; a second overflow before recovery is fatal.
    pub fn enter_recursive_call(&mut self, tracer: &mut dyn RuntimeTracer) -> RunResult<()> {
        let state = &mut self.recursion;
        state.depth += 1;
        if state.depth <= state.limit {
            return Ok(());
        }
        let depth = state.depth;
        state.depth -= 1;
        if state.overflowed {
            return Err(RunError::internal("Cannot recover from stack overflow."));
        }
        state.overflowed = true;
        let limit = state.recursion_limit;
        state.limit = limit + state.headroom;
        tracer.on_recursion_overflow(depth, limit);
        Err(ResourceError::Recursion { limit, depth }.into())
    }

    /// Counts one call as finished, clearing the overflow once well below the limit.
    pub fn leave_recursive_call(&mut self) {
        let state = &mut self.recursion;
        state.depth = state.depth.saturating_sub(1);
        if state.overflowed && state.depth <= low_water_mark(state.recursion_limit) {
            state.overflowed = false;
            state.limit = state.recursion_limit;
        }
    }

    pub fn push_frame(&mut self, name: Rc<str>) {
        self.frames.push(FrameRecord { name });
    }

    pub fn pop_frame(&mut self) -> Option<FrameRecord> {
        self.frames.pop()
    }

    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn current_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    /// Frames from outermost to innermost.
    #[must_use]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }
}

fn low_water_mark(limit: usize) -> usize {
    limit.saturating_sub(50).max(3 * limit / 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::{NoopTracer, RecordingTracer, TraceEvent};

    fn context(limit: usize) -> ThreadContext {
        ThreadContext::new(&ResourceLimits::new().max_recursion_depth(limit))
    }

    #[test]
    fn overflow_grants_headroom_once() {
        let mut ts = context(3);
        let mut tracer = RecordingTracer::new();
        for _ in 0..3 {
            ts.enter_recursive_call(&mut tracer).unwrap();
        }
        let err = ts.enter_recursive_call(&mut tracer).unwrap_err();
        assert!(err.is_exception_type(ExcType::RecursionError));
        assert_eq!(
            err.message(),
            "maximum recursion depth exceeded while calling a Python object"
        );
        assert!(ts.is_overflowed());
        assert_eq!(tracer.events(), &[TraceEvent::RecursionOverflow { depth: 4, limit: 3 }]);

        // the headroom lets the handler make further calls
        ts.enter_recursive_call(&mut tracer).unwrap();
        assert_eq!(ts.recursion_depth(), 4);
    }

    #[test]
    fn second_overflow_is_fatal() {
        let mut ts = ThreadContext::new(&ResourceLimits::new().max_recursion_depth(1).recursion_headroom(1));
        let mut tracer = NoopTracer;
        ts.enter_recursive_call(&mut tracer).unwrap();
        assert!(ts.enter_recursive_call(&mut tracer).is_err());
        ts.enter_recursive_call(&mut tracer).unwrap();
        let err = ts.enter_recursive_call(&mut tracer).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.message(), "Cannot recover from stack overflow.");
    }

    #[test]
    fn leaving_below_low_water_mark_recovers() {
        let mut ts = context(100);
        let mut tracer = NoopTracer;
        for _ in 0..100 {
            ts.enter_recursive_call(&mut tracer).unwrap();
        }
        assert!(ts.enter_recursive_call(&mut tracer).is_err());
        while ts.recursion_depth() > 76 {
            ts.leave_recursive_call();
            assert!(ts.is_overflowed());
        }
        ts.leave_recursive_call();
        assert!(!ts.is_overflowed());
        assert_eq!(ts.recursion_depth(), 75);
    }

    #[test]
    fn recursion_limit_must_exceed_depth() {
        let mut ts = context(10);
        let mut tracer = NoopTracer;
        for _ in 0..5 {
            ts.enter_recursive_call(&mut tracer).unwrap();
        }
        let err = ts.set_recursion_limit(5).unwrap_err();
        assert_eq!(
            err.message(),
            "cannot set the recursion limit to 5 at depth 5: the limit is too low"
        );
        assert!(ts.set_recursion_limit(0).unwrap_err().is_exception_type(ExcType::ValueError));
        ts.set_recursion_limit(6).unwrap();
        assert_eq!(ts.recursion_limit(), 6);
    }

    #[test]
    fn frames_stack() {
        let mut ts = context(10);
        ts.push_frame("outer".into());
        ts.push_frame("inner".into());
        assert_eq!(ts.frame_depth(), 2);
        assert_eq!(&*ts.current_frame().unwrap().name, "inner");
        assert_eq!(&*ts.pop_frame().unwrap().name, "inner");
        assert_eq!(&*ts.current_frame().unwrap().name, "outer");
    }
}
