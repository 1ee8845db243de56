//! Tests for the recursion guard around calls and for allocation limits.

use std::{cell::Cell, rc::Rc};

use ouros_runtime::{
    Code, ExcType, ParamShape, RecordingTracer, ResourceLimits, Runtime, ThreadContext, TraceEvent, Value, call,
    object_protocol,
};
use pretty_assertions::assert_eq;

/// `def dive(): return dive()`, with `dive` resolved through the function's globals.
fn diving_function(rt: &mut Runtime, ts: &mut ThreadContext, calls: Rc<Cell<usize>>) -> Value {
    let shape = ParamShape::builder("dive").build().unwrap();
    let globals = rt.new_globals().unwrap();
    let code = Code::from_fn(shape, move |rt, ts, frame| {
        calls.set(calls.get() + 1);
        let this = rt
            .heap()
            .dict(frame.globals())
            .and_then(|globals| globals.get("dive"))
            .cloned()
            .unwrap_or(Value::None);
        call::call_no_args(rt, ts, &this)
    });
    let func = rt.new_function(code, globals, &[]).unwrap();
    object_protocol::set_item(rt, ts, &Value::Ref(globals), &Value::from("dive"), &func).unwrap();
    func
}

#[test]
fn runaway_recursion_raises_recursion_error() {
    let mut rt = Runtime::with_limits(ResourceLimits::new().max_recursion_depth(50)).unwrap();
    let mut ts = rt.new_thread_context();
    let calls = Rc::new(Cell::new(0));
    let dive = diving_function(&mut rt, &mut ts, Rc::clone(&calls));

    let err = call::call_no_args(&mut rt, &mut ts, &dive).unwrap_err();
    assert!(err.is_exception_type(ExcType::RecursionError));
    assert_eq!(err.message(), "maximum recursion depth exceeded while calling a Python object");
    assert_eq!(calls.get(), 50);

    // the guard unwinds with the stack
    assert_eq!(ts.recursion_depth(), 0);
    assert_eq!(ts.frame_depth(), 0);
    assert!(!ts.is_overflowed());

    // and the thread is usable again
    let err = call::call_no_args(&mut rt, &mut ts, &dive).unwrap_err();
    assert!(err.is_exception_type(ExcType::RecursionError));
    assert_eq!(calls.get(), 100);
}

#[test]
fn overflow_reaches_the_tracer() {
    let limits = ResourceLimits::new().max_recursion_depth(10);
    let mut rt = Runtime::with_limits_and_tracer(limits, Box::new(RecordingTracer::new())).unwrap();
    let mut ts = rt.new_thread_context();
    let dive = diving_function(&mut rt, &mut ts, Rc::new(Cell::new(0)));
    call::call_no_args(&mut rt, &mut ts, &dive).unwrap_err();

    let events = rt.tracer_as::<RecordingTracer>().unwrap().events();
    let overflows: Vec<&TraceEvent> = events
        .iter()
        .filter(|event| matches!(event, TraceEvent::RecursionOverflow { .. }))
        .collect();
    assert_eq!(overflows, [&TraceEvent::RecursionOverflow { depth: 11, limit: 10 }]);
}

#[test]
fn recursion_limit_is_adjustable() {
    let rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    assert_eq!(ts.recursion_limit(), 1000);
    ts.set_recursion_limit(20).unwrap();
    assert_eq!(ts.recursion_limit(), 20);
    let err = ts.set_recursion_limit(0).unwrap_err();
    assert_eq!(err.to_string(), "ValueError: recursion limit must be greater or equal than 1");
}

/// Allocations made after bootstrap count against `max_allocations`.
#[test]
fn allocation_limit_raises_memory_error() {
    let mut rt = Runtime::with_limits(ResourceLimits::new().max_allocations(2)).unwrap();
    rt.new_tuple(vec![Value::Int(1)]).unwrap();
    rt.new_tuple(vec![Value::Int(2)]).unwrap();
    let err = rt.new_tuple(vec![Value::Int(3)]).unwrap_err();
    assert!(err.is_exception_type(ExcType::MemoryError));
    assert_eq!(err.to_string(), "MemoryError: allocation limit exceeded: 3 > 2");
}
