//! Tests for binding call arguments to function parameters.
//!
//! Each function body reports its bound locals so the tests can check exactly
//! what the binder produced.

use ouros_runtime::{Code, Dict, Frame, ParamShape, RunResult, Runtime, ThreadContext, Value, call, signature};
use pretty_assertions::assert_eq;

/// Returns a tuple of every bound local, `None` for unbound slots.
fn echo_locals(rt: &mut Runtime, _ts: &mut ThreadContext, frame: &mut Frame) -> RunResult<Value> {
    let items = frame.locals().iter().map(|v| v.clone().unwrap_or(Value::None)).collect();
    rt.new_tuple(items)
}

fn make(rt: &mut Runtime, shape: ParamShape) -> Value {
    let globals = rt.new_globals().unwrap();
    rt.new_function(Code::from_fn(shape, echo_locals), globals, &[]).unwrap()
}

fn kwargs(entries: &[(&str, Value)]) -> Dict {
    let mut dict = Dict::default();
    for (key, value) in entries {
        dict.insert((*key).into(), value.clone());
    }
    dict
}

fn locals_of(rt: &Runtime, result: &Value) -> Vec<Value> {
    rt.tuple_items(result).unwrap().to_vec()
}

fn call_kw(rt: &mut Runtime, ts: &mut ThreadContext, func: &Value, args: &[Value], kw: &[(&str, Value)]) -> RunResult<Vec<Value>> {
    let kw = kwargs(kw);
    let result = call::call(rt, ts, func, args, Some(&kw))?;
    Ok(locals_of(rt, &result))
}

// =============================================================================
// 1. Positional parameters and defaults
// =============================================================================

#[test]
fn exact_positional_call() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b"]).build().unwrap();
    let f = make(&mut rt, shape);
    let result = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1), Value::Int(2)]).unwrap();
    assert_eq!(locals_of(&rt, &result), [Value::Int(1), Value::Int(2)]);
}

#[test]
fn defaults_fill_trailing_parameters() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b", "c"]).build().unwrap();
    let f = make(&mut rt, shape);
    rt.set_function_defaults(&f, vec![Value::Int(20), Value::Int(30)]).unwrap();

    let result = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1)]).unwrap();
    assert_eq!(locals_of(&rt, &result), [Value::Int(1), Value::Int(20), Value::Int(30)]);

    let got = call_kw(&mut rt, &mut ts, &f, &[Value::Int(1)], &[("c", Value::Int(3))]).unwrap();
    assert_eq!(got, [Value::Int(1), Value::Int(20), Value::Int(3)]);
}

/// A function whose every parameter has a default can be called with nothing.
#[test]
fn all_defaults_with_no_arguments() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b"]).build().unwrap();
    let f = make(&mut rt, shape);
    rt.set_function_defaults(&f, vec![Value::from("x"), Value::from("y")]).unwrap();
    let result = call::call_no_args(&mut rt, &mut ts, &f).unwrap();
    assert_eq!(locals_of(&rt, &result), [Value::from("x"), Value::from("y")]);
}

#[test]
fn missing_positional_arguments_are_listed() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b", "c"]).build().unwrap();
    let f = make(&mut rt, shape);
    let err = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f() missing 2 required positional arguments: 'b' and 'c'");
}

#[test]
fn too_many_positional_arguments() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b"]).build().unwrap();
    let f = make(&mut rt, shape);
    let err = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f() takes 2 positional arguments but 3 were given");

    rt.set_function_defaults(&f, vec![Value::Int(0)]).unwrap();
    let err = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f() takes from 1 to 2 positional arguments but 3 were given");
}

// =============================================================================
// 2. Keywords
// =============================================================================

#[test]
fn keyword_arguments_bind_by_name() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b"]).build().unwrap();
    let f = make(&mut rt, shape);
    let got = call_kw(&mut rt, &mut ts, &f, &[], &[("b", Value::Int(2)), ("a", Value::Int(1))]).unwrap();
    assert_eq!(got, [Value::Int(1), Value::Int(2)]);
}

#[test]
fn keyword_errors() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a"]).build().unwrap();
    let f = make(&mut rt, shape);

    let err = call_kw(&mut rt, &mut ts, &f, &[], &[("z", Value::Int(0))]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f(): unexpected keyword argument 'z'");

    let err = call_kw(&mut rt, &mut ts, &f, &[Value::Int(1)], &[("a", Value::Int(2))]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f(): multiple values for argument 'a'");
}

#[test]
fn keyword_only_parameters() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a"]).kwonly(["k", "m"]).build().unwrap();
    let f = make(&mut rt, shape);
    let defaults = rt.new_dict(kwargs(&[("m", Value::Int(9))])).unwrap();
    rt.set_function_kwdefaults(&f, defaults.ref_id()).unwrap();

    let got = call_kw(&mut rt, &mut ts, &f, &[Value::Int(1)], &[("k", Value::Int(2))]).unwrap();
    assert_eq!(got, [Value::Int(1), Value::Int(2), Value::Int(9)]);

    let err = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f() missing 1 required keyword-only argument: 'k'");

    let err = call::call_function(&mut rt, &mut ts, &f, &[Value::Int(1), Value::Int(2)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f() takes 1 positional argument but 2 were given");
}

#[test]
fn positional_only_by_keyword() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b"]).posonly(1).build().unwrap();
    let f = make(&mut rt, shape);
    let err = call_kw(&mut rt, &mut ts, &f, &[], &[("a", Value::Int(1)), ("b", Value::Int(2))]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f(): positional-only arguments passed by keyword: a");
}

/// With `**kwargs`, a keyword named like a positional-only parameter is collected.
#[test]
fn positional_only_name_lands_in_varkeywords() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f")
        .positional(["a"])
        .posonly(1)
        .varkeywords("kw")
        .build()
        .unwrap();
    let f = make(&mut rt, shape);
    let got = call_kw(&mut rt, &mut ts, &f, &[Value::Int(1)], &[("a", Value::Int(2))]).unwrap();
    assert_eq!(got[0], Value::Int(1));
    let collected = rt.as_dict(&got[1]).unwrap();
    assert_eq!(collected.get("a"), Some(&Value::Int(2)));
}

// =============================================================================
// 3. Collectors
// =============================================================================

#[test]
fn varargs_and_varkeywords_collect_extras() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f")
        .positional(["a"])
        .varargs("args")
        .varkeywords("kwargs")
        .build()
        .unwrap();
    let f = make(&mut rt, shape);
    let got = call_kw(
        &mut rt,
        &mut ts,
        &f,
        &[Value::Int(1), Value::Int(2), Value::Int(3)],
        &[("x", Value::Int(4))],
    )
    .unwrap();
    assert_eq!(got[0], Value::Int(1));
    assert_eq!(rt.tuple_items(&got[1]).unwrap(), &[Value::Int(2), Value::Int(3)]);
    let extra = rt.as_dict(&got[2]).unwrap();
    assert_eq!(extra.len(), 1);
    assert_eq!(extra.get("x"), Some(&Value::Int(4)));
}

#[test]
fn empty_collectors_are_still_bound() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").varargs("args").varkeywords("kwargs").build().unwrap();
    let f = make(&mut rt, shape);
    let result = call::call_no_args(&mut rt, &mut ts, &f).unwrap();
    let got = locals_of(&rt, &result);
    assert_eq!(rt.tuple_items(&got[0]).unwrap(), &[] as &[Value]);
    assert!(rt.as_dict(&got[1]).unwrap().is_empty());
}

// =============================================================================
// 4. Vectorcall stacks and cells
// =============================================================================

/// Binding honours the start offset and the keyword tail of a vectorcall stack.
#[test]
fn vector_binding_respects_offsets() {
    let mut rt = Runtime::new().unwrap();
    let shape = ParamShape::builder("f").positional(["a", "b", "c"]).build().unwrap();
    let f = make(&mut rt, shape);
    let stack = [Value::from("ignored"), Value::Int(1), Value::Int(2), Value::Int(3)];
    let frame = signature::bind_vector_arguments(&mut rt, &f, &stack, 1, 2, &[Value::from("c")]).unwrap();
    assert_eq!(frame.local_by_name("a"), Some(&Value::Int(1)));
    assert_eq!(frame.local_by_name("b"), Some(&Value::Int(2)));
    assert_eq!(frame.local_by_name("c"), Some(&Value::Int(3)));
}

#[test]
fn keyword_names_must_be_strings() {
    let mut rt = Runtime::new().unwrap();
    let shape = ParamShape::builder("f").positional(["a"]).build().unwrap();
    let f = make(&mut rt, shape);
    let err = signature::bind_vector_arguments(&mut rt, &f, &[Value::Int(1)], 0, 0, &[Value::Int(0)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f(): keywords must be strings");
}

/// A keyword repeated in a vectorcall is an error even when it would land in `**kwargs`.
#[test]
fn repeated_keyword_names_are_rejected() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").varkeywords("kw").build().unwrap();
    let f = make(&mut rt, shape);
    let stack = [Value::Int(1), Value::Int(2)];
    let names = [Value::from("z"), Value::from("z")];

    let err = signature::bind_vector_arguments(&mut rt, &f, &stack, 0, 0, &names).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f(): multiple values for argument 'z'");
    let err = call::vectorcall(&mut rt, &mut ts, &f, &stack, 0, 0, &names).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: f(): multiple values for argument 'z'");

    let shape = ParamShape::builder("g").kwonly(["z"]).build().unwrap();
    let g = make(&mut rt, shape);
    let err = call::vectorcall(&mut rt, &mut ts, &g, &stack, 0, 0, &names).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: g(): multiple values for argument 'z'");
}

/// Offsets that run past the stack are reported instead of slicing out of bounds.
#[test]
fn vector_layout_must_fit_the_stack() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let shape = ParamShape::builder("f").positional(["a", "b"]).build().unwrap();
    let f = make(&mut rt, shape);
    let stack = [Value::Int(1), Value::Int(2)];

    let err = signature::bind_vector_arguments(&mut rt, &f, &stack, 1, 2, &[]).unwrap_err();
    assert!(err.is_internal());
    let err = call::vectorcall(&mut rt, &mut ts, &f, &stack, 0, 2, &[Value::from("b")]).unwrap_err();
    assert!(err.is_internal());
    let err = call::stack_as_dict(&stack, 1, &[Value::from("a"), Value::from("b")]).unwrap_err();
    assert!(err.is_internal());
    assert_eq!(ts.recursion_depth(), 0);

    let result = call::vectorcall(&mut rt, &mut ts, &f, &stack, 0, 1, &[Value::from("b")]).unwrap();
    assert_eq!(locals_of(&rt, &result), [Value::Int(1), Value::Int(2)]);
}

/// Writes to a missing local or cell slot fail without touching the frame.
#[test]
fn frame_slots_out_of_range() {
    let mut rt = Runtime::new().unwrap();
    let shape = ParamShape::builder("f").positional(["a"]).cellvars(["a"]).build().unwrap();
    let f = make(&mut rt, shape);
    let mut frame = signature::bind_arguments(&mut rt, &f, &[Value::Int(1)], None).unwrap();

    frame.set_local(0, Value::Int(5)).unwrap();
    assert_eq!(frame.local(0), Some(&Value::Int(5)));
    assert!(frame.set_local(9, Value::Int(5)).unwrap_err().is_internal());

    frame.set_cell_value(&mut rt, 0, Value::Int(6)).unwrap();
    assert_eq!(frame.cell_value(&rt, 0).unwrap(), Value::Int(6));
    assert!(frame.set_cell_value(&mut rt, 3, Value::Int(6)).unwrap_err().is_internal());
}

/// Parameters captured by inner functions move into cells.
#[test]
fn cell_parameters_are_boxed() {
    let mut rt = Runtime::new().unwrap();
    let shape = ParamShape::builder("outer")
        .positional(["x"])
        .cellvars(["x"])
        .build()
        .unwrap();
    let f = make(&mut rt, shape);
    let frame = signature::bind_arguments(&mut rt, &f, &[Value::Int(7)], None).unwrap();
    assert_eq!(frame.local(0), None);
    assert_eq!(frame.cell_value(&rt, 0).unwrap(), Value::Int(7));
}

/// Free variables read the closure cells the function was created with.
#[test]
fn closures_share_cells() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let cell = rt.new_cell(Some(Value::Int(1))).unwrap();
    let shape = ParamShape::builder("inner").freevars(["n"]).build().unwrap();
    let globals = rt.new_globals().unwrap();
    let inner = rt
        .new_function(
            Code::from_fn(shape, |rt, _ts, frame| {
                let current = frame.cell_value(rt, 0)?;
                let Value::Int(n) = current else { unreachable!() };
                frame.set_cell_value(rt, 0, Value::Int(n + 1))?;
                Ok(current)
            }),
            globals,
            std::slice::from_ref(&cell),
        )
        .unwrap();

    assert_eq!(call::call_no_args(&mut rt, &mut ts, &inner).unwrap(), Value::Int(1));
    assert_eq!(call::call_no_args(&mut rt, &mut ts, &inner).unwrap(), Value::Int(2));
    assert_eq!(rt.cell_contents(&cell), Some(Value::Int(3)));
}

/// Binding the same arguments twice yields the same locals.
#[test]
fn binding_is_repeatable() {
    let mut rt = Runtime::new().unwrap();
    let shape = ParamShape::builder("f").positional(["a", "b"]).kwonly(["k"]).build().unwrap();
    let f = make(&mut rt, shape);
    rt.set_function_defaults(&f, vec![Value::Int(5)]).unwrap();
    let kw = kwargs(&[("k", Value::from("v"))]);
    let first = signature::bind_arguments(&mut rt, &f, &[Value::Int(3)], Some(&kw)).unwrap();
    let second = signature::bind_arguments(&mut rt, &f, &[Value::Int(3)], Some(&kw)).unwrap();
    assert_eq!(first.locals(), second.locals());
    assert_eq!(first.local_by_name("b"), Some(&Value::Int(5)));
}
