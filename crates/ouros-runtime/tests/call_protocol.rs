//! Tests for the classic and vectorcall conventions, bound methods and
//! instance creation through `type.__call__`.

use ouros_runtime::{
    Code, Dict, Frame, ParamShape, RecordingTracer, RunResult, Runtime, ThreadContext, TraceEvent, TypeId, Value,
    attr, call,
};
use pretty_assertions::assert_eq;

fn function<F>(rt: &mut Runtime, name: &str, params: &[&str], body: F) -> Value
where
    F: Fn(&mut Runtime, &mut ThreadContext, &mut Frame) -> RunResult<Value> + 'static,
{
    let shape = ParamShape::builder(name)
        .positional(params.iter().copied())
        .build()
        .unwrap();
    let globals = rt.new_globals().unwrap();
    rt.new_function(Code::from_fn(shape, body), globals, &[]).unwrap()
}

fn new_class(rt: &mut Runtime, ts: &mut ThreadContext, name: &str, attrs: Vec<(&str, Value)>) -> Value {
    let bases = rt.empty_tuple();
    let mut namespace = Dict::default();
    for (key, value) in attrs {
        namespace.insert(key.into(), value);
    }
    let namespace = rt.new_dict(namespace).unwrap();
    call::call(rt, ts, &Value::Type(TypeId::TYPE), &[Value::from(name), bases, namespace], None).unwrap()
}

/// `def pair(a, b): return (a, b)`
fn pair(rt: &mut Runtime) -> Value {
    function(rt, "pair", &["a", "b"], |rt, _, frame| {
        let a = frame.local(0).cloned().unwrap_or(Value::None);
        let b = frame.local(1).cloned().unwrap_or(Value::None);
        rt.new_tuple(vec![a, b])
    })
}

// =============================================================================
// 1. Conventions agree
// =============================================================================

#[test]
fn classic_and_vectorcall_bind_the_same_way() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let f = pair(&mut rt);

    let mut kwargs = Dict::default();
    kwargs.insert("b".into(), Value::Int(2));
    let classic = call::call(&mut rt, &mut ts, &f, &[Value::Int(1)], Some(&kwargs)).unwrap();

    let stack = [Value::None, Value::Int(1), Value::Int(2)];
    let vector = call::vectorcall(&mut rt, &mut ts, &f, &stack, 1, 1, &[Value::from("b")]).unwrap();

    assert_eq!(rt.tuple_items(&classic).unwrap(), rt.tuple_items(&vector).unwrap());
    assert_eq!(rt.tuple_items(&vector).unwrap(), &[Value::Int(1), Value::Int(2)]);
}

/// Types that only define a classic call slot are reachable through vectorcall.
#[test]
fn vectorcall_falls_back_to_classic_slot() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let stack = [Value::from("12"), Value::Int(8)];
    let result = call::vectorcall(&mut rt, &mut ts, &Value::Type(TypeId::INT), &stack, 0, 1, &[Value::from("base")]).unwrap();
    assert_eq!(result, Value::Int(10));
}

#[test]
fn non_callables_are_rejected() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let err = call::call(&mut rt, &mut ts, &Value::Int(3), &[], None).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: 'int' object is not callable");
    let err = call::call_no_args(&mut rt, &mut ts, &Value::from("s")).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: 'str' object is not callable");
}

// =============================================================================
// 2. Methods
// =============================================================================

/// Looking up a function through an instance binds it; calling prepends `self`.
#[test]
fn functions_bind_to_instances() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let method = pair(&mut rt);
    let cls = new_class(&mut rt, &mut ts, "Holder", vec![("pair", method.clone())]);
    let obj = call::call_no_args(&mut rt, &mut ts, &cls).unwrap();

    let bound = attr::get_attribute(&mut rt, &mut ts, &obj, "pair").unwrap();
    assert_eq!(rt.type_of(&bound), TypeId::METHOD);
    assert_eq!(attr::get_attribute(&mut rt, &mut ts, &bound, "__self__").unwrap(), obj);
    assert_eq!(attr::get_attribute(&mut rt, &mut ts, &bound, "__func__").unwrap(), method);
    // attributes of the function are visible through the method
    assert_eq!(
        attr::get_attribute(&mut rt, &mut ts, &bound, "__name__").unwrap(),
        Value::from("pair")
    );

    let result = call::call_function(&mut rt, &mut ts, &bound, &[Value::Int(5)]).unwrap();
    assert_eq!(rt.tuple_items(&result).unwrap(), &[obj.clone(), Value::Int(5)]);

    // through the class the function stays plain
    let plain = attr::get_attribute(&mut rt, &mut ts, &cls, "pair").unwrap();
    assert_eq!(plain, method);
}

#[test]
fn bound_method_keywords() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let method = pair(&mut rt);
    let cls = new_class(&mut rt, &mut ts, "Holder", vec![("pair", method)]);
    let obj = call::call_no_args(&mut rt, &mut ts, &cls).unwrap();
    let bound = attr::get_attribute(&mut rt, &mut ts, &obj, "pair").unwrap();

    let result = call::vectorcall(&mut rt, &mut ts, &bound, &[Value::Int(9)], 0, 0, &[Value::from("b")]).unwrap();
    assert_eq!(rt.tuple_items(&result).unwrap(), &[obj, Value::Int(9)]);
}

#[test]
fn builtin_methods() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let text = Value::from("abc");
    assert_eq!(call::call_method(&mut rt, &mut ts, &text, "upper", &[]).unwrap(), Value::from("ABC"));
    assert_eq!(
        call::call_method(&mut rt, &mut ts, &text, "startswith", &[Value::from("ab")]).unwrap(),
        Value::Bool(true)
    );

    // unbound through the type, with an explicit receiver
    let upper = attr::get_attribute(&mut rt, &mut ts, &Value::Type(TypeId::STR), "upper").unwrap();
    assert_eq!(rt.type_of(&upper), TypeId::METHOD_DESCRIPTOR);
    assert_eq!(call::call_function(&mut rt, &mut ts, &upper, &[Value::from("x")]).unwrap(), Value::from("X"));
    let err = call::call_function(&mut rt, &mut ts, &upper, &[Value::Int(1)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: descriptor 'upper' requires a 'str' object but received a 'int'"
    );
}

/// Special methods are reachable as method-wrappers on instances.
#[test]
fn slot_wrappers_bind_to_instances() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let add = attr::get_attribute(&mut rt, &mut ts, &Value::Int(40), "__add__").unwrap();
    assert_eq!(rt.type_of(&add), TypeId::METHOD_WRAPPER);
    assert_eq!(call::call_function(&mut rt, &mut ts, &add, &[Value::Int(2)]).unwrap(), Value::Int(42));
    let err = call::call_function(&mut rt, &mut ts, &add, &[]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: expected 1 argument, got 0");
}

// =============================================================================
// 3. Instance creation
// =============================================================================

#[test]
fn init_receives_constructor_arguments() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let init = function(&mut rt, "__init__", &["self", "value"], |rt, ts, frame| {
        let self_ = frame.local(0).cloned().unwrap_or(Value::None);
        let value = frame.local(1).cloned().unwrap_or(Value::None);
        attr::set_attribute(rt, ts, &self_, "value", &value)?;
        Ok(Value::None)
    });
    let cls = new_class(&mut rt, &mut ts, "Box", vec![("__init__", init)]);
    let obj = call::call_function(&mut rt, &mut ts, &cls, &[Value::Int(11)]).unwrap();
    assert_eq!(attr::get_attribute(&mut rt, &mut ts, &obj, "value").unwrap(), Value::Int(11));
    assert_eq!(rt.instance_dict_get(&obj, "value"), Some(Value::Int(11)));

    let err = call::call_no_args(&mut rt, &mut ts, &cls).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: __init__() missing 1 required positional argument: 'value'"
    );
}

#[test]
fn init_must_return_none() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let init = function(&mut rt, "__init__", &["self"], |_, _, _| Ok(Value::Int(1)));
    let cls = new_class(&mut rt, &mut ts, "Bad", vec![("__init__", init)]);
    let err = call::call_no_args(&mut rt, &mut ts, &cls).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: __init__() should return None, not 'int'");
}

/// Classes without `__init__` or `__new__` take no arguments.
#[test]
fn plain_class_takes_no_arguments() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let cls = new_class(&mut rt, &mut ts, "Plain", vec![]);
    let err = call::call_function(&mut rt, &mut ts, &cls, &[Value::Int(1)]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Plain() takes no arguments");
}

/// When `__new__` returns an object of another type, `__init__` is skipped.
#[test]
fn foreign_new_result_skips_init() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let new = function(&mut rt, "__new__", &["cls"], |_, _, _| Ok(Value::Int(5)));
    let init = function(&mut rt, "__init__", &["self"], |_, _, _| Ok(Value::Int(0)));
    let cls = new_class(&mut rt, &mut ts, "Odd", vec![("__new__", new), ("__init__", init)]);
    assert_eq!(call::call_no_args(&mut rt, &mut ts, &cls).unwrap(), Value::Int(5));
}

/// `__call__` makes instances callable.
#[test]
fn dunder_call() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let dunder = function(&mut rt, "__call__", &["self", "x"], |_, _, frame| {
        Ok(frame.local(1).cloned().unwrap_or(Value::None))
    });
    let cls = new_class(&mut rt, &mut ts, "Callable", vec![("__call__", dunder)]);
    let obj = call::call_no_args(&mut rt, &mut ts, &cls).unwrap();
    assert_eq!(call::call_function(&mut rt, &mut ts, &obj, &[Value::Int(8)]).unwrap(), Value::Int(8));
    let stack = [Value::Int(4)];
    assert_eq!(
        call::vectorcall(&mut rt, &mut ts, &obj, &stack, 0, 0, &[Value::from("x")]).unwrap(),
        Value::Int(4)
    );
}

// =============================================================================
// 4. Frames and tracing
// =============================================================================

#[test]
fn calls_record_frames() {
    let mut rt = Runtime::with_tracer(Box::new(RecordingTracer::new())).unwrap();
    let mut ts = rt.new_thread_context();
    let f = function(&mut rt, "probe", &[], |_, ts, _| {
        let name = ts.current_frame().map(|frame| frame.name.to_string()).unwrap_or_default();
        Ok(Value::from(name.as_str()))
    });
    assert_eq!(call::call_no_args(&mut rt, &mut ts, &f).unwrap(), Value::from("probe"));
    assert_eq!(ts.frame_depth(), 0);
    assert_eq!(ts.recursion_depth(), 0);

    let events = rt.tracer_as::<RecordingTracer>().unwrap().events();
    assert!(events.contains(&TraceEvent::Call {
        func_name: "probe".to_owned(),
        depth: 1,
    }));
    assert!(events.contains(&TraceEvent::Return { depth: 1 }));
}
