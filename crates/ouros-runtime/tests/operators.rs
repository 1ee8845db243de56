//! Tests for binary operator dispatch, rich comparison and containment.

use ouros_runtime::{
    BinaryOp, Code, Comparison, Dict, Frame, ParamShape, RunResult, Runtime, ThreadContext, TypeId, Value, call,
    compare, number, object_protocol,
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

fn new_class(rt: &mut Runtime, ts: &mut ThreadContext, name: &str, base: TypeId, attrs: Vec<(&str, Value)>) -> Value {
    let bases = rt.new_tuple(vec![Value::Type(base)]).unwrap();
    let mut namespace = Dict::default();
    for (key, value) in attrs {
        namespace.insert(key.into(), value);
    }
    let namespace = rt.new_dict(namespace).unwrap();
    call::call(rt, ts, &Value::Type(TypeId::TYPE), &[Value::from(name), bases, namespace], None).unwrap()
}

fn binary(rt: &mut Runtime, ts: &mut ThreadContext, op: BinaryOp, v: &Value, w: &Value) -> RunResult<String> {
    let result = number::apply_binary_op(rt, ts, op, v, w)?;
    Ok(object_protocol::repr(rt, ts, &result)?.to_string())
}

/// A binary special method that returns a fixed string tagged with its name.
fn tagged(rt: &mut Runtime, tag: &'static str) -> Value {
    function(rt, tag, &["self", "other"], move |_, _, _| Ok(Value::from(tag)))
}

fn declining(rt: &mut Runtime, name: &str) -> Value {
    function(rt, name, &["self", "other"], |_, _, _| Ok(Value::NotImplemented))
}

// =============================================================================
// 1. Built-in arithmetic
// =============================================================================

#[test]
fn int_and_float_mix() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let sum = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &Value::Int(3), &Value::Float(4.0)).unwrap();
    assert_eq!(sum, Value::Float(7.0));
    let diff = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Sub, &Value::Float(0.5), &Value::Int(2)).unwrap();
    assert_eq!(diff, Value::Float(-1.5));
}

/// Results beyond the machine range promote to big integers.
#[test]
fn int_overflow_promotes() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let text = binary(&mut rt, &mut ts, BinaryOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
    assert_eq!(text, "9223372036854775808");
    let text = binary(&mut rt, &mut ts, BinaryOp::Mul, &Value::Int(i64::MAX), &Value::Int(2)).unwrap();
    assert_eq!(text, "18446744073709551614");
}

#[test]
fn sequence_concatenation_and_repetition() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let text = binary(&mut rt, &mut ts, BinaryOp::Add, &Value::from("ab"), &Value::from("cd")).unwrap();
    assert_eq!(text, "'abcd'");
    let text = binary(&mut rt, &mut ts, BinaryOp::Mul, &Value::Int(3), &Value::from("x")).unwrap();
    assert_eq!(text, "'xxx'");

    let pair = rt.new_tuple(vec![Value::Int(1), Value::Int(2)]).unwrap();
    let text = binary(&mut rt, &mut ts, BinaryOp::Mul, &pair, &Value::Int(2)).unwrap();
    assert_eq!(text, "(1, 2, 1, 2)");
}

#[test]
fn bool_bitwise_stays_bool() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let and = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::And, &Value::Bool(true), &Value::Bool(false)).unwrap();
    assert_eq!(and, Value::Bool(false));
    let xor = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Xor, &Value::Bool(true), &Value::Int(3)).unwrap();
    assert_eq!(xor, Value::Int(2));
}

#[test]
fn unsupported_operands_name_both_types() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let err = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &Value::Int(1), &Value::None).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unsupported operand type(s) for +: 'int' and 'NoneType'");
    let err = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Or, &Value::Float(1.0), &Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unsupported operand type(s) for |: 'float' and 'int'");
    let err = number::negative(&mut rt, &mut ts, &Value::from("s")).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: bad operand type for unary -: 'str'");
}

// =============================================================================
// 2. Reflected operands
// =============================================================================

/// The left operand's forward method wins when the types are unrelated.
#[test]
fn forward_method_goes_first() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let add = tagged(&mut rt, "__add__");
    let radd = tagged(&mut rt, "__radd__");
    let a = new_class(&mut rt, &mut ts, "A", TypeId::OBJECT, vec![("__add__", add)]);
    let b = new_class(&mut rt, &mut ts, "B", TypeId::OBJECT, vec![("__radd__", radd)]);
    let a = call::call_no_args(&mut rt, &mut ts, &a).unwrap();
    let b = call::call_no_args(&mut rt, &mut ts, &b).unwrap();
    assert_eq!(binary(&mut rt, &mut ts, BinaryOp::Add, &a, &b).unwrap(), "'__add__'");
    assert_eq!(binary(&mut rt, &mut ts, BinaryOp::Add, &b, &a).unwrap_err().to_string(),
        "TypeError: unsupported operand type(s) for +: 'B' and 'A'");
}

/// `NotImplemented` from the forward method hands over to the reflected one.
#[test]
fn declined_forward_falls_back_to_reflected() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let add = declining(&mut rt, "__add__");
    let radd = tagged(&mut rt, "__radd__");
    let a = new_class(&mut rt, &mut ts, "A", TypeId::OBJECT, vec![("__add__", add)]);
    let b = new_class(&mut rt, &mut ts, "B", TypeId::OBJECT, vec![("__radd__", radd)]);
    let a = call::call_no_args(&mut rt, &mut ts, &a).unwrap();
    let b = call::call_no_args(&mut rt, &mut ts, &b).unwrap();
    assert_eq!(binary(&mut rt, &mut ts, BinaryOp::Add, &a, &b).unwrap(), "'__radd__'");
}

/// A subclass on the right gets the first chance through its reflected method.
#[test]
fn subclass_reflected_method_has_priority() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let rsub = function(&mut rt, "__rsub__", &["self", "other"], |_, _, frame| {
        // records the operand order the method received
        Ok(Value::from(format!("{:?}", frame.local(1)).as_str()))
    });
    let cls = new_class(&mut rt, &mut ts, "Sub", TypeId::INT, vec![("__rsub__", rsub)]);
    let obj = call::call(&mut rt, &mut ts, &cls, &[Value::Int(2)], None).unwrap();

    let result = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Sub, &Value::Int(10), &obj).unwrap();
    assert_eq!(result, Value::from("Some(Int(10))"));

    // same type on both sides: only the forward method, inherited from int
    let result = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Sub, &obj, &obj).unwrap();
    assert_eq!(result, Value::Int(0));
}

/// Reflected methods of built-in types compute `other op self`.
#[test]
fn builtin_reflected_slot_orders_operands() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let rsub = rt.resolve_attribute(TypeId::FLOAT, "__rsub__").unwrap();
    let result = call::call_function(&mut rt, &mut ts, &rsub, &[Value::Float(1.0), Value::Int(5)]).unwrap();
    assert_eq!(result, Value::Float(4.0));
}

// =============================================================================
// 3. Comparison and containment
// =============================================================================

#[test]
fn numeric_comparisons_cross_types() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap());
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Eq, &Value::Float(2.0), &Value::Int(2)).unwrap());
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Ge, &Value::Bool(true), &Value::Int(1)).unwrap());
    assert!(!compare::compare_bool(&mut rt, &mut ts, Comparison::Eq, &Value::Float(f64::NAN), &Value::Float(f64::NAN)).unwrap());
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Ne, &Value::Float(f64::NAN), &Value::Float(f64::NAN)).unwrap());
}

/// Without comparison methods, equality is identity and ordering is an error.
#[test]
fn equality_falls_back_to_identity() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let cls = new_class(&mut rt, &mut ts, "Plain", TypeId::OBJECT, vec![]);
    let a = call::call_no_args(&mut rt, &mut ts, &cls).unwrap();
    let b = call::call_no_args(&mut rt, &mut ts, &cls).unwrap();
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Eq, &a, &a).unwrap());
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Ne, &a, &b).unwrap());

    let err = compare::rich_compare(&mut rt, &mut ts, Comparison::Lt, &a, &b).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: '<' not supported between instances of 'Plain' and 'Plain'");
    let err = compare::rich_compare(&mut rt, &mut ts, Comparison::Ge, &Value::from("a"), &Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: '>=' not supported between instances of 'str' and 'int'");
}

/// A user `__lt__` answers `b > a` through the swapped operator.
#[test]
fn swapped_comparison_uses_reflection() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let lt = function(&mut rt, "__lt__", &["self", "other"], |_, _, _| Ok(Value::Bool(true)));
    let cls = new_class(&mut rt, &mut ts, "Small", TypeId::OBJECT, vec![("__lt__", lt)]);
    let obj = call::call_no_args(&mut rt, &mut ts, &cls).unwrap();
    let result = compare::rich_compare(&mut rt, &mut ts, Comparison::Gt, &Value::Int(5), &obj).unwrap();
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn containment() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let items = rt.new_tuple(vec![Value::Int(1), Value::from("two")]).unwrap();
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::In, &Value::Float(1.0), &items).unwrap());
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::NotIn, &Value::from("three"), &items).unwrap());
    assert!(compare::contains(&mut rt, &mut ts, &Value::from("haystack"), &Value::from("st")).unwrap());

    let err = compare::contains(&mut rt, &mut ts, &Value::Int(1), &Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: 'int' object is not a container");
}

#[test]
fn identity_comparisons() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::Is, &Value::None, &Value::None).unwrap());
    assert!(compare::compare_bool(&mut rt, &mut ts, Comparison::IsNot, &Value::None, &Value::Bool(false)).unwrap());
}
