//! Tests for type creation, MRO construction and slot inheritance.
//!
//! Classes are built the way an evaluator would build them: by calling `type`
//! with a name, a tuple of bases and a namespace dict.

use ouros_runtime::{
    BinaryOp, Code, Dict, ExcType, Frame, ParamShape, RecordingTracer, ResourceLimits, RunResult, Runtime, Shape, Slot,
    SlotFn, ThreadContext, TraceEvent, TypeFlags, TypeId, TypeSpec, Value, attr, call, number, types::TypeObject,
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

fn new_class(rt: &mut Runtime, ts: &mut ThreadContext, name: &str, bases: &[TypeId], attrs: Vec<(&str, Value)>) -> RunResult<Value> {
    let bases = rt.new_tuple(bases.iter().copied().map(Value::Type).collect())?;
    let mut namespace = Dict::default();
    for (key, value) in attrs {
        namespace.insert(key.into(), value);
    }
    let namespace = rt.new_dict(namespace)?;
    call::call(rt, ts, &Value::Type(TypeId::TYPE), &[Value::from(name), bases, namespace], None)
}

fn type_id(value: &Value) -> TypeId {
    value.as_type().expect("expected a type")
}

/// `__add__` returning a constant so dispatch can be observed.
fn constant_add(rt: &mut Runtime, result: i64) -> Value {
    function(rt, "__add__", &["self", "other"], move |_, _, _| Ok(Value::Int(result)))
}

// =============================================================================
// 1. Construction
// =============================================================================

/// A class without explicit bases derives from `object`.
#[test]
fn class_defaults_to_object_base() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let cls = new_class(&mut rt, &mut ts, "A", &[], vec![]).unwrap();
    let ty = rt.type_object(type_id(&cls));
    assert_eq!(ty.name(), "A");
    assert_eq!(ty.mro(), &[type_id(&cls), TypeId::OBJECT]);
    assert!(ty.is_mutable());
    assert!(ty.has_instance_dict());
    assert_eq!(rt.type_of(&cls), TypeId::TYPE);
}

/// The MRO of a subclass is the class followed by the MRO of its base.
#[test]
fn subclass_mro_extends_base() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let a = new_class(&mut rt, &mut ts, "A", &[], vec![]).unwrap();
    let b = new_class(&mut rt, &mut ts, "B", &[type_id(&a)], vec![]).unwrap();
    assert_eq!(
        rt.type_object(type_id(&b)).mro(),
        &[type_id(&b), type_id(&a), TypeId::OBJECT]
    );
    assert!(rt.is_subtype(type_id(&b), type_id(&a)));
    assert!(!rt.is_subtype(type_id(&a), type_id(&b)));
}

/// Subclasses of value types keep the layout of their base.
#[test]
fn subclass_of_int_inherits_shape() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let cls = new_class(&mut rt, &mut ts, "MyInt", &[TypeId::INT], vec![]).unwrap();
    assert_eq!(rt.type_object(type_id(&cls)).shape(), Shape::Int);

    let obj = call::call(&mut rt, &mut ts, &cls, &[Value::Int(41)], None).unwrap();
    assert_eq!(rt.type_of(&obj), type_id(&cls));
    let sum = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &obj, &Value::Int(1)).unwrap();
    assert_eq!(sum, Value::Int(42));
}

/// `bool` cannot be subclassed.
#[test]
fn bool_is_not_an_acceptable_base() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let err = new_class(&mut rt, &mut ts, "B", &[TypeId::BOOL], vec![]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: type 'bool' is not an acceptable base type");
}

/// Non-type bases and wrongly typed arguments are rejected by `type.__new__`.
#[test]
fn type_new_validates_arguments() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let type_ = Value::Type(TypeId::TYPE);

    let empty = rt.empty_tuple();
    let namespace = rt.new_dict(Dict::default()).unwrap();
    let err = call::call(&mut rt, &mut ts, &type_, &[Value::Int(1), empty.clone(), namespace.clone()], None).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: type.__new__() argument 1 must be str, not int");

    let bad_bases = rt.new_tuple(vec![Value::Int(3)]).unwrap();
    let err = call::call(&mut rt, &mut ts, &type_, &[Value::from("X"), bad_bases, namespace], None).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: bases must be types");

    let err = call::call(&mut rt, &mut ts, &type_, &[Value::from("X"), empty], None).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: type() takes 1 or 3 arguments");
}

/// `type(x)` with one argument returns the type of `x`.
#[test]
fn type_with_one_argument_is_an_enquiry() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let type_ = Value::Type(TypeId::TYPE);
    let result = call::call(&mut rt, &mut ts, &type_, &[Value::Float(1.5)], None).unwrap();
    assert_eq!(result, Value::Type(TypeId::FLOAT));
    let result = call::call(&mut rt, &mut ts, &type_, &[Value::Type(TypeId::INT)], None).unwrap();
    assert_eq!(result, Value::Type(TypeId::TYPE));
}

/// A type without a `new` slot cannot be instantiated.
#[test]
fn type_without_new_cannot_create_instances() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let err = call::call(&mut rt, &mut ts, &Value::Type(TypeId::CELL), &[], None).unwrap_err();
    // cell inherits object.__new__, which refuses a non-object layout
    assert_eq!(
        err.to_string(),
        "TypeError: object.__new__(cell) is not safe, use cell.__new__()"
    );
}

// =============================================================================
// 2. Native type specs
// =============================================================================

fn answer(_rt: &mut Runtime, _ts: &mut ThreadContext, _v: &Value) -> RunResult<Value> {
    Ok(Value::Int(42))
}

fn bad_len(_rt: &mut Runtime, _ts: &mut ThreadContext, _v: &Value) -> RunResult<Value> {
    Ok(Value::Int(0))
}

/// Native slots are exposed as wrapper descriptors in the type namespace.
#[test]
fn native_slots_are_published_as_special_methods() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let spec = TypeSpec::new("Answer", Shape::Object).slot(Slot::Neg, SlotFn::Unary(answer));
    let id = rt.create_type(spec).unwrap();
    let method = rt.resolve_attribute(id, "__neg__").expect("__neg__ in namespace");
    assert_eq!(rt.type_of(&method), TypeId::WRAPPER_DESCRIPTOR);

    let obj = call::call(&mut rt, &mut ts, &Value::Type(id), &[], None).unwrap();
    assert_eq!(number::negative(&mut rt, &mut ts, &obj).unwrap(), Value::Int(42));
    assert_eq!(
        call::call_method(&mut rt, &mut ts, &obj, "__neg__", &[]).unwrap(),
        Value::Int(42)
    );
}

/// Registering a slot implementation with the wrong signature is a configuration error.
#[test]
fn slot_signature_mismatch_is_rejected() {
    let mut rt = Runtime::new().unwrap();
    let before = rt.type_count();
    let spec = TypeSpec::new("Broken", Shape::Object).slot(Slot::Len, SlotFn::Unary(bad_len));
    let err = rt.create_type(spec).unwrap_err();
    assert!(err.is_internal());
    assert_eq!(rt.type_count(), before, "failed type must not stay registered");
}

/// Running out of allocations while publishing a type's methods leaves neither the type nor its descriptors behind.
#[test]
fn failed_type_releases_its_descriptors() {
    let mut rt = Runtime::with_limits(ResourceLimits::new().max_allocations(1)).unwrap();
    let types_before = rt.type_count();
    let heap_before = rt.heap().len();
    let spec = TypeSpec::new("Numberish", Shape::Object)
        .slot(Slot::Neg, SlotFn::Unary(answer))
        .slot(Slot::Abs, SlotFn::Unary(answer));
    let err = rt.create_type(spec).unwrap_err();
    assert!(err.is_exception_type(ExcType::MemoryError));
    assert_eq!(rt.type_count(), types_before);
    assert_eq!(rt.heap().len(), heap_before);

    // the released allocation is available again
    rt.new_tuple(vec![Value::Int(1)]).unwrap();
}

/// A spec naming two bases is refused.
#[test]
fn multiple_bases_are_not_supported() {
    let mut rt = Runtime::new().unwrap();
    let spec = TypeSpec::new("Both", Shape::Object).base(TypeId::OBJECT).base(TypeId::INT);
    assert!(rt.create_type(spec).unwrap_err().is_internal());
}

/// Types created without `BASETYPE` refuse subclasses.
#[test]
fn final_types_refuse_subclasses() {
    let mut rt = Runtime::new().unwrap();
    let sealed = rt
        .create_type(TypeSpec::new("Sealed", Shape::Object).without_flags(TypeFlags::BASETYPE))
        .unwrap();
    let err = rt.create_type(TypeSpec::new("Sub", Shape::Object).base(sealed)).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::TypeError));
}

// =============================================================================
// 3. Special methods and slot re-derivation
// =============================================================================

/// A special method in the class namespace fills the corresponding slot.
#[test]
fn dunder_method_fills_slot() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let add = constant_add(&mut rt, 7);
    let cls = new_class(&mut rt, &mut ts, "A", &[], vec![("__add__", add)]).unwrap();
    assert!(rt.type_object(type_id(&cls)).slots().is_filled(Slot::Add));

    let obj = call::call(&mut rt, &mut ts, &cls, &[], None).unwrap();
    let result = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &obj, &Value::Int(1)).unwrap();
    assert_eq!(result, Value::Int(7));
}

/// Assigning a special method on a class updates it and every subclass.
#[test]
fn assigning_dunder_updates_subclasses() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let base = new_class(&mut rt, &mut ts, "Base", &[], vec![]).unwrap();
    let sub = new_class(&mut rt, &mut ts, "Sub", &[type_id(&base)], vec![]).unwrap();
    let obj = call::call(&mut rt, &mut ts, &sub, &[], None).unwrap();

    let err = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &obj, &obj).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unsupported operand type(s) for +: 'Sub' and 'Sub'");

    let add = constant_add(&mut rt, 3);
    attr::set_attribute(&mut rt, &mut ts, &base, "__add__", &add).unwrap();
    assert!(rt.type_object(type_id(&sub)).slots().is_filled(Slot::Add));
    let result = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &obj, &obj).unwrap();
    assert_eq!(result, Value::Int(3));

    attr::delete_attribute(&mut rt, &mut ts, &base, "__add__").unwrap();
    assert!(!rt.type_object(type_id(&sub)).slots().is_filled(Slot::Add));
}

/// A subclass definition shadows the inherited one.
#[test]
fn own_dunder_beats_inherited() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let add_one = constant_add(&mut rt, 1);
    let add_two = constant_add(&mut rt, 2);
    let base = new_class(&mut rt, &mut ts, "Base", &[], vec![("__add__", add_one)]).unwrap();
    let sub = new_class(&mut rt, &mut ts, "Sub", &[type_id(&base)], vec![("__add__", add_two)]).unwrap();
    let obj = call::call(&mut rt, &mut ts, &sub, &[], None).unwrap();
    let result = number::apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &obj, &Value::None).unwrap();
    assert_eq!(result, Value::Int(2));
}

/// Built-in types are immutable.
#[test]
fn builtin_types_refuse_attribute_writes() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let err = attr::set_attribute(&mut rt, &mut ts, &Value::Type(TypeId::INT), "x", &Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: cannot set 'x' attribute of immutable type 'int'");
}

/// Type creation and slot updates reach the tracer.
#[test]
fn tracer_sees_type_lifecycle() {
    let mut rt = Runtime::with_tracer(Box::new(RecordingTracer::new())).unwrap();
    let mut ts = rt.new_thread_context();
    let cls = new_class(&mut rt, &mut ts, "Traced", &[], vec![]).unwrap();
    let add = constant_add(&mut rt, 0);
    attr::set_attribute(&mut rt, &mut ts, &cls, "__add__", &add).unwrap();

    let events = rt.tracer_as::<RecordingTracer>().unwrap().events();
    assert!(events.contains(&TraceEvent::TypeCreated { name: "Traced".to_owned() }));
    assert!(events.contains(&TraceEvent::SlotsUpdated {
        type_name: "Traced".to_owned(),
        method: "__add__".to_owned(),
    }));
}

// =============================================================================
// 4. __slots__
// =============================================================================

/// Names in `__slots__` become member descriptors and suppress the instance dict.
#[test]
fn slots_become_members() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let slots = rt.new_tuple(vec![Value::from("x")]).unwrap();
    let cls = new_class(&mut rt, &mut ts, "Point", &[], vec![("__slots__", slots)]).unwrap();
    let ty: &TypeObject = rt.type_object(type_id(&cls));
    assert!(!ty.has_instance_dict());

    let member = rt.resolve_attribute(type_id(&cls), "x").unwrap();
    assert_eq!(rt.type_of(&member), TypeId::MEMBER_DESCRIPTOR);

    let obj = call::call(&mut rt, &mut ts, &cls, &[], None).unwrap();
    let err = attr::get_attribute(&mut rt, &mut ts, &obj, "x").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'Point' object has no attribute 'x'");

    attr::set_attribute(&mut rt, &mut ts, &obj, "x", &Value::Int(5)).unwrap();
    assert_eq!(attr::get_attribute(&mut rt, &mut ts, &obj, "x").unwrap(), Value::Int(5));

    let err = attr::set_attribute(&mut rt, &mut ts, &obj, "y", &Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'Point' object has no attribute 'y'");
}

/// A slot name that is also a class attribute is a conflict.
#[test]
fn slot_conflicting_with_class_variable() {
    let mut rt = Runtime::new().unwrap();
    let mut ts = rt.new_thread_context();
    let slots = rt.new_tuple(vec![Value::from("x")]).unwrap();
    let err = new_class(&mut rt, &mut ts, "P", &[], vec![("__slots__", slots), ("x", Value::Int(0))]).unwrap_err();
    assert_eq!(err.to_string(), "ValueError: 'x' in __slots__ conflicts with class variable");
}
