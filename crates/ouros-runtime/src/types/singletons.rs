//! `NoneType` and `NotImplementedType`.

use crate::{
    exception_private::{ExcType, RunResult},
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, Shape, TypeFlags, TypeId, TypeSpec},
    value::Value,
};

pub(crate) fn none_spec() -> TypeSpec {
    TypeSpec::new("NoneType", Shape::None)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(none_repr))
        .slot(Slot::Bool, SlotFn::Predicate(none_bool))
        .slot(Slot::New, SlotFn::New(none_new))
}

pub(crate) fn not_implemented_spec() -> TypeSpec {
    TypeSpec::new("NotImplementedType", Shape::NotImplemented)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(not_implemented_repr))
        .slot(Slot::New, SlotFn::New(not_implemented_new))
}

fn none_repr(_rt: &mut Runtime, _ts: &mut ThreadContext, _v: &Value) -> RunResult<Value> {
    Ok(Value::from("None"))
}

fn none_bool(_rt: &mut Runtime, _ts: &mut ThreadContext, _v: &Value) -> RunResult<bool> {
    Ok(false)
}

fn singleton_new(name: &str, args: &[Value], kwargs: Option<&Dict>, value: Value) -> RunResult<Value> {
    if !args.is_empty() || kwargs.is_some_and(|kwargs| !kwargs.is_empty()) {
        return Err(ExcType::type_error(format!("{name} takes no arguments")));
    }
    Ok(value)
}

fn none_new(
    _rt: &mut Runtime,
    _ts: &mut ThreadContext,
    _ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    singleton_new("NoneType", args, kwargs, Value::None)
}

fn not_implemented_repr(_rt: &mut Runtime, _ts: &mut ThreadContext, _v: &Value) -> RunResult<Value> {
    Ok(Value::from("NotImplemented"))
}

fn not_implemented_new(
    _rt: &mut Runtime,
    _ts: &mut ThreadContext,
    _ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    singleton_new("NotImplementedType", args, kwargs, Value::NotImplemented)
}
