//! `dict`: an insertion-ordered mapping with string keys.
//!
//! Namespaces, keyword arguments and instance dictionaries all use [`Dict`]
//! directly; the `dict` type exposes the same storage to the object protocol.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    compare::{self, Comparison},
    exception_private::{ExcType, RunResult},
    heap::HeapData,
    object_protocol,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{MethodDef, MethodStyle, Shape, TypeId, TypeSpec},
    value::Value,
};

/// Namespace and keyword mapping, keyed by attribute or parameter name.
pub type Dict = IndexMap<Rc<str>, Value, ahash::RandomState>;

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("dict", Shape::Dict)
        .slot(Slot::Repr, SlotFn::Unary(dict_repr))
        .slot(Slot::Hash, SlotFn::Hash(dict_hash))
        .slot(Slot::Len, SlotFn::Len(dict_len))
        .slot(Slot::Contains, SlotFn::BinaryPredicate(dict_contains))
        .slot(Slot::GetItem, SlotFn::Binary(dict_getitem))
        .slot(Slot::SetItem, SlotFn::SetItem(dict_setitem))
        .slot(Slot::DelItem, SlotFn::DelItem(dict_delitem))
        .slot(Slot::Eq, SlotFn::Binary(dict_eq))
        .slot(Slot::Ne, SlotFn::Binary(dict_ne))
        .slot(Slot::New, SlotFn::New(dict_new))
        .method(MethodDef::new("get", MethodStyle::VarArgs(dict_get)))
}

fn entries(rt: &Runtime, v: &Value) -> RunResult<Dict> {
    rt.as_dict(v)
        .cloned()
        .ok_or_else(|| ExcType::type_error(format!("expected dict, got '{}'", rt.type_name_of(v))))
}

/// Extracts a key, rejecting unhashable keys and non-string ones.
fn key_of(rt: &mut Runtime, ts: &mut ThreadContext, key: &Value) -> RunResult<Rc<str>> {
    if let Value::Str(s) = rt.unwrap_native(key) {
        return Ok(s.clone());
    }
    object_protocol::hash(rt, ts, key)?;
    Err(ExcType::type_error(format!(
        "dict keys must be str, not '{}'",
        rt.type_name_of(key)
    )))
}

fn dict_mut<'a>(rt: &'a mut Runtime, v: &Value) -> RunResult<&'a mut Dict> {
    let id = match rt.unwrap_native(v) {
        Value::Ref(id) => *id,
        _ => return Err(ExcType::type_error("expected dict")),
    };
    match rt.heap.get_mut(id) {
        HeapData::Dict(dict) => Ok(dict),
        _ => Err(ExcType::type_error("expected dict")),
    }
}

fn dict_repr(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let dict = entries(rt, v)?;
    let mut parts = Vec::with_capacity(dict.len());
    for (key, value) in &dict {
        let value = object_protocol::repr(rt, ts, value)?;
        parts.push(format!("{}: {value}", super::str::quote(key)));
    }
    Ok(Value::from(format!("{{{}}}", parts.join(", ")).as_str()))
}

fn dict_hash(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    Err(ExcType::unhashable(rt.type_name_of(v)))
}

fn dict_len(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<usize> {
    Ok(rt.as_dict(v).map_or(0, Dict::len))
}

fn dict_contains(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<bool> {
    if let Value::Str(s) = rt.unwrap_native(key) {
        return Ok(rt.as_dict(v).is_some_and(|dict| dict.contains_key(s)));
    }
    // unhashable keys raise, other keys are simply absent
    object_protocol::hash(rt, ts, key)?;
    Ok(false)
}

fn dict_getitem(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<Value> {
    let name = key_of(rt, ts, key)?;
    rt.as_dict(v)
        .and_then(|dict| dict.get(&name))
        .cloned()
        .ok_or_else(|| ExcType::key_error(&name))
}

fn dict_setitem(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value, value: &Value) -> RunResult<()> {
    let name = key_of(rt, ts, key)?;
    dict_mut(rt, v)?.insert(name, value.clone());
    Ok(())
}

fn dict_delitem(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<()> {
    let name = key_of(rt, ts, key)?;
    match dict_mut(rt, v)?.shift_remove(&name) {
        Some(_) => Ok(()),
        None => Err(ExcType::key_error(&name)),
    }
}

fn dict_eq(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    if !rt.isinstance(w, TypeId::DICT) {
        return Ok(Value::NotImplemented);
    }
    let left = entries(rt, v)?;
    let right = entries(rt, w)?;
    if left.len() != right.len() {
        return Ok(Value::Bool(false));
    }
    for (key, value) in &left {
        let Some(other) = right.get(key) else {
            return Ok(Value::Bool(false));
        };
        if !value.is(other) && !compare::compare_bool(rt, ts, Comparison::Eq, value, other)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn dict_ne(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(match dict_eq(rt, ts, v, w)? {
        Value::Bool(b) => Value::Bool(!b),
        other => other,
    })
}

/// `dict()`, `dict(mapping)` and `dict(**kwargs)`.
fn dict_new(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let mut dict = match args {
        [] => Dict::default(),
        [source] => rt.as_dict(source).cloned().ok_or_else(|| {
            ExcType::type_error(format!("'{}' object is not a mapping", rt.type_name_of(source)))
        })?,
        _ => return Err(ExcType::type_error_at_most("dict", 1, args.len())),
    };
    if let Some(kwargs) = kwargs {
        dict.extend(kwargs.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let value = rt.new_dict(dict)?;
    if ty == TypeId::DICT {
        Ok(value)
    } else {
        rt.new_instance(ty, Some(value))
    }
}

/// `d.get(key[, default])`
fn dict_get(rt: &mut Runtime, ts: &mut ThreadContext, self_: &Value, args: ArgValues<'_>) -> RunResult<Value> {
    let (key, default) = args.get_one_two_args("get")?;
    let name = key_of(rt, ts, &key)?;
    Ok(rt
        .as_dict(self_)
        .and_then(|dict| dict.get(&name))
        .cloned()
        .unwrap_or(default.unwrap_or(Value::None)))
}
