//! `tuple`.

use crate::{
    args::ArgValues,
    compare::{self, Comparison},
    exception_private::{ExcType, RunResult},
    hash::hash_tuple,
    number,
    object_protocol,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, MethodDef, MethodStyle, Shape, TypeId, TypeSpec},
    value::Value,
};

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("tuple", Shape::Tuple)
        .slot(Slot::Repr, SlotFn::Unary(tuple_repr))
        .slot(Slot::Hash, SlotFn::Hash(tuple_hash))
        .slot(Slot::Eq, SlotFn::Binary(tuple_eq))
        .slot(Slot::Ne, SlotFn::Binary(tuple_ne))
        .slot(Slot::Len, SlotFn::Len(tuple_len))
        .slot(Slot::Contains, SlotFn::BinaryPredicate(tuple_contains))
        .slot(Slot::GetItem, SlotFn::Binary(tuple_getitem))
        .slot(Slot::Add, SlotFn::Binary(tuple_add))
        .slot(Slot::Mul, SlotFn::Binary(tuple_mul))
        .slot(Slot::RMul, SlotFn::Binary(tuple_mul))
        .slot(Slot::New, SlotFn::New(tuple_new))
        .method(MethodDef::new("count", MethodStyle::O(tuple_count)))
        .method(MethodDef::new("index", MethodStyle::O(tuple_index)))
}

fn items(rt: &Runtime, v: &Value) -> RunResult<Vec<Value>> {
    rt.tuple_items(v)
        .map(<[Value]>::to_vec)
        .ok_or_else(|| ExcType::type_error(format!("expected tuple, got '{}'", rt.type_name_of(v))))
}

/// Identity first, then `==`, the way containers compare their items.
fn item_eq(rt: &mut Runtime, ts: &mut ThreadContext, a: &Value, b: &Value) -> RunResult<bool> {
    Ok(a.is(b) || compare::compare_bool(rt, ts, Comparison::Eq, a, b)?)
}

fn tuple_repr(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let items = items(rt, v)?;
    let mut parts = Vec::with_capacity(items.len());
    for item in &items {
        parts.push(object_protocol::repr(rt, ts, item)?.to_string());
    }
    let text = match parts.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", parts.join(", ")),
    };
    Ok(Value::from(text.as_str()))
}

fn tuple_hash(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    let items = items(rt, v)?;
    let mut hashes = Vec::with_capacity(items.len());
    for item in &items {
        hashes.push(object_protocol::hash(rt, ts, item)?);
    }
    Ok(hash_tuple(hashes.into_iter()))
}

fn tuple_eq(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    if !rt.isinstance(w, TypeId::TUPLE) {
        return Ok(Value::NotImplemented);
    }
    let left = items(rt, v)?;
    let right = items(rt, w)?;
    if left.len() != right.len() {
        return Ok(Value::Bool(false));
    }
    for (a, b) in left.iter().zip(&right) {
        if !item_eq(rt, ts, a, b)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn tuple_ne(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(match tuple_eq(rt, ts, v, w)? {
        Value::Bool(b) => Value::Bool(!b),
        other => other,
    })
}

fn tuple_len(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<usize> {
    Ok(rt.tuple_items(v).map_or(0, <[Value]>::len))
}

fn tuple_contains(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, item: &Value) -> RunResult<bool> {
    for candidate in items(rt, v)? {
        if item_eq(rt, ts, &candidate, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn tuple_getitem(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<Value> {
    if !rt.type_object(rt.type_of(key)).slots().is_filled(Slot::Index) {
        return Err(ExcType::type_error(format!(
            "tuple indices must be integers, not {}",
            rt.type_name_of(key)
        )));
    }
    let index = number::as_size(rt, ts, key)?;
    let items = items(rt, v)?;
    number::normalize_index(index, items.len())
        .and_then(|position| items.get(position).cloned())
        .ok_or_else(|| ExcType::index_error("tuple index out of range"))
}

fn tuple_add(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    let Some(right) = rt.tuple_items(w).map(<[Value]>::to_vec) else {
        return Err(ExcType::type_error(format!(
            "can only concatenate tuple (not \"{}\") to tuple",
            rt.type_name_of(w)
        )));
    };
    let mut joined = items(rt, v)?;
    joined.extend(right);
    rt.new_tuple(joined)
}

fn tuple_mul(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    if !rt.isinstance(w, TypeId::INT) {
        return Ok(Value::NotImplemented);
    }
    let count = usize::try_from(number::as_size(rt, ts, w)?).unwrap_or(0);
    let items = items(rt, v)?;
    let mut repeated = Vec::with_capacity(items.len().saturating_mul(count));
    for _ in 0..count {
        repeated.extend_from_slice(&items);
    }
    rt.new_tuple(repeated)
}

/// `tuple()` and `tuple(t)`; only tuples are accepted as the source.
fn tuple_new(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let value = match ArgValues::new(args, kwargs).get_zero_one_arg("tuple")? {
        None => rt.empty_tuple(),
        Some(source) if matches!(source, Value::Ref(_)) && rt.type_of(&source) == TypeId::TUPLE => source,
        Some(source) => match rt.tuple_items(&source).map(<[Value]>::to_vec) {
            Some(copied) => rt.new_tuple(copied)?,
            None => {
                return Err(ExcType::type_error(format!(
                    "'{}' object is not iterable",
                    rt.type_name_of(&source)
                )));
            }
        },
    };
    if ty == TypeId::TUPLE {
        Ok(value)
    } else {
        rt.new_instance(ty, Some(value))
    }
}

fn tuple_count(rt: &mut Runtime, ts: &mut ThreadContext, self_: &Value, value: &Value) -> RunResult<Value> {
    let mut count = 0;
    for item in items(rt, self_)? {
        if item_eq(rt, ts, &item, value)? {
            count += 1;
        }
    }
    Ok(Value::Int(count))
}

fn tuple_index(rt: &mut Runtime, ts: &mut ThreadContext, self_: &Value, value: &Value) -> RunResult<Value> {
    for (position, item) in items(rt, self_)?.iter().enumerate() {
        if item_eq(rt, ts, item, value)? {
            return Ok(Value::Int(i64::try_from(position).unwrap_or(i64::MAX)));
        }
    }
    Err(ExcType::value_error("tuple.index(x): x not in tuple"))
}
