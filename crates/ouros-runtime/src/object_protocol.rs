//! Generic object operations built on the slot table.

use std::rc::Rc;

use crate::{
    exception_private::{ExcType, RunResult},
    runtime::Runtime,
    slot::{self, Slot},
    thread_context::ThreadContext,
    value::Value,
};

/// `repr(v)`
pub fn repr(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Rc<str>> {
    match slot::invoke_unary(rt, ts, Slot::Repr, v)? {
        Some(result) => expect_str(rt, "__repr__", &result),
        None => Ok(format!("<'{}' object>", rt.type_name_of(v)).into()),
    }
}

/// `str(v)`, falling back to `repr`.
pub fn str(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Rc<str>> {
    if let Value::Str(s) = v {
        return Ok(s.clone());
    }
    match slot::invoke_unary(rt, ts, Slot::Str, v)? {
        Some(result) => expect_str(rt, "__str__", &result),
        None => repr(rt, ts, v),
    }
}

fn expect_str(rt: &Runtime, method: &str, result: &Value) -> RunResult<Rc<str>> {
    match rt.unwrap_native(result) {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(ExcType::returned_non_type(method, "string", rt.type_name_of(result))),
    }
}

/// `hash(v)`
pub fn hash(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    slot::invoke_hash(rt, ts, v)?.ok_or_else(|| ExcType::unhashable(rt.type_name_of(v)))
}

/// Truth value of `v`: the bool slot, else `len(v) != 0`, else true.
pub fn is_true(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<bool> {
    match v {
        Value::Bool(b) => return Ok(*b),
        Value::None => return Ok(false),
        _ => {}
    }
    if let Some(truth) = slot::invoke_bool(rt, ts, v)? {
        return Ok(truth);
    }
    if let Some(len) = slot::invoke_len(rt, ts, v)? {
        return Ok(len != 0);
    }
    Ok(true)
}

/// `len(v)`
pub fn len(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<usize> {
    slot::invoke_len(rt, ts, v)?.ok_or_else(|| ExcType::no_len(rt.type_name_of(v)))
}

/// `v[key]`
pub fn get_item(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<Value> {
    slot::invoke_binary(rt, ts, Slot::GetItem, v, key)?.ok_or_else(|| ExcType::not_subscriptable(rt.type_name_of(v)))
}

/// `v[key] = value`
pub fn set_item(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value, value: &Value) -> RunResult<()> {
    slot::invoke_setitem(rt, ts, v, key, value)?.ok_or_else(|| ExcType::no_item_assignment(rt.type_name_of(v)))
}

/// `del v[key]`
pub fn del_item(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<()> {
    slot::invoke_delitem(rt, ts, v, key)?.ok_or_else(|| {
        ExcType::type_error(format!(
            "'{}' object does not support item deletion",
            rt.type_name_of(v)
        ))
    })
}
