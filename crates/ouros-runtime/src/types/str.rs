//! `str`.

use std::{cmp::Ordering, rc::Rc};

use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunResult},
    hash::hash_str,
    number,
    object_protocol,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, MethodDef, MethodStyle, Shape, TypeId, TypeSpec},
    value::Value,
};

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("str", Shape::Str)
        .slot(Slot::Repr, SlotFn::Unary(str_repr))
        .slot(Slot::Str, SlotFn::Unary(str_str))
        .slot(Slot::Hash, SlotFn::Hash(str_hash))
        .slot(Slot::Lt, SlotFn::Binary(str_lt))
        .slot(Slot::Le, SlotFn::Binary(str_le))
        .slot(Slot::Eq, SlotFn::Binary(str_eq))
        .slot(Slot::Ne, SlotFn::Binary(str_ne))
        .slot(Slot::Gt, SlotFn::Binary(str_gt))
        .slot(Slot::Ge, SlotFn::Binary(str_ge))
        .slot(Slot::Add, SlotFn::Binary(str_add))
        .slot(Slot::Mul, SlotFn::Binary(str_mul))
        .slot(Slot::RMul, SlotFn::Binary(str_mul))
        .slot(Slot::Len, SlotFn::Len(str_len))
        .slot(Slot::Contains, SlotFn::BinaryPredicate(str_contains))
        .slot(Slot::GetItem, SlotFn::Binary(str_getitem))
        .slot(Slot::New, SlotFn::New(str_new))
        .method(MethodDef::new("upper", MethodStyle::NoArgs(str_upper)).doc("Return a copy of the string converted to uppercase."))
        .method(MethodDef::new("startswith", MethodStyle::O(str_startswith)))
}

/// Quotes `s` the way `repr()` does.
///
/// Single quotes are used unless the text contains a single quote and no double
/// quote. Control characters are escaped.
#[must_use]
pub fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = u32::from(c);
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else {
                    out.push_str(&format!("\\u{code:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

/// The text of `v` when it is a `str` or an instance of a `str` subclass.
fn text(rt: &Runtime, v: &Value) -> Option<Rc<str>> {
    match rt.unwrap_native(v) {
        Value::Str(s) => Some(s.clone()),
        _ => None,
    }
}

fn self_text(rt: &Runtime, v: &Value) -> RunResult<Rc<str>> {
    text(rt, v).ok_or_else(|| ExcType::type_error(format!("expected str, got '{}'", rt.type_name_of(v))))
}

fn str_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let s = self_text(rt, v)?;
    Ok(Value::from(quote(&s).as_str()))
}

/// `str(s)` of an exact string is the string itself; a subclass yields a plain copy.
fn str_str(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    if matches!(v, Value::Str(_)) {
        return Ok(v.clone());
    }
    self_text(rt, v).map(Value::Str)
}

fn str_hash(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    self_text(rt, v).map(|s| hash_str(&s))
}

fn compare(rt: &Runtime, v: &Value, w: &Value, test: fn(Ordering) -> bool) -> RunResult<Value> {
    let a = self_text(rt, v)?;
    Ok(match text(rt, w) {
        Some(b) => Value::Bool(test(a.cmp(&b))),
        None => Value::NotImplemented,
    })
}

fn str_lt(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, Ordering::is_lt)
}

fn str_le(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, Ordering::is_le)
}

fn str_eq(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, Ordering::is_eq)
}

fn str_ne(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, Ordering::is_ne)
}

fn str_gt(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, Ordering::is_gt)
}

fn str_ge(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, Ordering::is_ge)
}

fn str_add(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    let a = self_text(rt, v)?;
    let Some(b) = text(rt, w) else {
        return Err(ExcType::type_error(format!(
            "can only concatenate str (not \"{}\") to str",
            rt.type_name_of(w)
        )));
    };
    Ok(Value::from(format!("{a}{b}").as_str()))
}

/// Handles both `s * n` and `n * s`; the slot receives the string first either way.
fn str_mul(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    let s = self_text(rt, v)?;
    if !matches!(rt.unwrap_native(w), Value::Int(_) | Value::Bool(_)) && !rt.isinstance(w, TypeId::INT) {
        return Ok(Value::NotImplemented);
    }
    let count = usize::try_from(number::as_size(rt, ts, w)?).unwrap_or(0);
    Ok(Value::from(s.repeat(count).as_str()))
}

fn str_len(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<usize> {
    self_text(rt, v).map(|s| s.chars().count())
}

fn str_contains(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, item: &Value) -> RunResult<bool> {
    let s = self_text(rt, v)?;
    match text(rt, item) {
        Some(needle) => Ok(s.contains(&*needle)),
        None => Err(ExcType::type_error(format!(
            "'in <string>' requires string as left operand, not {}",
            rt.type_name_of(item)
        ))),
    }
}

fn str_getitem(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, key: &Value) -> RunResult<Value> {
    let s = self_text(rt, v)?;
    let index = number::as_size(rt, ts, key).map_err(|_| {
        ExcType::type_error(format!("string indices must be integers, not '{}'", rt.type_name_of(key)))
    })?;
    number::normalize_index(index, s.chars().count())
        .and_then(|position| s.chars().nth(position))
        .map(|c| Value::from(c.to_string().as_str()))
        .ok_or_else(|| ExcType::index_error("string index out of range"))
}

fn str_new(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let text = match ArgValues::new(args, kwargs).get_zero_one_arg("str")? {
        None => Rc::from(""),
        Some(x) => object_protocol::str(rt, ts, &x)?,
    };
    if ty == TypeId::STR {
        Ok(Value::Str(text))
    } else {
        rt.new_instance(ty, Some(Value::Str(text)))
    }
}

fn str_upper(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value) -> RunResult<Value> {
    let s = self_text(rt, self_)?;
    Ok(Value::from(s.to_uppercase().as_str()))
}

fn str_startswith(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value, prefix: &Value) -> RunResult<Value> {
    let s = self_text(rt, self_)?;
    match text(rt, prefix) {
        Some(prefix) => Ok(Value::Bool(s.starts_with(&*prefix))),
        None => Err(ExcType::type_error(format!(
            "startswith first arg must be str, not {}",
            rt.type_name_of(prefix)
        ))),
    }
}
