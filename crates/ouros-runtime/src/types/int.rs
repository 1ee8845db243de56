//! `int` and `bool`.
//!
//! Integers that fit in an `i64` are stored inline as `Value::Int`; arithmetic
//! that overflows promotes to a heap `BigInt`, and results that fit again are
//! demoted by [`Runtime::new_int`]. `bool` is a subtype of `int` whose bitwise
//! operators stay within `bool` when both operands are booleans.
//!
//! Operands that are not integers make the slots return `NotImplemented`, so that
//! `1 + 2.0` reaches `float.__radd__`.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunResult},
    hash::{hash_bigint, hash_int},
    heap::HeapData,
    number, object_protocol,
    runtime::Runtime,
    slot::{self, Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, MethodDef, MethodStyle, Shape, TypeFlags, TypeId, TypeSpec},
    value::Value,
};

/// Borrowed view of an integer value, inline or arbitrary precision.
#[derive(Debug, Clone, Copy)]
pub(crate) enum IntRef<'a> {
    Small(i64),
    Big(&'a BigInt),
}

impl IntRef<'_> {
    pub(crate) fn to_bigint(self) -> BigInt {
        match self {
            Self::Small(n) => BigInt::from(n),
            Self::Big(big) => big.clone(),
        }
    }
}

/// Views `v` as an integer: `int`, `bool` and instances of their subclasses.
pub(crate) fn int_ref<'a>(rt: &'a Runtime, v: &'a Value) -> Option<IntRef<'a>> {
    match rt.unwrap_native(v) {
        Value::Int(n) => Some(IntRef::Small(*n)),
        Value::Bool(b) => Some(IntRef::Small(i64::from(*b))),
        Value::Ref(id) => match rt.heap.get(*id) {
            HeapData::LongInt(big) => Some(IntRef::Big(big)),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn int_spec() -> TypeSpec {
    TypeSpec::new("int", Shape::Int)
        .slot(Slot::Repr, SlotFn::Unary(int_repr))
        .slot(Slot::Hash, SlotFn::Hash(int_hash))
        .slot(Slot::Lt, SlotFn::Binary(int_lt))
        .slot(Slot::Le, SlotFn::Binary(int_le))
        .slot(Slot::Eq, SlotFn::Binary(int_eq))
        .slot(Slot::Ne, SlotFn::Binary(int_ne))
        .slot(Slot::Gt, SlotFn::Binary(int_gt))
        .slot(Slot::Ge, SlotFn::Binary(int_ge))
        .slot(Slot::Add, SlotFn::Binary(int_add))
        .slot(Slot::RAdd, SlotFn::Binary(int_radd))
        .slot(Slot::Sub, SlotFn::Binary(int_sub))
        .slot(Slot::RSub, SlotFn::Binary(int_rsub))
        .slot(Slot::Mul, SlotFn::Binary(int_mul))
        .slot(Slot::RMul, SlotFn::Binary(int_rmul))
        .slot(Slot::And, SlotFn::Binary(int_and))
        .slot(Slot::RAnd, SlotFn::Binary(int_rand))
        .slot(Slot::Xor, SlotFn::Binary(int_xor))
        .slot(Slot::RXor, SlotFn::Binary(int_rxor))
        .slot(Slot::Or, SlotFn::Binary(int_or))
        .slot(Slot::ROr, SlotFn::Binary(int_ror))
        .slot(Slot::Neg, SlotFn::Unary(int_neg))
        .slot(Slot::Abs, SlotFn::Unary(int_abs))
        .slot(Slot::Bool, SlotFn::Predicate(int_bool))
        .slot(Slot::Int, SlotFn::Unary(int_int))
        .slot(Slot::Index, SlotFn::Unary(int_int))
        .slot(Slot::Float, SlotFn::Unary(int_float))
        .slot(Slot::New, SlotFn::New(int_new))
        .method(MethodDef::new("bit_length", MethodStyle::NoArgs(int_bit_length)))
}

pub(crate) fn bool_spec() -> TypeSpec {
    TypeSpec::new("bool", Shape::Bool)
        .base(TypeId::INT)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(bool_repr))
        .slot(Slot::And, SlotFn::Binary(bool_and))
        .slot(Slot::RAnd, SlotFn::Binary(bool_and))
        .slot(Slot::Xor, SlotFn::Binary(bool_xor))
        .slot(Slot::RXor, SlotFn::Binary(bool_xor))
        .slot(Slot::Or, SlotFn::Binary(bool_or))
        .slot(Slot::ROr, SlotFn::Binary(bool_or))
        .slot(Slot::New, SlotFn::New(bool_new))
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Applies an integer operation, with checked `i64` arithmetic first and `BigInt` on overflow.
fn arith(
    rt: &mut Runtime,
    v: &Value,
    w: &Value,
    small: fn(i64, i64) -> Option<i64>,
    big: fn(BigInt, BigInt) -> BigInt,
) -> RunResult<Value> {
    let result = match (int_ref(rt, v), int_ref(rt, w)) {
        (Some(IntRef::Small(a)), Some(IntRef::Small(b))) => small(a, b).ok_or_else(|| big(a.into(), b.into())),
        (Some(a), Some(b)) => Err(big(a.to_bigint(), b.to_bigint())),
        _ => return Ok(Value::NotImplemented),
    };
    match result {
        Ok(n) => Ok(Value::Int(n)),
        Err(big) => rt.new_int(big),
    }
}

fn int_add(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, i64::checked_add, |a, b| a + b)
}

fn int_radd(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, w, v, i64::checked_add, |a, b| a + b)
}

fn int_sub(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, i64::checked_sub, |a, b| a - b)
}

fn int_rsub(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, w, v, i64::checked_sub, |a, b| a - b)
}

fn int_mul(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, i64::checked_mul, |a, b| a * b)
}

fn int_rmul(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, w, v, i64::checked_mul, |a, b| a * b)
}

fn int_and(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, |a, b| Some(a & b), |a, b| a & b)
}

fn int_rand(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    int_and(rt, ts, w, v)
}

fn int_xor(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, |a, b| Some(a ^ b), |a, b| a ^ b)
}

fn int_rxor(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    int_xor(rt, ts, w, v)
}

fn int_or(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, |a, b| Some(a | b), |a, b| a | b)
}

fn int_ror(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    int_or(rt, ts, w, v)
}

fn unary(rt: &mut Runtime, v: &Value, small: fn(i64) -> Option<i64>, big: fn(BigInt) -> BigInt) -> RunResult<Value> {
    let result = match int_ref(rt, v) {
        Some(IntRef::Small(n)) => small(n).ok_or_else(|| big(n.into())),
        Some(IntRef::Big(n)) => Err(big(n.clone())),
        None => return Err(ExcType::type_error(format!("expected int, got '{}'", rt.type_name_of(v)))),
    };
    match result {
        Ok(n) => Ok(Value::Int(n)),
        Err(big) => rt.new_int(big),
    }
}

fn int_neg(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    unary(rt, v, i64::checked_neg, |n| -n)
}

fn int_abs(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    unary(rt, v, i64::checked_abs, |n| n.abs())
}

/// The plain `int` value of `v`, dropping any subclass.
fn int_int(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    unary(rt, v, Some, |n| n)
}

fn int_float(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    number::int_to_f64(rt, v).map(Value::Float)
}

fn int_bool(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<bool> {
    Ok(match int_ref(rt, v) {
        Some(IntRef::Small(n)) => n != 0,
        Some(IntRef::Big(n)) => !n.is_zero(),
        None => true,
    })
}

fn int_hash(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    Ok(match int_ref(rt, v) {
        Some(IntRef::Small(n)) => hash_int(n),
        Some(IntRef::Big(n)) => hash_bigint(n),
        None => 0,
    })
}

fn int_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let text = match int_ref(rt, v) {
        Some(IntRef::Small(n)) => n.to_string(),
        Some(IntRef::Big(n)) => n.to_string(),
        None => return Err(ExcType::type_error(format!("expected int, got '{}'", rt.type_name_of(v)))),
    };
    Ok(Value::from(text.as_str()))
}

// ============================================================================
// Comparison
// ============================================================================

fn compare(rt: &Runtime, v: &Value, w: &Value) -> Option<Ordering> {
    match (int_ref(rt, v)?, int_ref(rt, w)?) {
        (IntRef::Small(a), IntRef::Small(b)) => Some(a.cmp(&b)),
        (a, b) => Some(a.to_bigint().cmp(&b.to_bigint())),
    }
}

fn richcompare(rt: &Runtime, v: &Value, w: &Value, test: fn(Ordering) -> bool) -> Value {
    compare(rt, v, w).map_or(Value::NotImplemented, |ordering| Value::Bool(test(ordering)))
}

fn int_lt(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(richcompare(rt, v, w, Ordering::is_lt))
}

fn int_le(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(richcompare(rt, v, w, Ordering::is_le))
}

fn int_eq(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(richcompare(rt, v, w, Ordering::is_eq))
}

fn int_ne(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(richcompare(rt, v, w, Ordering::is_ne))
}

fn int_gt(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(richcompare(rt, v, w, Ordering::is_gt))
}

fn int_ge(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(richcompare(rt, v, w, Ordering::is_ge))
}

// ============================================================================
// Construction
// ============================================================================

/// `int()`, `int(x)` and `int(text, base)`.
fn int_new(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let values = ArgValues::new(args, kwargs);
    let base = values.keyword("base").cloned();
    if values.kwargs().is_some_and(|kwargs| kwargs.keys().any(|key| &**key != "base")) {
        return Err(ExcType::type_error("int() got an unexpected keyword argument"));
    }
    let (x, base) = match (args, base) {
        ([], None) => (None, None),
        ([x], base) => (Some(x.clone()), base),
        ([x, base], None) => (Some(x.clone()), Some(base.clone())),
        ([], Some(_)) => return Err(ExcType::type_error("int() missing string argument")),
        _ => return Err(ExcType::type_error_at_most("int()", 2, values.count())),
    };

    let value = match (x, base) {
        (None, _) => Value::Int(0),
        (Some(x), None) => to_int(rt, ts, &x)?,
        (Some(x), Some(base)) => {
            let base = number::as_size(rt, ts, &base)?;
            let Value::Str(text) = rt.unwrap_native(&x).clone() else {
                return Err(ExcType::type_error("int() can't convert non-string with explicit base"));
            };
            parse_int(rt, &text, base)?
        }
    };
    if ty == TypeId::INT {
        Ok(value)
    } else {
        rt.new_instance(ty, Some(value))
    }
}

/// `int(x)` for a single argument.
fn to_int(rt: &mut Runtime, ts: &mut ThreadContext, x: &Value) -> RunResult<Value> {
    if int_ref(rt, x).is_some() {
        return unary(rt, x, Some, |n| n);
    }
    match rt.unwrap_native(x).clone() {
        Value::Str(text) => return parse_int(rt, &text, 10),
        Value::Float(f) => return float_to_int(rt, f),
        _ => {}
    }
    for slot in [Slot::Int, Slot::Index] {
        if let Some(result) = slot::invoke_unary(rt, ts, slot, x)? {
            if int_ref(rt, &result).is_none() {
                let method = slot.method_name().unwrap_or("__int__");
                return Err(ExcType::returned_non_type(method, "int", rt.type_name_of(&result)));
            }
            return unary(rt, &result, Some, |n| n);
        }
    }
    Err(ExcType::type_error(format!(
        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
        rt.type_name_of(x)
    )))
}

pub(crate) fn float_to_int(rt: &mut Runtime, f: f64) -> RunResult<Value> {
    if f.is_nan() {
        return Err(ExcType::value_error("cannot convert float NaN to integer"));
    }
    if f.is_infinite() {
        return Err(ExcType::overflow_error("cannot convert float infinity to integer"));
    }
    let truncated = f.trunc();
    match truncated.to_i64() {
        Some(n) => Ok(Value::Int(n)),
        None => {
            let big = BigInt::from_f64(truncated)
                .ok_or_else(|| ExcType::overflow_error("cannot convert float to integer"))?;
            rt.new_int(big)
        }
    }
}

fn parse_int(rt: &mut Runtime, text: &str, base: i64) -> RunResult<Value> {
    if !(2..=36).contains(&base) {
        return Err(ExcType::value_error("int() base must be >= 2 and <= 36"));
    }
    let invalid = || {
        ExcType::value_error(format!(
            "invalid literal for int() with base {base}: {}",
            super::str::quote(text)
        ))
    };
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty()
        || digits.starts_with(['_', '+', '-'])
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(invalid());
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let radix = u32::try_from(base).map_err(|_| invalid())?;
    let magnitude = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(invalid)?;
    if magnitude.is_negative() {
        return Err(invalid());
    }
    rt.new_int(if negative { -magnitude } else { magnitude })
}

fn int_bit_length(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value) -> RunResult<Value> {
    let bits = match int_ref(rt, self_) {
        Some(IntRef::Small(n)) => u64::from(64 - n.unsigned_abs().leading_zeros()),
        Some(IntRef::Big(n)) => n.bits(),
        None => return Err(ExcType::type_error("bit_length() requires an int")),
    };
    Ok(Value::Int(i64::try_from(bits).unwrap_or(i64::MAX)))
}

// ============================================================================
// bool
// ============================================================================

fn bool_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    match rt.unwrap_native(v) {
        Value::Bool(true) => Ok(Value::from("True")),
        Value::Bool(false) => Ok(Value::from("False")),
        _ => Err(ExcType::type_error(format!("expected bool, got '{}'", rt.type_name_of(v)))),
    }
}

/// Bitwise operators on two booleans stay booleans; anything else is integer arithmetic.
fn bool_bitwise(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    w: &Value,
    op: fn(bool, bool) -> bool,
    int_op: fn(&mut Runtime, &mut ThreadContext, &Value, &Value) -> RunResult<Value>,
) -> RunResult<Value> {
    match (v, w) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(op(*a, *b))),
        _ => int_op(rt, ts, v, w),
    }
}

fn bool_and(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    bool_bitwise(rt, ts, v, w, |a, b| a & b, int_and)
}

fn bool_xor(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    bool_bitwise(rt, ts, v, w, |a, b| a ^ b, int_xor)
}

fn bool_or(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    bool_bitwise(rt, ts, v, w, |a, b| a | b, int_or)
}

fn bool_new(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    _ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    match ArgValues::new(args, kwargs).get_zero_one_arg("bool")? {
        None => Ok(Value::Bool(false)),
        Some(x) => object_protocol::is_true(rt, ts, &x).map(Value::Bool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_promotes_and_demotes() {
        let mut rt = Runtime::new().unwrap();
        let mut ts = rt.new_thread_context();
        let big = int_add(&mut rt, &mut ts, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert!(matches!(big, Value::Ref(_)));
        let back = int_sub(&mut rt, &mut ts, &big, &Value::Int(1)).unwrap();
        assert_eq!(back, Value::Int(i64::MAX));
    }

    #[test]
    fn non_int_operands_are_not_implemented() {
        let mut rt = Runtime::new().unwrap();
        let mut ts = rt.new_thread_context();
        let result = int_add(&mut rt, &mut ts, &Value::Int(1), &Value::Float(2.0)).unwrap();
        assert!(result.is_not_implemented());
    }

    #[test]
    fn parses_literals() {
        let mut rt = Runtime::new().unwrap();
        assert_eq!(parse_int(&mut rt, " -1_000 ", 10).unwrap(), Value::Int(-1000));
        assert_eq!(parse_int(&mut rt, "ff", 16).unwrap(), Value::Int(255));
        let err = parse_int(&mut rt, "12a", 10).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: invalid literal for int() with base 10: '12a'");
    }
}
