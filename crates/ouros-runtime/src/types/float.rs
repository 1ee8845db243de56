//! `float`.
//!
//! Arithmetic and comparisons accept `int` operands on either side, so mixed
//! expressions resolve through the float slots whichever side the int is on.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunResult},
    hash::hash_float,
    number,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{
        Dict, MethodDef, MethodStyle, Shape, TypeId, TypeSpec,
        int::{IntRef, float_to_int, int_ref},
    },
    value::Value,
};

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("float", Shape::Float)
        .slot(Slot::Repr, SlotFn::Unary(float_repr_slot))
        .slot(Slot::Hash, SlotFn::Hash(float_hash))
        .slot(Slot::Lt, SlotFn::Binary(float_lt))
        .slot(Slot::Le, SlotFn::Binary(float_le))
        .slot(Slot::Eq, SlotFn::Binary(float_eq))
        .slot(Slot::Ne, SlotFn::Binary(float_ne))
        .slot(Slot::Gt, SlotFn::Binary(float_gt))
        .slot(Slot::Ge, SlotFn::Binary(float_ge))
        .slot(Slot::Add, SlotFn::Binary(float_add))
        .slot(Slot::RAdd, SlotFn::Binary(float_radd))
        .slot(Slot::Sub, SlotFn::Binary(float_sub))
        .slot(Slot::RSub, SlotFn::Binary(float_rsub))
        .slot(Slot::Mul, SlotFn::Binary(float_mul))
        .slot(Slot::RMul, SlotFn::Binary(float_rmul))
        .slot(Slot::Neg, SlotFn::Unary(float_neg))
        .slot(Slot::Abs, SlotFn::Unary(float_abs))
        .slot(Slot::Bool, SlotFn::Predicate(float_bool))
        .slot(Slot::Int, SlotFn::Unary(float_int))
        .slot(Slot::Float, SlotFn::Unary(float_float))
        .slot(Slot::New, SlotFn::New(float_new))
        .method(MethodDef::new("is_integer", MethodStyle::NoArgs(float_is_integer)))
}

/// Returns a string representation of a float matching `repr()`.
///
/// Uses `ryu` for the shortest round-tripping digits. Special values are spelled
/// `inf`, `-inf` and `nan`; positive exponents get an explicit `+` and integral
/// values keep a trailing `.0`.
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    fix_exponent(buffer.format(f))
}

fn fix_exponent(s: &str) -> String {
    if let Some(e_pos) = s.find('e') {
        let (mantissa, exp_part) = s.split_at(e_pos);
        let exp = &exp_part[1..];
        if exp.starts_with('-') {
            return s.to_owned();
        }
        return format!("{mantissa}e+{exp}");
    }
    if s.contains('.') { s.to_owned() } else { format!("{s}.0") }
}

/// The float value of `v` when it is a float or an int, `None` otherwise.
fn operand(rt: &Runtime, v: &Value) -> RunResult<Option<f64>> {
    if let Value::Float(f) = rt.unwrap_native(v) {
        return Ok(Some(*f));
    }
    match int_ref(rt, v) {
        Some(_) => number::int_to_f64(rt, v).map(Some),
        None => Ok(None),
    }
}

fn self_value(rt: &Runtime, v: &Value) -> RunResult<f64> {
    match rt.unwrap_native(v) {
        Value::Float(f) => Ok(*f),
        _ => Err(ExcType::type_error(format!("expected float, got '{}'", rt.type_name_of(v)))),
    }
}

fn arith(rt: &Runtime, v: &Value, w: &Value, op: fn(f64, f64) -> f64) -> RunResult<Value> {
    match (operand(rt, v)?, operand(rt, w)?) {
        (Some(a), Some(b)) => Ok(Value::Float(op(a, b))),
        _ => Ok(Value::NotImplemented),
    }
}

fn float_add(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, |a, b| a + b)
}

fn float_radd(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, w, v, |a, b| a + b)
}

fn float_sub(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, |a, b| a - b)
}

fn float_rsub(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, w, v, |a, b| a - b)
}

fn float_mul(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, v, w, |a, b| a * b)
}

fn float_rmul(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    arith(rt, w, v, |a, b| a * b)
}

fn float_neg(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    self_value(rt, v).map(|f| Value::Float(-f))
}

fn float_abs(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    self_value(rt, v).map(|f| Value::Float(f.abs()))
}

fn float_bool(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<bool> {
    self_value(rt, v).map(|f| f != 0.0)
}

fn float_int(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let f = self_value(rt, v)?;
    float_to_int(rt, f)
}

fn float_float(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    self_value(rt, v).map(Value::Float)
}

fn float_hash(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    self_value(rt, v).map(hash_float)
}

fn float_repr_slot(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let f = self_value(rt, v)?;
    Ok(Value::from(float_repr(f).as_str()))
}

// ============================================================================
// Comparison
// ============================================================================

/// Compares a float with a float or an int.
///
/// Large ints are compared exactly rather than after rounding to `f64`.
fn compare(
    rt: &Runtime,
    v: &Value,
    w: &Value,
    test: fn(std::cmp::Ordering) -> bool,
    unordered: bool,
) -> RunResult<Value> {
    let a = self_value(rt, v)?;
    let ordering = match rt.unwrap_native(w) {
        Value::Float(b) => a.partial_cmp(b),
        _ => match int_ref(rt, w) {
            Some(IntRef::Small(n)) if n.unsigned_abs() < (1 << 53) => a.partial_cmp(&(n as f64)),
            Some(n) => compare_with_int(a, &n.to_bigint()),
            None => return Ok(Value::NotImplemented),
        },
    };
    Ok(Value::Bool(ordering.map_or(unordered, test)))
}

fn compare_with_int(a: f64, b: &BigInt) -> Option<std::cmp::Ordering> {
    if a.is_nan() {
        return None;
    }
    if a.is_infinite() {
        return Some(if a > 0.0 { std::cmp::Ordering::Greater } else { std::cmp::Ordering::Less });
    }
    let whole = BigInt::from_f64(a.trunc())?;
    match whole.cmp(b) {
        std::cmp::Ordering::Equal => {
            let fraction = a - a.trunc();
            Some(fraction.partial_cmp(&0.0)?)
        }
        other => Some(other),
    }
}

fn float_lt(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, std::cmp::Ordering::is_lt, false)
}

fn float_le(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, std::cmp::Ordering::is_le, false)
}

fn float_eq(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, std::cmp::Ordering::is_eq, false)
}

fn float_ne(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, std::cmp::Ordering::is_ne, true)
}

fn float_gt(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, std::cmp::Ordering::is_gt, false)
}

fn float_ge(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    compare(rt, v, w, std::cmp::Ordering::is_ge, false)
}

// ============================================================================
// Construction
// ============================================================================

fn float_new(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let value = match ArgValues::new(args, kwargs).get_zero_one_arg("float")? {
        None => 0.0,
        Some(x) => match rt.unwrap_native(&x) {
            Value::Str(text) => parse_float(text)?,
            _ => number::to_float(rt, ts, &x)?,
        },
    };
    if ty == TypeId::FLOAT {
        Ok(Value::Float(value))
    } else {
        rt.new_instance(ty, Some(Value::Float(value)))
    }
}

fn parse_float(text: &str) -> RunResult<f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let unsigned = lowered.trim_start_matches(['+', '-']);
    let special = match unsigned {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    if let Some(special) = special {
        return Ok(if lowered.starts_with('-') { -special } else { special });
    }
    trimmed
        .replace('_', "")
        .parse::<f64>()
        .ok()
        .filter(|_| !trimmed.is_empty() && !trimmed.starts_with('_') && !trimmed.contains("__"))
        .ok_or_else(|| {
            ExcType::value_error(format!(
                "could not convert string to float: {}",
                super::str::quote(text)
            ))
        })
}

fn float_is_integer(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value) -> RunResult<Value> {
    let f = self_value(rt, self_)?;
    Ok(Value::Bool(f.is_finite() && f.fract() == 0.0 && f.to_i128().is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_matches_literal_syntax() {
        assert_eq!(float_repr(7.0), "7.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(1e20), "1e+20");
        assert_eq!(float_repr(1.5e-7), "1.5e-7");
        assert_eq!(float_repr(f64::NEG_INFINITY), "-inf");
        assert_eq!(float_repr(f64::NAN), "nan");
    }

    #[test]
    fn big_ints_compare_exactly() {
        let big = BigInt::from(2_i64).pow(80) + 1;
        let f = 2_f64.powi(80);
        assert_eq!(compare_with_int(f, &big), Some(std::cmp::Ordering::Less));
        assert_eq!(compare_with_int(0.5, &BigInt::from(0)), Some(std::cmp::Ordering::Greater));
    }

    #[test]
    fn parses_text() {
        assert_eq!(parse_float(" 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_float("-inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_float("1_0.5").unwrap(), 10.5);
        assert!(parse_float("abc").is_err());
    }
}
