//! Arithmetic operator dispatch and numeric conversions.

use num_traits::ToPrimitive;

use crate::{
    exception_private::{ExcType, RunResult},
    runtime::Runtime,
    slot::{self, Slot},
    thread_context::ThreadContext,
    types::{
        TypeId,
        int::{IntRef, int_ref},
    },
    value::Value,
};

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "^")]
    Xor,
    #[strum(serialize = "|")]
    Or,
}

impl BinaryOp {
    /// The forward slot, e.g. `Add`.
    #[must_use]
    pub const fn slot(self) -> Slot {
        match self {
            Self::Add => Slot::Add,
            Self::Sub => Slot::Sub,
            Self::Mul => Slot::Mul,
            Self::And => Slot::And,
            Self::Xor => Slot::Xor,
            Self::Or => Slot::Or,
        }
    }

    /// The reflected slot, e.g. `RAdd`.
    #[must_use]
    pub const fn reflected_slot(self) -> Slot {
        match self {
            Self::Add => Slot::RAdd,
            Self::Sub => Slot::RSub,
            Self::Mul => Slot::RMul,
            Self::And => Slot::RAnd,
            Self::Xor => Slot::RXor,
            Self::Or => Slot::ROr,
        }
    }
}

/// Evaluates `v op w`.
///
/// Operands of the same type only try `v`'s forward slot. When `type(w)` is a
/// proper subtype of `type(v)`, `w`'s reflected slot goes first; otherwise `v`'s
/// forward slot does. An empty slot or a `NotImplemented` result passes the turn
/// to the other side.
pub fn apply_binary_op(rt: &mut Runtime, ts: &mut ThreadContext, op: BinaryOp, v: &Value, w: &Value) -> RunResult<Value> {
    let vt = rt.type_of(v);
    let wt = rt.type_of(w);
    if vt == wt {
        if let Some(result) = try_slot(rt, ts, op.slot(), v, w)? {
            return Ok(result);
        }
    } else if rt.is_subtype(wt, vt) {
        if let Some(result) = try_slot(rt, ts, op.reflected_slot(), w, v)? {
            return Ok(result);
        }
        if let Some(result) = try_slot(rt, ts, op.slot(), v, w)? {
            return Ok(result);
        }
    } else {
        if let Some(result) = try_slot(rt, ts, op.slot(), v, w)? {
            return Ok(result);
        }
        if let Some(result) = try_slot(rt, ts, op.reflected_slot(), w, v)? {
            return Ok(result);
        }
    }
    Err(ExcType::binary_type_error(
        &op.to_string(),
        rt.type_name(vt),
        rt.type_name(wt),
    ))
}

/// Calls a binary slot, folding "empty" and `NotImplemented` into `None`.
fn try_slot(rt: &mut Runtime, ts: &mut ThreadContext, slot: Slot, a: &Value, b: &Value) -> RunResult<Option<Value>> {
    Ok(slot::invoke_binary(rt, ts, slot, a, b)?.filter(|result| !result.is_not_implemented()))
}

/// `-v`
pub fn negative(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    slot::invoke_unary(rt, ts, Slot::Neg, v)?.ok_or_else(|| ExcType::unary_type_error("unary -", rt.type_name_of(v)))
}

/// `abs(v)`
pub fn absolute(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    slot::invoke_unary(rt, ts, Slot::Abs, v)?.ok_or_else(|| ExcType::unary_type_error("abs()", rt.type_name_of(v)))
}

/// Converts `v` to an `int` through its index slot.
pub fn index(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    match v {
        Value::Int(_) => return Ok(v.clone()),
        Value::Bool(b) => return Ok(Value::Int(i64::from(*b))),
        _ => {}
    }
    let Some(result) = slot::invoke_unary(rt, ts, Slot::Index, v)? else {
        return Err(ExcType::cannot_interpret_as_int(rt.type_name_of(v)));
    };
    if rt.isinstance(&result, TypeId::INT) {
        Ok(result)
    } else {
        Err(ExcType::returned_non_type("__index__", "int", rt.type_name_of(&result)))
    }
}

/// Converts `v` to a machine-sized integer.
pub fn as_size(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    let value = index(rt, ts, v)?;
    match int_ref(rt, &value) {
        Some(IntRef::Small(n)) => Ok(n),
        _ => Err(ExcType::overflow_error(format!(
            "cannot fit '{}' into an index-sized integer",
            rt.type_name_of(v)
        ))),
    }
}

/// Converts `v` to a float through its float slot, falling back to its index slot.
pub fn to_float(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<f64> {
    if let Value::Float(f) = rt.unwrap_native(v) {
        return Ok(*f);
    }
    if let Some(result) = slot::invoke_unary(rt, ts, Slot::Float, v)? {
        return match rt.unwrap_native(&result) {
            Value::Float(f) => Ok(*f),
            _ => Err(ExcType::returned_non_type("__float__", "float", rt.type_name_of(&result))),
        };
    }
    if rt.type_object(rt.type_of(v)).slots().is_filled(Slot::Index) {
        let value = index(rt, ts, v)?;
        return int_to_f64(rt, &value);
    }
    Err(ExcType::type_error(format!(
        "must be real number, not {}",
        rt.type_name_of(v)
    )))
}

/// Resolves a possibly negative sequence index against `len`.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let signed_len = i64::try_from(len).ok()?;
    let position = if index < 0 { index + signed_len } else { index };
    usize::try_from(position).ok().filter(|&position| position < len)
}

pub(crate) fn int_to_f64(rt: &Runtime, v: &Value) -> RunResult<f64> {
    match int_ref(rt, v) {
        Some(IntRef::Small(n)) => Ok(n as f64),
        Some(IntRef::Big(big)) => big
            .to_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| ExcType::overflow_error("int too large to convert to float")),
        None => Err(ExcType::type_error(format!(
            "must be real number, not {}",
            rt.type_name_of(v)
        ))),
    }
}
