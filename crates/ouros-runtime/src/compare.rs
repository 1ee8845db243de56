//! Rich comparison, identity and containment.

use crate::{
    exception_private::{ExcType, RunResult},
    object_protocol,
    runtime::Runtime,
    slot::{self, Slot},
    thread_context::ThreadContext,
    value::Value,
};

/// Comparison operators, including identity and membership tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Comparison {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "not in")]
    NotIn,
    #[strum(serialize = "is")]
    Is,
    #[strum(serialize = "is not")]
    IsNot,
}

impl Comparison {
    /// The operator with its operands exchanged: `a < b` is `b > a`.
    #[must_use]
    pub const fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            other => other,
        }
    }

    /// The slot implementing a rich comparison, `None` for identity and membership.
    #[must_use]
    pub const fn slot(self) -> Option<Slot> {
        match self {
            Self::Lt => Some(Slot::Lt),
            Self::Le => Some(Slot::Le),
            Self::Eq => Some(Slot::Eq),
            Self::Ne => Some(Slot::Ne),
            Self::Gt => Some(Slot::Gt),
            Self::Ge => Some(Slot::Ge),
            _ => None,
        }
    }
}

/// Evaluates `v op w`, returning whatever the comparison slot produced.
///
/// If `type(w)` is a proper subtype of `type(v)` its swapped slot is tried first.
/// When both sides decline, `==` and `!=` fall back to identity.
pub fn rich_compare(rt: &mut Runtime, ts: &mut ThreadContext, op: Comparison, v: &Value, w: &Value) -> RunResult<Value> {
    let Some(slot) = op.slot() else {
        return compare_bool(rt, ts, op, v, w).map(Value::Bool);
    };
    let swapped = op.swapped().slot().unwrap_or(slot);
    let vt = rt.type_of(v);
    let wt = rt.type_of(w);

    let mut checked_reverse = false;
    if vt != wt && rt.is_subtype(wt, vt) {
        checked_reverse = true;
        if let Some(result) = try_compare(rt, ts, swapped, w, v)? {
            return Ok(result);
        }
    }
    if let Some(result) = try_compare(rt, ts, slot, v, w)? {
        return Ok(result);
    }
    if !checked_reverse && let Some(result) = try_compare(rt, ts, swapped, w, v)? {
        return Ok(result);
    }

    match op {
        Comparison::Eq => Ok(Value::Bool(v.is(w))),
        Comparison::Ne => Ok(Value::Bool(!v.is(w))),
        _ => Err(ExcType::comparison_type_error(
            &op.to_string(),
            rt.type_name(vt),
            rt.type_name(wt),
        )),
    }
}

fn try_compare(rt: &mut Runtime, ts: &mut ThreadContext, slot: Slot, a: &Value, b: &Value) -> RunResult<Option<Value>> {
    Ok(slot::invoke_binary(rt, ts, slot, a, b)?.filter(|result| !result.is_not_implemented()))
}

/// Evaluates `v op w` as a truth value.
pub fn compare_bool(rt: &mut Runtime, ts: &mut ThreadContext, op: Comparison, v: &Value, w: &Value) -> RunResult<bool> {
    match op {
        Comparison::Is => Ok(v.is(w)),
        Comparison::IsNot => Ok(!v.is(w)),
        Comparison::In => contains(rt, ts, w, v),
        Comparison::NotIn => contains(rt, ts, w, v).map(|found| !found),
        _ => {
            let result = rich_compare(rt, ts, op, v, w)?;
            object_protocol::is_true(rt, ts, &result)
        }
    }
}

/// `item in container`, dispatched to the container's contains slot.
pub fn contains(rt: &mut Runtime, ts: &mut ThreadContext, container: &Value, item: &Value) -> RunResult<bool> {
    slot::invoke_contains(rt, ts, container, item)?
        .ok_or_else(|| ExcType::not_a_container(rt.type_name_of(container)))
}
