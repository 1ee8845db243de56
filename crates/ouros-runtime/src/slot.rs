//! The per-type dispatch table.
//!
//! Every type owns a [`SlotTable`] with one [`SlotEntry`] per [`Slot`]. An entry is
//! empty, a native function whose shape is fixed by the slot's [`SlotSignature`], or
//! a `Dunder` marker meaning "look the special method up on the receiver's type and
//! call it". The `invoke_*` helpers in this module are the only way the rest of the
//! crate reads a slot: they return `Ok(None)` for an empty slot so callers can apply
//! their own fallback.

use strum::{EnumCount, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
    call,
    exception_private::{ExcType, RunError, RunResult},
    number,
    object_protocol,
    runtime::Runtime,
    thread_context::ThreadContext,
    types::{Dict, TypeId},
    value::Value,
};

/// Identifies one operation in a type's dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr)]
pub enum Slot {
    Repr,
    Hash,
    Call,
    Str,

    GetAttribute,
    GetAttr,
    SetAttr,
    DelAttr,

    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,

    Iter,

    Get,
    Set,
    Delete,

    Init,
    New,

    Vectorcall,

    Neg,
    Abs,

    RAdd,
    RSub,
    RMul,
    RAnd,
    RXor,
    ROr,

    Add,
    Sub,
    Mul,
    And,
    Xor,
    Or,

    Bool,
    Int,
    Float,
    Index,

    Len,

    Contains,

    GetItem,
    SetItem,
    DelItem,
}

impl Slot {
    /// The fixed call signature every implementation of this slot must have.
    #[must_use]
    pub const fn signature(self) -> SlotSignature {
        match self {
            Self::Repr | Self::Str | Self::Iter | Self::Neg | Self::Abs | Self::Int | Self::Float | Self::Index => {
                SlotSignature::Unary
            }
            Self::Hash => SlotSignature::Hash,
            Self::Call => SlotSignature::Call,
            Self::GetAttribute | Self::GetAttr => SlotSignature::GetAttr,
            Self::SetAttr => SlotSignature::SetAttr,
            Self::DelAttr => SlotSignature::DelAttr,
            Self::Lt
            | Self::Le
            | Self::Eq
            | Self::Ne
            | Self::Ge
            | Self::Gt
            | Self::RAdd
            | Self::RSub
            | Self::RMul
            | Self::RAnd
            | Self::RXor
            | Self::ROr
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::And
            | Self::Xor
            | Self::Or
            | Self::GetItem => SlotSignature::Binary,
            Self::Get => SlotSignature::DescrGet,
            Self::Set | Self::SetItem => SlotSignature::SetItem,
            Self::Delete | Self::DelItem => SlotSignature::DelItem,
            Self::Init => SlotSignature::Init,
            Self::New => SlotSignature::New,
            Self::Vectorcall => SlotSignature::Vectorcall,
            Self::Bool => SlotSignature::Predicate,
            Self::Len => SlotSignature::Len,
            Self::Contains => SlotSignature::BinaryPredicate,
        }
    }

    /// The special method name that exposes this slot, `None` for vectorcall.
    #[must_use]
    pub const fn method_name(self) -> Option<&'static str> {
        Some(match self {
            Self::Repr => "__repr__",
            Self::Hash => "__hash__",
            Self::Call => "__call__",
            Self::Str => "__str__",
            Self::GetAttribute => "__getattribute__",
            Self::GetAttr => "__getattr__",
            Self::SetAttr => "__setattr__",
            Self::DelAttr => "__delattr__",
            Self::Lt => "__lt__",
            Self::Le => "__le__",
            Self::Eq => "__eq__",
            Self::Ne => "__ne__",
            Self::Ge => "__ge__",
            Self::Gt => "__gt__",
            Self::Iter => "__iter__",
            Self::Get => "__get__",
            Self::Set => "__set__",
            Self::Delete => "__delete__",
            Self::Init => "__init__",
            Self::New => "__new__",
            Self::Vectorcall => return None,
            Self::Neg => "__neg__",
            Self::Abs => "__abs__",
            Self::RAdd => "__radd__",
            Self::RSub => "__rsub__",
            Self::RMul => "__rmul__",
            Self::RAnd => "__rand__",
            Self::RXor => "__rxor__",
            Self::ROr => "__ror__",
            Self::Add => "__add__",
            Self::Sub => "__sub__",
            Self::Mul => "__mul__",
            Self::And => "__and__",
            Self::Xor => "__xor__",
            Self::Or => "__or__",
            Self::Bool => "__bool__",
            Self::Int => "__int__",
            Self::Float => "__float__",
            Self::Index => "__index__",
            Self::Len => "__len__",
            Self::Contains => "__contains__",
            Self::GetItem => "__getitem__",
            Self::SetItem => "__setitem__",
            Self::DelItem => "__delitem__",
        })
    }

    /// Finds the slot exposed under a special method name.
    #[must_use]
    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::iter().find(|slot| slot.method_name() == Some(name))
    }

    /// The reflected form of a forward binary operation (`Add` → `RAdd`).
    #[must_use]
    pub const fn reflected(self) -> Option<Self> {
        match self {
            Self::Add => Some(Self::RAdd),
            Self::Sub => Some(Self::RSub),
            Self::Mul => Some(Self::RMul),
            Self::And => Some(Self::RAnd),
            Self::Xor => Some(Self::RXor),
            Self::Or => Some(Self::ROr),
            _ => None,
        }
    }

    /// Operator symbol used in "unsupported operand" messages.
    #[must_use]
    pub const fn op_symbol(self) -> Option<&'static str> {
        match self {
            Self::Add | Self::RAdd => Some("+"),
            Self::Sub | Self::RSub => Some("-"),
            Self::Mul | Self::RMul => Some("*"),
            Self::And | Self::RAnd => Some("&"),
            Self::Xor | Self::RXor => Some("^"),
            Self::Or | Self::ROr => Some("|"),
            _ => None,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

/// The shapes a slot implementation can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum SlotSignature {
    /// `(self) -> object`
    Unary,
    /// `(self, other) -> object`
    Binary,
    /// `(self) -> bool`
    Predicate,
    /// `(self, item) -> bool`
    BinaryPredicate,
    /// `(self) -> usize`
    Len,
    /// `(self) -> i64`
    Hash,
    /// `(self, args, kwargs) -> object`
    Call,
    /// `(self, stack, start, nargs, kwnames) -> object`
    Vectorcall,
    /// `(self, name) -> object`
    GetAttr,
    /// `(self, name, value)`
    SetAttr,
    /// `(self, name)`
    DelAttr,
    /// `(self, instance | None, owner | None) -> object`
    DescrGet,
    /// `(self, key, value)`
    SetItem,
    /// `(self, key)`
    DelItem,
    /// `(self, args, kwargs)`
    Init,
    /// `(type, args, kwargs) -> object`
    New,
}

pub type UnaryFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<Value>;
pub type BinaryFn = fn(&mut Runtime, &mut ThreadContext, &Value, &Value) -> RunResult<Value>;
pub type PredicateFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<bool>;
pub type BinaryPredicateFn = fn(&mut Runtime, &mut ThreadContext, &Value, &Value) -> RunResult<bool>;
pub type LenFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<usize>;
pub type HashFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<i64>;
pub type CallFn = fn(&mut Runtime, &mut ThreadContext, &Value, &[Value], Option<&Dict>) -> RunResult<Value>;
pub type VectorcallFn =
    fn(&mut Runtime, &mut ThreadContext, &Value, &[Value], usize, usize, &[Value]) -> RunResult<Value>;
pub type GetAttrFn = fn(&mut Runtime, &mut ThreadContext, &Value, &str) -> RunResult<Value>;
pub type SetAttrFn = fn(&mut Runtime, &mut ThreadContext, &Value, &str, &Value) -> RunResult<()>;
pub type DelAttrFn = fn(&mut Runtime, &mut ThreadContext, &Value, &str) -> RunResult<()>;
pub type DescrGetFn =
    fn(&mut Runtime, &mut ThreadContext, &Value, Option<&Value>, Option<TypeId>) -> RunResult<Value>;
pub type SetItemFn = fn(&mut Runtime, &mut ThreadContext, &Value, &Value, &Value) -> RunResult<()>;
pub type DelItemFn = fn(&mut Runtime, &mut ThreadContext, &Value, &Value) -> RunResult<()>;
pub type InitFn = fn(&mut Runtime, &mut ThreadContext, &Value, &[Value], Option<&Dict>) -> RunResult<()>;
pub type NewFn = fn(&mut Runtime, &mut ThreadContext, TypeId, &[Value], Option<&Dict>) -> RunResult<Value>;

/// A native slot implementation, tagged with its signature.
#[derive(Debug, Clone, Copy)]
pub enum SlotFn {
    Unary(UnaryFn),
    Binary(BinaryFn),
    Predicate(PredicateFn),
    BinaryPredicate(BinaryPredicateFn),
    Len(LenFn),
    Hash(HashFn),
    Call(CallFn),
    Vectorcall(VectorcallFn),
    GetAttr(GetAttrFn),
    SetAttr(SetAttrFn),
    DelAttr(DelAttrFn),
    DescrGet(DescrGetFn),
    SetItem(SetItemFn),
    DelItem(DelItemFn),
    Init(InitFn),
    New(NewFn),
}

impl SlotFn {
    #[must_use]
    pub const fn signature(&self) -> SlotSignature {
        match self {
            Self::Unary(_) => SlotSignature::Unary,
            Self::Binary(_) => SlotSignature::Binary,
            Self::Predicate(_) => SlotSignature::Predicate,
            Self::BinaryPredicate(_) => SlotSignature::BinaryPredicate,
            Self::Len(_) => SlotSignature::Len,
            Self::Hash(_) => SlotSignature::Hash,
            Self::Call(_) => SlotSignature::Call,
            Self::Vectorcall(_) => SlotSignature::Vectorcall,
            Self::GetAttr(_) => SlotSignature::GetAttr,
            Self::SetAttr(_) => SlotSignature::SetAttr,
            Self::DelAttr(_) => SlotSignature::DelAttr,
            Self::DescrGet(_) => SlotSignature::DescrGet,
            Self::SetItem(_) => SlotSignature::SetItem,
            Self::DelItem(_) => SlotSignature::DelItem,
            Self::Init(_) => SlotSignature::Init,
            Self::New(_) => SlotSignature::New,
        }
    }
}

/// One cell of a dispatch table.
#[derive(Debug, Clone, Copy, Default)]
pub enum SlotEntry {
    /// Not implemented by this type or any base.
    #[default]
    Empty,
    Native(SlotFn),
    /// Implemented by a special method defined in a class namespace.
    Dunder,
}

impl SlotEntry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Fixed-size dispatch table indexed by [`Slot`].
#[derive(Debug, Clone)]
pub struct SlotTable([SlotEntry; Slot::COUNT]);

impl Default for SlotTable {
    fn default() -> Self {
        Self([SlotEntry::Empty; Slot::COUNT])
    }
}

impl SlotTable {
    #[inline]
    #[must_use]
    pub fn get(&self, slot: Slot) -> SlotEntry {
        self.0[slot.index()]
    }

    #[inline]
    pub(crate) fn set(&mut self, slot: Slot, entry: SlotEntry) {
        self.0[slot.index()] = entry;
    }

    #[must_use]
    pub fn is_filled(&self, slot: Slot) -> bool {
        !self.get(slot).is_empty()
    }
}

// ============================================================================
// Slot invocation
// ============================================================================

/// Reads `slot` from `ty`, reporting non-empty entries to the tracer.
fn entry(rt: &mut Runtime, ty: TypeId, slot: Slot) -> SlotEntry {
    let entry = rt.type_object(ty).slots.get(slot);
    if !entry.is_empty() {
        rt.trace_slot(ty, slot);
    }
    entry
}

fn signature_mismatch(rt: &Runtime, ty: TypeId, slot: Slot) -> RunError {
    RunError::internal(format!(
        "slot {slot:?} of type '{}' does not have signature {:?}",
        rt.type_name(ty),
        slot.signature()
    ))
}

/// Calls the special method that backs a `Dunder` entry.
///
/// The method is looked up on the receiver's MRO; a method that has since been
/// deleted behaves like an empty slot. Functions are called with the receiver
/// prepended; anything else is bound through its `get` slot first when it has one.
fn call_special(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    slot: Slot,
    receiver: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Option<Value>> {
    let Some(name) = slot.method_name() else {
        return Ok(None);
    };
    let ty = rt.type_of(receiver);
    let Some(method) = rt.resolve_attribute(ty, name) else {
        return Ok(None);
    };
    let mut stack = Vec::with_capacity(args.len() + 1);
    let target = if rt.is_function(&method) {
        stack.push(receiver.clone());
        method
    } else {
        descr_get(rt, ts, &method, Some(receiver), Some(ty))?.unwrap_or(method)
    };
    stack.extend_from_slice(args);
    let result = match kwargs {
        Some(kwargs) if !kwargs.is_empty() => call::call(rt, ts, &target, &stack, Some(kwargs))?,
        _ => call::vectorcall(rt, ts, &target, &stack, 0, stack.len(), &[])?,
    };
    Ok(Some(result))
}

pub(crate) fn invoke_unary(rt: &mut Runtime, ts: &mut ThreadContext, slot: Slot, v: &Value) -> RunResult<Option<Value>> {
    let ty = rt.type_of(v);
    match entry(rt, ty, slot) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Unary(f)) => f(rt, ts, v).map(Some),
        SlotEntry::Dunder => call_special(rt, ts, slot, v, &[], None),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, slot)),
    }
}

pub(crate) fn invoke_binary(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    slot: Slot,
    v: &Value,
    w: &Value,
) -> RunResult<Option<Value>> {
    let ty = rt.type_of(v);
    match entry(rt, ty, slot) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Binary(f)) => f(rt, ts, v, w).map(Some),
        SlotEntry::Dunder => call_special(rt, ts, slot, v, std::slice::from_ref(w), None),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, slot)),
    }
}

pub(crate) fn invoke_bool(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Option<bool>> {
    let ty = rt.type_of(v);
    match entry(rt, ty, Slot::Bool) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Predicate(f)) => f(rt, ts, v).map(Some),
        SlotEntry::Dunder => match call_special(rt, ts, Slot::Bool, v, &[], None)? {
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => {
                let ty = rt.type_of(&other);
                Err(ExcType::returned_non_type("__bool__", "bool", rt.type_name(ty)))
            }
            None => Ok(None),
        },
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Bool)),
    }
}

/// Calls the contains slot of `container`.
pub(crate) fn invoke_contains(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    container: &Value,
    item: &Value,
) -> RunResult<Option<bool>> {
    let ty = rt.type_of(container);
    match entry(rt, ty, Slot::Contains) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::BinaryPredicate(f)) => f(rt, ts, container, item).map(Some),
        SlotEntry::Dunder => match call_special(rt, ts, Slot::Contains, container, std::slice::from_ref(item), None)? {
            Some(result) => object_protocol::is_true(rt, ts, &result).map(Some),
            None => Ok(None),
        },
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Contains)),
    }
}

pub(crate) fn invoke_len(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Option<usize>> {
    let ty = rt.type_of(v);
    match entry(rt, ty, Slot::Len) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Len(f)) => f(rt, ts, v).map(Some),
        SlotEntry::Dunder => match call_special(rt, ts, Slot::Len, v, &[], None)? {
            Some(result) => {
                let n = number::as_size(rt, ts, &result)?;
                usize::try_from(n)
                    .map(Some)
                    .map_err(|_| ExcType::value_error("__len__() should return >= 0"))
            }
            None => Ok(None),
        },
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Len)),
    }
}

pub(crate) fn invoke_hash(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Option<i64>> {
    let ty = rt.type_of(v);
    match entry(rt, ty, Slot::Hash) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Hash(f)) => f(rt, ts, v).map(Some),
        SlotEntry::Dunder => match call_special(rt, ts, Slot::Hash, v, &[], None)? {
            Some(result) => match number::index(rt, ts, &result) {
                Ok(index) => object_protocol::hash(rt, ts, &index).map(Some),
                Err(err) if err.is_exception_type(ExcType::TypeError) => {
                    Err(ExcType::type_error("__hash__ method should return an integer"))
                }
                Err(err) => Err(err),
            },
            None => Ok(None),
        },
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Hash)),
    }
}

pub(crate) fn invoke_call(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Option<Value>> {
    let ty = rt.type_of(callable);
    match entry(rt, ty, Slot::Call) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Call(f)) => f(rt, ts, callable, args, kwargs).map(Some),
        SlotEntry::Dunder => call_special(rt, ts, Slot::Call, callable, args, kwargs),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Call)),
    }
}

/// Calls the vectorcall slot. It has no special method, so a `Dunder` entry never occurs.
pub(crate) fn invoke_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Option<Value>> {
    let ty = rt.type_of(callable);
    match entry(rt, ty, Slot::Vectorcall) {
        SlotEntry::Empty | SlotEntry::Dunder => Ok(None),
        SlotEntry::Native(SlotFn::Vectorcall(f)) => f(rt, ts, callable, stack, start, nargs, kwnames).map(Some),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Vectorcall)),
    }
}

/// Calls the getattribute or getattr slot.
pub(crate) fn invoke_getattr(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    slot: Slot,
    obj: &Value,
    name: &str,
) -> RunResult<Option<Value>> {
    let ty = rt.type_of(obj);
    match entry(rt, ty, slot) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::GetAttr(f)) => f(rt, ts, obj, name).map(Some),
        SlotEntry::Dunder => call_special(rt, ts, slot, obj, &[Value::from(name)], None),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, slot)),
    }
}

pub(crate) fn invoke_setattr(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    value: &Value,
) -> RunResult<Option<()>> {
    let ty = rt.type_of(obj);
    match entry(rt, ty, Slot::SetAttr) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::SetAttr(f)) => f(rt, ts, obj, name, value).map(Some),
        SlotEntry::Dunder => {
            Ok(call_special(rt, ts, Slot::SetAttr, obj, &[Value::from(name), value.clone()], None)?.map(drop))
        }
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::SetAttr)),
    }
}

pub(crate) fn invoke_delattr(rt: &mut Runtime, ts: &mut ThreadContext, obj: &Value, name: &str) -> RunResult<Option<()>> {
    let ty = rt.type_of(obj);
    match entry(rt, ty, Slot::DelAttr) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::DelAttr(f)) => f(rt, ts, obj, name).map(Some),
        SlotEntry::Dunder => Ok(call_special(rt, ts, Slot::DelAttr, obj, &[Value::from(name)], None)?.map(drop)),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::DelAttr)),
    }
}

/// Invokes a descriptor's `get` slot: `descr.__get__(obj, owner)`.
///
/// `obj` is `None` when the attribute is looked up on the owner type itself.
pub(crate) fn descr_get(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    descr: &Value,
    obj: Option<&Value>,
    owner: Option<TypeId>,
) -> RunResult<Option<Value>> {
    let ty = rt.type_of(descr);
    match entry(rt, ty, Slot::Get) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::DescrGet(f)) => f(rt, ts, descr, obj, owner).map(Some),
        SlotEntry::Dunder => {
            let args = [
                obj.cloned().unwrap_or(Value::None),
                owner.map_or(Value::None, Value::Type),
            ];
            call_special(rt, ts, Slot::Get, descr, &args, None)
        }
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Get)),
    }
}

/// Invokes a descriptor's `set` slot: `descr.__set__(obj, value)`.
pub(crate) fn descr_set(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    descr: &Value,
    obj: &Value,
    value: &Value,
) -> RunResult<Option<()>> {
    invoke_setitem_like(rt, ts, Slot::Set, descr, obj, value)
}

/// Invokes a descriptor's `delete` slot: `descr.__delete__(obj)`.
pub(crate) fn descr_delete(rt: &mut Runtime, ts: &mut ThreadContext, descr: &Value, obj: &Value) -> RunResult<Option<()>> {
    invoke_delitem_like(rt, ts, Slot::Delete, descr, obj)
}

pub(crate) fn invoke_setitem(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    key: &Value,
    value: &Value,
) -> RunResult<Option<()>> {
    invoke_setitem_like(rt, ts, Slot::SetItem, obj, key, value)
}

pub(crate) fn invoke_delitem(rt: &mut Runtime, ts: &mut ThreadContext, obj: &Value, key: &Value) -> RunResult<Option<()>> {
    invoke_delitem_like(rt, ts, Slot::DelItem, obj, key)
}

fn invoke_setitem_like(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    slot: Slot,
    obj: &Value,
    key: &Value,
    value: &Value,
) -> RunResult<Option<()>> {
    let ty = rt.type_of(obj);
    match entry(rt, ty, slot) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::SetItem(f)) => f(rt, ts, obj, key, value).map(Some),
        SlotEntry::Dunder => Ok(call_special(rt, ts, slot, obj, &[key.clone(), value.clone()], None)?.map(drop)),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, slot)),
    }
}

fn invoke_delitem_like(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    slot: Slot,
    obj: &Value,
    key: &Value,
) -> RunResult<Option<()>> {
    let ty = rt.type_of(obj);
    match entry(rt, ty, slot) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::DelItem(f)) => f(rt, ts, obj, key).map(Some),
        SlotEntry::Dunder => Ok(call_special(rt, ts, slot, obj, std::slice::from_ref(key), None)?.map(drop)),
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, slot)),
    }
}

pub(crate) fn invoke_init(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Option<()>> {
    let ty = rt.type_of(obj);
    match entry(rt, ty, Slot::Init) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::Init(f)) => f(rt, ts, obj, args, kwargs).map(Some),
        SlotEntry::Dunder => match call_special(rt, ts, Slot::Init, obj, args, kwargs)? {
            Some(Value::None) => Ok(Some(())),
            Some(other) => {
                let ty = rt.type_of(&other);
                Err(ExcType::type_error(format!(
                    "__init__() should return None, not '{}'",
                    rt.type_name(ty)
                )))
            }
            None => Ok(None),
        },
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::Init)),
    }
}

/// Calls the `new` slot of `ty` itself (not of its metatype).
///
/// A special `__new__` is called unbound with the type as first argument.
pub(crate) fn invoke_new(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Option<Value>> {
    match entry(rt, ty, Slot::New) {
        SlotEntry::Empty => Ok(None),
        SlotEntry::Native(SlotFn::New(f)) => f(rt, ts, ty, args, kwargs).map(Some),
        SlotEntry::Dunder => {
            let Some(method) = rt.resolve_attribute(ty, "__new__") else {
                return Ok(None);
            };
            let mut stack = Vec::with_capacity(args.len() + 1);
            stack.push(Value::Type(ty));
            stack.extend_from_slice(args);
            call::call(rt, ts, &method, &stack, kwargs).map(Some)
        }
        SlotEntry::Native(_) => Err(signature_mismatch(rt, ty, Slot::New)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_but_vectorcall_has_a_method_name() {
        for slot in Slot::iter() {
            match slot {
                Slot::Vectorcall => assert_eq!(slot.method_name(), None),
                _ => {
                    let name = slot.method_name().expect("special method name");
                    assert_eq!(Slot::from_method_name(name), Some(slot));
                }
            }
        }
    }

    #[test]
    fn reflected_slots_share_signature_and_symbol() {
        for slot in [Slot::Add, Slot::Sub, Slot::Mul, Slot::And, Slot::Xor, Slot::Or] {
            let reflected = slot.reflected().expect("binary operator has a reflection");
            assert_eq!(reflected.signature(), slot.signature());
            assert_eq!(reflected.op_symbol(), slot.op_symbol());
        }
        assert_eq!(Slot::Lt.reflected(), None);
    }

    #[test]
    fn descriptor_slots_reuse_item_signatures() {
        assert_eq!(Slot::Set.signature(), SlotSignature::SetItem);
        assert_eq!(Slot::Delete.signature(), SlotSignature::DelItem);
        assert_eq!(Slot::Get.signature(), SlotSignature::DescrGet);
        assert_eq!(Slot::Hash.signature(), SlotSignature::Hash);
    }

    #[test]
    fn table_starts_empty() {
        let table = SlotTable::default();
        assert!(Slot::iter().all(|slot| !table.is_filled(slot)));
    }
}
