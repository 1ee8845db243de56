//! `object`, the root of every MRO, and the layout of user-class instances.

use crate::{
    attr,
    exception_private::{ExcType, RunResult},
    hash::hash_int,
    heap::HeapId,
    object_protocol,
    runtime::Runtime,
    slot::{self, Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, GetSetDef, Shape, TypeId, TypeSpec},
    value::Value,
};

/// An instance of a user-defined class.
///
/// Member slots (`__slots__`) live in `members`, other attributes in the lazily
/// created `dict`. An instance of a subclass of a value type (`int`, `str`, ...)
/// keeps the value it wraps in `native`.
#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) type_id: TypeId,
    pub(crate) dict: Option<HeapId>,
    pub(crate) members: Vec<Option<Value>>,
    pub(crate) native: Option<Value>,
}

impl Instance {
    pub(crate) fn new(type_id: TypeId, member_count: usize, native: Option<Value>) -> Self {
        Self {
            type_id,
            dict: None,
            members: vec![None; member_count],
            native,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The attribute dictionary, if one was created.
    #[must_use]
    pub fn dict(&self) -> Option<HeapId> {
        self.dict
    }

    #[must_use]
    pub fn native(&self) -> Option<&Value> {
        self.native.as_ref()
    }
}

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("object", Shape::Object)
        .slot(Slot::Repr, SlotFn::Unary(object_repr))
        .slot(Slot::Hash, SlotFn::Hash(object_hash))
        .slot(Slot::Str, SlotFn::Unary(object_str))
        .slot(Slot::GetAttribute, SlotFn::GetAttr(attr::object_getattribute))
        .slot(Slot::SetAttr, SlotFn::SetAttr(attr::object_setattr))
        .slot(Slot::DelAttr, SlotFn::DelAttr(attr::object_delattr))
        .slot(Slot::Eq, SlotFn::Binary(object_eq))
        .slot(Slot::Ne, SlotFn::Binary(object_ne))
        .slot(Slot::Init, SlotFn::Init(object_init))
        .slot(Slot::New, SlotFn::New(object_new))
        .getset(GetSetDef::new("__class__").getter(object_get_class))
}

/// A number identifying `v` for as long as it lives.
fn identity(v: &Value) -> usize {
    match v {
        Value::Ref(id) => id.index(),
        Value::Type(id) => id.index(),
        _ => 0,
    }
}

fn object_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(Value::from(
        format!("<{} object at {:#x}>", rt.type_name_of(v), identity(v)).as_str(),
    ))
}

fn object_str(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    object_protocol::repr(rt, ts, v).map(Value::Str)
}

fn object_hash(_rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<i64> {
    Ok(hash_int(i64::try_from(identity(v)).unwrap_or(i64::MAX)))
}

fn object_eq(_rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    Ok(if v.is(w) { Value::Bool(true) } else { Value::NotImplemented })
}

/// `!=` is the negation of whatever `__eq__` says, unless it declines.
fn object_ne(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, w: &Value) -> RunResult<Value> {
    match slot::invoke_binary(rt, ts, Slot::Eq, v, w)? {
        None | Some(Value::NotImplemented) => Ok(Value::NotImplemented),
        Some(Value::Bool(b)) => Ok(Value::Bool(!b)),
        Some(other) => Ok(Value::Bool(!object_protocol::is_true(rt, ts, &other)?)),
    }
}

fn has_arguments(args: &[Value], kwargs: Option<&Dict>) -> bool {
    !args.is_empty() || kwargs.is_some_and(|kwargs| !kwargs.is_empty())
}

fn object_init(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    obj: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<()> {
    if !has_arguments(args, kwargs) {
        return Ok(());
    }
    let ty = rt.type_of(obj);
    if rt.slot_provider(ty, Slot::Init) != Some(TypeId::OBJECT) {
        return Err(ExcType::type_error(
            "object.__init__() takes exactly one argument (the instance to initialize)",
        ));
    }
    if rt.slot_provider(ty, Slot::New) == Some(TypeId::OBJECT) {
        return Err(ExcType::type_error(format!("{}() takes no arguments", rt.type_name(ty))));
    }
    Ok(())
}

fn object_new(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    ty: TypeId,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    if has_arguments(args, kwargs) {
        if rt.slot_provider(ty, Slot::New) != Some(TypeId::OBJECT) {
            return Err(ExcType::type_error(
                "object.__new__() takes exactly one argument (the type to instantiate)",
            ));
        }
        if rt.slot_provider(ty, Slot::Init) == Some(TypeId::OBJECT) {
            return Err(ExcType::type_error(format!("{}() takes no arguments", rt.type_name(ty))));
        }
    }
    if rt.type_object(ty).shape() != Shape::Object {
        let name = rt.type_name(ty);
        return Err(ExcType::type_error(format!(
            "object.__new__({name}) is not safe, use {name}.__new__()"
        )));
    }
    rt.new_instance(ty, None)
}

fn object_get_class(rt: &mut Runtime, _ts: &mut ThreadContext, obj: &Value) -> RunResult<Value> {
    Ok(Value::Type(rt.type_of(obj)))
}
