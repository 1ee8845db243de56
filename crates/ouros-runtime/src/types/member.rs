//! `member_descriptor`: fixed storage positions inside instances.
//!
//! Classes created with `__slots__` get one member per slot name. The value lives
//! in `Instance::members`; an unset member reads as `AttributeError`.

use std::rc::Rc;

use crate::{
    attr,
    exception_private::{ExcType, RunResult},
    heap::HeapData,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Shape, TypeFlags, TypeId, TypeSpec, descr},
    value::Value,
};

/// Definition of an instance member, registered with [`TypeSpec::member`].
#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: Rc<str>,
    pub readonly: bool,
}

impl MemberDef {
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            readonly: false,
        }
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MemberDescr {
    pub(crate) owner: TypeId,
    pub(crate) name: Rc<str>,
    /// Position in `Instance::members`, counting the members of every base.
    pub(crate) index: usize,
    pub(crate) readonly: bool,
}

impl MemberDescr {
    pub(crate) fn new(owner: TypeId, def: MemberDef, index: usize) -> Self {
        Self {
            owner,
            name: def.name,
            index,
            readonly: def.readonly,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("member_descriptor", Shape::Member)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(member_repr))
        .slot(Slot::Get, SlotFn::DescrGet(member_get))
        .slot(Slot::Set, SlotFn::SetItem(member_set))
        .slot(Slot::Delete, SlotFn::DelItem(member_delete))
        .getset(descr::NAME)
        .getset(descr::OBJCLASS)
        .getset(descr::DOC)
}

fn descriptor(rt: &Runtime, v: &Value) -> RunResult<MemberDescr> {
    if let Value::Ref(id) = v
        && let HeapData::Member(descr) = rt.heap.get(*id)
    {
        return Ok(descr.clone());
    }
    Err(ExcType::type_error(format!(
        "expected member_descriptor, got '{}'",
        rt.type_name_of(v)
    )))
}

/// The member storage of `obj`, which has already passed the applicability check.
fn members_mut<'a>(rt: &'a mut Runtime, obj: &Value) -> Option<&'a mut Vec<Option<Value>>> {
    match obj {
        Value::Ref(id) => match rt.heap.get_mut(*id) {
            HeapData::Instance(instance) => Some(&mut instance.members),
            _ => None,
        },
        _ => None,
    }
}

fn member_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let descr = descriptor(rt, v)?;
    Ok(descr::repr(rt, "member", &descr.name, descr.owner))
}

fn member_get(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    v: &Value,
    obj: Option<&Value>,
    _owner: Option<TypeId>,
) -> RunResult<Value> {
    let descr = descriptor(rt, v)?;
    let Some(obj) = obj else {
        return Ok(v.clone());
    };
    attr::check_descriptor_applies(rt, descr.owner, &descr.name, obj)?;
    let value = members_mut(rt, obj).and_then(|members| members.get(descr.index).cloned().flatten());
    value.ok_or_else(|| ExcType::attribute_error(rt.type_name_of(obj), &descr.name))
}

fn store(rt: &mut Runtime, v: &Value, obj: &Value, value: Option<Value>) -> RunResult<()> {
    let descr = descriptor(rt, v)?;
    attr::check_descriptor_applies(rt, descr.owner, &descr.name, obj)?;
    if descr.readonly {
        return Err(ExcType::readonly_attribute());
    }
    let missing = ExcType::attribute_error(rt.type_name_of(obj), &descr.name);
    let deleting = value.is_none();
    match members_mut(rt, obj).and_then(|members| members.get_mut(descr.index)) {
        Some(slot) if !(deleting && slot.is_none()) => {
            *slot = value;
            Ok(())
        }
        _ => Err(missing),
    }
}

fn member_set(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, obj: &Value, value: &Value) -> RunResult<()> {
    store(rt, v, obj, Some(value.clone()))
}

fn member_delete(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, obj: &Value) -> RunResult<()> {
    store(rt, v, obj, None)
}
