//! `getset_descriptor`: computed attributes backed by native accessors.

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

pub type GetterFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<Value>;
pub type SetterFn = fn(&mut Runtime, &mut ThreadContext, &Value, &Value) -> RunResult<()>;
pub type DeleterFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<()>;

/// Definition of a computed attribute, registered with [`TypeSpec::getset`].
#[derive(Debug, Clone, Copy)]
pub struct GetSetDef {
    pub name: &'static str,
    pub get: Option<GetterFn>,
    pub set: Option<SetterFn>,
    pub delete: Option<DeleterFn>,
    pub doc: Option<&'static str>,
}

impl GetSetDef {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            get: None,
            set: None,
            delete: None,
            doc: None,
        }
    }

    #[must_use]
    pub const fn getter(mut self, f: GetterFn) -> Self {
        self.get = Some(f);
        self
    }

    #[must_use]
    pub const fn setter(mut self, f: SetterFn) -> Self {
        self.set = Some(f);
        self
    }

    #[must_use]
    pub const fn deleter(mut self, f: DeleterFn) -> Self {
        self.delete = Some(f);
        self
    }

    #[must_use]
    pub const fn doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }
}

/// A [`GetSetDef`] installed in the namespace of `owner`.
#[derive(Debug, Clone, Copy)]
pub struct GetSetDescr {
    pub(crate) owner: TypeId,
    pub(crate) def: GetSetDef,
}

impl GetSetDescr {
    pub(crate) fn new(owner: TypeId, def: GetSetDef) -> Self {
        Self { owner, def }
    }

    #[must_use]
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.def.name
    }
}

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("getset_descriptor", Shape::GetSet)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(getset_repr))
        .slot(Slot::Get, SlotFn::DescrGet(getset_get))
        .slot(Slot::Set, SlotFn::SetItem(getset_set))
        .slot(Slot::Delete, SlotFn::DelItem(getset_delete))
        .getset(descr::NAME)
        .getset(descr::OBJCLASS)
        .getset(descr::DOC)
}

fn descriptor(rt: &Runtime, v: &Value) -> RunResult<GetSetDescr> {
    if let Value::Ref(id) = v
        && let HeapData::GetSet(descr) = rt.heap.get(*id)
    {
        return Ok(*descr);
    }
    Err(ExcType::type_error(format!(
        "expected getset_descriptor, got '{}'",
        rt.type_name_of(v)
    )))
}

fn getset_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let descr = descriptor(rt, v)?;
    Ok(descr::repr(rt, "attribute", descr.def.name, descr.owner))
}

fn getset_get(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    obj: Option<&Value>,
    _owner: Option<TypeId>,
) -> RunResult<Value> {
    let descr = descriptor(rt, v)?;
    let Some(obj) = obj else {
        return Ok(v.clone());
    };
    attr::check_descriptor_applies(rt, descr.owner, descr.def.name, obj)?;
    match descr.def.get {
        Some(get) => get(rt, ts, obj),
        None => Err(ExcType::attribute_is_not(
            descr.def.name,
            rt.type_name(descr.owner),
            "readable",
        )),
    }
}

fn getset_set(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, obj: &Value, value: &Value) -> RunResult<()> {
    let descr = descriptor(rt, v)?;
    attr::check_descriptor_applies(rt, descr.owner, descr.def.name, obj)?;
    match descr.def.set {
        Some(set) => set(rt, ts, obj, value),
        None => Err(ExcType::attribute_is_not(
            descr.def.name,
            rt.type_name(descr.owner),
            "writable",
        )),
    }
}

fn getset_delete(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, obj: &Value) -> RunResult<()> {
    let descr = descriptor(rt, v)?;
    attr::check_descriptor_applies(rt, descr.owner, descr.def.name, obj)?;
    match descr.def.delete {
        Some(delete) => delete(rt, ts, obj),
        None => Err(ExcType::attribute_is_not(
            descr.def.name,
            rt.type_name(descr.owner),
            "delible",
        )),
    }
}
