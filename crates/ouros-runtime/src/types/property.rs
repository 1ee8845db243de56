//! `property`: a data descriptor calling Python-level accessor functions.

use crate::{
    args::ArgValues,
    call,
    exception_private::{ExcType, RunResult},
    heap::HeapData,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, GetSetDef, MethodDef, MethodStyle, Shape, TypeId, TypeSpec},
    value::Value,
};

/// Accessors of a property; `None` entries are absent, not `None`-valued.
#[derive(Debug, Clone, Default)]
pub struct Property {
    pub fget: Option<Value>,
    pub fset: Option<Value>,
    pub fdel: Option<Value>,
    pub doc: Option<Value>,
}

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("property", Shape::Property)
        .slot(Slot::Get, SlotFn::DescrGet(property_get))
        .slot(Slot::Set, SlotFn::SetItem(property_set))
        .slot(Slot::Delete, SlotFn::DelItem(property_delete))
        .slot(Slot::Init, SlotFn::Init(property_init))
        .slot(Slot::New, SlotFn::New(property_new))
        .method(MethodDef::new("getter", MethodStyle::O(property_getter)).doc("Descriptor to obtain a copy of the property with a different getter."))
        .method(MethodDef::new("setter", MethodStyle::O(property_setter)).doc("Descriptor to obtain a copy of the property with a different setter."))
        .method(MethodDef::new("deleter", MethodStyle::O(property_deleter)).doc("Descriptor to obtain a copy of the property with a different deleter."))
        .getset(GetSetDef::new("fget").getter(get_fget))
        .getset(GetSetDef::new("fset").getter(get_fset))
        .getset(GetSetDef::new("fdel").getter(get_fdel))
        .getset(GetSetDef::new("__doc__").getter(get_doc))
}

fn property_of(rt: &Runtime, v: &Value) -> RunResult<Property> {
    if let Value::Ref(id) = rt.unwrap_native(v)
        && let HeapData::Property(property) = rt.heap.get(*id)
    {
        return Ok(property.clone());
    }
    Err(ExcType::type_error(format!("expected property, got '{}'", rt.type_name_of(v))))
}

fn property_mut<'a>(rt: &'a mut Runtime, v: &Value) -> RunResult<&'a mut Property> {
    let id = match rt.unwrap_native(v) {
        Value::Ref(id) => *id,
        _ => return Err(ExcType::type_error("expected property")),
    };
    match rt.heap.get_mut(id) {
        HeapData::Property(property) => Ok(property),
        _ => Err(ExcType::type_error("expected property")),
    }
}

/// Treats an explicit `None` accessor like a missing one.
fn accessor(value: Option<&Value>) -> Option<Value> {
    value.filter(|value| !value.is_none()).cloned()
}

fn property_get(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    obj: Option<&Value>,
    _owner: Option<TypeId>,
) -> RunResult<Value> {
    let Some(obj) = obj else {
        return Ok(v.clone());
    };
    match property_of(rt, v)?.fget {
        Some(fget) => call::call_function(rt, ts, &fget, std::slice::from_ref(obj)),
        None => Err(ExcType::property_accessor_missing("unreadable attribute")),
    }
}

fn property_set(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, obj: &Value, value: &Value) -> RunResult<()> {
    match property_of(rt, v)?.fset {
        Some(fset) => call::call_function(rt, ts, &fset, &[obj.clone(), value.clone()]).map(drop),
        None => Err(ExcType::property_accessor_missing("can't set attribute")),
    }
}

fn property_delete(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, obj: &Value) -> RunResult<()> {
    match property_of(rt, v)?.fdel {
        Some(fdel) => call::call_function(rt, ts, &fdel, std::slice::from_ref(obj)).map(drop),
        None => Err(ExcType::property_accessor_missing("can't delete attribute")),
    }
}

/// `property(fget=None, fset=None, fdel=None, doc=None)`
fn property_init(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    obj: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<()> {
    const NAMES: [&str; 4] = ["fget", "fset", "fdel", "doc"];
    let values = ArgValues::new(args, kwargs);
    if args.len() > NAMES.len() {
        return Err(ExcType::type_error_at_most("property", NAMES.len(), args.len()));
    }
    if let Some(kwargs) = values.kwargs() {
        for key in kwargs.keys() {
            let position = NAMES.iter().position(|name| **name == **key);
            match position {
                None => return Err(ExcType::type_error_unexpected_keyword("property", key)),
                Some(position) if position < args.len() => {
                    return Err(ExcType::type_error_multiple_values("property", key));
                }
                Some(_) => {}
            }
        }
    }
    let mut slots: [Option<Value>; 4] = Default::default();
    for (position, name) in NAMES.iter().enumerate() {
        slots[position] = accessor(args.get(position).or_else(|| values.keyword(name)));
    }
    let [fget, fset, fdel, doc] = slots;
    *property_mut(rt, obj)? = Property { fget, fset, fdel, doc };
    Ok(())
}

fn property_new(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    ty: TypeId,
    _args: &[Value],
    _kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let property = Value::Ref(rt.allocate(HeapData::Property(Property::default()))?);
    if ty == TypeId::PROPERTY {
        Ok(property)
    } else {
        rt.new_instance(ty, Some(property))
    }
}

/// A copy of `self_` with one accessor replaced, allocated as an exact `property`.
fn with_accessor(
    rt: &mut Runtime,
    self_: &Value,
    func: &Value,
    replace: fn(&mut Property, Option<Value>),
) -> RunResult<Value> {
    let mut copy = property_of(rt, self_)?;
    replace(&mut copy, accessor(Some(func)));
    Ok(Value::Ref(rt.allocate(HeapData::Property(copy))?))
}

fn property_getter(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value, func: &Value) -> RunResult<Value> {
    with_accessor(rt, self_, func, |property, f| property.fget = f)
}

fn property_setter(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value, func: &Value) -> RunResult<Value> {
    with_accessor(rt, self_, func, |property, f| property.fset = f)
}

fn property_deleter(rt: &mut Runtime, _ts: &mut ThreadContext, self_: &Value, func: &Value) -> RunResult<Value> {
    with_accessor(rt, self_, func, |property, f| property.fdel = f)
}

fn get_fget(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(property_of(rt, v)?.fget.unwrap_or(Value::None))
}

fn get_fset(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(property_of(rt, v)?.fset.unwrap_or(Value::None))
}

fn get_fdel(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(property_of(rt, v)?.fdel.unwrap_or(Value::None))
}

fn get_doc(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(property_of(rt, v)?.doc.unwrap_or(Value::None))
}
