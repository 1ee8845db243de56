//! `type`: the metatype of every class.
//!
//! Calling a type runs its `new` slot and then, when the result is an instance of
//! that type, its `init` slot. `type(name, bases, dict)` builds a user class that
//! inherits the layout of its base and owns a mutable namespace.

use std::rc::Rc;

use crate::{
    attr,
    exception_private::{ExcType, RunError, RunResult},
    runtime::Runtime,
    slot::{self, Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, GetSetDef, MemberDef, MethodDef, MethodStyle, Shape, TypeFlags, TypeId, TypeSpec},
    value::Value,
};

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("type", Shape::Type)
        .slot(Slot::Repr, SlotFn::Unary(type_repr))
        .slot(Slot::Call, SlotFn::Call(type_call))
        .slot(Slot::GetAttribute, SlotFn::GetAttr(attr::type_getattribute))
        .slot(Slot::SetAttr, SlotFn::SetAttr(attr::type_setattr))
        .slot(Slot::DelAttr, SlotFn::DelAttr(attr::type_delattr))
        .slot(Slot::Init, SlotFn::Init(type_init))
        .slot(Slot::New, SlotFn::New(type_new))
        .getset(GetSetDef::new("__name__").getter(type_get_name))
        .getset(GetSetDef::new("__mro__").getter(type_get_mro))
        .getset(GetSetDef::new("__bases__").getter(type_get_bases))
        .getset(GetSetDef::new("__base__").getter(type_get_base))
        .getset(GetSetDef::new("__dict__").getter(type_get_dict))
        .method(MethodDef::new("mro", MethodStyle::NoArgs(type_mro)).doc("Return a type's method resolution order."))
}

fn expect_type(rt: &Runtime, v: &Value) -> RunResult<TypeId> {
    v.as_type()
        .ok_or_else(|| ExcType::type_error(format!("expected type, got '{}'", rt.type_name_of(v))))
}

fn type_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let ty = expect_type(rt, v)?;
    Ok(Value::from(format!("<class '{}'>", rt.type_name(ty)).as_str()))
}

fn no_kwargs(kwargs: Option<&Dict>) -> bool {
    kwargs.is_none_or(Dict::is_empty)
}

fn type_call(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let ty = expect_type(rt, callable)?;
    if ty == TypeId::TYPE {
        if let [obj] = args
            && no_kwargs(kwargs)
        {
            return Ok(Value::Type(rt.type_of(obj)));
        }
        if args.len() != 3 {
            return Err(ExcType::type_error("type() takes 1 or 3 arguments"));
        }
    }

    let Some(obj) = slot::invoke_new(rt, ts, ty, args, kwargs)? else {
        return Err(ExcType::cannot_create_instances(rt.type_name(ty)));
    };
    if !rt.isinstance(&obj, ty) {
        return Ok(obj);
    }
    slot::invoke_init(rt, ts, &obj, args, kwargs)?;
    Ok(obj)
}

fn type_init(
    _rt: &mut Runtime,
    _ts: &mut ThreadContext,
    _obj: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<()> {
    if !no_kwargs(kwargs) && args.len() == 1 {
        return Err(ExcType::type_error("type.__init__() takes no keyword arguments"));
    }
    if args.len() != 1 && args.len() != 3 {
        return Err(ExcType::type_error("type.__init__() takes 1 or 3 arguments"));
    }
    Ok(())
}

fn argument_error(rt: &Runtime, position: usize, expected: &str, got: &Value) -> RunError {
    ExcType::type_error(format!(
        "type.__new__() argument {position} must be {expected}, not {}",
        rt.type_name_of(got)
    ))
}

/// `type.__new__(meta, name, bases, dict)`
fn type_new(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    meta: TypeId,
    args: &[Value],
    _kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let [name, bases, namespace] = args else {
        return Err(ExcType::type_error("type() takes 1 or 3 arguments"));
    };
    let Value::Str(name) = rt.unwrap_native(name).clone() else {
        return Err(argument_error(rt, 1, "str", name));
    };
    let Some(bases) = rt.tuple_items(bases).map(<[Value]>::to_vec) else {
        return Err(argument_error(rt, 2, "tuple", bases));
    };
    let Some(namespace) = rt.as_dict(namespace).cloned() else {
        return Err(argument_error(rt, 3, "dict", namespace));
    };

    let mut base_ids = Vec::with_capacity(bases.len());
    for base in &bases {
        match base {
            Value::Type(id) => base_ids.push(*id),
            _ => return Err(ExcType::type_error("bases must be types")),
        }
    }
    let base = base_ids.first().copied().unwrap_or(TypeId::OBJECT);
    let metatype = winner_metatype(rt, meta, &base_ids)?;

    let mut spec = TypeSpec::new(name, rt.type_object(base).shape())
        .metatype(metatype)
        .flags(TypeFlags::MUTABLE);
    for base in base_ids {
        spec = spec.base(base);
    }

    match namespace.get("__slots__") {
        Some(slots) => {
            let names = slot_names(rt, slots)?;
            let mut wants_dict = false;
            for member in names {
                if &*member == "__dict__" {
                    wants_dict = true;
                    continue;
                }
                if namespace.contains_key(&member) {
                    return Err(ExcType::value_error(format!(
                        "'{member}' in __slots__ conflicts with class variable"
                    )));
                }
                spec = spec.member(MemberDef::new(member));
            }
            spec = spec.instance_dict(wants_dict);
        }
        None => spec = spec.instance_dict(true),
    }
    for (key, value) in namespace {
        spec = spec.attr(key, value);
    }

    rt.create_type(spec).map(Value::Type)
}

/// The most derived of `meta` and the metatypes of `bases`.
fn winner_metatype(rt: &Runtime, meta: TypeId, bases: &[TypeId]) -> RunResult<TypeId> {
    let mut winner = meta;
    for base in bases {
        let candidate = rt.type_object(*base).metatype();
        if rt.is_subtype(winner, candidate) {
            continue;
        }
        if rt.is_subtype(candidate, winner) {
            winner = candidate;
            continue;
        }
        return Err(ExcType::type_error(
            "metaclass conflict: the metaclass of a derived class must be a (non-strict) subclass of the metaclasses of all its bases",
        ));
    }
    Ok(winner)
}

/// `__slots__` is either one name or a tuple of names.
fn slot_names(rt: &Runtime, slots: &Value) -> RunResult<Vec<Rc<str>>> {
    if let Value::Str(single) = rt.unwrap_native(slots) {
        return Ok(vec![single.clone()]);
    }
    let Some(items) = rt.tuple_items(slots) else {
        return Err(ExcType::type_error(format!(
            "__slots__ must be a str or a tuple, not '{}'",
            rt.type_name_of(slots)
        )));
    };
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match rt.unwrap_native(item) {
            Value::Str(name) => {
                if names.contains(name) {
                    return Err(ExcType::type_error("__slots__ items must be unique"));
                }
                names.push(name.clone());
            }
            _ => {
                return Err(ExcType::type_error(format!(
                    "__slots__ items must be strings, not '{}'",
                    rt.type_name_of(item)
                )));
            }
        }
    }
    Ok(names)
}

fn type_get_name(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let ty = expect_type(rt, v)?;
    Ok(Value::from(rt.type_name(ty)))
}

fn types_tuple(rt: &mut Runtime, ids: Vec<TypeId>) -> RunResult<Value> {
    rt.new_tuple(ids.into_iter().map(Value::Type).collect())
}

fn type_get_mro(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let ty = expect_type(rt, v)?;
    let mro = rt.type_object(ty).mro().to_vec();
    types_tuple(rt, mro)
}

fn type_get_bases(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let ty = expect_type(rt, v)?;
    let bases = rt.type_object(ty).bases().to_vec();
    types_tuple(rt, bases)
}

fn type_get_base(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let ty = expect_type(rt, v)?;
    Ok(rt.type_object(ty).base().map_or(Value::None, Value::Type))
}

/// A snapshot of the namespace; writes go through `setattr` on the type.
fn type_get_dict(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let ty = expect_type(rt, v)?;
    let dict = rt.type_object(ty).dict().clone();
    rt.new_dict(dict)
}

fn type_mro(rt: &mut Runtime, ts: &mut ThreadContext, self_: &Value) -> RunResult<Value> {
    type_get_mro(rt, ts, self_)
}
