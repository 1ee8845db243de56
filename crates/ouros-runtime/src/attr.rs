//! The descriptor protocol: attribute retrieval, assignment and deletion.
//!
//! Generic instance lookup gives precedence, in order, to a data descriptor on the
//! type, the instance dictionary, a non-data descriptor on the type and finally a
//! plain value on the type. Type objects follow the same scheme with the metatype
//! in the role of the type and the type's own MRO in the role of the instance
//! dictionary.

use crate::{
    exception_private::{ExcType, RunError, RunResult, SimpleException},
    runtime::Runtime,
    slot::{self, Slot},
    thread_context::ThreadContext,
    types::{TypeFlags, TypeId, is_dunder_name},
    value::Value,
};

/// How an attribute found on a type takes part in lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Plain,
    /// Defines `__get__` only.
    NonData,
    /// Defines `__set__` or `__delete__`.
    Data,
}

#[must_use]
pub fn descriptor_kind(rt: &Runtime, attr: &Value) -> DescriptorKind {
    let flags = rt.type_object(rt.type_of(attr)).flags();
    if flags.contains(TypeFlags::IS_DATA_DESCR) {
        DescriptorKind::Data
    } else if flags.contains(TypeFlags::IS_DESCR) {
        DescriptorKind::NonData
    } else {
        DescriptorKind::Plain
    }
}

/// Returns `obj.name`.
///
/// Calls the getattribute slot and, when it raises `AttributeError`, the getattr
/// slot if the type has one.
pub fn get_attribute(rt: &mut Runtime, ts: &mut ThreadContext, obj: &Value, name: &str) -> RunResult<Value> {
    let err = match slot::invoke_getattr(rt, ts, Slot::GetAttribute, obj, name) {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => ExcType::attribute_error(rt.type_name_of(obj), name),
        Err(err) if err.is_exception_type(ExcType::AttributeError) => err,
        Err(err) => return Err(err),
    };
    match slot::invoke_getattr(rt, ts, Slot::GetAttr, obj, name)? {
        Some(value) => Ok(value),
        None => Err(err),
    }
}

/// Like [`get_attribute`], but a missing attribute is `None` rather than an error.
pub fn lookup_attribute(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
) -> RunResult<Option<Value>> {
    match get_attribute(rt, ts, obj, name) {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_exception_type(ExcType::AttributeError) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Performs `obj.name = value`.
pub fn set_attribute(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    value: &Value,
) -> RunResult<()> {
    match slot::invoke_setattr(rt, ts, obj, name, value)? {
        Some(()) => Ok(()),
        None => Err(no_setattr(rt, obj, name, false)),
    }
}

/// Performs `del obj.name`.
pub fn delete_attribute(rt: &mut Runtime, ts: &mut ThreadContext, obj: &Value, name: &str) -> RunResult<()> {
    match slot::invoke_delattr(rt, ts, obj, name)? {
        Some(()) => Ok(()),
        None => Err(no_setattr(rt, obj, name, true)),
    }
}

fn no_setattr(rt: &Runtime, obj: &Value, name: &str, delete: bool) -> RunError {
    let ty = rt.type_of(obj);
    let slots = rt.type_object(ty).slots();
    let readable = slots.is_filled(Slot::GetAttribute) || slots.is_filled(Slot::GetAttr);
    ExcType::no_setattr_slot(rt.type_name(ty), readable, delete, name)
}

/// Rejects `obj` unless it is an instance of the descriptor's declaring type.
pub fn check_descriptor_applies(rt: &Runtime, owner: TypeId, descr_name: &str, obj: &Value) -> RunResult<()> {
    if rt.isinstance(obj, owner) {
        Ok(())
    } else {
        Err(ExcType::descriptor_doesnt_apply(
            descr_name,
            rt.type_name(owner),
            rt.type_name_of(obj),
        ))
    }
}

// ============================================================================
// Generic instance attributes (object.__getattribute__ and friends)
// ============================================================================

/// `object.__getattribute__`.
pub(crate) fn object_getattribute(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
) -> RunResult<Value> {
    let ty = rt.type_of(obj);
    let attr = rt.resolve_attribute(ty, name);
    let kind = attr.as_ref().map(|attr| descriptor_kind(rt, attr));

    let mut data_missed = false;
    if let Some(attr) = &attr
        && kind == Some(DescriptorKind::Data)
    {
        match slot::descr_get(rt, ts, attr, Some(obj), Some(ty)) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            // a data descriptor reporting a missing value defers to the instance dict
            Err(err) if err.is_exception_type(ExcType::AttributeError) => data_missed = true,
            Err(err) => return Err(err),
        }
    }

    if let Some(value) = rt.instance_dict_get(obj, name) {
        return Ok(value);
    }
    if data_missed {
        return Err(ExcType::attribute_error(rt.type_name(ty), name));
    }

    match attr {
        Some(attr) => {
            if kind == Some(DescriptorKind::NonData)
                && let Some(value) = slot::descr_get(rt, ts, &attr, Some(obj), Some(ty))?
            {
                return Ok(value);
            }
            Ok(attr)
        }
        None => Err(ExcType::attribute_error(rt.type_name(ty), name)),
    }
}

/// `object.__setattr__`.
pub(crate) fn object_setattr(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    value: &Value,
) -> RunResult<()> {
    generic_setattr(rt, ts, obj, name, Some(value))
}

/// `object.__delattr__`.
pub(crate) fn object_delattr(rt: &mut Runtime, ts: &mut ThreadContext, obj: &Value, name: &str) -> RunResult<()> {
    generic_setattr(rt, ts, obj, name, None)
}

fn generic_setattr(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    value: Option<&Value>,
) -> RunResult<()> {
    let ty = rt.type_of(obj);
    let attr = rt.resolve_attribute(ty, name);
    if let Some(attr) = &attr
        && descriptor_kind(rt, attr) == DescriptorKind::Data
    {
        return descriptor_store(rt, ts, attr, obj, value);
    }

    let Some(dict) = rt.instance_dict(obj, value.is_some())? else {
        return Err(if attr.is_some() && !rt.supports_instance_dict(obj) {
            ExcType::readonly_attribute_error(rt.type_name(ty), name)
        } else {
            ExcType::attribute_error(rt.type_name(ty), name)
        });
    };
    let Some(entries) = rt.heap.dict_mut(dict) else {
        return Err(RunError::internal("instance dictionary is not a dict"));
    };
    match value {
        Some(value) => {
            entries.insert(name.into(), value.clone());
        }
        None => {
            if entries.shift_remove(name).is_none() {
                return Err(ExcType::attribute_error(rt.type_name(ty), name));
            }
        }
    }
    Ok(())
}

/// Assigns or deletes through a data descriptor. The outcome is final either way.
fn descriptor_store(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    descr: &Value,
    obj: &Value,
    value: Option<&Value>,
) -> RunResult<()> {
    let (done, method) = match value {
        Some(value) => (slot::descr_set(rt, ts, descr, obj, value)?, "__set__"),
        None => (slot::descr_delete(rt, ts, descr, obj)?, "__delete__"),
    };
    done.ok_or_else(|| SimpleException::new_msg(ExcType::AttributeError, method).into())
}

// ============================================================================
// Type attributes (type.__getattribute__ and friends)
// ============================================================================

fn expect_type(obj: &Value) -> RunResult<TypeId> {
    obj.as_type()
        .ok_or_else(|| RunError::internal("type attribute slot called on a non-type"))
}

/// `type.__getattribute__`.
pub(crate) fn type_getattribute(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
) -> RunResult<Value> {
    let ty = expect_type(obj)?;
    let meta = rt.type_of(obj);
    let meta_attr = rt.resolve_attribute(meta, name);
    let meta_kind = meta_attr.as_ref().map(|attr| descriptor_kind(rt, attr));

    if let Some(meta_attr) = &meta_attr
        && meta_kind == Some(DescriptorKind::Data)
        && let Some(value) = slot::descr_get(rt, ts, meta_attr, Some(obj), Some(meta))?
    {
        return Ok(value);
    }

    if let Some(attr) = rt.resolve_attribute(ty, name) {
        // descriptors in the type's own MRO are bound with no instance
        return Ok(slot::descr_get(rt, ts, &attr, None, Some(ty))?.unwrap_or(attr));
    }

    match meta_attr {
        Some(meta_attr) => {
            if meta_kind == Some(DescriptorKind::NonData)
                && let Some(value) = slot::descr_get(rt, ts, &meta_attr, Some(obj), Some(meta))?
            {
                return Ok(value);
            }
            Ok(meta_attr)
        }
        None => Err(ExcType::type_attribute_error(rt.type_name(ty), name)),
    }
}

/// `type.__setattr__`.
pub(crate) fn type_setattr(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    value: &Value,
) -> RunResult<()> {
    type_store(rt, ts, obj, name, Some(value))
}

/// `type.__delattr__`.
pub(crate) fn type_delattr(rt: &mut Runtime, ts: &mut ThreadContext, obj: &Value, name: &str) -> RunResult<()> {
    type_store(rt, ts, obj, name, None)
}

fn type_store(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    value: Option<&Value>,
) -> RunResult<()> {
    let ty = expect_type(obj)?;
    if !rt.type_object(ty).is_mutable() {
        return Err(ExcType::immutable_type_setattr(name, rt.type_name(ty)));
    }
    let meta = rt.type_of(obj);
    if let Some(meta_attr) = rt.resolve_attribute(meta, name)
        && descriptor_kind(rt, &meta_attr) == DescriptorKind::Data
    {
        return descriptor_store(rt, ts, &meta_attr, obj, value);
    }

    let dict = &mut rt.types[ty.index()].dict;
    match value {
        Some(value) => {
            dict.insert(name.into(), value.clone());
        }
        None => {
            if dict.shift_remove(name).is_none() {
                return Err(ExcType::type_attribute_error(rt.type_name(ty), name));
            }
        }
    }
    if is_dunder_name(name) {
        rt.update_after_setattr(ty, name);
    }
    Ok(())
}
