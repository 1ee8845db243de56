//! Construction of the built-in types.
//!
//! `object` and `type` refer to each other (the type of `object` is `type`, the
//! base of `type` is `object`), so every built-in header is allocated before any
//! namespace is filled.

use std::rc::Rc;

use crate::{
    exception_private::{RunError, RunResult},
    runtime::Runtime,
    types::{
        self, TypeId, TypeSpec, base_object, cell, dict, float, function, getset, int, member, method_descr, property,
        singletons, tuple, type_type, wrapper,
    },
    value::Value,
};

/// Specs of the built-in types, in [`TypeId`] order.
fn builtin_specs() -> [(TypeId, TypeSpec); 20] {
    [
        (TypeId::OBJECT, base_object::spec()),
        (TypeId::TYPE, type_type::spec()),
        (TypeId::NONE_TYPE, singletons::none_spec()),
        (TypeId::NOT_IMPLEMENTED_TYPE, singletons::not_implemented_spec()),
        (TypeId::INT, int::int_spec()),
        (TypeId::BOOL, int::bool_spec()),
        (TypeId::FLOAT, float::spec()),
        (TypeId::STR, types::str::spec()),
        (TypeId::TUPLE, tuple::spec()),
        (TypeId::DICT, dict::spec()),
        (TypeId::FUNCTION, function::function_spec()),
        (TypeId::METHOD, function::method_spec()),
        (TypeId::CELL, cell::spec()),
        (TypeId::GETSET_DESCRIPTOR, getset::spec()),
        (TypeId::MEMBER_DESCRIPTOR, member::spec()),
        (TypeId::METHOD_DESCRIPTOR, method_descr::descriptor_spec()),
        (TypeId::WRAPPER_DESCRIPTOR, wrapper::descriptor_spec()),
        (TypeId::METHOD_WRAPPER, wrapper::method_wrapper_spec()),
        (TypeId::BUILTIN_FUNCTION, method_descr::builtin_spec()),
        (TypeId::PROPERTY, property::spec()),
    ]
}

/// Allocates and fills every built-in type.
pub(crate) fn bootstrap(rt: &mut Runtime) -> RunResult<()> {
    let specs = builtin_specs();
    for (expected, spec) in &specs {
        let id = rt.allocate_type_header(spec)?;
        if id != *expected {
            return Err(RunError::internal(format!(
                "built-in type `{}` allocated as {id:?}, expected {expected:?}",
                rt.type_name(id)
            )));
        }
    }
    for (id, spec) in specs {
        rt.fill_type(id, spec)?;
    }
    Ok(())
}

/// Names visible in the builtins namespace of every frame.
const PUBLIC_TYPES: [TypeId; 9] = [
    TypeId::OBJECT,
    TypeId::TYPE,
    TypeId::INT,
    TypeId::BOOL,
    TypeId::FLOAT,
    TypeId::STR,
    TypeId::TUPLE,
    TypeId::DICT,
    TypeId::PROPERTY,
];

pub(crate) fn populate_builtins(rt: &mut Runtime) {
    let mut entries: Vec<(Rc<str>, Value)> = PUBLIC_TYPES
        .iter()
        .map(|&id| (rt.type_name(id).into(), Value::Type(id)))
        .collect();
    entries.push(("None".into(), Value::None));
    entries.push(("True".into(), Value::Bool(true)));
    entries.push(("False".into(), Value::Bool(false)));
    entries.push(("NotImplemented".into(), Value::NotImplemented));

    let builtins = rt.builtins();
    if let Some(dict) = rt.heap.dict_mut(builtins) {
        dict.extend(entries);
    }
}
