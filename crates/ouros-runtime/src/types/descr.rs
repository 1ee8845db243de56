//! Pieces shared by the native descriptor types.

use std::rc::Rc;

use crate::{
    exception_private::{ExcType, RunResult},
    heap::HeapData,
    runtime::Runtime,
    thread_context::ThreadContext,
    types::{GetSetDef, TypeId},
    value::Value,
};

/// `__name__` of a native descriptor.
pub(crate) const NAME: GetSetDef = GetSetDef::new("__name__").getter(descr_name);
/// `__objclass__`: the type that declared the descriptor.
pub(crate) const OBJCLASS: GetSetDef = GetSetDef::new("__objclass__").getter(descr_objclass);
pub(crate) const DOC: GetSetDef = GetSetDef::new("__doc__").getter(descr_doc);

/// `<kind 'name' of 'owner' objects>`
pub(crate) fn repr(rt: &Runtime, kind: &str, name: &str, owner: TypeId) -> Value {
    Value::from(format!("<{kind} '{name}' of '{}' objects>", rt.type_name(owner)).as_str())
}

/// Name, declaring type and docstring of any native descriptor.
fn parts(rt: &Runtime, v: &Value) -> Option<(Rc<str>, TypeId, Option<&'static str>)> {
    let Value::Ref(id) = v else {
        return None;
    };
    match rt.heap.get(*id) {
        HeapData::GetSet(d) => Some((d.def.name.into(), d.owner, d.def.doc)),
        HeapData::Member(d) => Some((d.name.clone(), d.owner, None)),
        HeapData::MethodDescr(d) => Some((d.def.name.into(), d.owner, d.def.doc)),
        HeapData::WrapperDescr(d) => Some((d.name().into(), d.owner, None)),
        _ => None,
    }
}

fn parts_or_error(rt: &Runtime, v: &Value) -> RunResult<(Rc<str>, TypeId, Option<&'static str>)> {
    parts(rt, v).ok_or_else(|| ExcType::type_error(format!("'{}' object is not a descriptor", rt.type_name_of(v))))
}

fn descr_name(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    parts_or_error(rt, v).map(|(name, _, _)| Value::Str(name))
}

fn descr_objclass(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    parts_or_error(rt, v).map(|(_, owner, _)| Value::Type(owner))
}

fn descr_doc(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    parts_or_error(rt, v).map(|(_, _, doc)| doc.map_or(Value::None, Value::from))
}
