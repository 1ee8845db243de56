//! `cell`: the shared storage behind closure variables.

use crate::{
    exception_private::{ExcType, RunResult},
    heap::HeapData,
    object_protocol,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{GetSetDef, Shape, TypeFlags, TypeSpec},
    value::Value,
};

pub(crate) fn spec() -> TypeSpec {
    TypeSpec::new("cell", Shape::Cell)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(cell_repr))
        .getset(
            GetSetDef::new("cell_contents")
                .getter(get_contents)
                .setter(set_contents)
                .deleter(delete_contents),
        )
}

fn contents_mut<'a>(rt: &'a mut Runtime, v: &Value) -> RunResult<&'a mut Option<Value>> {
    if let Value::Ref(id) = v
        && let HeapData::Cell(contents) = rt.heap.get_mut(*id)
    {
        return Ok(contents);
    }
    Err(ExcType::type_error("expected a cell"))
}

fn cell_repr(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let text = match rt.cell_contents(v) {
        None => "<cell: empty>".to_owned(),
        Some(contents) => {
            let kind = rt.type_name_of(&contents).to_owned();
            let repr = object_protocol::repr(rt, ts, &contents)?;
            format!("<cell: {kind} object {repr}>")
        }
    };
    Ok(Value::from(text.as_str()))
}

fn get_contents(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    rt.cell_contents(v).ok_or_else(ExcType::cell_is_empty)
}

fn set_contents(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, value: &Value) -> RunResult<()> {
    *contents_mut(rt, v)? = Some(value.clone());
    Ok(())
}

fn delete_contents(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<()> {
    *contents_mut(rt, v)? = None;
    Ok(())
}
