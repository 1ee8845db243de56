//! Native slots seen as special methods.
//!
//! Every native slot of a type is published in its namespace under the slot's
//! special name as a `wrapper_descriptor`, so `int.__add__` or `x.__repr__()`
//! reach the same function the dispatcher calls. Binding one to an instance
//! yields a `method-wrapper`. `__new__` is the exception: it is a static method,
//! published as a built-in function bound to the type ([`TP_NEW_WRAPPER`]).

use crate::{
    args::ArgValues,
    attr,
    call,
    exception_private::{ExcType, RunError, RunResult},
    heap::HeapData,
    runtime::Runtime,
    slot::{Slot, SlotEntry, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, GetSetDef, MethodDef, MethodStyle, Shape, TypeFlags, TypeId, TypeSpec, descr},
    value::Value,
};

/// A native slot of `owner`, exposed under the slot's special method name.
#[derive(Debug, Clone, Copy)]
pub struct WrapperDescr {
    pub(crate) owner: TypeId,
    pub(crate) slot: Slot,
}

impl WrapperDescr {
    pub(crate) fn new(owner: TypeId, slot: Slot) -> Self {
        Self { owner, slot }
    }

    #[must_use]
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.slot.method_name().unwrap_or("<vectorcall>")
    }
}

/// A [`WrapperDescr`] bound to a receiver.
#[derive(Debug, Clone)]
pub struct MethodWrapper {
    pub(crate) descr: WrapperDescr,
    pub(crate) self_: Value,
}

pub(crate) const TP_NEW_WRAPPER: MethodDef =
    MethodDef::new("__new__", MethodStyle::Keywords(tp_new_wrapper)).doc("Create and return a new object.");

/// `T.__new__(S, *args, **kwargs)`: runs the native `new` of `T` for the subtype `S`.
fn tp_new_wrapper(rt: &mut Runtime, ts: &mut ThreadContext, self_: &Value, args: ArgValues<'_>) -> RunResult<Value> {
    let Value::Type(owner) = *self_ else {
        return Err(RunError::internal("__new__ wrapper is not bound to a type"));
    };
    let owner_name = rt.type_name(owner).to_owned();
    let Some((first, rest)) = args.positional().split_first() else {
        return Err(ExcType::type_error(format!("{owner_name}.__new__(): not enough arguments")));
    };
    let Value::Type(subtype) = *first else {
        return Err(ExcType::type_error(format!(
            "{owner_name}.__new__(X): X is not a type object ({})",
            rt.type_name_of(first)
        )));
    };
    if !rt.is_subtype(subtype, owner) {
        let sub_name = rt.type_name(subtype);
        return Err(ExcType::type_error(format!(
            "{owner_name}.__new__({sub_name}): {sub_name} is not a subtype of {owner_name}"
        )));
    }
    match rt.type_object(owner).native_slots.get(Slot::New) {
        SlotEntry::Native(SlotFn::New(f)) => f(rt, ts, subtype, rest, args.kwargs()),
        _ => Err(ExcType::cannot_create_instances(&owner_name)),
    }
}

// ============================================================================
// Argument conversion
// ============================================================================

fn expect_args(args: &[Value], expected: usize) -> RunResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExcType::wrapper_arg_count(expected, args.len()))
    }
}

fn attr_name<'a>(rt: &'a Runtime, name: &'a Value) -> RunResult<&'a str> {
    match rt.unwrap_native(name) {
        Value::Str(s) => Ok(s),
        _ => Err(ExcType::type_error(format!(
            "attribute name must be string, not '{}'",
            rt.type_name_of(name)
        ))),
    }
}

/// Calls the native slot behind `descr` with arguments given as a special-method call.
fn call_slot(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    descr: WrapperDescr,
    self_: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let SlotEntry::Native(f) = rt.type_object(descr.owner).native_slots.get(descr.slot) else {
        return Err(RunError::internal(format!(
            "slot wrapper '{}' of '{}' has no native implementation",
            descr.name(),
            rt.type_name(descr.owner)
        )));
    };
    let takes_keywords = matches!(f, SlotFn::Call(_) | SlotFn::Init(_) | SlotFn::New(_));
    if !takes_keywords && kwargs.is_some_and(|kwargs| !kwargs.is_empty()) {
        return Err(ExcType::type_error_no_kwargs(&format!("wrapper {}", descr.name())));
    }
    match f {
        SlotFn::Unary(f) => {
            expect_args(args, 0)?;
            f(rt, ts, self_)
        }
        SlotFn::Binary(f) => {
            expect_args(args, 1)?;
            f(rt, ts, self_, &args[0])
        }
        SlotFn::Predicate(f) => {
            expect_args(args, 0)?;
            f(rt, ts, self_).map(Value::Bool)
        }
        SlotFn::BinaryPredicate(f) => {
            expect_args(args, 1)?;
            f(rt, ts, self_, &args[0]).map(Value::Bool)
        }
        SlotFn::Len(f) => {
            expect_args(args, 0)?;
            let len = f(rt, ts, self_)?;
            i64::try_from(len)
                .map(Value::Int)
                .map_err(|_| ExcType::overflow_error("length does not fit in an int"))
        }
        SlotFn::Hash(f) => {
            expect_args(args, 0)?;
            f(rt, ts, self_).map(Value::Int)
        }
        SlotFn::Call(f) => f(rt, ts, self_, args, kwargs),
        SlotFn::Vectorcall(f) => f(rt, ts, self_, args, 0, args.len(), &[]),
        SlotFn::GetAttr(f) => {
            expect_args(args, 1)?;
            let name = attr_name(rt, &args[0])?.to_owned();
            f(rt, ts, self_, &name)
        }
        SlotFn::SetAttr(f) => {
            expect_args(args, 2)?;
            let name = attr_name(rt, &args[0])?.to_owned();
            f(rt, ts, self_, &name, &args[1]).map(|()| Value::None)
        }
        SlotFn::DelAttr(f) => {
            expect_args(args, 1)?;
            let name = attr_name(rt, &args[0])?.to_owned();
            f(rt, ts, self_, &name).map(|()| Value::None)
        }
        SlotFn::DescrGet(f) => {
            let (obj, owner) = match args {
                [obj] => (obj, None),
                [obj, owner] => (obj, owner.as_type()),
                _ => return Err(ExcType::wrapper_arg_count(2, args.len())),
            };
            if obj.is_none() && owner.is_none() {
                return Err(ExcType::type_error("__get__(None, None) is invalid"));
            }
            let obj = if obj.is_none() { None } else { Some(obj) };
            f(rt, ts, self_, obj, owner)
        }
        SlotFn::SetItem(f) => {
            expect_args(args, 2)?;
            f(rt, ts, self_, &args[0], &args[1]).map(|()| Value::None)
        }
        SlotFn::DelItem(f) => {
            expect_args(args, 1)?;
            f(rt, ts, self_, &args[0]).map(|()| Value::None)
        }
        SlotFn::Init(f) => f(rt, ts, self_, args, kwargs).map(|()| Value::None),
        SlotFn::New(f) => match self_ {
            Value::Type(ty) => f(rt, ts, *ty, args, kwargs),
            other => Err(ExcType::type_error(format!(
                "__new__(X): X is not a type object ({})",
                rt.type_name_of(other)
            ))),
        },
    }
}

// ============================================================================
// wrapper_descriptor
// ============================================================================

pub(crate) fn descriptor_spec() -> TypeSpec {
    TypeSpec::new("wrapper_descriptor", Shape::WrapperDescr)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(wrapper_repr))
        .slot(Slot::Get, SlotFn::DescrGet(wrapper_get))
        .slot(Slot::Call, SlotFn::Call(call::call_via_vectorcall))
        .slot(Slot::Vectorcall, SlotFn::Vectorcall(wrapper_vectorcall))
        .getset(descr::NAME)
        .getset(descr::OBJCLASS)
        .getset(descr::DOC)
}

fn wrapper_descr(rt: &Runtime, v: &Value) -> RunResult<WrapperDescr> {
    if let Value::Ref(id) = v
        && let HeapData::WrapperDescr(descr) = rt.heap.get(*id)
    {
        return Ok(*descr);
    }
    Err(ExcType::type_error(format!(
        "expected wrapper_descriptor, got '{}'",
        rt.type_name_of(v)
    )))
}

fn wrapper_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let descr = wrapper_descr(rt, v)?;
    Ok(descr::repr(rt, "slot wrapper", descr.name(), descr.owner))
}

fn wrapper_get(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    v: &Value,
    obj: Option<&Value>,
    _owner: Option<TypeId>,
) -> RunResult<Value> {
    let descr = wrapper_descr(rt, v)?;
    let Some(obj) = obj else {
        return Ok(v.clone());
    };
    attr::check_descriptor_applies(rt, descr.owner, descr.name(), obj)?;
    let bound = rt.allocate(HeapData::MethodWrapper(MethodWrapper {
        descr,
        self_: obj.clone(),
    }))?;
    Ok(Value::Ref(bound))
}

fn wrapper_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    let descr = wrapper_descr(rt, v)?;
    if nargs == 0 {
        return Err(ExcType::descriptor_needs_argument(descr.name(), rt.type_name(descr.owner)));
    }
    let self_ = &stack[start];
    if !rt.isinstance(self_, descr.owner) {
        return Err(ExcType::descriptor_requires(
            descr.name(),
            rt.type_name(descr.owner),
            rt.type_name_of(self_),
        ));
    }
    let kwargs = call::stack_as_dict(stack, start + nargs, kwnames)?;
    call_slot(rt, ts, descr, self_, &stack[start + 1..start + nargs], kwargs.as_ref())
}

// ============================================================================
// method-wrapper
// ============================================================================

pub(crate) fn method_wrapper_spec() -> TypeSpec {
    TypeSpec::new("method-wrapper", Shape::MethodWrapper)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(method_wrapper_repr))
        .slot(Slot::Call, SlotFn::Call(call::call_via_vectorcall))
        .slot(Slot::Vectorcall, SlotFn::Vectorcall(method_wrapper_vectorcall))
        .getset(GetSetDef::new("__name__").getter(method_wrapper_name))
        .getset(GetSetDef::new("__self__").getter(method_wrapper_self))
}

fn method_wrapper(rt: &Runtime, v: &Value) -> RunResult<MethodWrapper> {
    if let Value::Ref(id) = v
        && let HeapData::MethodWrapper(wrapper) = rt.heap.get(*id)
    {
        return Ok(wrapper.clone());
    }
    Err(ExcType::type_error(format!(
        "expected method-wrapper, got '{}'",
        rt.type_name_of(v)
    )))
}

fn method_wrapper_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let wrapper = method_wrapper(rt, v)?;
    Ok(Value::from(
        format!(
            "<method-wrapper '{}' of {} object>",
            wrapper.descr.name(),
            rt.type_name_of(&wrapper.self_)
        )
        .as_str(),
    ))
}

fn method_wrapper_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    let wrapper = method_wrapper(rt, v)?;
    let kwargs = call::stack_as_dict(stack, start + nargs, kwnames)?;
    call_slot(
        rt,
        ts,
        wrapper.descr,
        &wrapper.self_,
        &stack[start..start + nargs],
        kwargs.as_ref(),
    )
}

fn method_wrapper_name(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    method_wrapper(rt, v).map(|wrapper| Value::from(wrapper.descr.name()))
}

fn method_wrapper_self(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    method_wrapper(rt, v).map(|wrapper| wrapper.self_)
}
