//! Native methods: `method_descriptor` and `builtin_function_or_method`.
//!
//! A [`MethodDef`] lives in a type's namespace as a [`MethodDescr`]. Looking it up
//! on an instance binds it into a [`BuiltinFunction`] carrying the receiver; calling
//! the descriptor directly takes the receiver as the first positional argument.

use crate::{
    args::ArgValues,
    attr,
    call,
    exception_private::{ExcType, RunResult},
    heap::HeapData,
    runtime::Runtime,
    slot::{Slot, SlotFn},
    thread_context::ThreadContext,
    types::{Dict, GetSetDef, Shape, TypeFlags, TypeId, TypeSpec, descr},
    value::Value,
};

pub type NoArgsFn = fn(&mut Runtime, &mut ThreadContext, &Value) -> RunResult<Value>;
pub type OneArgFn = fn(&mut Runtime, &mut ThreadContext, &Value, &Value) -> RunResult<Value>;
pub type FixedArgsFn = fn(&mut Runtime, &mut ThreadContext, &Value, &[Value]) -> RunResult<Value>;
pub type VarArgsFn = fn(&mut Runtime, &mut ThreadContext, &Value, ArgValues<'_>) -> RunResult<Value>;

/// How a native method receives its arguments.
///
/// Every style gets the receiver first. The style decides which argument counts
/// are accepted before the function runs and how a mismatch is reported.
#[derive(Debug, Clone, Copy)]
pub enum MethodStyle {
    /// No arguments besides the receiver.
    NoArgs(NoArgsFn),
    /// Exactly one positional argument.
    O(OneArgFn),
    /// Exactly `n` positional arguments.
    Fixed(usize, FixedArgsFn),
    /// Any number of positional arguments, no keywords.
    VarArgs(VarArgsFn),
    /// Positional and keyword arguments.
    Keywords(VarArgsFn),
}

/// Definition of a native method, registered with [`TypeSpec::method`].
#[derive(Debug, Clone, Copy)]
pub struct MethodDef {
    pub name: &'static str,
    pub style: MethodStyle,
    pub doc: Option<&'static str>,
}

impl MethodDef {
    #[must_use]
    pub const fn new(name: &'static str, style: MethodStyle) -> Self {
        Self { name, style, doc: None }
    }

    #[must_use]
    pub const fn doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }

    /// Checks the arguments against the calling style and runs the method.
    pub fn call(
        &self,
        rt: &mut Runtime,
        ts: &mut ThreadContext,
        self_: &Value,
        args: &[Value],
        kwargs: Option<&Dict>,
    ) -> RunResult<Value> {
        let values = ArgValues::new(args, kwargs);
        match self.style {
            MethodStyle::NoArgs(f) => {
                values.check_zero_args(self.name)?;
                f(rt, ts, self_)
            }
            MethodStyle::O(f) => {
                let arg = values.get_one_arg(self.name)?;
                f(rt, ts, self_, &arg)
            }
            MethodStyle::Fixed(n, f) => {
                values.check_no_kwargs(self.name)?;
                if args.len() != n {
                    return Err(ExcType::type_error_arg_count(self.name, n, args.len()));
                }
                f(rt, ts, self_, args)
            }
            MethodStyle::VarArgs(f) => {
                values.check_no_kwargs(self.name)?;
                f(rt, ts, self_, values)
            }
            MethodStyle::Keywords(f) => f(rt, ts, self_, values),
        }
    }
}

/// A [`MethodDef`] installed in the namespace of `owner`.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescr {
    pub(crate) owner: TypeId,
    pub(crate) def: MethodDef,
}

impl MethodDescr {
    pub(crate) fn new(owner: TypeId, def: MethodDef) -> Self {
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

/// A native method bound to its receiver, or a free native function.
#[derive(Debug, Clone)]
pub struct BuiltinFunction {
    pub(crate) def: MethodDef,
    /// The receiver; `None` for a free function.
    pub(crate) self_: Value,
}

impl BuiltinFunction {
    pub(crate) fn new(def: MethodDef, self_: Value) -> Self {
        Self { def, self_ }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.def.name
    }
}

impl Runtime {
    /// Wraps a native function so it can be stored and called like any object.
    pub fn new_builtin_function(&mut self, def: MethodDef) -> RunResult<Value> {
        let id = self.allocate(HeapData::BuiltinFunction(BuiltinFunction::new(def, Value::None)))?;
        Ok(Value::Ref(id))
    }
}

// ============================================================================
// method_descriptor
// ============================================================================

pub(crate) fn descriptor_spec() -> TypeSpec {
    TypeSpec::new("method_descriptor", Shape::MethodDescr)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(method_descr_repr))
        .slot(Slot::Get, SlotFn::DescrGet(method_descr_get))
        .slot(Slot::Call, SlotFn::Call(call::call_via_vectorcall))
        .slot(Slot::Vectorcall, SlotFn::Vectorcall(method_descr_vectorcall))
        .getset(descr::NAME)
        .getset(descr::OBJCLASS)
        .getset(descr::DOC)
}

fn method_descr(rt: &Runtime, v: &Value) -> RunResult<MethodDescr> {
    if let Value::Ref(id) = v
        && let HeapData::MethodDescr(descr) = rt.heap.get(*id)
    {
        return Ok(*descr);
    }
    Err(ExcType::type_error(format!(
        "expected method_descriptor, got '{}'",
        rt.type_name_of(v)
    )))
}

fn method_descr_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let descr = method_descr(rt, v)?;
    Ok(descr::repr(rt, "method", descr.def.name, descr.owner))
}

fn method_descr_get(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    v: &Value,
    obj: Option<&Value>,
    _owner: Option<TypeId>,
) -> RunResult<Value> {
    let descr = method_descr(rt, v)?;
    let Some(obj) = obj else {
        return Ok(v.clone());
    };
    attr::check_descriptor_applies(rt, descr.owner, descr.def.name, obj)?;
    let bound = rt.allocate(HeapData::BuiltinFunction(BuiltinFunction::new(descr.def, obj.clone())))?;
    Ok(Value::Ref(bound))
}

/// `type.method(self, *args)`: the receiver is the first positional argument.
fn method_descr_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    let descr = method_descr(rt, v)?;
    if nargs == 0 {
        return Err(ExcType::descriptor_needs_argument(descr.def.name, rt.type_name(descr.owner)));
    }
    let self_ = &stack[start];
    if !rt.isinstance(self_, descr.owner) {
        return Err(ExcType::descriptor_requires(
            descr.def.name,
            rt.type_name(descr.owner),
            rt.type_name_of(self_),
        ));
    }
    let kwargs = call::stack_as_dict(stack, start + nargs, kwnames)?;
    descr.def.call(rt, ts, self_, &stack[start + 1..start + nargs], kwargs.as_ref())
}

// ============================================================================
// builtin_function_or_method
// ============================================================================

pub(crate) fn builtin_spec() -> TypeSpec {
    TypeSpec::new("builtin_function_or_method", Shape::BuiltinFunction)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(builtin_repr))
        .slot(Slot::Call, SlotFn::Call(call::call_via_vectorcall))
        .slot(Slot::Vectorcall, SlotFn::Vectorcall(builtin_vectorcall))
        .getset(GetSetDef::new("__name__").getter(builtin_name))
        .getset(GetSetDef::new("__self__").getter(builtin_self))
        .getset(GetSetDef::new("__doc__").getter(builtin_doc))
}

fn builtin(rt: &Runtime, v: &Value) -> RunResult<BuiltinFunction> {
    if let Value::Ref(id) = v
        && let HeapData::BuiltinFunction(function) = rt.heap.get(*id)
    {
        return Ok(function.clone());
    }
    Err(ExcType::type_error(format!(
        "expected builtin_function_or_method, got '{}'",
        rt.type_name_of(v)
    )))
}

fn builtin_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let function = builtin(rt, v)?;
    let text = match &function.self_ {
        Value::None => format!("<built-in function {}>", function.def.name),
        Value::Type(id) => format!("<built-in method {} of type object '{}'>", function.def.name, rt.type_name(*id)),
        receiver => format!(
            "<built-in method {} of {} object>",
            function.def.name,
            rt.type_name_of(receiver)
        ),
    };
    Ok(Value::from(text.as_str()))
}

fn builtin_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    let function = builtin(rt, v)?;
    let kwargs = call::stack_as_dict(stack, start + nargs, kwnames)?;
    function
        .def
        .call(rt, ts, &function.self_, &stack[start..start + nargs], kwargs.as_ref())
}

fn builtin_name(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    builtin(rt, v).map(|function| Value::from(function.def.name))
}

fn builtin_self(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    builtin(rt, v).map(|function| function.self_)
}

fn builtin_doc(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    builtin(rt, v).map(|function| function.def.doc.map_or(Value::None, Value::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(_rt: &mut Runtime, _ts: &mut ThreadContext, _self: &Value, args: &[Value]) -> RunResult<Value> {
        Ok(args[0].clone())
    }

    fn nothing(_rt: &mut Runtime, _ts: &mut ThreadContext, _self: &Value) -> RunResult<Value> {
        Ok(Value::None)
    }

    #[test]
    fn styles_check_argument_counts() {
        let mut rt = Runtime::new().unwrap();
        let mut ts = rt.new_thread_context();

        let fixed = MethodDef::new("pair", MethodStyle::Fixed(2, echo));
        let err = fixed.call(&mut rt, &mut ts, &Value::None, &[Value::Int(1)], None).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: pair() takes exactly 2 arguments (1 given)");

        let no_args = MethodDef::new("clear", MethodStyle::NoArgs(nothing));
        let err = no_args.call(&mut rt, &mut ts, &Value::None, &[Value::Int(1)], None).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: clear() takes no arguments (1 given)");
        assert_eq!(no_args.call(&mut rt, &mut ts, &Value::None, &[], None).unwrap(), Value::None);
    }
}
