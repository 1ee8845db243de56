//! `function` and bound `method` objects.
//!
//! A function pairs a [`Code`] with the environment it was created in: globals,
//! builtins, positional and keyword-only defaults and the closure cells. Calling
//! one binds the arguments into a [`Frame`](crate::frame::Frame) and runs it.
//! Looking a function up through an instance binds it into a [`BoundMethod`].

use std::rc::Rc;

use crate::{
    attr, call,
    exception_private::{ExcType, RunError, RunResult},
    frame::Code,
    heap::{HeapData, HeapId},
    object_protocol,
    runtime::Runtime,
    signature,
    slot::{self, Slot, SlotFn},
    thread_context::ThreadContext,
    types::{GetSetDef, Shape, TypeFlags, TypeId, TypeSpec},
    value::Value,
};

#[derive(Debug, Clone)]
pub struct Function {
    pub(crate) code: Rc<Code>,
    pub(crate) globals: HeapId,
    pub(crate) builtins: HeapId,
    pub(crate) defaults: Rc<[Value]>,
    /// Dict of keyword-only defaults.
    pub(crate) kwdefaults: Option<HeapId>,
    pub(crate) closure: Rc<[HeapId]>,
    pub(crate) name: Rc<str>,
    pub(crate) qualname: Rc<str>,
    pub(crate) dict: Option<HeapId>,
    /// Positional arguments can be copied straight into the locals.
    pub(crate) fast: bool,
    /// A call without arguments takes every parameter from the defaults.
    pub(crate) fast0: bool,
}

impl Function {
    #[must_use]
    pub fn code(&self) -> &Rc<Code> {
        &self.code
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    #[must_use]
    pub fn defaults(&self) -> &[Value] {
        &self.defaults
    }

    #[must_use]
    pub fn closure(&self) -> &[HeapId] {
        &self.closure
    }

    #[must_use]
    pub fn is_fast(&self) -> bool {
        self.fast
    }

    #[must_use]
    pub fn is_fast0(&self) -> bool {
        self.fast0
    }

    fn update_fast_flags(&mut self) {
        let shape = self.code.shape();
        self.fast = shape.is_simple();
        self.fast0 = self.fast && shape.argcount() > 0 && self.defaults.len() == shape.argcount();
    }
}

/// A callable bound to the object it was looked up on.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub(crate) func: Value,
    pub(crate) self_: Value,
}

impl BoundMethod {
    #[must_use]
    pub fn func(&self) -> &Value {
        &self.func
    }

    #[must_use]
    pub fn self_value(&self) -> &Value {
        &self.self_
    }
}

impl Runtime {
    /// True for `function` objects.
    #[must_use]
    pub fn is_function(&self, value: &Value) -> bool {
        matches!(value, Value::Ref(id) if matches!(self.heap.get(*id), HeapData::Function(_)))
    }

    /// A snapshot of the function behind `value`.
    pub fn function(&self, value: &Value) -> RunResult<Function> {
        if let Value::Ref(id) = value
            && let HeapData::Function(function) = self.heap.get(*id)
        {
            return Ok(function.clone());
        }
        Err(RunError::internal(format!(
            "expected a function, got '{}'",
            self.type_name_of(value)
        )))
    }

    fn function_mut(&mut self, value: &Value) -> RunResult<&mut Function> {
        if let Value::Ref(id) = value
            && let HeapData::Function(function) = self.heap.get_mut(*id)
        {
            return Ok(function);
        }
        Err(RunError::internal("expected a function"))
    }

    /// Creates a function running `code` in `globals`.
    ///
    /// `closure` holds one cell per free variable of the code. Builtins come from
    /// `globals["__builtins__"]` when that is a dict, else from the runtime's
    /// minimal builtins.
    pub fn new_function(&mut self, code: impl Into<Rc<Code>>, globals: HeapId, closure: &[Value]) -> RunResult<Value> {
        let code = code.into();
        let name = Rc::clone(code.name());
        let nfree = code.shape().freevars().len();
        if nfree == 0 && !closure.is_empty() {
            return Err(ExcType::closure_must_be_empty(&name));
        }
        if closure.len() != nfree {
            return Err(ExcType::closure_length(&name, nfree, closure.len()));
        }
        let mut cells = Vec::with_capacity(closure.len());
        for cell in closure {
            match cell {
                Value::Ref(id) if matches!(self.heap.get(*id), HeapData::Cell(_)) => cells.push(*id),
                other => return Err(ExcType::closure_expected_cell(self.type_name_of(other))),
            }
        }

        let builtins = self
            .heap
            .dict(globals)
            .and_then(|globals| globals.get("__builtins__"))
            .and_then(Value::ref_id)
            .filter(|id| self.heap.dict(*id).is_some())
            .unwrap_or(self.builtins());

        let mut function = Function {
            code,
            globals,
            builtins,
            defaults: Rc::from([]),
            kwdefaults: None,
            closure: cells.into(),
            name: Rc::clone(&name),
            qualname: name,
            dict: None,
            fast: false,
            fast0: false,
        };
        function.update_fast_flags();
        Ok(Value::Ref(self.allocate(HeapData::Function(function))?))
    }

    /// Replaces the positional defaults, which apply to the last parameters.
    pub fn set_function_defaults(&mut self, function: &Value, defaults: Vec<Value>) -> RunResult<()> {
        let func = self.function_mut(function)?;
        let argcount = func.code.shape().argcount();
        if defaults.len() > argcount {
            return Err(ExcType::value_error(format!(
                "{}() has {argcount} positional parameters but {} defaults",
                func.qualname,
                defaults.len()
            )));
        }
        func.defaults = defaults.into();
        func.update_fast_flags();
        Ok(())
    }

    /// Replaces the keyword-only defaults; `None` removes them.
    pub fn set_function_kwdefaults(&mut self, function: &Value, kwdefaults: Option<HeapId>) -> RunResult<()> {
        if let Some(id) = kwdefaults
            && self.heap.dict(id).is_none()
        {
            return Err(ExcType::type_error("__kwdefaults__ must be set to a dict object"));
        }
        self.function_mut(function)?.kwdefaults = kwdefaults;
        Ok(())
    }

    /// Sets the qualified name used in repr and error messages.
    pub fn set_function_qualname(&mut self, function: &Value, qualname: impl Into<Rc<str>>) -> RunResult<()> {
        self.function_mut(function)?.qualname = qualname.into();
        Ok(())
    }
}

// ============================================================================
// function
// ============================================================================

pub(crate) fn function_spec() -> TypeSpec {
    TypeSpec::new("function", Shape::Function)
        .without_flags(TypeFlags::BASETYPE)
        .instance_dict(true)
        .slot(Slot::Repr, SlotFn::Unary(function_repr))
        .slot(Slot::Call, SlotFn::Call(call::call_via_vectorcall))
        .slot(Slot::Vectorcall, SlotFn::Vectorcall(function_vectorcall))
        .slot(Slot::Get, SlotFn::DescrGet(function_get))
        .getset(
            GetSetDef::new("__defaults__")
                .getter(get_defaults)
                .setter(set_defaults)
                .deleter(delete_defaults),
        )
        .getset(
            GetSetDef::new("__kwdefaults__")
                .getter(get_kwdefaults)
                .setter(set_kwdefaults)
                .deleter(delete_kwdefaults),
        )
        .getset(GetSetDef::new("__closure__").getter(get_closure))
        .getset(GetSetDef::new("__name__").getter(get_name).setter(set_name))
        .getset(GetSetDef::new("__qualname__").getter(get_qualname).setter(set_qualname))
        .getset(GetSetDef::new("__globals__").getter(get_globals))
        .getset(GetSetDef::new("__dict__").getter(get_dict))
}

fn function_repr(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let func = rt.function(v)?;
    Ok(Value::from(format!("<function {}>", func.qualname).as_str()))
}

/// Binds the arguments and runs the code, with the frame recorded on the thread.
fn function_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    let func = rt.function(v)?;
    let mut frame = signature::bind(rt, &func, stack, start, nargs, kwnames)?;
    ts.push_frame(Rc::clone(&func.qualname));
    let depth = ts.frame_depth();
    rt.tracer_mut().on_call(&func.qualname, depth);
    let result = frame.run(rt, ts);
    ts.pop_frame();
    rt.tracer_mut().on_return(depth);
    result
}

fn function_get(
    rt: &mut Runtime,
    _ts: &mut ThreadContext,
    v: &Value,
    obj: Option<&Value>,
    _owner: Option<TypeId>,
) -> RunResult<Value> {
    match obj {
        None => Ok(v.clone()),
        Some(obj) => {
            let method = BoundMethod {
                func: v.clone(),
                self_: obj.clone(),
            };
            Ok(Value::Ref(rt.allocate(HeapData::Method(method))?))
        }
    }
}

fn get_defaults(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let func = rt.function(v)?;
    if func.defaults.is_empty() {
        return Ok(Value::None);
    }
    rt.new_tuple(func.defaults.to_vec())
}

fn set_defaults(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, value: &Value) -> RunResult<()> {
    let defaults = match value {
        Value::None => Vec::new(),
        other => match rt.tuple_items(other) {
            Some(items) => items.to_vec(),
            None => {
                return Err(ExcType::attribute_must_be_set_to(
                    "__defaults__",
                    "a tuple object",
                    rt.type_name_of(other),
                ));
            }
        },
    };
    rt.set_function_defaults(v, defaults)
}

fn delete_defaults(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<()> {
    rt.set_function_defaults(v, Vec::new())
}

fn get_kwdefaults(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(rt.function(v)?.kwdefaults.map_or(Value::None, Value::Ref))
}

fn set_kwdefaults(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, value: &Value) -> RunResult<()> {
    let kwdefaults = match value {
        Value::None => None,
        Value::Ref(id) if rt.heap.dict(*id).is_some() => Some(*id),
        other => {
            return Err(ExcType::attribute_must_be_set_to(
                "__kwdefaults__",
                "a dict object",
                rt.type_name_of(other),
            ));
        }
    };
    rt.set_function_kwdefaults(v, kwdefaults)
}

fn delete_kwdefaults(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<()> {
    rt.set_function_kwdefaults(v, None)
}

fn get_closure(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let func = rt.function(v)?;
    if func.closure.is_empty() {
        return Ok(Value::None);
    }
    rt.new_tuple(func.closure.iter().copied().map(Value::Ref).collect())
}

fn get_name(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(Value::Str(rt.function(v)?.name))
}

fn string_value(rt: &Runtime, attr: &str, value: &Value) -> RunResult<Rc<str>> {
    match rt.unwrap_native(value) {
        Value::Str(s) => Ok(Rc::clone(s)),
        _ => Err(ExcType::attribute_must_be_set_to(attr, "a string object", rt.type_name_of(value))),
    }
}

fn set_name(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, value: &Value) -> RunResult<()> {
    let name = string_value(rt, "__name__", value)?;
    rt.function_mut(v)?.name = name;
    Ok(())
}

fn get_qualname(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(Value::Str(rt.function(v)?.qualname))
}

fn set_qualname(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value, value: &Value) -> RunResult<()> {
    let qualname = string_value(rt, "__qualname__", value)?;
    rt.set_function_qualname(v, qualname)
}

fn get_globals(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    Ok(Value::Ref(rt.function(v)?.globals))
}

fn get_dict(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    rt.instance_dict(v, true)?
        .map(Value::Ref)
        .ok_or_else(|| ExcType::attribute_error(rt.type_name_of(v), "__dict__"))
}

// ============================================================================
// method
// ============================================================================

pub(crate) fn method_spec() -> TypeSpec {
    TypeSpec::new("method", Shape::Method)
        .without_flags(TypeFlags::BASETYPE)
        .slot(Slot::Repr, SlotFn::Unary(method_repr))
        .slot(Slot::Call, SlotFn::Call(call::call_via_vectorcall))
        .slot(Slot::Vectorcall, SlotFn::Vectorcall(method_vectorcall))
        .slot(Slot::GetAttribute, SlotFn::GetAttr(method_getattribute))
        .getset(GetSetDef::new("__func__").getter(method_func))
        .getset(GetSetDef::new("__self__").getter(method_self))
}

fn bound_method(rt: &Runtime, v: &Value) -> RunResult<BoundMethod> {
    if let Value::Ref(id) = v
        && let HeapData::Method(method) = rt.heap.get(*id)
    {
        return Ok(method.clone());
    }
    Err(RunError::internal(format!("expected a method, got '{}'", rt.type_name_of(v))))
}

fn method_repr(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    let method = bound_method(rt, v)?;
    let name = match attr::lookup_attribute(rt, ts, &method.func, "__qualname__")? {
        Some(Value::Str(name)) => name,
        _ => "?".into(),
    };
    let receiver = object_protocol::repr(rt, ts, &method.self_)?;
    Ok(Value::from(format!("<bound method {name} of {receiver}>").as_str()))
}

/// Calls the function with the receiver prepended to the positional arguments.
fn method_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    v: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    let method = bound_method(rt, v)?;
    let mut args = Vec::with_capacity(stack.len() - start + 1);
    args.push(method.self_);
    args.extend_from_slice(&stack[start..]);
    if let Some(result) = slot::invoke_vectorcall(rt, ts, &method.func, &args, 0, nargs + 1, kwnames)? {
        return Ok(result);
    }
    let kwargs = call::stack_as_dict(&args, nargs + 1, kwnames)?;
    call::call(rt, ts, &method.func, &args[..=nargs], kwargs.as_ref())
}

/// Attributes of the method itself, then those of the underlying function.
fn method_getattribute(rt: &mut Runtime, ts: &mut ThreadContext, v: &Value, name: &str) -> RunResult<Value> {
    match attr::object_getattribute(rt, ts, v, name) {
        Err(err) if err.is_exception_type(ExcType::AttributeError) => {
            let method = bound_method(rt, v)?;
            attr::get_attribute(rt, ts, &method.func, name)
        }
        other => other,
    }
}

fn method_func(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    bound_method(rt, v).map(|method| method.func)
}

fn method_self(rt: &mut Runtime, _ts: &mut ThreadContext, v: &Value) -> RunResult<Value> {
    bound_method(rt, v).map(|method| method.self_)
}
