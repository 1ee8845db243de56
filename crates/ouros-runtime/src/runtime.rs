use std::{any::Any, rc::Rc};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    exception_private::RunResult,
    heap::{Heap, HeapData, HeapId, HeapStats},
    resource::ResourceLimits,
    slot::Slot,
    thread_context::ThreadContext,
    tracer::{NoopTracer, RuntimeTracer},
    types::{Dict, Instance, TypeId, TypeObject, bootstrap},
    value::Value,
};

/// The object runtime: type arena, heap, tracer and configuration.
///
/// A runtime is shared by every [`ThreadContext`] created from it. All operations
/// take the runtime and the calling thread's context explicitly.
///
/// # Example
///
/// ```
/// use ouros_runtime::{BinaryOp, Runtime, Value, number::apply_binary_op};
///
/// let mut rt = Runtime::new().unwrap();
/// let mut ts = rt.new_thread_context();
/// let sum = apply_binary_op(&mut rt, &mut ts, BinaryOp::Add, &Value::Int(3), &Value::Float(4.0)).unwrap();
/// assert_eq!(sum, Value::Float(7.0));
/// ```
#[derive(Debug)]
pub struct Runtime {
    pub(crate) types: Vec<TypeObject>,
    pub(crate) heap: Heap,
    tracer: Box<dyn RuntimeTracer>,
    limits: ResourceLimits,
    empty_tuple: HeapId,
    builtins: HeapId,
}

impl Runtime {
    /// Creates a runtime with default limits and no tracing.
    pub fn new() -> RunResult<Self> {
        Self::with_limits_and_tracer(ResourceLimits::new(), Box::new(NoopTracer))
    }

    pub fn with_limits(limits: ResourceLimits) -> RunResult<Self> {
        Self::with_limits_and_tracer(limits, Box::new(NoopTracer))
    }

    pub fn with_tracer(tracer: Box<dyn RuntimeTracer>) -> RunResult<Self> {
        Self::with_limits_and_tracer(ResourceLimits::new(), tracer)
    }

    /// Creates a runtime and bootstraps every built-in type.
    pub fn with_limits_and_tracer(limits: ResourceLimits, tracer: Box<dyn RuntimeTracer>) -> RunResult<Self> {
        let mut heap = Heap::new();
        let empty_tuple = heap.allocate(HeapData::Tuple(Vec::new()))?;
        let builtins = heap.allocate(HeapData::Dict(Dict::default()))?;
        let mut rt = Self {
            types: Vec::new(),
            heap,
            tracer,
            limits,
            empty_tuple,
            builtins,
        };
        bootstrap::bootstrap(&mut rt)?;
        bootstrap::populate_builtins(&mut rt);
        rt.heap.limit_allocations(rt.limits.max_allocations);
        Ok(rt)
    }

    /// Creates the per-thread state for a thread that will use this runtime.
    #[must_use]
    pub fn new_thread_context(&self) -> ThreadContext {
        ThreadContext::new(&self.limits)
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    // --- tracing ---

    #[must_use]
    pub fn tracer(&self) -> &dyn RuntimeTracer {
        self.tracer.as_ref()
    }

    pub(crate) fn tracer_mut(&mut self) -> &mut dyn RuntimeTracer {
        self.tracer.as_mut()
    }

    /// Recovers the concrete tracer, e.g. to read a profiling report.
    #[must_use]
    pub fn tracer_as<T: RuntimeTracer>(&self) -> Option<&T> {
        let tracer: &dyn Any = self.tracer.as_ref();
        tracer.downcast_ref()
    }

    pub fn tracer_as_mut<T: RuntimeTracer>(&mut self) -> Option<&mut T> {
        let tracer: &mut dyn Any = self.tracer.as_mut();
        tracer.downcast_mut()
    }

    #[inline]
    pub(crate) fn trace_slot(&mut self, ty: TypeId, slot: Slot) {
        self.tracer.on_slot_dispatch(&self.types[ty.index()].name, slot);
    }

    // --- heap ---

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    pub(crate) fn allocate(&mut self, data: HeapData) -> RunResult<HeapId> {
        Ok(self.heap.allocate(data)?)
    }

    // --- types ---

    #[must_use]
    pub fn type_object(&self, id: TypeId) -> &TypeObject {
        &self.types[id.index()]
    }

    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn type_name(&self, id: TypeId) -> &str {
        &self.types[id.index()].name
    }

    /// Returns the type of `value`.
    #[must_use]
    pub fn type_of(&self, value: &Value) -> TypeId {
        match value {
            Value::None => TypeId::NONE_TYPE,
            Value::NotImplemented => TypeId::NOT_IMPLEMENTED_TYPE,
            Value::Bool(_) => TypeId::BOOL,
            Value::Int(_) => TypeId::INT,
            Value::Float(_) => TypeId::FLOAT,
            Value::Str(_) => TypeId::STR,
            Value::Type(id) => self.types[id.index()].metatype,
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::LongInt(_) => TypeId::INT,
                HeapData::Tuple(_) => TypeId::TUPLE,
                HeapData::Dict(_) => TypeId::DICT,
                HeapData::Instance(instance) => instance.type_id,
                HeapData::Function(_) => TypeId::FUNCTION,
                HeapData::Method(_) => TypeId::METHOD,
                HeapData::Cell(_) => TypeId::CELL,
                HeapData::GetSet(_) => TypeId::GETSET_DESCRIPTOR,
                HeapData::Member(_) => TypeId::MEMBER_DESCRIPTOR,
                HeapData::MethodDescr(_) => TypeId::METHOD_DESCRIPTOR,
                HeapData::WrapperDescr(_) => TypeId::WRAPPER_DESCRIPTOR,
                HeapData::MethodWrapper(_) => TypeId::METHOD_WRAPPER,
                HeapData::BuiltinFunction(_) => TypeId::BUILTIN_FUNCTION,
                HeapData::Property(_) => TypeId::PROPERTY,
            },
        }
    }

    /// Name of the type of `value`.
    #[must_use]
    pub fn type_name_of(&self, value: &Value) -> &str {
        self.type_name(self.type_of(value))
    }

    /// Sub-type test: `sup` appears in the MRO of `sub`.
    #[must_use]
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        sub == sup || self.types[sub.index()].mro.contains(&sup)
    }

    #[must_use]
    pub fn isinstance(&self, value: &Value, ty: TypeId) -> bool {
        self.is_subtype(self.type_of(value), ty)
    }

    /// Looks `name` up along the MRO of `ty`, returning the first namespace entry found.
    ///
    /// Absence is `None`, never an exception, so callers apply their own fallback.
    #[must_use]
    pub fn resolve_attribute(&self, ty: TypeId, name: &str) -> Option<Value> {
        self.types[ty.index()]
            .mro
            .iter()
            .find_map(|id| self.types[id.index()].dict.get(name))
            .cloned()
    }

    // --- values ---

    #[must_use]
    pub fn empty_tuple(&self) -> Value {
        Value::Ref(self.empty_tuple)
    }

    /// The minimal builtins mapping used by frames whose globals have no `__builtins__`.
    #[must_use]
    pub fn builtins(&self) -> HeapId {
        self.builtins
    }

    pub fn new_tuple(&mut self, items: Vec<Value>) -> RunResult<Value> {
        if items.is_empty() {
            return Ok(self.empty_tuple());
        }
        Ok(Value::Ref(self.allocate(HeapData::Tuple(items))?))
    }

    pub fn new_dict(&mut self, dict: Dict) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Dict(dict))?))
    }

    /// Creates an empty dict suitable as function globals.
    pub fn new_globals(&mut self) -> RunResult<HeapId> {
        self.allocate(HeapData::Dict(Dict::default()))
    }

    /// Boxes an arbitrary-precision integer, keeping it inline when it fits in an `i64`.
    pub fn new_int(&mut self, value: BigInt) -> RunResult<Value> {
        match value.to_i64() {
            Some(small) => Ok(Value::Int(small)),
            None => Ok(Value::Ref(self.allocate(HeapData::LongInt(value))?)),
        }
    }

    pub fn new_cell(&mut self, contents: Option<Value>) -> RunResult<Value> {
        Ok(Value::Ref(self.allocate(HeapData::Cell(contents))?))
    }

    /// Allocates a bare instance of `ty`, optionally wrapping a native value.
    pub fn new_instance(&mut self, ty: TypeId, native: Option<Value>) -> RunResult<Value> {
        let members = self.types[ty.index()].member_count;
        let instance = Instance::new(ty, members, native);
        Ok(Value::Ref(self.allocate(HeapData::Instance(instance))?))
    }

    /// Items of an exact or subclassed tuple.
    #[must_use]
    pub fn tuple_items(&self, value: &Value) -> Option<&[Value]> {
        match self.unwrap_native(value) {
            Value::Ref(id) => self.heap.tuple(*id),
            _ => None,
        }
    }

    /// Entries of an exact or subclassed dict.
    #[must_use]
    pub fn as_dict(&self, value: &Value) -> Option<&Dict> {
        match self.unwrap_native(value) {
            Value::Ref(id) => self.heap.dict(*id),
            _ => None,
        }
    }

    /// Contents of a cell, `None` when empty or when `value` is not a cell.
    #[must_use]
    pub fn cell_contents(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::Cell(contents) => contents.clone(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Looks through an instance of a subclass of a value type to the native value it wraps.
    #[must_use]
    pub(crate) fn unwrap_native<'a>(&'a self, value: &'a Value) -> &'a Value {
        if let Value::Ref(id) = value
            && let HeapData::Instance(instance) = self.heap.get(*id)
            && let Some(native) = &instance.native
        {
            return native;
        }
        value
    }

    /// The attribute dictionary of an instance or function, if it has one.
    ///
    /// With `create`, a missing dictionary is allocated for objects whose type allows one.
    pub(crate) fn instance_dict(&mut self, value: &Value, create: bool) -> RunResult<Option<HeapId>> {
        let Value::Ref(id) = value else {
            return Ok(None);
        };
        let existing = match self.heap.get(*id) {
            HeapData::Instance(instance) => {
                if !self.types[instance.type_id.index()].instance_dict {
                    return Ok(None);
                }
                instance.dict
            }
            HeapData::Function(function) => function.dict,
            _ => return Ok(None),
        };
        if existing.is_some() || !create {
            return Ok(existing);
        }
        let dict = self.allocate(HeapData::Dict(Dict::default()))?;
        match self.heap.get_mut(*id) {
            HeapData::Instance(instance) => instance.dict = Some(dict),
            HeapData::Function(function) => function.dict = Some(dict),
            _ => {}
        }
        Ok(Some(dict))
    }

    /// True for objects that carry an attribute dictionary, created or not.
    #[must_use]
    pub fn supports_instance_dict(&self, value: &Value) -> bool {
        match value {
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::Instance(instance) => self.types[instance.type_id.index()].instance_dict,
                HeapData::Function(_) => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Reads `name` from the attribute dictionary of `value`, without descriptors.
    #[must_use]
    pub fn instance_dict_get(&self, value: &Value, name: &str) -> Option<Value> {
        let dict = match value {
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::Instance(instance) => instance.dict?,
                HeapData::Function(function) => function.dict?,
                _ => return None,
            },
            _ => return None,
        };
        self.heap.dict(dict)?.get(name).cloned()
    }

    /// Interns nothing: builds a `str` value sharing `s`.
    #[must_use]
    pub fn new_str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }
}
