use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::{
    resource::ResourceError,
    types::{
        BoundMethod, BuiltinFunction, Dict, Function, GetSetDescr, Instance, MemberDescr, MethodDescr, MethodWrapper,
        Property, WrapperDescr,
    },
    value::Value,
};

/// Unique identifier for values stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a heap-allocated object.
///
/// The variant decides the object's built-in type, except for `Instance`, which
/// carries its own type. The variant name doubles as the key in [`HeapStats`].
#[derive(Debug, strum::IntoStaticStr)]
pub enum HeapData {
    /// An `int` outside the `i64` range.
    LongInt(BigInt),
    Tuple(Vec<Value>),
    Dict(Dict),
    /// Instance of a user-defined class, or of a subclass of a built-in value type.
    Instance(Instance),
    Function(Function),
    Method(BoundMethod),
    /// A closure cell; `None` when the variable is unbound.
    Cell(Option<Value>),
    GetSet(GetSetDescr),
    Member(MemberDescr),
    MethodDescr(MethodDescr),
    WrapperDescr(WrapperDescr),
    MethodWrapper(MethodWrapper),
    BuiltinFunction(BuiltinFunction),
    Property(Property),
}

/// Snapshot of heap state at a point in time.
///
/// The `objects_by_type` map uses `BTreeMap` for deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of objects on the heap.
    pub live_objects: usize,
    /// Breakdown of objects by `HeapData` variant name.
    pub objects_by_type: BTreeMap<&'static str, usize>,
}

/// Arena holding every heap-allocated object.
///
/// Objects are never freed: reclaiming them is the job of a collector outside
/// this crate. `max_allocations` bounds the number of objects allocated after
/// [`Heap::limit_allocations`] was called; objects created while bootstrapping
/// the built-in types do not count.
#[derive(Debug, Default)]
pub struct Heap {
    entries: Vec<HeapData>,
    baseline: usize,
    max_allocations: Option<usize>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting allocations against `max_allocations` from the current size.
    pub fn limit_allocations(&mut self, max_allocations: Option<usize>) {
        self.baseline = self.entries.len();
        self.max_allocations = max_allocations;
    }

    /// Number of objects allocated since the limit was set.
    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.entries.len() - self.baseline
    }

    /// Stores `data` in the arena and returns its id.
    ///
    /// Returns `ResourceError::Allocation` if the allocation limit would be exceeded.
    pub fn allocate(&mut self, data: HeapData) -> Result<HeapId, ResourceError> {
        let count = self.allocation_count() + 1;
        if let Some(limit) = self.max_allocations
            && count > limit
        {
            return Err(ResourceError::Allocation { limit, count });
        }
        let id = HeapId(self.entries.len());
        self.entries.push(data);
        Ok(id)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.entries[id.0]
    }

    #[inline]
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.entries[id.0]
    }

    /// Returns the dict stored at `id`, or `None` if it holds something else.
    #[must_use]
    pub fn dict(&self, id: HeapId) -> Option<&Dict> {
        match self.get(id) {
            HeapData::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn dict_mut(&mut self, id: HeapId) -> Option<&mut Dict> {
        match self.get_mut(id) {
            HeapData::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns the items of the tuple stored at `id`.
    #[must_use]
    pub fn tuple(&self, id: HeapId) -> Option<&[Value]> {
        match self.get(id) {
            HeapData::Tuple(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every object allocated at or after `len`.
    ///
    /// Only valid while nothing outside the caller refers to those objects.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len.max(self.baseline));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts objects per `HeapData` variant.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        for data in &self.entries {
            let name: &'static str = data.into();
            *objects_by_type.entry(name).or_insert(0) += 1;
        }
        HeapStats {
            live_objects: self.entries.len(),
            objects_by_type,
        }
    }
}

