//! Type objects, their construction and slot inheritance.
//!
//! A type is built in two phases. [`Runtime::allocate_type_header`] reserves the
//! [`TypeId`], validates the bases and computes the MRO. [`Runtime::fill_type`] then
//! populates the namespace with descriptors for the native slots, get-sets, methods
//! and members, and resolves the dispatch table against the (already filled) base.
//! Built-in types go through both phases in bulk so that `object` and `type` can
//! refer to each other before either is complete.

use std::{fmt, ops::BitOr, rc::Rc};

use smallvec::{SmallVec, smallvec};
use strum::IntoEnumIterator;

use crate::{
    exception_private::{ExcType, RunError, RunResult},
    heap::HeapData,
    resource::{MAX_INHERITANCE_DEPTH, ResourceError},
    runtime::Runtime,
    slot::{Slot, SlotEntry, SlotFn, SlotTable},
    types::{
        BuiltinFunction, Dict, GetSetDef, GetSetDescr, MemberDef, MemberDescr, MethodDef, MethodDescr, WrapperDescr,
        wrapper::TP_NEW_WRAPPER,
    },
    value::Value,
};

/// Index of a type object in the runtime's type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub const OBJECT: Self = Self(0);
    pub const TYPE: Self = Self(1);
    pub const NONE_TYPE: Self = Self(2);
    pub const NOT_IMPLEMENTED_TYPE: Self = Self(3);
    pub const INT: Self = Self(4);
    pub const BOOL: Self = Self(5);
    pub const FLOAT: Self = Self(6);
    pub const STR: Self = Self(7);
    pub const TUPLE: Self = Self(8);
    pub const DICT: Self = Self(9);
    pub const FUNCTION: Self = Self(10);
    pub const METHOD: Self = Self(11);
    pub const CELL: Self = Self(12);
    pub const GETSET_DESCRIPTOR: Self = Self(13);
    pub const MEMBER_DESCRIPTOR: Self = Self(14);
    pub const METHOD_DESCRIPTOR: Self = Self(15);
    pub const WRAPPER_DESCRIPTOR: Self = Self(16);
    pub const METHOD_WRAPPER: Self = Self(17);
    pub const BUILTIN_FUNCTION: Self = Self(18);
    pub const PROPERTY: Self = Self(19);

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Feature flags of a type.
#[derive(Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct TypeFlags(u8);

impl TypeFlags {
    /// Namespace and slots may change after creation.
    pub const MUTABLE: Self = Self(1);
    /// Instances may be deleted from their owner's namespace.
    pub const REMOVABLE: Self = Self(1 << 1);
    /// The type may be used as a base.
    pub const BASETYPE: Self = Self(1 << 2);
    /// Instances define `__get__`.
    pub const IS_DESCR: Self = Self(1 << 3);
    /// Instances define `__set__` or `__delete__`.
    pub const IS_DATA_DESCR: Self = Self(1 << 4);

    const DEDUCED: Self = Self(Self::IS_DESCR.0 | Self::IS_DATA_DESCR.0);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for TypeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for TypeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::MUTABLE, "MUTABLE"),
            (Self::REMOVABLE, "REMOVABLE"),
            (Self::BASETYPE, "BASETYPE"),
            (Self::IS_DESCR, "IS_DESCR"),
            (Self::IS_DATA_DESCR, "IS_DATA_DESCR"),
        ];
        let set: Vec<_> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "TypeFlags({})", set.join(" | "))
    }
}

/// The native layout backing instances of a type.
///
/// User classes inherit the shape of their base; an instance of a subclass of a
/// value type keeps the native value alongside its own namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr)]
pub enum Shape {
    Object,
    Type,
    None,
    NotImplemented,
    Int,
    Bool,
    Float,
    Str,
    Tuple,
    Dict,
    Function,
    Method,
    Cell,
    GetSet,
    Member,
    MethodDescr,
    WrapperDescr,
    MethodWrapper,
    BuiltinFunction,
    Property,
}

/// Declarative description of a type, consumed by [`Runtime::create_type`].
#[derive(Debug, Clone)]
pub struct TypeSpec {
    name: Rc<str>,
    shape: Shape,
    bases: SmallVec<[TypeId; 1]>,
    metatype: TypeId,
    flags: TypeFlags,
    slots: Vec<(Slot, SlotFn)>,
    getsets: Vec<GetSetDef>,
    methods: Vec<MethodDef>,
    members: Vec<MemberDef>,
    attrs: Vec<(Rc<str>, Value)>,
    instance_dict: bool,
}

impl TypeSpec {
    /// Starts a spec for a subclassable type whose metatype is `type`.
    ///
    /// With no explicit base the type derives from `object`.
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            bases: SmallVec::new(),
            metatype: TypeId::TYPE,
            flags: TypeFlags::BASETYPE,
            slots: Vec::new(),
            getsets: Vec::new(),
            methods: Vec::new(),
            members: Vec::new(),
            attrs: Vec::new(),
            instance_dict: false,
        }
    }

    #[must_use]
    pub fn base(mut self, base: TypeId) -> Self {
        self.bases.push(base);
        self
    }

    #[must_use]
    pub fn metatype(mut self, metatype: TypeId) -> Self {
        self.metatype = metatype;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.flags.insert(flags);
        self
    }

    #[must_use]
    pub fn without_flags(mut self, flags: TypeFlags) -> Self {
        self.flags.remove(flags);
        self
    }

    /// Registers a native implementation for `slot`.
    #[must_use]
    pub fn slot(mut self, slot: Slot, f: SlotFn) -> Self {
        self.slots.push((slot, f));
        self
    }

    #[must_use]
    pub fn getset(mut self, def: GetSetDef) -> Self {
        self.getsets.push(def);
        self
    }

    #[must_use]
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(def);
        self
    }

    /// Adds an instance member stored in a fixed position of each instance.
    #[must_use]
    pub fn member(mut self, def: MemberDef) -> Self {
        self.members.push(def);
        self
    }

    /// Adds a plain namespace entry.
    #[must_use]
    pub fn attr(mut self, name: impl Into<Rc<str>>, value: Value) -> Self {
        self.attrs.push((name.into(), value));
        self
    }

    /// Gives instances their own attribute dictionary.
    #[must_use]
    pub fn instance_dict(mut self, enabled: bool) -> Self {
        self.instance_dict = enabled;
        self
    }
}

/// A type: name, layout, MRO, namespace and dispatch table.
#[derive(Debug)]
pub struct TypeObject {
    pub(crate) name: Rc<str>,
    pub(crate) shape: Shape,
    pub(crate) metatype: TypeId,
    pub(crate) bases: SmallVec<[TypeId; 1]>,
    pub(crate) mro: Vec<TypeId>,
    pub(crate) dict: Dict,
    /// Slots implemented by this type itself.
    pub(crate) native_slots: SlotTable,
    /// Resolved slots, including inherited ones.
    pub(crate) slots: SlotTable,
    pub(crate) flags: TypeFlags,
    pub(crate) instance_dict: bool,
    /// Number of member storage positions in each instance, bases included.
    pub(crate) member_count: usize,
}

impl TypeObject {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn metatype(&self) -> TypeId {
        self.metatype
    }

    #[must_use]
    pub fn bases(&self) -> &[TypeId] {
        &self.bases
    }

    #[must_use]
    pub fn base(&self) -> Option<TypeId> {
        self.bases.first().copied()
    }

    /// The method resolution order, starting with the type itself and ending at `object`.
    #[must_use]
    pub fn mro(&self) -> &[TypeId] {
        &self.mro
    }

    #[must_use]
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    #[must_use]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[must_use]
    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    #[must_use]
    pub fn has_instance_dict(&self) -> bool {
        self.instance_dict
    }

    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.flags.contains(TypeFlags::MUTABLE)
    }
}

/// Returns true for `__x__` style names, which may be bound to slots.
#[must_use]
pub fn is_dunder_name(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

impl Runtime {
    /// Creates a new type from `spec` and publishes it.
    ///
    /// Fails with a configuration error for more than one base, with `TypeError`
    /// for a base that does not allow subclassing. On failure no trace of the type
    /// remains in the type arena or on the heap.
    pub fn create_type(&mut self, spec: TypeSpec) -> RunResult<TypeId> {
        let heap_len = self.heap.len();
        let id = self.allocate_type_header(&spec)?;
        if let Err(err) = self.fill_type(id, spec) {
            self.types.truncate(id.index());
            self.heap.truncate(heap_len);
            return Err(err);
        }
        let name = self.types[id.index()].name.clone();
        self.tracer_mut().on_type_created(&name);
        Ok(id)
    }

    /// First construction phase: reserves the id, checks the bases and computes the MRO.
    pub(crate) fn allocate_type_header(&mut self, spec: &TypeSpec) -> RunResult<TypeId> {
        let raw = u32::try_from(self.types.len()).map_err(|_| RunError::internal("type arena is full"))?;
        let id = TypeId(raw);
        let bases: SmallVec<[TypeId; 1]> = if spec.bases.is_empty() && id != TypeId::OBJECT {
            smallvec![TypeId::OBJECT]
        } else {
            spec.bases.clone()
        };
        if bases.len() > 1 {
            return Err(RunError::internal(format!(
                "multiple inheritance not supported yet (type `{}`)",
                spec.name
            )));
        }

        let (mro, base_members, base_dict) = match bases.first() {
            Some(base) => {
                let base = self
                    .types
                    .get(base.index())
                    .ok_or_else(|| RunError::internal(format!("base of type `{}` is not allocated", spec.name)))?;
                if !base.flags.contains(TypeFlags::BASETYPE) {
                    return Err(ExcType::not_acceptable_base(&base.name));
                }
                let depth = base.mro.len() + 1;
                if depth > MAX_INHERITANCE_DEPTH {
                    return Err(ResourceError::Inheritance {
                        limit: MAX_INHERITANCE_DEPTH,
                        depth,
                    }
                    .into());
                }
                let mut mro = Vec::with_capacity(depth);
                mro.push(id);
                mro.extend_from_slice(&base.mro);
                (mro, base.member_count, base.instance_dict)
            }
            None => (vec![id], 0, false),
        };

        let mut flags = spec.flags;
        flags.remove(TypeFlags::DEDUCED);
        self.types.push(TypeObject {
            name: spec.name.clone(),
            shape: spec.shape,
            metatype: spec.metatype,
            bases,
            mro,
            dict: Dict::default(),
            native_slots: SlotTable::default(),
            slots: SlotTable::default(),
            flags,
            instance_dict: spec.instance_dict || base_dict,
            member_count: base_members + spec.members.len(),
        });
        Ok(id)
    }

    /// Second construction phase: namespace, native slots and the resolved table.
    ///
    /// The base must already be filled.
    pub(crate) fn fill_type(&mut self, id: TypeId, spec: TypeSpec) -> RunResult<()> {
        let TypeSpec {
            name,
            slots,
            getsets,
            methods,
            members,
            attrs,
            ..
        } = spec;

        let mut native = SlotTable::default();
        for (slot, f) in slots {
            if f.signature() != slot.signature() {
                return Err(RunError::internal(format!(
                    "type `{name}`: slot {slot:?} needs signature {:?}, not {:?}",
                    slot.signature(),
                    f.signature()
                )));
            }
            native.set(slot, SlotEntry::Native(f));
        }

        let mut dict = Dict::default();
        for slot in Slot::iter() {
            let Some(method_name) = slot.method_name() else {
                continue;
            };
            if !native.is_filled(slot) {
                continue;
            }
            let data = if slot == Slot::New {
                HeapData::BuiltinFunction(BuiltinFunction::new(TP_NEW_WRAPPER, Value::Type(id)))
            } else {
                HeapData::WrapperDescr(WrapperDescr::new(id, slot))
            };
            dict.insert(method_name.into(), Value::Ref(self.allocate(data)?));
        }
        for def in getsets {
            let descr = self.allocate(HeapData::GetSet(GetSetDescr::new(id, def)))?;
            dict.insert(def.name.into(), Value::Ref(descr));
        }
        for def in methods {
            let descr = self.allocate(HeapData::MethodDescr(MethodDescr::new(id, def)))?;
            dict.insert(def.name.into(), Value::Ref(descr));
        }
        let first_member = self.types[id.index()].member_count - members.len();
        for (offset, def) in members.into_iter().enumerate() {
            let member_name = def.name.clone();
            let descr = self.allocate(HeapData::Member(MemberDescr::new(id, def, first_member + offset)))?;
            dict.insert(member_name, Value::Ref(descr));
        }
        for (attr_name, value) in attrs {
            dict.insert(attr_name, value);
        }

        let ty = &mut self.types[id.index()];
        ty.native_slots = native;
        ty.dict = dict;
        self.resolve_slots(id);
        Ok(())
    }

    /// Recomputes the dispatch table of `id` from its own slots, its namespace and its base.
    ///
    /// Resolution per slot: own native implementation, else a special method in the
    /// type's own namespace, else whatever the base resolved to.
    fn resolve_slots(&mut self, id: TypeId) {
        let base_slots = self.types[id.index()]
            .base()
            .map(|base| self.types[base.index()].slots.clone());
        let ty = &mut self.types[id.index()];
        for slot in Slot::iter() {
            let resolved = if ty.native_slots.is_filled(slot) {
                ty.native_slots.get(slot)
            } else if slot.method_name().is_some_and(|name| ty.dict.contains_key(name)) {
                SlotEntry::Dunder
            } else {
                base_slots.as_ref().map_or(SlotEntry::Empty, |base| base.get(slot))
            };
            ty.slots.set(slot, resolved);
        }

        ty.flags.remove(TypeFlags::DEDUCED);
        if ty.slots.is_filled(Slot::Get) {
            ty.flags.insert(TypeFlags::IS_DESCR);
        }
        if ty.slots.is_filled(Slot::Set) || ty.slots.is_filled(Slot::Delete) {
            ty.flags.insert(TypeFlags::IS_DATA_DESCR);
        }
    }

    /// Re-derives slots after the special method `name` of `id` was assigned or deleted.
    ///
    /// Every type whose MRO contains `id` is recomputed, bases before subclasses;
    /// all slots are recomputed rather than just the one named.
    pub(crate) fn update_after_setattr(&mut self, id: TypeId, name: &str) {
        for index in id.index()..self.types.len() {
            if !self.types[index].mro.contains(&id) {
                continue;
            }
            let sub = self.types[index].mro[0];
            self.resolve_slots(sub);
            let type_name = self.types[index].name.clone();
            self.tracer_mut().on_slots_updated(&type_name, name);
        }
    }

    /// The type in `id`'s MRO that provides `slot`, natively or through a special method.
    #[must_use]
    pub fn slot_provider(&self, id: TypeId, slot: Slot) -> Option<TypeId> {
        let name = slot.method_name();
        self.types[id.index()].mro.iter().copied().find(|candidate| {
            let ty = &self.types[candidate.index()];
            ty.native_slots.is_filled(slot) || name.is_some_and(|name| ty.dict.contains_key(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dunder_names() {
        assert!(is_dunder_name("__add__"));
        assert!(is_dunder_name("__x__"));
        assert!(!is_dunder_name("____"));
        assert!(!is_dunder_name("__add"));
        assert!(!is_dunder_name("add__"));
    }

    #[test]
    fn flags_compose() {
        let mut flags = TypeFlags::BASETYPE | TypeFlags::MUTABLE;
        assert!(flags.contains(TypeFlags::MUTABLE));
        flags.remove(TypeFlags::MUTABLE);
        assert!(!flags.contains(TypeFlags::MUTABLE));
        assert!(flags.contains(TypeFlags::BASETYPE));
        assert_eq!(format!("{flags:?}"), "TypeFlags(BASETYPE)");
    }
}
