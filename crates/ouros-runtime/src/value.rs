use std::rc::Rc;

use crate::{heap::HeapId, types::TypeId};

/// A runtime value.
///
/// Small immutable values are stored inline; everything else lives in the heap
/// and is referenced by [`HeapId`]. Type objects live in the runtime's type arena
/// and are referenced by [`TypeId`].
///
/// `PartialEq` is structural and exists for tests and container bookkeeping. Language-level
/// equality goes through [`rich_compare`](crate::compare::rich_compare), identity through
/// [`Value::is`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    /// The "defer to the other operand" sentinel returned by binary slots.
    NotImplemented,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Type(TypeId),
    Ref(HeapId),
}

impl Value {
    /// Identity comparison (`is`).
    ///
    /// Heap objects and types compare by id and strings by allocation. Inline
    /// numbers compare by value, as if small values were interned.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::NotImplemented, Self::NotImplemented) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b),
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => a == b,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented)
    }

    /// Returns the string payload of an exact `str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_type(&self) -> Option<TypeId> {
        match self {
            Self::Type(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn ref_id(&self) -> Option<HeapId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<TypeId> for Value {
    fn from(id: TypeId) -> Self {
        Self::Type(id)
    }
}

impl From<HeapId> for Value {
    fn from(id: HeapId) -> Self {
        Self::Ref(id)
    }
}
