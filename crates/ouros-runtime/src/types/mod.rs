/// Type objects and the built-in types of the runtime.
///
/// `type_object` holds the machinery shared by every type (specs, MRO, slot
/// resolution); the other modules each define one built-in type: its payload and
/// the native slot functions registered for it in `bootstrap`.
pub mod base_object;
pub mod bootstrap;
pub mod cell;
pub mod descr;
pub mod dict;
pub mod float;
pub mod function;
pub mod getset;
pub mod int;
pub mod member;
pub mod method_descr;
pub mod property;
pub mod singletons;
pub mod str;
pub mod tuple;
pub mod type_object;
pub mod type_type;
pub mod wrapper;

pub use base_object::Instance;
pub use dict::Dict;
pub use function::{BoundMethod, Function};
pub use getset::{GetSetDef, GetSetDescr};
pub use member::{MemberDef, MemberDescr};
pub use method_descr::{BuiltinFunction, MethodDef, MethodDescr, MethodStyle};
pub use property::Property;
pub use type_object::{Shape, TypeFlags, TypeId, TypeObject, TypeSpec, is_dunder_name};
pub use wrapper::{MethodWrapper, WrapperDescr};
