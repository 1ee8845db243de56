use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Exception types raised by the object runtime.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// Root of every exception, matches anything in `is_subclass_of`.
    BaseException,
    /// Primary exception class.
    Exception,

    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    OverflowError,
    ZeroDivisionError,

    // --- LookupError hierarchy ---
    LookupError,
    IndexError,
    KeyError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    NotImplementedError,
    RecursionError,

    AttributeError,
    MemoryError,
    SystemError,
    TypeError,
    ValueError,
}

impl ExcType {
    /// Returns true if `self` is `other` or one of its subclasses.
    ///
    /// Mirrors the built-in exception hierarchy for the classes the runtime raises.
    #[must_use]
    pub fn is_subclass_of(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        match other {
            Self::BaseException => true,
            Self::Exception => self != Self::BaseException,
            Self::ArithmeticError => matches!(self, Self::OverflowError | Self::ZeroDivisionError),
            Self::LookupError => matches!(self, Self::IndexError | Self::KeyError),
            Self::RuntimeError => matches!(self, Self::NotImplementedError | Self::RecursionError),
            _ => false,
        }
    }

    /// Creates a `TypeError` with the given message.
    #[must_use]
    pub(crate) fn type_error(msg: impl Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, msg).into()
    }

    /// Creates a `ValueError` with the given message.
    #[must_use]
    pub(crate) fn value_error(msg: impl Display) -> RunError {
        SimpleException::new_msg(Self::ValueError, msg).into()
    }

    // --- attribute access ---

    #[must_use]
    pub(crate) fn attribute_error(type_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!(
                "'{}' object has no attribute '{}'",
                truncate(type_name, 50),
                truncate(attr, 50)
            ),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn type_attribute_error(type_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!(
                "type object '{}' has no attribute '{}'",
                truncate(type_name, 50),
                truncate(attr, 400)
            ),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn readonly_attribute_error(type_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("'{}' object attribute '{attr}' is read-only", truncate(type_name, 50)),
        )
        .into()
    }

    /// An `AttributeError` raised by a property lacking the requested accessor.
    #[must_use]
    pub(crate) fn property_accessor_missing(msg: &str) -> RunError {
        SimpleException::new_msg(Self::AttributeError, msg).into()
    }

    /// The error raised when a descriptor with the READONLY flag is written.
    #[must_use]
    pub(crate) fn readonly_attribute() -> RunError {
        SimpleException::new_msg(Self::AttributeError, "readonly attribute").into()
    }

    /// `attribute 'x' of 'T' objects is not readable` (also writable, delible).
    #[must_use]
    pub(crate) fn attribute_is_not(attr: &str, owner: &str, what: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("attribute '{attr}' of '{}' objects is not {what}", truncate(owner, 100)),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn attribute_must_be_set_to(attr: &str, kind: &str, value_type: &str) -> RunError {
        Self::type_error(format!(
            "{} must be set to {kind}, not a '{}' object",
            truncate(attr, 50),
            truncate(value_type, 50)
        ))
    }

    /// Raised when a type without a setattr slot is written: "has no attributes" or
    /// "has only read-only attributes".
    #[must_use]
    pub(crate) fn no_setattr_slot(type_name: &str, readable: bool, delete: bool, attr: &str) -> RunError {
        let kind = if readable { "only read-only" } else { "no" };
        let mode = if delete { "del" } else { "assign to" };
        Self::type_error(format!(
            "'{}' object has {kind} attributes ({mode} .{})",
            truncate(type_name, 100),
            truncate(attr, 50)
        ))
    }

    #[must_use]
    pub(crate) fn immutable_type_setattr(attr: &str, type_name: &str) -> RunError {
        Self::type_error(format!("cannot set '{attr}' attribute of immutable type '{type_name}'"))
    }

    #[must_use]
    pub(crate) fn descriptor_doesnt_apply(descr: &str, owner: &str, actual: &str) -> RunError {
        Self::type_error(format!(
            "descriptor '{descr}' for '{}' objects doesn't apply to a '{}' object",
            truncate(owner, 100),
            truncate(actual, 100)
        ))
    }

    #[must_use]
    pub(crate) fn descriptor_needs_argument(descr: &str, owner: &str) -> RunError {
        Self::type_error(format!(
            "descriptor '{descr}' of '{}' object needs an argument",
            truncate(owner, 100)
        ))
    }

    #[must_use]
    pub(crate) fn descriptor_requires(descr: &str, owner: &str, actual: &str) -> RunError {
        Self::type_error(format!(
            "descriptor '{descr}' requires a '{}' object but received a '{}'",
            truncate(owner, 100),
            truncate(actual, 100)
        ))
    }

    // --- calls ---

    #[must_use]
    pub(crate) fn not_callable(type_name: &str) -> RunError {
        Self::type_error(format!("'{}' object is not callable", truncate(type_name, 200)))
    }

    /// `f(): keywords must be strings`, or the bare form when the callee is not known yet.
    #[must_use]
    pub(crate) fn keywords_must_be_strings(func_name: Option<&str>) -> RunError {
        match func_name {
            Some(name) => Self::type_error(format!("{}(): keywords must be strings", truncate(name, 200))),
            None => Self::type_error("keywords must be strings"),
        }
    }

    #[must_use]
    pub(crate) fn repeated_keyword(keyword: &str) -> RunError {
        Self::type_error(format!("got multiple values for keyword argument '{keyword}'"))
    }

    /// `f() takes no arguments (2 given)`
    #[must_use]
    pub(crate) fn type_error_no_args(name: &str, count: usize) -> RunError {
        Self::type_error(format!("{}() takes no arguments ({count} given)", truncate(name, 200)))
    }

    /// `f() takes exactly one argument (2 given)` / `f() takes exactly 3 arguments (2 given)`
    #[must_use]
    pub(crate) fn type_error_arg_count(name: &str, expected: usize, actual: usize) -> RunError {
        let name = truncate(name, 200);
        if expected == 1 {
            Self::type_error(format!("{name}() takes exactly one argument ({actual} given)"))
        } else {
            Self::type_error(format!("{name}() takes exactly {expected} arguments ({actual} given)"))
        }
    }

    #[must_use]
    pub(crate) fn type_error_at_least(name: &str, min: usize, actual: usize) -> RunError {
        let plural = if min == 1 { "" } else { "s" };
        Self::type_error(format!("{name} expected at least {min} argument{plural}, got {actual}"))
    }

    #[must_use]
    pub(crate) fn type_error_at_most(name: &str, max: usize, actual: usize) -> RunError {
        let plural = if max == 1 { "" } else { "s" };
        Self::type_error(format!("{name} expected at most {max} argument{plural}, got {actual}"))
    }

    #[must_use]
    pub(crate) fn type_error_no_kwargs(name: &str) -> RunError {
        Self::type_error(format!("{}() takes no keyword arguments", truncate(name, 200)))
    }

    /// Argument count check for slot wrappers such as `int.__add__`.
    #[must_use]
    pub(crate) fn wrapper_arg_count(expected: usize, actual: usize) -> RunError {
        let plural = if expected == 1 { "" } else { "s" };
        Self::type_error(format!("expected {expected} argument{plural}, got {actual}"))
    }

    /// Builds the "too many positional arguments" diagnostic.
    ///
    /// The wording depends on whether the callee has defaults ("from N to M"), on
    /// singular/plural agreement, and on whether keyword-only arguments were also
    /// supplied, in which case those are reported separately.
    ///
    /// # Arguments
    /// * `name` - Callee name
    /// * `argcount` - Declared positional parameter count
    /// * `defcount` - Number of positional defaults
    /// * `pos_given` - Positional arguments actually passed
    /// * `kw_given` - Keyword-only parameters bound by the same call
    #[must_use]
    pub(crate) fn type_error_too_many_positional(
        name: &str,
        argcount: usize,
        defcount: usize,
        pos_given: usize,
        kw_given: usize,
    ) -> RunError {
        let (pos_text, pos_plural) = if defcount == 0 {
            (argcount.to_string(), argcount != 1)
        } else {
            (format!("from {} to {argcount}", argcount - defcount), true)
        };
        let given_text = if kw_given > 0 {
            format!(
                " positional argument{} (and {kw_given} keyword-only argument{})",
                plural_s(pos_given),
                plural_s(kw_given)
            )
        } else {
            String::new()
        };
        let verb = if pos_given == 1 && kw_given == 0 { "was" } else { "were" };
        Self::type_error(format!(
            "{name}() takes {pos_text} positional argument{} but {pos_given}{given_text} {verb} given",
            if pos_plural { "s" } else { "" }
        ))
    }

    /// `f() missing 2 required positional arguments: 'a' and 'b'`
    #[must_use]
    pub(crate) fn type_error_missing_args(name: &str, kind: &str, names: &[&str]) -> RunError {
        Self::type_error(format!(
            "{name}() missing {} required {kind} argument{}: {}",
            names.len(),
            plural_s(names.len()),
            format_param_names(names)
        ))
    }

    #[must_use]
    pub(crate) fn type_error_multiple_values(name: &str, arg: &str) -> RunError {
        Self::type_error(format!("{}(): multiple values for argument '{arg}'", truncate(name, 200)))
    }

    #[must_use]
    pub(crate) fn type_error_positional_only(name: &str, keywords: &[&str]) -> RunError {
        Self::type_error(format!(
            "{}(): positional-only arguments passed by keyword: {}",
            truncate(name, 200),
            keywords.join(", ")
        ))
    }

    #[must_use]
    pub(crate) fn type_error_unexpected_keyword(name: &str, keyword: &str) -> RunError {
        Self::type_error(format!(
            "{}(): unexpected keyword argument '{keyword}'",
            truncate(name, 200)
        ))
    }

    // --- operators ---

    #[must_use]
    pub(crate) fn binary_type_error(op: &str, lhs_type: &str, rhs_type: &str) -> RunError {
        Self::type_error(format!(
            "unsupported operand type(s) for {op}: '{}' and '{}'",
            truncate(lhs_type, 100),
            truncate(rhs_type, 100)
        ))
    }

    #[must_use]
    pub(crate) fn unary_type_error(op: &str, type_name: &str) -> RunError {
        Self::type_error(format!("bad operand type for {op}: '{}'", truncate(type_name, 200)))
    }

    #[must_use]
    pub(crate) fn comparison_type_error(op: &str, lhs_type: &str, rhs_type: &str) -> RunError {
        Self::type_error(format!(
            "'{op}' not supported between instances of '{}' and '{}'",
            truncate(lhs_type, 100),
            truncate(rhs_type, 100)
        ))
    }

    #[must_use]
    pub(crate) fn not_a_container(type_name: &str) -> RunError {
        Self::type_error(format!("'{}' object is not a container", truncate(type_name, 200)))
    }

    #[must_use]
    pub(crate) fn returned_non_type(func: &str, expected: &str, actual: &str) -> RunError {
        Self::type_error(format!(
            "{} returned non-{} (type {})",
            truncate(func, 200),
            truncate(expected, 200),
            truncate(actual, 200)
        ))
    }

    #[must_use]
    pub(crate) fn cannot_interpret_as_int(type_name: &str) -> RunError {
        Self::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            truncate(type_name, 200)
        ))
    }

    #[must_use]
    pub(crate) fn no_len(type_name: &str) -> RunError {
        Self::type_error(format!("object of type '{}' has no len()", truncate(type_name, 200)))
    }

    #[must_use]
    pub(crate) fn not_subscriptable(type_name: &str) -> RunError {
        Self::type_error(format!("'{}' object is not subscriptable", truncate(type_name, 200)))
    }

    #[must_use]
    pub(crate) fn no_item_assignment(type_name: &str) -> RunError {
        Self::type_error(format!(
            "'{}' object does not support item assignment",
            truncate(type_name, 200)
        ))
    }

    #[must_use]
    pub(crate) fn unhashable(type_name: &str) -> RunError {
        Self::type_error(format!("unhashable type: '{}'", truncate(type_name, 200)))
    }

    #[must_use]
    pub(crate) fn index_error(msg: impl Display) -> RunError {
        SimpleException::new_msg(Self::IndexError, msg).into()
    }

    #[must_use]
    pub(crate) fn key_error(key: &str) -> RunError {
        SimpleException::new_msg(Self::KeyError, format!("'{key}'")).into()
    }

    #[must_use]
    pub(crate) fn overflow_error(msg: impl Display) -> RunError {
        SimpleException::new_msg(Self::OverflowError, msg).into()
    }

    // --- functions and cells ---

    #[must_use]
    pub(crate) fn closure_length(func_name: &str, expected: usize, actual: usize) -> RunError {
        Self::value_error(format!("{func_name} requires closure of length {expected}, not {actual}"))
    }

    #[must_use]
    pub(crate) fn closure_must_be_empty(func_name: &str) -> RunError {
        Self::type_error(format!("{func_name} closure must be empty/None"))
    }

    #[must_use]
    pub(crate) fn closure_expected_cell(found: &str) -> RunError {
        Self::type_error(format!("closure: expected cell, found {found}"))
    }

    #[must_use]
    pub(crate) fn cell_is_empty() -> RunError {
        Self::value_error("Cell is empty")
    }

    // --- types ---

    #[must_use]
    pub(crate) fn cannot_create_instances(type_name: &str) -> RunError {
        Self::type_error(format!("cannot create '{}' instances", truncate(type_name, 100)))
    }

    #[must_use]
    pub(crate) fn not_acceptable_base(type_name: &str) -> RunError {
        Self::type_error(format!("type '{}' is not an acceptable base type", truncate(type_name, 100)))
    }
}

/// Simple lightweight representation of an exception.
///
/// The runtime core only needs the exception class and its message: traceback
/// construction belongs to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    arg: Option<String>,
}

impl SimpleException {
    /// Creates a new exception with the given type and optional argument message.
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self { exc_type, arg }
    }

    /// Creates a new exception with the given type and message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, msg: impl Display) -> Self {
        Self::new(exc_type, Some(msg.to_string()))
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}: {arg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

/// Runtime error types that can occur while dispatching.
///
/// Two variants:
/// - `Internal`: a configuration error or a defect in the runtime itself (multiple
///   inheritance requested, slot signature mismatch, unrecoverable stack overflow).
///   These are fatal and are never matched as language-level exceptions.
/// - `Exc`: a language-level exception that the evaluator may catch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunError {
    /// Fatal runtime configuration error.
    Internal(Cow<'static, str>),
    /// Catchable exception (e.g., TypeError, AttributeError).
    Exc(Box<SimpleException>),
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl RunError {
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error is a catchable exception of `exc_type` or a subclass of it.
    #[must_use]
    pub fn is_exception_type(&self, exc_type: ExcType) -> bool {
        match self {
            Self::Exc(exc) => exc.exc_type().is_subclass_of(exc_type),
            Self::Internal(_) => false,
        }
    }

    /// The exception class, or `None` for internal errors.
    #[must_use]
    pub fn exc_type(&self) -> Option<ExcType> {
        match self {
            Self::Exc(exc) => Some(exc.exc_type()),
            Self::Internal(_) => None,
        }
    }

    /// The message carried by the error, without the class prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Exc(exc) => exc.arg().unwrap_or_default(),
            Self::Internal(msg) => msg,
        }
    }

    /// Returns true for fatal configuration errors.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exc(exc) => exc.fmt(f),
            Self::Internal(msg) => write!(f, "InterpreterError: {msg}"),
        }
    }
}

impl std::error::Error for RunError {}

/// Truncates `s` to at most `max` characters, mirroring `%.Ns` in message templates.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Formats a list of parameter names for error messages.
///
/// Examples:
/// - `["a"]` -> `'a'`
/// - `["a", "b"]` -> `'a' and 'b'`
/// - `["a", "b", "c"]` -> `'a', 'b' and 'c'`
fn format_param_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => format!("'{only}'"),
        [rest @ .., last] => {
            let rest: Vec<_> = rest.iter().map(|n| format!("'{n}'")).collect();
            format!("{} and '{last}'", rest.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_positional_grammar() {
        let err = ExcType::type_error_too_many_positional("f", 2, 0, 3, 0);
        assert_eq!(err.to_string(), "TypeError: f() takes 2 positional arguments but 3 were given");

        let err = ExcType::type_error_too_many_positional("f", 1, 0, 2, 0);
        assert_eq!(err.to_string(), "TypeError: f() takes 1 positional argument but 2 were given");

        let err = ExcType::type_error_too_many_positional("f", 0, 0, 1, 0);
        assert_eq!(err.to_string(), "TypeError: f() takes 0 positional arguments but 1 was given");

        let err = ExcType::type_error_too_many_positional("f", 3, 2, 4, 0);
        assert_eq!(
            err.to_string(),
            "TypeError: f() takes from 1 to 3 positional arguments but 4 were given"
        );
    }

    #[test]
    fn too_many_positional_reports_keyword_only_separately() {
        let err = ExcType::type_error_too_many_positional("f", 0, 0, 1, 1);
        assert_eq!(
            err.to_string(),
            "TypeError: f() takes 0 positional arguments but 1 positional argument (and 1 keyword-only argument) were given"
        );
        let err = ExcType::type_error_too_many_positional("g", 1, 0, 2, 2);
        assert_eq!(
            err.to_string(),
            "TypeError: g() takes 1 positional argument but 2 positional arguments (and 2 keyword-only arguments) were given"
        );
    }

    #[test]
    fn missing_names_are_joined() {
        assert_eq!(format_param_names(&["a"]), "'a'");
        assert_eq!(format_param_names(&["a", "b"]), "'a' and 'b'");
        assert_eq!(format_param_names(&["a", "b", "c"]), "'a', 'b' and 'c'");
        let err = ExcType::type_error_missing_args("f", "keyword-only", &["k"]);
        assert_eq!(err.to_string(), "TypeError: f() missing 1 required keyword-only argument: 'k'");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("ééé", 2), "éé");
    }

    #[test]
    fn hierarchy() {
        assert!(ExcType::RecursionError.is_subclass_of(ExcType::RuntimeError));
        assert!(ExcType::KeyError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::TypeError.is_subclass_of(ExcType::Exception));
        assert!(!ExcType::TypeError.is_subclass_of(ExcType::AttributeError));
        assert!(!RunError::internal("boom").is_exception_type(ExcType::BaseException));
    }
}
