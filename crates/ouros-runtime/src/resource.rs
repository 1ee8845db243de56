use std::fmt;

use crate::exception_private::{ExcType, RunError, SimpleException};

/// Error returned when a resource limit is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of heap allocations exceeded.
    Allocation { limit: usize, count: usize },
    /// Maximum recursion depth exceeded.
    Recursion { limit: usize, depth: usize },
    /// Maximum depth of a single-inheritance chain exceeded.
    Inheritance { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::Recursion { .. } => {
                write!(f, "maximum recursion depth exceeded while calling a Python object")
            }
            Self::Inheritance { limit, depth } => {
                write!(f, "inheritance chain too deep: {depth} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

impl ResourceError {
    /// Converts this resource error to an exception.
    ///
    /// Maps resource error types to exception types:
    /// - `Allocation` → `MemoryError`
    /// - `Recursion` → `RecursionError`
    /// - `Inheritance` → `RecursionError`
    #[must_use]
    pub(crate) fn into_exception(self) -> SimpleException {
        let exc_type = match self {
            Self::Allocation { .. } => ExcType::MemoryError,
            Self::Recursion { .. } | Self::Inheritance { .. } => ExcType::RecursionError,
        };
        SimpleException::new_msg(exc_type, self)
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Exc(Box::new(err.into_exception()))
    }
}

/// Recommended maximum recursion depth if not otherwise specified.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Extra depth granted once to let a handler run after a recursion overflow.
pub const DEFAULT_RECURSION_HEADROOM: usize = 50;

/// Maximum depth of single-path inheritance chains.
///
/// Keeps MRO construction and slot re-derivation bounded.
pub const MAX_INHERITANCE_DEPTH: usize = 1000;

/// Configuration for resource limits.
///
/// `max_allocations` is optional: set to `None` to disable it.
/// Use `ResourceLimits::new()` for the defaults, or build custom limits
/// with the builder pattern.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of heap allocations allowed.
    pub max_allocations: Option<usize>,
    /// Initial recursion limit of each thread context.
    pub max_recursion_depth: usize,
    /// Depth added to the limit while an overflow is being handled.
    pub recursion_headroom: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceLimits {
    /// Creates limits with no allocation cap and a recursion limit of 1000.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_allocations: None,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            recursion_headroom: DEFAULT_RECURSION_HEADROOM,
        }
    }

    /// Sets the maximum number of allocations.
    #[must_use]
    pub fn max_allocations(mut self, limit: usize) -> Self {
        self.max_allocations = Some(limit);
        self
    }

    /// Sets the initial recursion limit.
    #[must_use]
    pub fn max_recursion_depth(mut self, limit: usize) -> Self {
        self.max_recursion_depth = limit;
        self
    }

    /// Sets the headroom granted after a recursion overflow.
    #[must_use]
    pub fn recursion_headroom(mut self, headroom: usize) -> Self {
        self.recursion_headroom = headroom;
        self
    }
}
