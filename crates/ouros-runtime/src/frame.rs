//! Frames and the evaluator seam.
//!
//! The runtime core never executes bytecode itself. A [`Code`] object pairs the
//! parameter shape of a function with an [`Evaluator`] supplied by the embedder;
//! calling a function binds its arguments into a [`Frame`] and hands the frame to
//! that evaluator.

use std::{fmt, rc::Rc};

use crate::{
    exception_private::{ExcType, RunError, RunResult},
    heap::{HeapData, HeapId},
    runtime::Runtime,
    signature::ParamShape,
    thread_context::ThreadContext,
    value::Value,
};

/// Executes the body of a function against a bound frame.
pub trait Evaluator {
    fn eval(&self, rt: &mut Runtime, ts: &mut ThreadContext, frame: &mut Frame) -> RunResult<Value>;
}

/// Adapts a closure into an [`Evaluator`].
pub struct FnEvaluator<F>(pub F);

impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&mut Runtime, &mut ThreadContext, &mut Frame) -> RunResult<Value>,
{
    fn eval(&self, rt: &mut Runtime, ts: &mut ThreadContext, frame: &mut Frame) -> RunResult<Value> {
        (self.0)(rt, ts, frame)
    }
}

/// Compiled body of a function: its parameter shape and the evaluator running it.
#[derive(Clone)]
pub struct Code {
    shape: ParamShape,
    body: Rc<dyn Evaluator>,
}

impl Code {
    pub fn new(shape: ParamShape, body: impl Evaluator + 'static) -> Self {
        Self {
            shape,
            body: Rc::new(body),
        }
    }

    /// Builds a code object whose body is a Rust closure.
    pub fn from_fn<F>(shape: ParamShape, body: F) -> Self
    where
        F: Fn(&mut Runtime, &mut ThreadContext, &mut Frame) -> RunResult<Value> + 'static,
    {
        Self::new(shape, FnEvaluator(body))
    }

    #[must_use]
    pub fn shape(&self) -> &ParamShape {
        &self.shape
    }

    #[must_use]
    pub fn name(&self) -> &Rc<str> {
        self.shape.name()
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Code").field("shape", &self.shape).finish_non_exhaustive()
    }
}

/// Activation record of one function call.
///
/// Locals are indexed as in [`ParamShape::varnames`]. Cells hold the cell
/// variables of the code followed by the free variables taken from the closure.
#[derive(Debug, Clone)]
pub struct Frame {
    code: Rc<Code>,
    globals: HeapId,
    builtins: HeapId,
    locals: Vec<Option<Value>>,
    cells: Vec<HeapId>,
}

impl Frame {
    pub(crate) fn new(
        code: Rc<Code>,
        globals: HeapId,
        builtins: HeapId,
        locals: Vec<Option<Value>>,
        cells: Vec<HeapId>,
    ) -> Self {
        Self {
            code,
            globals,
            builtins,
            locals,
            cells,
        }
    }

    #[must_use]
    pub fn code(&self) -> &Rc<Code> {
        &self.code
    }

    #[must_use]
    pub fn globals(&self) -> HeapId {
        self.globals
    }

    #[must_use]
    pub fn builtins(&self) -> HeapId {
        self.builtins
    }

    #[must_use]
    pub fn locals(&self) -> &[Option<Value>] {
        &self.locals
    }

    #[must_use]
    pub fn local(&self, index: usize) -> Option<&Value> {
        self.locals.get(index)?.as_ref()
    }

    #[must_use]
    pub fn local_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.code.shape().varnames().iter().position(|v| &**v == name)?;
        self.local(index)
    }

    /// Binds a local slot, failing when the code has no such slot.
    pub fn set_local(&mut self, index: usize, value: Value) -> RunResult<()> {
        let slot = self
            .locals
            .get_mut(index)
            .ok_or_else(|| RunError::internal(format!("local slot {index} out of range for `{}`", self.code.name())))?;
        *slot = Some(value);
        Ok(())
    }

    /// Heap ids of the cells: cell variables first, then free variables.
    #[must_use]
    pub fn cells(&self) -> &[HeapId] {
        &self.cells
    }

    #[must_use]
    pub fn cell(&self, index: usize) -> Option<HeapId> {
        self.cells.get(index).copied()
    }

    /// Reads a cell, failing when it is unbound.
    pub fn cell_value(&self, rt: &Runtime, index: usize) -> RunResult<Value> {
        self.cell(index)
            .and_then(|id| rt.cell_contents(&Value::Ref(id)))
            .ok_or_else(ExcType::cell_is_empty)
    }

    /// Stores into a cell, failing when the frame has no such cell.
    pub fn set_cell_value(&self, rt: &mut Runtime, index: usize, value: Value) -> RunResult<()> {
        let id = self
            .cell(index)
            .ok_or_else(|| RunError::internal(format!("cell {index} out of range for `{}`", self.code.name())))?;
        match rt.heap.get_mut(id) {
            HeapData::Cell(contents) => {
                *contents = Some(value);
                Ok(())
            }
            _ => Err(RunError::internal(format!("cell {index} of `{}` is not a cell object", self.code.name()))),
        }
    }

    /// Runs the frame's code through its evaluator.
    pub fn run(&mut self, rt: &mut Runtime, ts: &mut ThreadContext) -> RunResult<Value> {
        let code = Rc::clone(&self.code);
        code.body.eval(rt, ts, self)
    }
}
