//! Parameter shapes and argument binding.
//!
//! A [`ParamShape`] describes the parameters of a function: positional (some of
//! them positional-only), keyword-only, the `*args`/`**kwargs` collectors, and the
//! names of cell and free variables. [`bind_arguments`] turns the actual arguments
//! of a call into the locals and cells of a fresh [`Frame`].
//!
//! Locals are laid out as
//! `[positional.., keyword-only.., *args?, **kwargs?, other locals..]`.

use std::rc::Rc;

use crate::{
    call,
    exception_private::{ExcType, RunError, RunResult},
    frame::Frame,
    heap::HeapId,
    runtime::Runtime,
    types::{Dict, Function},
    value::Value,
};

/// Declared parameters and variable layout of a code object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamShape {
    name: Rc<str>,
    varnames: Vec<Rc<str>>,
    argcount: usize,
    posonlyargcount: usize,
    kwonlyargcount: usize,
    has_varargs: bool,
    has_varkeywords: bool,
    cellvars: Vec<Rc<str>>,
    freevars: Vec<Rc<str>>,
    /// For each cell variable, the index of the parameter it shadows.
    cell2arg: Vec<Option<usize>>,
}

impl ParamShape {
    #[must_use]
    pub fn builder(name: impl Into<Rc<str>>) -> ParamShapeBuilder {
        ParamShapeBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    /// Parameter names followed by the other local variable names.
    #[must_use]
    pub fn varnames(&self) -> &[Rc<str>] {
        &self.varnames
    }

    #[must_use]
    pub fn argcount(&self) -> usize {
        self.argcount
    }

    #[must_use]
    pub fn posonlyargcount(&self) -> usize {
        self.posonlyargcount
    }

    #[must_use]
    pub fn kwonlyargcount(&self) -> usize {
        self.kwonlyargcount
    }

    #[must_use]
    pub fn has_varargs(&self) -> bool {
        self.has_varargs
    }

    #[must_use]
    pub fn has_varkeywords(&self) -> bool {
        self.has_varkeywords
    }

    #[must_use]
    pub fn cellvars(&self) -> &[Rc<str>] {
        &self.cellvars
    }

    #[must_use]
    pub fn freevars(&self) -> &[Rc<str>] {
        &self.freevars
    }

    /// Number of parameter slots, collectors included.
    #[must_use]
    pub fn total_args(&self) -> usize {
        self.argcount + self.kwonlyargcount + usize::from(self.has_varargs) + usize::from(self.has_varkeywords)
    }

    #[must_use]
    pub fn nlocals(&self) -> usize {
        self.varnames.len()
    }

    /// Only plain positional parameters and no cells: binding may copy arguments directly.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.kwonlyargcount == 0
            && !self.has_varargs
            && !self.has_varkeywords
            && self.cellvars.is_empty()
            && self.freevars.is_empty()
    }
}

/// Builder for [`ParamShape`].
#[derive(Debug, Clone)]
pub struct ParamShapeBuilder {
    name: Rc<str>,
    positional: Vec<Rc<str>>,
    posonly: usize,
    kwonly: Vec<Rc<str>>,
    varargs: Option<Rc<str>>,
    varkeywords: Option<Rc<str>>,
    locals: Vec<Rc<str>>,
    cellvars: Vec<Rc<str>>,
    freevars: Vec<Rc<str>>,
}

impl ParamShapeBuilder {
    fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            positional: Vec::new(),
            posonly: 0,
            kwonly: Vec::new(),
            varargs: None,
            varkeywords: None,
            locals: Vec::new(),
            cellvars: Vec::new(),
            freevars: Vec::new(),
        }
    }

    #[must_use]
    pub fn positional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.positional.extend(names.into_iter().map(Into::into));
        self
    }

    /// Marks the first `count` positional parameters as positional-only.
    #[must_use]
    pub fn posonly(mut self, count: usize) -> Self {
        self.posonly = count;
        self
    }

    #[must_use]
    pub fn kwonly<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.kwonly.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn varargs(mut self, name: impl Into<Rc<str>>) -> Self {
        self.varargs = Some(name.into());
        self
    }

    #[must_use]
    pub fn varkeywords(mut self, name: impl Into<Rc<str>>) -> Self {
        self.varkeywords = Some(name.into());
        self
    }

    /// Local variables that are not parameters.
    #[must_use]
    pub fn locals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.locals.extend(names.into_iter().map(Into::into));
        self
    }

    /// Variables captured by nested scopes.
    #[must_use]
    pub fn cellvars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.cellvars.extend(names.into_iter().map(Into::into));
        self
    }

    /// Variables taken from the enclosing scope's closure.
    #[must_use]
    pub fn freevars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.freevars.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> RunResult<ParamShape> {
        if self.posonly > self.positional.len() {
            return Err(RunError::internal(format!(
                "code `{}`: {} positional-only parameters but only {} positional",
                self.name,
                self.posonly,
                self.positional.len()
            )));
        }
        let argcount = self.positional.len();
        let kwonlyargcount = self.kwonly.len();
        let has_varargs = self.varargs.is_some();
        let has_varkeywords = self.varkeywords.is_some();

        let mut varnames = self.positional;
        varnames.extend(self.kwonly);
        varnames.extend(self.varargs);
        varnames.extend(self.varkeywords);
        let total_args = varnames.len();
        varnames.extend(self.locals);

        let cell2arg = self
            .cellvars
            .iter()
            .map(|cell| varnames[..total_args].iter().position(|arg| arg == cell))
            .collect();

        Ok(ParamShape {
            name: self.name,
            varnames,
            argcount,
            posonlyargcount: self.posonly,
            kwonlyargcount,
            has_varargs,
            has_varkeywords,
            cellvars: self.cellvars,
            freevars: self.freevars,
            cell2arg,
        })
    }
}

// ============================================================================
// Binding
// ============================================================================

/// Binds classic-call arguments for `function` into a new frame.
///
/// `function` must be a `function` object; anything else is a runtime defect.
pub fn bind_arguments(rt: &mut Runtime, function: &Value, args: &[Value], kwargs: Option<&Dict>) -> RunResult<Frame> {
    let func = rt.function(function)?;
    match kwargs {
        Some(kwargs) if !kwargs.is_empty() => {
            let (stack, kwnames) = call::unpack_dict(args, kwargs);
            bind(rt, &func, &stack, 0, args.len(), &kwnames)
        }
        _ => bind(rt, &func, args, 0, args.len(), &[]),
    }
}

/// Binds vectorcall arguments for `function` into a new frame.
pub fn bind_vector_arguments(
    rt: &mut Runtime,
    function: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Frame> {
    check_vector_layout(stack, start, nargs, kwnames)?;
    let func = rt.function(function)?;
    bind(rt, &func, stack, start, nargs, kwnames)
}

/// Fails unless `stack` holds `nargs` positionals from `start` followed by one value per keyword name.
pub(crate) fn check_vector_layout(stack: &[Value], start: usize, nargs: usize, kwnames: &[Value]) -> RunResult<()> {
    let needed = start.checked_add(nargs).and_then(|n| n.checked_add(kwnames.len()));
    match needed {
        Some(needed) if needed <= stack.len() => Ok(()),
        _ => Err(RunError::internal(format!(
            "vectorcall layout out of range: start {start} + {nargs} positional + {} keyword > stack of {}",
            kwnames.len(),
            stack.len()
        ))),
    }
}

pub(crate) fn bind(
    rt: &mut Runtime,
    func: &Function,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Frame> {
    let shape = func.code.shape();
    if kwnames.is_empty() {
        if func.fast && nargs == shape.argcount {
            let mut locals: Vec<Option<Value>> = stack[start..start + nargs].iter().cloned().map(Some).collect();
            locals.resize(shape.nlocals(), None);
            return Ok(new_frame(func, locals, Vec::new()));
        }
        if func.fast0 && nargs == 0 {
            let mut locals: Vec<Option<Value>> = func.defaults.iter().cloned().map(Some).collect();
            locals.resize(shape.nlocals(), None);
            return Ok(new_frame(func, locals, Vec::new()));
        }
    }
    bind_full(rt, func, stack, start, nargs, kwnames)
}

fn new_frame(func: &Function, locals: Vec<Option<Value>>, cells: Vec<HeapId>) -> Frame {
    Frame::new(Rc::clone(&func.code), func.globals, func.builtins, locals, cells)
}

fn bind_full(
    rt: &mut Runtime,
    func: &Function,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Frame> {
    let shape = func.code.shape();
    let name = &*func.qualname;
    let argcount = shape.argcount;
    let posonly = shape.posonlyargcount;
    let kwonly = shape.kwonlyargcount;
    let mut locals: Vec<Option<Value>> = vec![None; shape.nlocals()];

    let mut kwdict = if shape.has_varkeywords { Some(Dict::default()) } else { None };

    let bound = nargs.min(argcount);
    for (slot, value) in locals.iter_mut().zip(&stack[start..start + bound]) {
        *slot = Some(value.clone());
    }

    if shape.has_varargs {
        let extra = stack[start + bound..start + nargs].to_vec();
        locals[argcount + kwonly] = Some(rt.new_tuple(extra)?);
    }

    let kw_values = &stack[start + nargs..];
    for (key, value) in kwnames.iter().zip(kw_values) {
        let Some(keyword) = key.as_str() else {
            return Err(ExcType::keywords_must_be_strings(Some(name)));
        };
        let index = shape.varnames[posonly..argcount + kwonly]
            .iter()
            .position(|param| &**param == keyword)
            .map(|offset| offset + posonly);
        match (index, kwdict.as_mut()) {
            (Some(index), _) => {
                if locals[index].is_some() {
                    return Err(ExcType::type_error_multiple_values(name, keyword));
                }
                locals[index] = Some(value.clone());
            }
            (None, Some(kwdict)) => {
                if kwdict.insert(keyword.into(), value.clone()).is_some() {
                    return Err(ExcType::type_error_multiple_values(name, keyword));
                }
            }
            (None, None) => {
                let passed = positional_only_passed_as_keyword(shape, kwnames);
                if !passed.is_empty() {
                    return Err(ExcType::type_error_positional_only(name, &passed));
                }
                return Err(ExcType::type_error_unexpected_keyword(name, keyword));
            }
        }
    }

    if let Some(kwdict) = kwdict {
        let index = argcount + kwonly + usize::from(shape.has_varargs);
        locals[index] = Some(rt.new_dict(kwdict)?);
    }

    if nargs > argcount && !shape.has_varargs {
        let kw_given = locals[argcount..argcount + kwonly].iter().filter(|v| v.is_some()).count();
        return Err(ExcType::type_error_too_many_positional(
            name,
            argcount,
            func.defaults.len(),
            nargs,
            kw_given,
        ));
    }

    if nargs < argcount {
        let defcount = func.defaults.len();
        let first_default = argcount - defcount;
        let missing: Vec<&str> = (nargs..first_default)
            .filter(|&i| locals[i].is_none())
            .map(|i| &*shape.varnames[i])
            .collect();
        if !missing.is_empty() {
            return Err(ExcType::type_error_missing_args(name, "positional", &missing));
        }
        for i in nargs.max(first_default)..argcount {
            if locals[i].is_none() {
                locals[i] = Some(func.defaults[i - first_default].clone());
            }
        }
    }

    if kwonly > 0 {
        let mut missing = Vec::new();
        for i in argcount..argcount + kwonly {
            if locals[i].is_some() {
                continue;
            }
            let param = &shape.varnames[i];
            let default = func
                .kwdefaults
                .and_then(|id| rt.heap.dict(id))
                .and_then(|defaults| defaults.get(&**param))
                .cloned();
            match default {
                Some(default) => locals[i] = Some(default),
                None => missing.push(&**param),
            }
        }
        if !missing.is_empty() {
            return Err(ExcType::type_error_missing_args(name, "keyword-only", &missing));
        }
    }

    let mut cells = Vec::with_capacity(shape.cellvars.len() + func.closure.len());
    for arg in &shape.cell2arg {
        let contents = arg.and_then(|index| locals[index].take());
        let cell = rt.new_cell(contents)?;
        cells.extend(cell.ref_id());
    }
    cells.extend(func.closure.iter().copied());

    Ok(new_frame(func, locals, cells))
}

/// Names of positional-only parameters that were passed by keyword, in parameter order.
fn positional_only_passed_as_keyword<'a>(shape: &'a ParamShape, kwnames: &[Value]) -> Vec<&'a str> {
    shape.varnames[..shape.posonlyargcount]
        .iter()
        .filter(|param| kwnames.iter().any(|key| key.as_str() == Some(&***param)))
        .map(|param| &**param)
        .collect()
}
