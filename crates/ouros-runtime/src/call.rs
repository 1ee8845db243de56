//! The call protocol.
//!
//! Two conventions coexist:
//!
//! - *classic*: a positional slice plus an optional keyword mapping, dispatched
//!   through the `call` slot;
//! - *vectorcall*: one flat stack holding positional values followed by keyword
//!   values, a start offset, a positional count and the keyword names aligned with
//!   the trailing values, dispatched through the `vectorcall` slot.
//!
//! Functions, bound methods and native descriptors implement vectorcall directly and
//! derive their classic slot from it through [`call_via_vectorcall`]. Callables
//! without a vectorcall slot are reached from [`vectorcall`] by converting the stack
//! back into the classic form.

use crate::{
    attr,
    exception_private::{ExcType, RunError, RunResult},
    runtime::Runtime,
    signature, slot,
    thread_context::ThreadContext,
    types::Dict,
    value::Value,
};

/// Calls `callable(*args, **kwargs)`.
pub fn call(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    ts.enter_recursive_call(rt.tracer_mut())?;
    let result = call_inner(rt, ts, callable, args, kwargs);
    ts.leave_recursive_call();
    result
}

fn call_inner(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    if let Some(result) = slot::invoke_call(rt, ts, callable, args, kwargs)? {
        return Ok(result);
    }
    // no classic slot: a callable that only speaks vectorcall
    let kwargs = kwargs.filter(|kwargs| !kwargs.is_empty());
    let outcome = match kwargs {
        Some(kwargs) => {
            let (stack, kwnames) = unpack_dict(args, kwargs);
            slot::invoke_vectorcall(rt, ts, callable, &stack, 0, args.len(), &kwnames)?
        }
        None => slot::invoke_vectorcall(rt, ts, callable, args, 0, args.len(), &[])?,
    };
    outcome.ok_or_else(|| ExcType::not_callable(rt.type_name_of(callable)))
}

/// Calls `callable` with vectorcall arguments.
///
/// `stack[start..start + nargs]` are the positional arguments; the values following
/// them pair up with `kwnames`.
pub fn vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    signature::check_vector_layout(stack, start, nargs, kwnames)?;
    ts.enter_recursive_call(rt.tracer_mut())?;
    let result = vectorcall_inner(rt, ts, callable, stack, start, nargs, kwnames);
    ts.leave_recursive_call();
    result
}

fn vectorcall_inner(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    stack: &[Value],
    start: usize,
    nargs: usize,
    kwnames: &[Value],
) -> RunResult<Value> {
    if let Some(result) = slot::invoke_vectorcall(rt, ts, callable, stack, start, nargs, kwnames)? {
        return Ok(result);
    }
    let kwargs = stack_as_dict(stack, start + nargs, kwnames)?;
    slot::invoke_call(rt, ts, callable, &stack[start..start + nargs], kwargs.as_ref())?
        .ok_or_else(|| ExcType::not_callable(rt.type_name_of(callable)))
}

/// Builds the keyword mapping of a vectorcall.
///
/// Returns `None` when there are no keywords. Keyword names must be strings and
/// may not repeat.
pub fn stack_as_dict(stack: &[Value], kw_start: usize, kwnames: &[Value]) -> RunResult<Option<Dict>> {
    if kwnames.is_empty() {
        return Ok(None);
    }
    if kw_start.checked_add(kwnames.len()).is_none_or(|end| end > stack.len()) {
        return Err(RunError::internal(format!(
            "{} keyword names but {} values after index {kw_start}",
            kwnames.len(),
            stack.len().saturating_sub(kw_start)
        )));
    }
    let mut kwargs = Dict::with_capacity_and_hasher(kwnames.len(), ahash::RandomState::default());
    for (key, value) in kwnames.iter().zip(&stack[kw_start..]) {
        let Value::Str(name) = key else {
            return Err(ExcType::keywords_must_be_strings(None));
        };
        if kwargs.insert(name.clone(), value.clone()).is_some() {
            return Err(ExcType::repeated_keyword(name));
        }
    }
    Ok(Some(kwargs))
}

/// Splits classic arguments into a vectorcall stack and its keyword names.
#[must_use]
pub fn unpack_dict(args: &[Value], kwargs: &Dict) -> (Vec<Value>, Vec<Value>) {
    let mut stack = Vec::with_capacity(args.len() + kwargs.len());
    stack.extend_from_slice(args);
    let mut kwnames = Vec::with_capacity(kwargs.len());
    for (name, value) in kwargs {
        kwnames.push(Value::Str(name.clone()));
        stack.push(value.clone());
    }
    (stack, kwnames)
}

/// Classic-call slot shared by every type whose canonical convention is vectorcall.
pub(crate) fn call_via_vectorcall(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    callable: &Value,
    args: &[Value],
    kwargs: Option<&Dict>,
) -> RunResult<Value> {
    let outcome = match kwargs {
        Some(kwargs) if !kwargs.is_empty() => {
            let (stack, kwnames) = unpack_dict(args, kwargs);
            slot::invoke_vectorcall(rt, ts, callable, &stack, 0, args.len(), &kwnames)?
        }
        _ => slot::invoke_vectorcall(rt, ts, callable, args, 0, args.len(), &[])?,
    };
    outcome.ok_or_else(|| ExcType::not_callable(rt.type_name_of(callable)))
}

/// Calls `callable(*args)` without keywords.
pub fn call_function(rt: &mut Runtime, ts: &mut ThreadContext, callable: &Value, args: &[Value]) -> RunResult<Value> {
    vectorcall(rt, ts, callable, args, 0, args.len(), &[])
}

/// Calls `callable()`.
pub fn call_no_args(rt: &mut Runtime, ts: &mut ThreadContext, callable: &Value) -> RunResult<Value> {
    vectorcall(rt, ts, callable, &[], 0, 0, &[])
}

/// Calls `obj.name(*args)`.
pub fn call_method(
    rt: &mut Runtime,
    ts: &mut ThreadContext,
    obj: &Value,
    name: &str,
    args: &[Value],
) -> RunResult<Value> {
    let method = attr::get_attribute(rt, ts, obj, name)?;
    call_function(rt, ts, &method, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_as_dict_pairs_trailing_values() {
        let stack = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let kwargs = stack_as_dict(&stack, 1, &[Value::from("a"), Value::from("b")])
            .unwrap()
            .unwrap();
        assert_eq!(kwargs.get("a"), Some(&Value::Int(2)));
        assert_eq!(kwargs.get("b"), Some(&Value::Int(3)));
        assert!(stack_as_dict(&stack, 3, &[]).unwrap().is_none());
    }

    #[test]
    fn stack_as_dict_rejects_bad_names() {
        let stack = [Value::Int(1), Value::Int(2)];
        let err = stack_as_dict(&stack, 0, &[Value::Int(0)]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: keywords must be strings");
        let err = stack_as_dict(&stack, 0, &[Value::from("a"), Value::from("a")]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: got multiple values for keyword argument 'a'");
    }

    #[test]
    fn unpack_dict_appends_keyword_values() {
        let mut kwargs = Dict::default();
        kwargs.insert("k".into(), Value::Int(9));
        let (stack, kwnames) = unpack_dict(&[Value::Int(1)], &kwargs);
        assert_eq!(stack, [Value::Int(1), Value::Int(9)]);
        assert_eq!(kwnames, [Value::from("k")]);
    }
}
