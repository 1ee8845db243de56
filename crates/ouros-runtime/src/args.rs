use crate::{
    exception_private::{ExcType, RunResult},
    types::Dict,
    value::Value,
};

/// Arguments of a call into a native method or constructor.
///
/// Borrows the positional arguments and the optional keyword mapping of a
/// classic call. The `get_*` helpers check the argument count the way native
/// methods report it and hand out owned values.
#[derive(Debug, Clone, Copy)]
pub struct ArgValues<'a> {
    args: &'a [Value],
    kwargs: Option<&'a Dict>,
}

impl<'a> ArgValues<'a> {
    #[must_use]
    pub fn new(args: &'a [Value], kwargs: Option<&'a Dict>) -> Self {
        Self { args, kwargs }
    }

    #[must_use]
    pub fn positional(&self) -> &'a [Value] {
        self.args
    }

    /// The keyword mapping, `None` when empty.
    #[must_use]
    pub fn kwargs(&self) -> Option<&'a Dict> {
        self.kwargs.filter(|kwargs| !kwargs.is_empty())
    }

    #[must_use]
    pub fn has_kwargs(&self) -> bool {
        self.kwargs().is_some()
    }

    /// Number of positional plus keyword arguments.
    #[must_use]
    pub fn count(&self) -> usize {
        self.args.len() + self.kwargs().map_or(0, Dict::len)
    }

    /// Checks that no keyword arguments were passed.
    pub fn check_no_kwargs(&self, name: &str) -> RunResult<()> {
        if self.has_kwargs() {
            Err(ExcType::type_error_no_kwargs(name))
        } else {
            Ok(())
        }
    }

    /// Checks that zero arguments were passed.
    pub fn check_zero_args(&self, name: &str) -> RunResult<()> {
        if self.count() == 0 {
            Ok(())
        } else {
            Err(ExcType::type_error_no_args(name, self.count()))
        }
    }

    /// Checks that exactly one positional argument was passed, returning it.
    pub fn get_one_arg(&self, name: &str) -> RunResult<Value> {
        self.check_no_kwargs(name)?;
        match self.args {
            [a] => Ok(a.clone()),
            _ => Err(ExcType::type_error_arg_count(name, 1, self.count())),
        }
    }

    /// Checks that exactly two positional arguments were passed.
    pub fn get_two_args(&self, name: &str) -> RunResult<(Value, Value)> {
        self.check_no_kwargs(name)?;
        match self.args {
            [a, b] => Ok((a.clone(), b.clone())),
            _ => Err(ExcType::type_error_arg_count(name, 2, self.count())),
        }
    }

    /// Checks that exactly three positional arguments were passed.
    pub fn get_three_args(&self, name: &str) -> RunResult<(Value, Value, Value)> {
        self.check_no_kwargs(name)?;
        match self.args {
            [a, b, c] => Ok((a.clone(), b.clone(), c.clone())),
            _ => Err(ExcType::type_error_arg_count(name, 3, self.count())),
        }
    }

    /// Checks that one or two positional arguments were passed.
    pub fn get_one_two_args(&self, name: &str) -> RunResult<(Value, Option<Value>)> {
        self.check_no_kwargs(name)?;
        match self.args {
            [a] => Ok((a.clone(), None)),
            [a, b] => Ok((a.clone(), Some(b.clone()))),
            [] => Err(ExcType::type_error_at_least(name, 1, 0)),
            _ => Err(ExcType::type_error_at_most(name, 2, self.count())),
        }
    }

    /// Checks that zero or one positional argument was passed.
    pub fn get_zero_one_arg(&self, name: &str) -> RunResult<Option<Value>> {
        self.check_no_kwargs(name)?;
        match self.args {
            [] => Ok(None),
            [a] => Ok(Some(a.clone())),
            _ => Err(ExcType::type_error_at_most(name, 1, self.count())),
        }
    }

    /// Looks up a keyword argument by name.
    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&'a Value> {
        self.kwargs?.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_keywords() {
        let mut kwargs = Dict::default();
        kwargs.insert("x".into(), Value::Int(1));
        let args = [Value::None];
        let values = ArgValues::new(&args, Some(&kwargs));
        assert_eq!(values.count(), 2);
        let err = values.check_zero_args("f").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: f() takes no arguments (2 given)");
        let err = values.get_one_arg("f").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: f() takes no keyword arguments");
    }

    #[test]
    fn empty_kwargs_are_ignored() {
        let kwargs = Dict::default();
        let args = [Value::Int(1), Value::Int(2)];
        let values = ArgValues::new(&args, Some(&kwargs));
        assert!(!values.has_kwargs());
        assert_eq!(values.get_one_two_args("f").unwrap(), (Value::Int(1), Some(Value::Int(2))));
        let err = values.get_zero_one_arg("g").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: g expected at most 1 argument, got 2");
    }
}
