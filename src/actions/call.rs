use std::any::Any;
use std::marker::PhantomData;
use xmldigest_core::{Action, Attributes, Context, ParseError};

/// Calls a method on the top object when the element ends.
///
/// With `param_count == 0` the method receives the element's body text as its
/// only parameter. Otherwise the parameters are collected by [`ParamAction`]s
/// registered on the element or its descendants.
pub struct CallAction<T, F> {
    param_count: usize,
    call: F,
    _target: PhantomData<fn(&mut T)>,
}

impl<T, F> CallAction<T, F>
where
    T: Any,
    F: Fn(&mut T, &[Option<String>]) -> Result<(), ParseError> + Send + Sync,
{
    pub fn new(param_count: usize, call: F) -> Self {
        Self {
            param_count,
            call,
            _target: PhantomData,
        }
    }

    fn frame_len(&self) -> usize {
        self.param_count.max(1)
    }
}

impl<T, F> Action for CallAction<T, F>
where
    T: Any,
    F: Fn(&mut T, &[Option<String>]) -> Result<(), ParseError> + Send + Sync,
{
    fn begin(&self, ctx: &mut Context, _namespace: &str, _name: &str, _attrs: &Attributes) -> Result<(), ParseError> {
        ctx.push_params(vec![None; self.frame_len()]);
        Ok(())
    }

    fn body(&self, ctx: &mut Context, _namespace: &str, _name: &str, text: &str) -> Result<(), ParseError> {
        if self.param_count == 0 {
            ctx.peek_params_mut()?[0] = Some(text.to_string());
        }
        Ok(())
    }

    fn end(&self, ctx: &mut Context, _namespace: &str, _name: &str) -> Result<(), ParseError> {
        let params = ctx.pop_params()?;
        log::trace!("Calling {} with {:?} at '{}'", self.name(), params, ctx.path());
        ctx.with_top(|target: &mut T| (self.call)(target, &params))?
    }

    fn name(&self) -> &str {
        "CallAction"
    }
}

/// Fills one parameter of the enclosing [`CallAction`], from an attribute or from the body text.
#[derive(Debug, Clone)]
pub struct ParamAction {
    index: usize,
    attribute: Option<String>,
}

impl ParamAction {
    /// Takes the parameter from the element's body text.
    pub fn from_body(index: usize) -> Self {
        Self {
            index,
            attribute: None,
        }
    }

    pub fn from_attribute(index: usize, attribute: impl Into<String>) -> Self {
        Self {
            index,
            attribute: Some(attribute.into()),
        }
    }

    fn set(&self, ctx: &mut Context, value: Option<String>) -> Result<(), ParseError> {
        let index = self.index;
        let params = ctx.peek_params_mut()?;
        let count = params.len();
        let slot = params.get_mut(index).ok_or_else(|| {
            ParseError::new(format!("parameter index {} out of range for a call taking {}", index, count))
        })?;
        *slot = value;
        Ok(())
    }
}

impl Action for ParamAction {
    fn begin(&self, ctx: &mut Context, _namespace: &str, _name: &str, attrs: &Attributes) -> Result<(), ParseError> {
        match &self.attribute {
            Some(attr) => self.set(ctx, attrs.get(attr).map(str::to_string)),
            None => Ok(()),
        }
    }

    fn body(&self, ctx: &mut Context, _namespace: &str, _name: &str, text: &str) -> Result<(), ParseError> {
        match self.attribute {
            Some(_) => Ok(()),
            None => self.set(ctx, Some(text.to_string())),
        }
    }
}
