use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;
use xmldigest_core::{Action, Context, ParseError};

/// Hands the object on top of the stack to the one beneath it when the element ends.
///
/// Register it after the action that creates the child: `end` runs in reverse
/// registration order, so the child is still on the stack when the link is made.
pub struct LinkAction<P, C, F> {
    link: F,
    _types: PhantomData<fn(&mut P, &C)>,
}

impl<P, C, F> LinkAction<P, C, F>
where
    P: Any,
    C: Any,
    F: Fn(&mut P, &C) + Send + Sync,
{
    pub fn new(link: F) -> Self {
        Self {
            link,
            _types: PhantomData,
        }
    }
}

impl<P, C, F> Action for LinkAction<P, C, F>
where
    P: Any,
    C: Any,
    F: Fn(&mut P, &C) + Send + Sync,
{
    fn end(&self, ctx: &mut Context, _namespace: &str, _name: &str) -> Result<(), ParseError> {
        let child = ctx.peek()?;
        let parent = ctx.peek_at(1)?;
        if Rc::ptr_eq(child, parent) {
            return Err(ParseError::new("cannot link an object to itself"));
        }

        let child = child.borrow();
        let child = child.downcast_ref::<C>().ok_or_else(ParseError::type_mismatch::<C>)?;
        let mut parent = parent.borrow_mut();
        let parent = parent.downcast_mut::<P>().ok_or_else(ParseError::type_mismatch::<P>)?;
        (self.link)(parent, child);
        Ok(())
    }

    fn name(&self) -> &str {
        "LinkAction"
    }
}
