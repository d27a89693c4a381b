//! The handler contract that rules bind to patterns.
use crate::attributes::Attributes;
use crate::context::Context;
use crate::error::ParseError;
use std::fmt;
use std::sync::Arc;

/// A shared, ordered list of actions.
pub type ActionList = Vec<Arc<dyn Action>>;

/// A handler fired for every element whose path matches one of its patterns.
///
/// An action takes `&self` everywhere: a single instance may be registered under
/// several patterns and shared between concurrent parses, so all per-parse state
/// lives in the [`Context`]. Every callback defaults to a no-op.
pub trait Action: Send + Sync {
    /// Called once before the first element of a parse.
    fn start_parse(&self, _ctx: &mut Context) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called when a matching element opens, in registration order.
    fn begin(
        &self,
        _ctx: &mut Context,
        _namespace: &str,
        _name: &str,
        _attrs: &Attributes,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called for each contiguous run of text directly inside a matching element.
    fn body_segment(
        &self,
        _ctx: &mut Context,
        _namespace: &str,
        _name: &str,
        _text: &str,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called once per matching element with all of its direct text merged.
    fn body(
        &self,
        _ctx: &mut Context,
        _namespace: &str,
        _name: &str,
        _text: &str,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called when a matching element closes, in reverse registration order.
    fn end(&self, _ctx: &mut Context, _namespace: &str, _name: &str) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called once after the last element of a parse.
    fn finish_parse(&self, _ctx: &mut Context) -> Result<(), ParseError> {
        Ok(())
    }

    /// A human-readable name used in logs and error messages.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity membership test; actions are compared by allocation, not value.
pub fn contains_action(list: &[Arc<dyn Action>], action: &Arc<dyn Action>) -> bool {
    list.iter().any(|a| Arc::ptr_eq(a, action))
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(i) => &full[i + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Action for Noop {}

    #[test]
    fn test_identity_membership() {
        let a: Arc<dyn Action> = Arc::new(Noop);
        let b: Arc<dyn Action> = Arc::new(Noop);
        let list = vec![a.clone()];
        assert!(contains_action(&list, &a));
        assert!(!contains_action(&list, &b));
    }

    #[test]
    fn test_default_name_is_short_type_name() {
        let a: Arc<dyn Action> = Arc::new(Noop);
        assert_eq!(a.name(), "Noop");
        assert_eq!(short_type_name("x::y::Link<a::B>"), "Link<a::B>");
    }
}
