//! A registry that shadows its parent for the subtree below a mount point.
use crate::action::{Action, ActionList};
use crate::context::Context;
use crate::error::{ParseError, RuleError};
use crate::rules::{DefaultRuleManager, RuleManager};
use std::sync::Arc;

/// Rules that apply only beneath the element that opened them.
///
/// Registration and matching go to the delegate alone; the parent is kept only so
/// it can be made active again when the scope closes. Once inside the scope the
/// subtree is stand-alone: parent rules are not consulted, even though the path
/// still carries the ancestor segments.
#[derive(Debug)]
pub struct ScopedRuleManager {
    parent: Arc<dyn RuleManager>,
    delegate: Box<dyn RuleManager>,
    mount_point: String,
}

impl ScopedRuleManager {
    /// A scope with an empty `DefaultRuleManager` as its delegate.
    pub fn new(parent: Arc<dyn RuleManager>, mount_point: impl Into<String>) -> Self {
        Self::with_delegate(parent, Box::new(DefaultRuleManager::new()), mount_point)
    }

    pub fn with_delegate(
        parent: Arc<dyn RuleManager>,
        delegate: Box<dyn RuleManager>,
        mount_point: impl Into<String>,
    ) -> Self {
        Self {
            parent,
            delegate,
            mount_point: mount_point.into(),
        }
    }

    /// The path of the element that opened this scope.
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn delegate(&self) -> &dyn RuleManager {
        self.delegate.as_ref()
    }
}

impl RuleManager for ScopedRuleManager {
    fn add_namespace(&mut self, prefix: &str, uri: &str) {
        self.delegate.add_namespace(prefix, uri);
    }

    fn add_rule(&mut self, pattern: &str, action: Arc<dyn Action>) -> Result<(), RuleError> {
        self.delegate.add_rule(pattern, action)
    }

    fn add_fallback_action(&mut self, action: Arc<dyn Action>) {
        self.delegate.add_fallback_action(action);
    }

    fn add_fallback_actions(&mut self, actions: ActionList) {
        self.delegate.add_fallback_actions(actions);
    }

    fn add_mandatory_action(&mut self, action: Arc<dyn Action>) {
        self.delegate.add_mandatory_action(action);
    }

    fn add_mandatory_actions(&mut self, actions: ActionList) {
        self.delegate.add_mandatory_actions(actions);
    }

    fn matching_actions(&self, path: &str) -> ActionList {
        self.delegate.matching_actions(path)
    }

    fn actions(&self) -> ActionList {
        self.delegate.actions()
    }

    fn copy(&self) -> Result<Box<dyn RuleManager>, RuleError> {
        Err(RuleError::CopyUnsupported)
    }

    fn start_parse(&self, ctx: &mut Context) -> Result<(), ParseError> {
        self.delegate.start_parse(ctx)
    }

    fn finish_parse(&self, ctx: &mut Context) -> Result<(), ParseError> {
        self.delegate.finish_parse(ctx)
    }

    fn parent(&self) -> Option<Arc<dyn RuleManager>> {
        Some(self.parent.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::new_object;
    use crate::factory::TypeRegistry;

    struct Tagged(&'static str);

    impl Action for Tagged {
        fn start_parse(&self, ctx: &mut Context) -> Result<(), ParseError> {
            ctx.push_named("started", new_object(self.0));
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn parent_rules() -> Arc<dyn RuleManager> {
        let mut parent = DefaultRuleManager::new();
        parent.add_rule("item", Arc::new(Tagged("parent-item"))).unwrap();
        parent.add_fallback_action(Arc::new(Tagged("parent-fallback")));
        Arc::new(parent)
    }

    #[test]
    fn test_registration_goes_to_delegate_only() {
        let parent = parent_rules();
        let mut scoped = ScopedRuleManager::new(parent.clone(), "/root/plugin");
        scoped.add_namespace("p", "urn:p");
        scoped.add_rule("p:item", Arc::new(Tagged("scoped-item"))).unwrap();
        scoped.add_mandatory_action(Arc::new(Tagged("scoped-mandatory")));

        assert_eq!(parent.actions().len(), 2);
        assert!(parent.matching_actions("/root/{urn:p}item").iter().all(|a| a.name() != "scoped-item"));

        let names: Vec<String> = scoped
            .matching_actions("/root/plugin/{urn:p}item")
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["scoped-item", "scoped-mandatory"]);
    }

    #[test]
    fn test_parent_rules_are_not_consulted() {
        let scoped = ScopedRuleManager::new(parent_rules(), "/root/plugin");
        assert!(scoped.matching_actions("/root/plugin/item").is_empty());
        assert_eq!(scoped.mount_point(), "/root/plugin");
    }

    #[test]
    fn test_parent_is_exposed_and_copy_is_refused() {
        let parent = parent_rules();
        let scoped = ScopedRuleManager::new(parent.clone(), "/root");
        assert!(Arc::ptr_eq(&scoped.parent().unwrap(), &parent));
        assert_eq!(scoped.copy().unwrap_err(), RuleError::CopyUnsupported);
    }

    #[test]
    fn test_lifecycle_reaches_delegate_actions_only() {
        let parent = parent_rules();
        let mut scoped = ScopedRuleManager::new(parent.clone(), "/root");
        scoped.add_rule("x", Arc::new(Tagged("scoped"))).unwrap();

        let mut ctx = Context::new(parent, Arc::new(TypeRegistry::new()));
        scoped.start_parse(&mut ctx).unwrap();
        let started = ctx.pop_named("started").unwrap();
        assert_eq!(started.borrow().downcast_ref::<&str>(), Some(&"scoped"));
        assert!(ctx.is_named_empty("started"));
    }
}
