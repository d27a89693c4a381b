//! Subtrees whose elements are mapped by their own rule set.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use xmldigest_core::{
    Action, ActionList, Attributes, Context, ParseError, RuleError, RuleManager,
    ScopedRuleManager,
};

/// A set of rules installed into a fresh registry on demand.
pub trait RuleSet: Send + Sync {
    fn add_rule_instances(&self, rules: &mut dyn RuleManager) -> Result<(), RuleError>;
}

impl<F> RuleSet for F
where
    F: Fn(&mut dyn RuleManager) -> Result<(), RuleError> + Send + Sync,
{
    fn add_rule_instances(&self, rules: &mut dyn RuleManager) -> Result<(), RuleError> {
        self(rules)
    }
}

/// Switches to a dedicated rule set for the subtree below the matched element.
///
/// The set is picked by the value of a selector attribute, or the default set
/// when the attribute is absent. The scoped rules replace the enclosing ones
/// until the element ends; the actions they match for the element itself are
/// run alongside this one.
pub struct NestedRulesAction {
    /// Tags the scopes this action opens.
    id: usize,
    sets: HashMap<String, Arc<dyn RuleSet>>,
    selector: Option<String>,
    default_set: Option<String>,
}

impl fmt::Debug for NestedRulesAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.sets.keys().collect();
        names.sort();
        f.debug_struct("NestedRulesAction")
            .field("sets", &names)
            .field("selector", &self.selector)
            .field("default_set", &self.default_set)
            .finish()
    }
}

impl Default for NestedRulesAction {
    fn default() -> Self {
        Self::new()
    }
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

impl NestedRulesAction {
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            sets: HashMap::new(),
            selector: None,
            default_set: None,
        }
    }

    /// A single rule set used for every matching element.
    pub fn single(set: impl RuleSet + 'static) -> Self {
        Self::new().with_set("default", set).with_default_set("default")
    }

    pub fn with_set(mut self, name: impl Into<String>, set: impl RuleSet + 'static) -> Self {
        self.sets.insert(name.into(), Arc::new(set));
        self
    }

    /// Names the attribute whose value selects the rule set.
    pub fn with_selector(mut self, attribute: impl Into<String>) -> Self {
        self.selector = Some(attribute.into());
        self
    }

    pub fn with_default_set(mut self, name: impl Into<String>) -> Self {
        self.default_set = Some(name.into());
        self
    }

    fn select(&self, attrs: &Attributes) -> Result<&Arc<dyn RuleSet>, ParseError> {
        let selected = self.selector.as_deref().and_then(|attr| attrs.get(attr));
        let name = match (selected, self.default_set.as_deref()) {
            (Some(name), _) | (None, Some(name)) => name,
            (None, None) => {
                return Err(ParseError::MissingAttribute(
                    self.selector.clone().unwrap_or_default(),
                ));
            }
        };
        self.sets
            .get(name)
            .ok_or_else(|| ParseError::UnknownRuleSet(name.to_string()))
    }

    /// The mount actions of the scope this action opened at the current element.
    fn mount_actions(&self, ctx: &Context) -> Result<ActionList, ParseError> {
        ctx.owned_rule_scope(self.id)
            .map(|frame| frame.mount_actions.clone())
            .ok_or_else(|| ParseError::NoRuleScope(ctx.path().to_string()))
    }

    fn open_scope(
        &self,
        ctx: &mut Context,
        namespace: &str,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let set = self.select(attrs)?;
        let mut scoped = ScopedRuleManager::new(ctx.rule_manager(), ctx.path());
        set.add_rule_instances(&mut scoped)?;
        let scoped: Arc<dyn RuleManager> = Arc::new(scoped);

        let mount_actions = scoped.matching_actions(ctx.path());
        ctx.push_owned_rule_scope(self.id, scoped.clone(), mount_actions.clone());
        scoped.start_parse(ctx)?;
        for action in &mount_actions {
            action.begin(ctx, namespace, name, attrs)?;
        }
        Ok(())
    }
}

impl Action for NestedRulesAction {
    fn begin(&self, ctx: &mut Context, namespace: &str, name: &str, attrs: &Attributes) -> Result<(), ParseError> {
        let result = self.open_scope(ctx, namespace, name, attrs);
        if result.is_err() && ctx.owned_rule_scope(self.id).is_some() {
            ctx.pop_owned_rule_scope(self.id)?;
        }
        result
    }

    fn body_segment(&self, ctx: &mut Context, namespace: &str, name: &str, text: &str) -> Result<(), ParseError> {
        for action in self.mount_actions(ctx)? {
            action.body_segment(ctx, namespace, name, text)?;
        }
        Ok(())
    }

    fn body(&self, ctx: &mut Context, namespace: &str, name: &str, text: &str) -> Result<(), ParseError> {
        for action in self.mount_actions(ctx)? {
            action.body(ctx, namespace, name, text)?;
        }
        Ok(())
    }

    fn end(&self, ctx: &mut Context, namespace: &str, name: &str) -> Result<(), ParseError> {
        let mount_actions = self.mount_actions(ctx)?;
        let mut result = Ok(());
        for action in mount_actions.iter().rev() {
            result = action.end(ctx, namespace, name);
            if result.is_err() {
                break;
            }
        }
        let frame = ctx.pop_owned_rule_scope(self.id)?;
        let finished = frame.rules.finish_parse(ctx);
        result.and(finished)
    }
}
