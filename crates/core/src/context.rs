//! The per-parse state container handed to every action callback.
use crate::action::ActionList;
use crate::error::ParseError;
use crate::factory::ObjectFactory;
use crate::namespace::NamespaceScope;
use crate::path::PathTracker;
use crate::rules::RuleManager;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// A type-erased, shared, mutable object built during a parse.
pub type ObjectRef = Rc<RefCell<dyn Any>>;

/// Wraps a value for the object stack.
pub fn new_object<T: Any>(value: T) -> ObjectRef {
    Rc::new(RefCell::new(value))
}

/// Call parameters collected by cooperating actions for one pending call.
pub type ParamFrame = Vec<Option<String>>;

const OBJECT_STACK: &str = "objects";
const PARAM_STACK: &str = "params";

/// The actions matched for one open element, frozen at its start.
pub(crate) struct MatchFrame {
    pub(crate) actions: ActionList,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) body: String,
    pub(crate) segment: String,
}

/// A rule scope opened for a subtree.
pub struct ScopeFrame {
    pub rules: Arc<dyn RuleManager>,
    /// Depth of the element that opened the scope.
    pub mount_depth: usize,
    /// Actions the scoped rules matched for the mount element itself.
    pub mount_actions: ActionList,
    /// Identifies the action that opened the scope, when it asked to be tracked.
    pub owner: Option<usize>,
}

pub struct Context {
    path: PathTracker,
    objects: Vec<ObjectRef>,
    named: HashMap<String, Vec<ObjectRef>>,
    params: Vec<ParamFrame>,
    pub(crate) matches: Vec<MatchFrame>,
    scopes: Vec<ScopeFrame>,
    base_rules: Arc<dyn RuleManager>,
    namespaces: NamespaceScope,
    factory: Arc<dyn ObjectFactory>,
    root: Option<ObjectRef>,
}

impl Context {
    pub fn new(rules: Arc<dyn RuleManager>, factory: Arc<dyn ObjectFactory>) -> Self {
        Self {
            path: PathTracker::new(),
            objects: Vec::new(),
            named: HashMap::new(),
            params: Vec::new(),
            matches: Vec::new(),
            scopes: Vec::new(),
            base_rules: rules,
            namespaces: NamespaceScope::new(),
            factory,
            root: None,
        }
    }

    // --- Document position ---

    /// The path of the element currently being processed.
    pub fn path(&self) -> &str {
        self.path.current()
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub(crate) fn path_mut(&mut self) -> &mut PathTracker {
        &mut self.path
    }

    pub fn namespaces(&self) -> &NamespaceScope {
        &self.namespaces
    }

    pub(crate) fn namespaces_mut(&mut self) -> &mut NamespaceScope {
        &mut self.namespaces
    }

    pub fn factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.factory
    }

    // --- Object stack ---

    /// Pushes an object; the first object pushed onto an empty stack becomes the root.
    pub fn push(&mut self, object: ObjectRef) {
        if self.objects.is_empty() && self.root.is_none() {
            self.root = Some(object.clone());
        }
        self.objects.push(object);
    }

    pub fn pop(&mut self) -> Result<ObjectRef, ParseError> {
        self.objects
            .pop()
            .ok_or_else(|| ParseError::EmptyStack(OBJECT_STACK.to_string()))
    }

    pub fn peek(&self) -> Result<&ObjectRef, ParseError> {
        self.peek_at(0)
    }

    /// The object `n` places below the top.
    pub fn peek_at(&self, n: usize) -> Result<&ObjectRef, ParseError> {
        self.objects
            .len()
            .checked_sub(n + 1)
            .map(|i| &self.objects[i])
            .ok_or_else(|| ParseError::EmptyStack(OBJECT_STACK.to_string()))
    }

    pub fn stack_depth(&self) -> usize {
        self.objects.len()
    }

    /// Runs `f` against the top object, which must be a `T`.
    pub fn with_top<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ParseError> {
        let top = self.peek()?;
        let mut top = top.borrow_mut();
        let value = top.downcast_mut::<T>().ok_or_else(ParseError::type_mismatch::<T>)?;
        Ok(f(value))
    }

    pub fn root(&self) -> Option<&ObjectRef> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, root: ObjectRef) {
        self.root = Some(root);
    }

    pub(crate) fn take_root(&mut self) -> Option<ObjectRef> {
        self.root.take()
    }

    // --- Named stacks ---

    pub fn push_named(&mut self, stack: &str, object: ObjectRef) {
        self.named.entry(stack.to_string()).or_default().push(object);
    }

    pub fn pop_named(&mut self, stack: &str) -> Result<ObjectRef, ParseError> {
        self.named
            .get_mut(stack)
            .and_then(Vec::pop)
            .ok_or_else(|| ParseError::EmptyStack(stack.to_string()))
    }

    pub fn peek_named(&self, stack: &str) -> Result<&ObjectRef, ParseError> {
        self.named
            .get(stack)
            .and_then(|s| s.last())
            .ok_or_else(|| ParseError::EmptyStack(stack.to_string()))
    }

    pub fn is_named_empty(&self, stack: &str) -> bool {
        self.named.get(stack).is_none_or(Vec::is_empty)
    }

    // --- Parameter stack ---

    pub fn push_params(&mut self, params: ParamFrame) {
        self.params.push(params);
    }

    pub fn pop_params(&mut self) -> Result<ParamFrame, ParseError> {
        self.params
            .pop()
            .ok_or_else(|| ParseError::EmptyStack(PARAM_STACK.to_string()))
    }

    pub fn peek_params_mut(&mut self) -> Result<&mut ParamFrame, ParseError> {
        self.params
            .last_mut()
            .ok_or_else(|| ParseError::EmptyStack(PARAM_STACK.to_string()))
    }

    // --- Rule scopes ---

    /// The registry new elements are matched against.
    pub fn rule_manager(&self) -> Arc<dyn RuleManager> {
        match self.scopes.last() {
            Some(frame) => frame.rules.clone(),
            None => self.base_rules.clone(),
        }
    }

    pub fn base_rule_manager(&self) -> &Arc<dyn RuleManager> {
        &self.base_rules
    }

    /// Makes `rules` the active registry for the subtree of the current element.
    pub fn push_rule_scope(&mut self, rules: Arc<dyn RuleManager>, mount_actions: ActionList) {
        self.open_scope(rules, mount_actions, None);
    }

    /// Like [`push_rule_scope`](Self::push_rule_scope), tagging the frame with
    /// `owner` so several scopes mounted on one element can be told apart.
    pub fn push_owned_rule_scope(
        &mut self,
        owner: usize,
        rules: Arc<dyn RuleManager>,
        mount_actions: ActionList,
    ) {
        self.open_scope(rules, mount_actions, Some(owner));
    }

    fn open_scope(&mut self, rules: Arc<dyn RuleManager>, mount_actions: ActionList, owner: Option<usize>) {
        log::debug!("Opening rule scope at '{}'", self.path());
        self.scopes.push(ScopeFrame {
            rules,
            mount_depth: self.depth(),
            mount_actions,
            owner,
        });
    }

    /// The scope `owner` mounted on the current element.
    pub fn owned_rule_scope(&self, owner: usize) -> Option<&ScopeFrame> {
        self.owned_scope_index(owner).map(|idx| &self.scopes[idx])
    }

    /// Closes the scope `owner` mounted on the current element, wherever it sits
    /// among the scopes opened there.
    pub fn pop_owned_rule_scope(&mut self, owner: usize) -> Result<ScopeFrame, ParseError> {
        let idx = self
            .owned_scope_index(owner)
            .ok_or_else(|| ParseError::NoRuleScope(self.path().to_string()))?;
        let frame = self.scopes.remove(idx);
        log::debug!("Closed rule scope at '{}'", self.path());
        Ok(frame)
    }

    fn owned_scope_index(&self, owner: usize) -> Option<usize> {
        let depth = self.depth();
        self.scopes
            .iter()
            .rposition(|f| f.owner == Some(owner) && f.mount_depth == depth)
    }

    /// The innermost open scope.
    pub fn rule_scope(&self) -> Option<&ScopeFrame> {
        self.scopes.last()
    }

    /// Closes the innermost scope, making its parent registry active again.
    pub fn pop_rule_scope(&mut self) -> Result<ScopeFrame, ParseError> {
        let frame = self
            .scopes
            .pop()
            .ok_or_else(|| ParseError::NoRuleScope(self.path().to_string()))?;
        log::debug!("Closed rule scope at '{}'", self.path());
        Ok(frame)
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Removes every scope mounted at `depth` or deeper, innermost first.
    pub(crate) fn close_scopes_from(&mut self, depth: usize) -> Vec<ScopeFrame> {
        let mut closed = Vec::new();
        while self.scopes.last().is_some_and(|f| f.mount_depth >= depth) {
            closed.extend(self.scopes.pop());
        }
        closed
    }
}
