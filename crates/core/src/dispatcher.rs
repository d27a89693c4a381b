//! The event-driven state machine that fires matched actions for each element.
use crate::action::{Action, ActionList};
use crate::attributes::Attributes;
use crate::context::{Context, MatchFrame, ObjectRef};
use crate::error::{DispatchError, ParseError, Phase};
use crate::factory::{ObjectFactory, TypeRegistry};
use crate::rules::RuleManager;
use std::sync::Arc;

/// Where the dispatcher is in the document lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    DocumentStarted,
    DocumentEnded,
    /// An action failed; the rest of the document is refused.
    Aborted,
}

/// Behavioural switches for a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Trim surrounding whitespace from the merged text passed to `body`.
    pub trim_body_text: bool,
}

/// Receives tokenizer events and drives the registered actions.
///
/// One dispatcher handles one parse at a time; every `start_document` builds a
/// fresh [`Context`], so nothing leaks between documents.
pub struct Dispatcher {
    rules: Arc<dyn RuleManager>,
    factory: Arc<dyn ObjectFactory>,
    options: DispatchOptions,
    state: DispatchState,
    context: Option<Context>,
    pending_namespaces: Vec<(String, String)>,
    initial_root: Option<ObjectRef>,
    root: Option<ObjectRef>,
}

impl Dispatcher {
    pub fn new(rules: Arc<dyn RuleManager>) -> Self {
        Self {
            rules,
            factory: Arc::new(TypeRegistry::new()),
            options: DispatchOptions::default(),
            state: DispatchState::Idle,
            context: None,
            pending_namespaces: Vec::new(),
            initial_root: None,
            root: None,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Supplies an object pushed onto the stack before the first element; it becomes the root.
    pub fn set_root(&mut self, root: ObjectRef) {
        self.initial_root = Some(root);
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// The live context, while a document is being processed.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.context.as_ref().map_or(0, Context::depth)
    }

    /// The root object retained from the last completed parse.
    pub fn root(&self) -> Option<&ObjectRef> {
        self.root.as_ref()
    }

    pub fn take_root(&mut self) -> Option<ObjectRef> {
        self.root.take()
    }

    pub fn start_document(&mut self) -> Result<(), DispatchError> {
        if self.state == DispatchState::DocumentStarted {
            return Err(DispatchError::internal("document already started"));
        }
        log::debug!("Starting document");
        let mut ctx = Context::new(self.rules.clone(), self.factory.clone());
        if let Some(root) = self.initial_root.take() {
            ctx.push(root);
        }
        self.root = None;
        self.pending_namespaces.clear();
        self.state = DispatchState::DocumentStarted;

        let rules = ctx.rule_manager();
        let result = rules
            .start_parse(&mut ctx)
            .map_err(|source| DispatchError::Lifecycle {
                phase: Phase::StartParse,
                source,
            });
        self.context = Some(ctx);
        self.finish_step(result)
    }

    /// Records a prefix binding declared on the next element to start.
    pub fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) {
        self.pending_namespaces
            .push((prefix.to_string(), uri.to_string()));
    }

    pub fn start_element(
        &mut self,
        namespace: &str,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), DispatchError> {
        let declarations = std::mem::take(&mut self.pending_namespaces);
        let ctx = self.live_context()?;
        let result = open_element(ctx, namespace, name, attrs, declarations);
        self.finish_step(result)
    }

    pub fn characters(&mut self, text: &str) -> Result<(), DispatchError> {
        let ctx = self.live_context()?;
        match ctx.matches.last_mut() {
            Some(frame) => {
                frame.body.push_str(text);
                frame.segment.push_str(text);
            }
            None if !text.trim().is_empty() => {
                log::warn!("Ignoring text outside the document element: {:?}", text);
            }
            None => {}
        }
        Ok(())
    }

    pub fn end_element(&mut self, namespace: &str, name: &str) -> Result<(), DispatchError> {
        let trim = self.options.trim_body_text;
        let ctx = self.live_context()?;
        let result = close_element(ctx, namespace, name, trim);
        self.finish_step(result)
    }

    pub fn end_document(&mut self) -> Result<(), DispatchError> {
        let ctx = self.live_context()?;
        if ctx.depth() > 0 {
            let path = ctx.path().to_string();
            return self.finish_step(Err(DispatchError::internal(format!(
                "document ended with '{}' still open",
                path
            ))));
        }
        let rules = ctx.base_rule_manager().clone();
        let result = rules
            .finish_parse(ctx)
            .map_err(|source| DispatchError::Lifecycle {
                phase: Phase::FinishParse,
                source,
            });
        if result.is_ok() {
            let root = ctx.take_root();
            self.root = root;
            self.context = None;
            self.state = DispatchState::DocumentEnded;
            log::debug!("Finished document");
        }
        self.finish_step(result)
    }

    /// Abandons the document in progress, e.g. when the tokenizer fails.
    pub fn abort(&mut self) {
        if self.state == DispatchState::DocumentStarted {
            log::debug!("Aborting document at '{}'", self.context.as_ref().map_or("", Context::path));
            let _ = self.finish_step(Err(DispatchError::internal("aborted")));
        }
    }

    fn live_context(&mut self) -> Result<&mut Context, DispatchError> {
        match self.state {
            DispatchState::DocumentStarted => self
                .context
                .as_mut()
                .ok_or_else(|| DispatchError::internal("no parse context")),
            DispatchState::Aborted => Err(DispatchError::internal(
                "dispatcher was aborted by an earlier failure",
            )),
            _ => Err(DispatchError::internal("no document has been started")),
        }
    }

    /// Aborts the parse on failure, unwinding every rule scope.
    fn finish_step(&mut self, result: Result<(), DispatchError>) -> Result<(), DispatchError> {
        if result.is_err() {
            if let Some(ctx) = self.context.as_mut() {
                let closed = ctx.close_scopes_from(0);
                if !closed.is_empty() {
                    log::debug!("Unwound {} rule scope(s) after failure", closed.len());
                }
            }
            self.context = None;
            self.state = DispatchState::Aborted;
        }
        result
    }
}

fn open_element(
    ctx: &mut Context,
    namespace: &str,
    name: &str,
    attrs: &Attributes,
    declarations: Vec<(String, String)>,
) -> Result<(), DispatchError> {
    flush_segment(ctx)?;

    ctx.namespaces_mut().push_scope(declarations);
    ctx.path_mut().push(namespace, name);
    let path = ctx.path().to_string();
    let actions = ctx.rule_manager().matching_actions(&path);
    log::trace!("<{}> matched {:?}", path, actions);

    ctx.matches.push(MatchFrame {
        actions: actions.clone(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        body: String::new(),
        segment: String::new(),
    });

    for action in &actions {
        action
            .begin(ctx, namespace, name, attrs)
            .map_err(|e| action_failed(action.as_ref(), Phase::Begin, &path, e))?;
    }
    Ok(())
}

fn close_element(
    ctx: &mut Context,
    namespace: &str,
    name: &str,
    trim: bool,
) -> Result<(), DispatchError> {
    let (actions, body) = match ctx.matches.last() {
        Some(frame) if frame.namespace == namespace && frame.name == name => {
            (frame.actions.clone(), frame.body.clone())
        }
        Some(frame) => {
            return Err(DispatchError::internal(format!(
                "end of '{}' while '{}' is open",
                crate::path::qualified_name(namespace, name),
                crate::path::qualified_name(&frame.namespace, &frame.name)
            )));
        }
        None => {
            return Err(DispatchError::internal(format!(
                "end of '{}' without an open element",
                crate::path::qualified_name(namespace, name)
            )));
        }
    };
    flush_segment(ctx)?;

    let path = ctx.path().to_string();
    let text = if trim { body.trim() } else { body.as_str() };
    for action in &actions {
        action
            .body(ctx, namespace, name, text)
            .map_err(|e| action_failed(action.as_ref(), Phase::Body, &path, e))?;
    }
    for action in actions.iter().rev() {
        action
            .end(ctx, namespace, name)
            .map_err(|e| action_failed(action.as_ref(), Phase::End, &path, e))?;
    }

    let leaked = ctx.close_scopes_from(ctx.depth());
    for frame in &leaked {
        log::warn!(
            "Rule scope mounted at depth {} was still open at the end of '{}'; closing it",
            frame.mount_depth,
            path
        );
    }

    ctx.matches.pop();
    ctx.path_mut().pop();
    ctx.namespaces_mut().pop_scope();
    Ok(())
}

/// Delivers the pending text run of the innermost element to `body_segment`.
fn flush_segment(ctx: &mut Context) -> Result<(), DispatchError> {
    let (actions, segment, namespace, name): (ActionList, String, String, String) =
        match ctx.matches.last_mut() {
            Some(frame) if !frame.segment.is_empty() => (
                frame.actions.clone(),
                std::mem::take(&mut frame.segment),
                frame.namespace.clone(),
                frame.name.clone(),
            ),
            _ => return Ok(()),
        };
    let path = ctx.path().to_string();
    for action in &actions {
        action
            .body_segment(ctx, &namespace, &name, &segment)
            .map_err(|e| action_failed(action.as_ref(), Phase::BodySegment, &path, e))?;
    }
    Ok(())
}

fn action_failed(action: &dyn Action, phase: Phase, path: &str, source: ParseError) -> DispatchError {
    log::debug!("{} failed during {} at '{}': {}", action.name(), phase, path, source);
    DispatchError::Action {
        action: action.name().to_string(),
        phase,
        path: path.to_string(),
        source,
    }
}
