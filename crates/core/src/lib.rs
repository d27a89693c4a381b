//! # xmldigest-core
//!
//! The matching and dispatch engine behind rule-driven XML-to-object mapping.
//!
//! - **pattern** / **rules**: path patterns and the registry that resolves them
//! - **scoped**: registries that apply only beneath a mount element
//! - **context**: per-parse object stacks, named stacks, and rule scopes
//! - **dispatcher**: turns element events into ordered action callbacks
//!
//! The crate performs no I/O and knows nothing about tokenizers. A driver feeds
//! [`Dispatcher`] with `start_element`/`characters`/`end_element` events and the
//! registered [`Action`]s build the result.

pub mod action;
pub mod attributes;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod namespace;
pub mod path;
pub mod pattern;
pub mod rules;
pub mod scoped;

pub use action::{Action, ActionList};
pub use attributes::{Attribute, Attributes};
pub use context::{Context, ObjectRef, ParamFrame, ScopeFrame, new_object};
pub use dispatcher::{DispatchOptions, DispatchState, Dispatcher};
pub use error::{DispatchError, ParseError, Phase, RuleError};
pub use factory::{ObjectFactory, TypeHandle, TypeRegistry};
pub use namespace::NamespaceScope;
pub use pattern::{Anchor, Form, Pattern};
pub use rules::{DefaultRuleManager, MandatoryPlacement, RuleManager};
pub use scoped::ScopedRuleManager;
