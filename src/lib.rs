//! # xmldigest
//!
//! Maps XML documents onto application objects with path-pattern rules.
//!
//! Rules pair a pattern such as `library/book` or `*/item/?` with an
//! [`Action`]. While a document streams through the quick-xml tokenizer, the
//! actions matched for each element receive `begin`, `body` and `end` callbacks
//! and build objects on the parse [`Context`]'s stacks.
//!
//! ```no_run
//! use std::sync::Arc;
//! use xmldigest::actions::CreateAction;
//! use xmldigest::{Digester, TypeRegistry};
//!
//! #[derive(Default)]
//! struct Library;
//!
//! let mut types = TypeRegistry::new();
//! types.register::<Library>("library");
//!
//! let mut digester = Digester::new().with_factory(Arc::new(types));
//! digester.add_rule("/library", Arc::new(CreateAction::new("library")))?;
//! let root = digester.parse_str("<library/>")?;
//! assert!(root.is_some());
//! # Ok::<(), xmldigest::DigestError>(())
//! ```

pub mod actions;
pub mod config;
pub mod digester;
pub mod error;
pub mod reader;

pub use config::DigesterConfig;
pub use digester::Digester;
pub use error::DigestError;
pub use reader::{ReaderOptions, drive};

pub use xmldigest_core::{
    Action, ActionList, Attribute, Attributes, Context, DefaultRuleManager, DispatchError,
    DispatchOptions, DispatchState, Dispatcher, MandatoryPlacement, ObjectFactory, ObjectRef,
    ParseError, Phase, RuleError, RuleManager, ScopedRuleManager, TypeHandle, TypeRegistry,
    new_object,
};
