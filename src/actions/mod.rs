//! Ready-made actions for the common object-building steps.
//!
//! Each one is an ordinary [`Action`](xmldigest_core::Action); applications are free
//! to mix them with their own.
pub mod call;
pub mod create;
pub mod link;
pub mod nested;

pub use call::{CallAction, ParamAction};
pub use create::CreateAction;
pub use link::LinkAction;
pub use nested::{NestedRulesAction, RuleSet};
