//! Defines the error taxonomy shared by the registry, the actions and the dispatcher.
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Raised while building a rule set: the pattern cannot be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Pattern '{pattern}' uses undeclared namespace prefix '{prefix}'")]
    UndeclaredPrefix { pattern: String, prefix: String },

    #[error("Malformed pattern '{pattern}': {reason}")]
    Malformed { pattern: String, reason: String },

    #[error("Scoped rule managers cannot be copied")]
    CopyUnsupported,
}

impl RuleError {
    pub(crate) fn malformed(pattern: &str, reason: impl Into<String>) -> Self {
        RuleError::Malformed {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// An error reported by an action while it handles a document event.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Stack '{0}' is empty")]
    EmptyStack(String),

    #[error("Object on the stack is not a '{expected}'")]
    TypeMismatch { expected: &'static str },

    #[error("Missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("Unknown object type '{0}'")]
    UnknownType(String),

    #[error("No rule set registered under '{0}'")]
    UnknownRuleSet(String),

    #[error("No rule scope is open at '{0}'")]
    NoRuleScope(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl ParseError {
    /// A free-form failure without an underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        ParseError::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// A free-form failure wrapping the error that caused it.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        ParseError::Failed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn type_mismatch<T: ?Sized>() -> Self {
        ParseError::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }
    }
}

/// The callback during which an action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    StartParse,
    Begin,
    BodySegment,
    Body,
    End,
    FinishParse,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::StartParse => "start_parse",
            Phase::Begin => "begin",
            Phase::BodySegment => "body_segment",
            Phase::Body => "body",
            Phase::End => "end",
            Phase::FinishParse => "finish_parse",
        };
        f.write_str(name)
    }
}

/// The error surfaced by the dispatcher. Any variant aborts the current parse.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Action '{action}' failed during {phase} at '{path}': {source}")]
    Action {
        action: String,
        phase: Phase,
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("Rule set failed during {phase}: {source}")]
    Lifecycle {
        phase: Phase,
        #[source]
        source: ParseError,
    },

    #[error("Internal matching error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        DispatchError::Internal(message.into())
    }

    /// The action-reported error at the root of this failure, if any.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            DispatchError::Action { source, .. } | DispatchError::Lifecycle { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
