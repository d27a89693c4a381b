use thiserror::Error;
use xmldigest_core::{DispatchError, RuleError};

/// Everything that can go wrong while digesting a document.
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invalid rule: {0}")]
    Rule(#[from] RuleError),

    #[error("XML error at byte {position}: {source}")]
    Xml {
        #[source]
        source: quick_xml::Error,
        position: u64,
    },

    #[error("Malformed attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Unknown entity reference '&{0};'")]
    UnknownEntity(String),

    #[error("Element or attribute '{0}' uses an unbound namespace prefix")]
    UnknownPrefix(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("The rule set is shared with another owner and cannot be modified")]
    RulesShared,
}

impl From<quick_xml::Error> for DigestError {
    fn from(source: quick_xml::Error) -> Self {
        DigestError::Xml {
            source,
            position: 0,
        }
    }
}

impl DigestError {
    pub(crate) fn at(self, position: u64) -> Self {
        match self {
            DigestError::Xml { source, .. } => DigestError::Xml { source, position },
            other => other,
        }
    }

    /// The dispatch failure behind this error, if any.
    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        match self {
            DigestError::Dispatch(e) => Some(e),
            _ => None,
        }
    }
}
