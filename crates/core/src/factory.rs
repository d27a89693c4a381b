//! Pluggable construction of objects by type name.
//!
//! Actions never hard-wire how a type name becomes an object. They ask the
//! [`ObjectFactory`] carried by the parse [`Context`](crate::Context), which a
//! caller injects before the parse.
use crate::attributes::Attributes;
use crate::context::{ObjectRef, new_object};
use crate::error::ParseError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// An opaque reference to a type a factory knows how to build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    name: String,
}

impl TypeHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub trait ObjectFactory: Send + Sync + Debug {
    /// Maps a type name, as written in rules or documents, to a handle.
    fn resolve_type(&self, name: &str) -> Result<TypeHandle, ParseError>;

    /// Builds a new instance; the element's attributes are available to constructors.
    fn instantiate(&self, handle: &TypeHandle, attrs: &Attributes) -> Result<ObjectRef, ParseError>;
}

type Constructor = Arc<dyn Fn(&Attributes) -> Result<ObjectRef, ParseError> + Send + Sync>;

/// A factory backed by named constructors.
#[derive(Default, Clone)]
pub struct TypeRegistry {
    constructors: HashMap<String, Constructor>,
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T::default()` under `name`.
    pub fn register<T: Any + Default>(&mut self, name: impl Into<String>) -> &mut Self {
        self.register_with(name, |_| Ok(new_object(T::default())))
    }

    /// Registers a constructor that may read the element's attributes.
    pub fn register_with<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&Attributes) -> Result<ObjectRef, ParseError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}

impl ObjectFactory for TypeRegistry {
    fn resolve_type(&self, name: &str) -> Result<TypeHandle, ParseError> {
        if self.constructors.contains_key(name) {
            Ok(TypeHandle::new(name))
        } else {
            Err(ParseError::UnknownType(name.to_string()))
        }
    }

    fn instantiate(&self, handle: &TypeHandle, attrs: &Attributes) -> Result<ObjectRef, ParseError> {
        let constructor = self
            .constructors
            .get(handle.name())
            .ok_or_else(|| ParseError::UnknownType(handle.name().to_string()))?;
        constructor(attrs)
    }
}
