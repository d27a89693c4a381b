use xmldigest_core::{Action, Attributes, Context, ParseError};

/// Builds an object through the context's factory when its element starts, and
/// pops it when the element ends.
#[derive(Debug, Clone)]
pub struct CreateAction {
    type_name: String,
    override_attribute: Option<String>,
}

impl CreateAction {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            override_attribute: None,
        }
    }

    /// Lets the document choose the type: the attribute's value, when present, replaces the default.
    pub fn with_override_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.override_attribute = Some(attribute.into());
        self
    }
}

impl Action for CreateAction {
    fn begin(&self, ctx: &mut Context, _namespace: &str, _name: &str, attrs: &Attributes) -> Result<(), ParseError> {
        let type_name = self
            .override_attribute
            .as_deref()
            .and_then(|attr| attrs.get(attr))
            .unwrap_or(&self.type_name);

        let factory = ctx.factory().clone();
        let handle = factory.resolve_type(type_name)?;
        let object = factory.instantiate(&handle, attrs)?;
        log::trace!("Created '{}' at '{}'", type_name, ctx.path());
        ctx.push(object);
        Ok(())
    }

    fn end(&self, ctx: &mut Context, _namespace: &str, _name: &str) -> Result<(), ParseError> {
        ctx.pop()?;
        Ok(())
    }
}
