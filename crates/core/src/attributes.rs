//! Namespace-resolved element attributes as handed to `Action::begin`.

/// A single attribute with its namespace already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: String,
    pub local_name: String,
    /// The name as written in the document, including any prefix.
    pub qname: String,
    pub value: String,
}

/// The attributes of one element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    items: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for attributes without a namespace.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut attrs = Self::new();
        for (name, value) in pairs {
            attrs.push(Attribute {
                namespace: String::new(),
                local_name: name.to_string(),
                qname: name.to_string(),
                value: value.to_string(),
            });
        }
        attrs
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.items.push(attribute);
    }

    /// Looks up an attribute that is not in any namespace.
    pub fn get(&self, local_name: &str) -> Option<&str> {
        self.get_ns("", local_name)
    }

    pub fn get_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|a| a.namespace == namespace && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_respects_namespace() {
        let mut attrs = Attributes::from_pairs([("id", "7")]);
        attrs.push(Attribute {
            namespace: "urn:x".to_string(),
            local_name: "id".to_string(),
            qname: "x:id".to_string(),
            value: "ns".to_string(),
        });
        assert_eq!(attrs.get("id"), Some("7"));
        assert_eq!(attrs.get_ns("urn:x", "id"), Some("ns"));
        assert_eq!(attrs.get("missing"), None);
        assert_eq!(attrs.len(), 2);
    }
}
