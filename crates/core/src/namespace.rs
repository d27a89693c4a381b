//! Per-parse prefix bindings, scoped to the elements that declare them.

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Default, Clone)]
pub struct NamespaceScope {
    bindings: Vec<(String, String)>,
    marks: Vec<usize>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope for one element with the bindings it declares.
    pub fn push_scope(&mut self, declarations: impl IntoIterator<Item = (String, String)>) {
        self.marks.push(self.bindings.len());
        self.bindings.extend(declarations);
    }

    /// Drops the bindings of the innermost element.
    pub fn pop_scope(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    /// The innermost URI bound to `prefix`; the empty prefix is the default namespace.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Expands a QName-valued string such as `xsi:type="p:Thing"` into `{uri}Thing`.
    /// Unprefixed names take the default namespace, if one is bound.
    pub fn expand_qname(&self, qname: &str) -> Option<String> {
        match qname.split_once(':') {
            Some((prefix, local)) => self
                .resolve(prefix)
                .map(|uri| crate::path::qualified_name(uri, local)),
            None => Some(crate::path::qualified_name(
                self.resolve("").unwrap_or(""),
                qname,
            )),
        }
    }

    pub fn depth(&self) -> usize {
        self.marks.len()
    }
}
