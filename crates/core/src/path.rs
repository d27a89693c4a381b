//! Tracks the absolute nesting path of the element currently being processed.
//!
//! A path is a string of `/`-prefixed segments, one per open element, each either
//! a bare local name or a `{uri}local` qualified name. Namespace URIs routinely
//! contain `/`, so every helper here splits on separators outside braces only.

/// Formats a qualified segment name, `{uri}local` or just `local`.
pub fn qualified_name(namespace: &str, local_name: &str) -> String {
    if namespace.is_empty() {
        local_name.to_string()
    } else {
        format!("{{{}}}{}", namespace, local_name)
    }
}

/// Byte offsets of every segment separator in `path` that lies outside a `{...}` URI.
pub fn segment_starts(path: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_uri = false;
    for (i, b) in path.bytes().enumerate() {
        match b {
            b'{' => in_uri = true,
            b'}' => in_uri = false,
            b'/' if !in_uri => starts.push(i),
            _ => {}
        }
    }
    starts
}

/// The final segment of `path` (the current element's qualified name).
pub fn last_segment(path: &str) -> &str {
    match segment_starts(path).last() {
        Some(&i) => &path[i + 1..],
        None => path,
    }
}

/// The path of the enclosing element, or `None` for the document element.
pub fn parent_path(path: &str) -> Option<&str> {
    segment_starts(path)
        .last()
        .filter(|&&i| i > 0)
        .map(|&i| &path[..i])
}

/// Every proper ancestor path of `path`, outermost first.
pub fn ancestor_paths(path: &str) -> impl Iterator<Item = &str> {
    segment_starts(path)
        .into_iter()
        .filter(|&i| i > 0)
        .map(move |i| &path[..i])
}

/// True when `path` ends with `suffix` and the suffix starts on a segment boundary.
pub fn ends_on_boundary(path: &str, suffix: &str) -> bool {
    if suffix.is_empty() || !path.ends_with(suffix) {
        return false;
    }
    let cut = path.len() - suffix.len();
    cut == 0 || path.as_bytes()[cut - 1] == b'/'
}

/// A push/pop stack-backed path buffer.
#[derive(Debug, Default, Clone)]
pub struct PathTracker {
    buf: String,
    marks: Vec<usize>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a segment for a newly opened element.
    pub fn push(&mut self, namespace: &str, local_name: &str) {
        self.marks.push(self.buf.len());
        self.buf.push('/');
        if !namespace.is_empty() {
            self.buf.push('{');
            self.buf.push_str(namespace);
            self.buf.push('}');
        }
        self.buf.push_str(local_name);
    }

    /// Restores the path to its value before the matching `push`.
    /// Returns `false` if nothing was pushed.
    pub fn pop(&mut self) -> bool {
        match self.marks.pop() {
            Some(mark) => {
                self.buf.truncate(mark);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> &str {
        &self.buf
    }

    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    pub fn parent(&self) -> Option<&str> {
        match self.marks.last() {
            Some(&mark) if mark > 0 => Some(&self.buf[..mark]),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.marks.clear();
    }
}
