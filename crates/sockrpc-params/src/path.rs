use std::fmt;

/// Address of a value inside a [`ParamList`](crate::ParamList).
///
/// Built from a dotted string (`"result.code"`) or from explicit segments
/// (`["result", "code"]`) when a key itself contains a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamPath(Vec<String>);

impl ParamPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `len` segments joined with dots.
    pub(crate) fn prefix(&self, len: usize) -> String {
        self.0[..len.min(self.0.len())].join(".")
    }
}

impl From<&str> for ParamPath {
    fn from(path: &str) -> Self {
        ParamPath(
            path.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

impl From<&String> for ParamPath {
    fn from(path: &String) -> Self {
        ParamPath::from(path.as_str())
    }
}

impl From<&[&str]> for ParamPath {
    fn from(segments: &[&str]) -> Self {
        ParamPath(segments.iter().map(|segment| (*segment).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamPath {
    fn from(segments: [&str; N]) -> Self {
        ParamPath::from(&segments[..])
    }
}

impl<const N: usize> From<&[&str; N]> for ParamPath {
    fn from(segments: &[&str; N]) -> Self {
        ParamPath::from(&segments[..])
    }
}

impl From<Vec<String>> for ParamPath {
    fn from(segments: Vec<String>) -> Self {
        ParamPath(segments)
    }
}

impl From<&ParamPath> for ParamPath {
    fn from(path: &ParamPath) -> Self {
        path.clone()
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
