use std::fmt;

/// Mount point of the application on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath(String);

impl BasePath {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Prefixes `path` with the base path.
    ///
    /// At the root `path` is returned unchanged; otherwise the two are
    /// concatenated as is, so `/moe` + `/post` gives `/moe/post`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if self.is_root() { path.to_owned() } else { format!("{}{path}", self.0) }
    }
}

impl Default for BasePath {
    fn default() -> Self {
        Self::new("/")
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
