use crate::error::BuildError;
use crate::sourcemap::SourceMap;
use moe_domain::config::SourceRewriteSettings;
use regex::Regex;

/// Regex rewrite applied to each `sources` entry of a merged map.
///
/// Chaining the legacy compiler's inline maps through the bundler's map
/// yields paths such as `../../javascript/foo/app/javascript/bar.coffee`;
/// the default rule folds them back to `../../javascript/bar.coffee`.
/// Only the first match in each path is replaced, and `$n` in the
/// replacement refers to capture groups.
#[derive(Debug, Clone)]
pub struct SourceRewrite {
    pattern: Regex,
    replacement: String,
}

impl SourceRewrite {
    /// # Errors
    /// Returns [`BuildError::Pattern`] if `pattern` is not a valid regex.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, BuildError> {
        let pattern = Regex::new(pattern).map_err(|e| BuildError::Pattern {
            message: e.to_string().into(),
            context: Some("build.source_rewrite.pattern".into()),
        })?;
        Ok(Self { pattern, replacement: replacement.into() })
    }

    /// # Errors
    /// See [`SourceRewrite::new`].
    pub fn from_settings(settings: &SourceRewriteSettings) -> Result<Self, BuildError> {
        Self::new(&settings.pattern, settings.replacement.clone())
    }

    #[must_use]
    pub fn rewrite(&self, path: &str) -> String {
        self.pattern.replace(path, self.replacement.as_str()).into_owned()
    }

    /// Rewrites every source path of `map` in place.
    pub fn apply(&self, map: &mut SourceMap) {
        for source in &mut map.sources {
            *source = self.rewrite(source);
        }
    }
}
