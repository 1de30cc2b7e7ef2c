use std::borrow::Cow;

/// A specialized [`BuildError`] enum of this crate.
///
/// Any of these aborts the current build cycle. Artifacts from earlier cycles
/// stay on disk untouched.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A source transform or the finishing transpiler rejected its input.
    #[error("Compile failure{}: {message}", format_context(.context))]
    Compile { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("File system failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// A source map could not be parsed, decoded or serialized.
    #[error("Source map error{}: {message}", format_context(.context))]
    SourceMap { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// An entry glob or a rewrite regex is malformed.
    #[error("Invalid pattern{}: {message}", format_context(.context))]
    Pattern { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid build configuration{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The file watcher could not be started or subscribed to a directory.
    #[error("Watch failure{}: {source}", format_context(.context))]
    Watch { source: notify::Error, context: Option<Cow<'static, str>> },
}

impl BuildError {
    pub fn compile(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Compile { message: message.into(), context: None }
    }

    pub fn source_map(message: impl Into<Cow<'static, str>>) -> Self {
        Self::SourceMap { message: message.into(), context: None }
    }

    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config { message: message.into(), context: None }
    }

    fn with_context(mut self, ctx: Cow<'static, str>) -> Self {
        match &mut self {
            Self::Compile { context, .. }
            | Self::Io { context, .. }
            | Self::SourceMap { context, .. }
            | Self::Pattern { context, .. }
            | Self::Config { context, .. }
            | Self::Watch { context, .. } => *context = Some(ctx),
        }
        self
    }
}

impl From<std::io::Error> for BuildError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

/// Attaches a human-readable context to a failing result.
pub trait BuildErrorExt<T> {
    /// # Errors
    /// Returns the original error converted into [`BuildError`] with `context` set.
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, BuildError>;
}

impl<T> BuildErrorExt<T> for Result<T, BuildError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|e| e.with_context(context.into()))
    }
}

impl From<notify::Error> for BuildError {
    fn from(source: notify::Error) -> Self {
        Self::Watch { source, context: None }
    }
}

impl<T> BuildErrorExt<T> for Result<T, notify::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, BuildError> {
        self.map_err(|source| BuildError::Watch { source, context: Some(context.into()) })
    }
}

impl<T> BuildErrorExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, BuildError> {
        self.map_err(|source| BuildError::Io { source, context: Some(context.into()) })
    }
}

#[allow(clippy::ref_option)]
fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
