use std::borrow::Cow;

/// Error types specific to the dispatch feature.
///
/// Request failures are never reported through this type; they become
/// user-facing notices instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The configured origin is not an absolute URL.
    #[error("Invalid origin{}: {message}", format_context(.context))]
    InvalidOrigin { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error{}: {source}", format_context(.context))]
    Http { source: reqwest::Error, context: Option<Cow<'static, str>> },

    /// A wire topic name does not match any known topic.
    #[error("Unknown topic{}: {message}", format_context(.context))]
    UnknownTopic { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<reqwest::Error> for DispatchError {
    fn from(source: reqwest::Error) -> Self {
        Self::Http { source, context: None }
    }
}

#[allow(clippy::ref_option)]
fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
