use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::warn;

/// Key of the generic failure text.
pub const ERROR_KEY: &str = "error";
/// Key of the access-denied text.
pub const DENIED_KEY: &str = "denied";

/// Shows short, user-facing messages.
pub trait Notifier: Send + Sync + Debug {
    fn notice(&self, message: &str);
}

/// Writes notices to the log at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notice(&self, message: &str) {
        warn!(target: "moe_dispatch::notice", "{message}");
    }
}

/// Localized message table. Unknown keys translate to themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translations {
    messages: BTreeMap<String, String>,
}

impl Translations {
    /// Builds a table on top of the English defaults.
    pub fn new<K, V>(overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::default();
        table.messages.extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        table
    }

    #[must_use]
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map_or(key, String::as_str)
    }

    /// Notice shown when the server answers 403.
    #[must_use]
    pub fn denied_notice(&self) -> String {
        format!("{}: {}", self.t(ERROR_KEY), self.t(DENIED_KEY))
    }

    /// Notice shown for every other failure.
    #[must_use]
    pub fn error_notice(&self) -> String {
        self.t(ERROR_KEY).to_owned()
    }
}

impl Default for Translations {
    fn default() -> Self {
        let messages = [(ERROR_KEY, "Error"), (DENIED_KEY, "Access denied")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_defaults() {
        let t = Translations::default();
        assert_eq!(t.error_notice(), "Error");
        assert_eq!(t.denied_notice(), "Error: Access denied");
    }

    #[test]
    fn overrides_replace_defaults() {
        let t = Translations::new([("denied", "Accès refusé"), ("error", "Erreur")]);
        assert_eq!(t.denied_notice(), "Erreur: Accès refusé");
    }

    #[test]
    fn unknown_key_falls_back_to_itself() {
        assert_eq!(Translations::default().t("missing"), "missing");
    }
}
