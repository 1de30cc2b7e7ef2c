use serde::Deserialize;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level settings shared by the build tool and the dispatch client.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsInner {
    pub build: BuildSettings,
    pub client: ClientSettings,
    pub log: LogSettings,
}

/// Thin Arc-wrapped settings for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(flatten, default)]
    inner: Arc<SettingsInner>,
}

impl Deref for Settings {
    type Target = SettingsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Settings {
    fn deref_mut(&mut self) -> &mut SettingsInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Asset build layout and tooling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Directory globbed for entry points.
    pub source_dir: PathBuf,
    /// Glob pattern, relative to `source_dir`, selecting entry points.
    pub entry_pattern: String,
    /// Directory all artifacts are written to.
    pub out_dir: PathBuf,
    /// Entry whose bundle goes through the finishing pass.
    pub finish_entry: String,
    /// File name of the finished bundle inside `out_dir`.
    pub finished_name: String,
    /// Quiet period watch mode waits after the last file event before rebuilding.
    pub debounce_ms: u64,
    pub source_rewrite: SourceRewriteSettings,
    pub transforms: Vec<TransformSettings>,
}

/// Rewrite applied to every `sources` entry of the finished source map.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceRewriteSettings {
    pub pattern: String,
    pub replacement: String,
}

/// What kind of output a transform produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Script,
    Stylesheet,
}

/// An external compiler that reads source on stdin and writes output on stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformSettings {
    pub name: String,
    pub extensions: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub output: OutputKind,
}

/// Settings of the server-facing dispatch client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Scheme and authority requests are sent to, e.g. `http://localhost:3000`.
    pub origin: String,
    /// Mount point of the application; `/` means mounted at the root.
    pub base_path: String,
    /// Localized notice strings keyed by message id.
    pub translations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub directory: Option<PathBuf>,
    pub json: bool,
}

// --- Default ---

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("app/javascript"),
            entry_pattern: "*.*".to_owned(),
            out_dir: PathBuf::from("app/assets/builds"),
            finish_entry: "application".to_owned(),
            finished_name: "application.jsout".to_owned(),
            debounce_ms: 100,
            source_rewrite: SourceRewriteSettings::default(),
            transforms: vec![TransformSettings::coffee(), TransformSettings::less()],
        }
    }
}

impl Default for SourceRewriteSettings {
    fn default() -> Self {
        Self {
            pattern: r"\.\./\.\./javascript(/.+)?/app/javascript/".to_owned(),
            replacement: "../../javascript/".to_owned(),
        }
    }
}

impl TransformSettings {
    /// CoffeeScript compiler in bare mode, with the source map inlined into its output.
    #[must_use]
    pub fn coffee() -> Self {
        Self {
            name: "coffeescript".to_owned(),
            extensions: vec!["coffee".to_owned()],
            command: "coffee".to_owned(),
            args: ["--bare", "--compile", "--inline-map", "--stdio"].map(str::to_owned).to_vec(),
            output: OutputKind::Script,
        }
    }

    /// LESS stylesheet compiler reading from stdin.
    #[must_use]
    pub fn less() -> Self {
        Self {
            name: "less".to_owned(),
            extensions: vec!["less".to_owned()],
            command: "lessc".to_owned(),
            args: vec!["--rootpath=".to_owned(), "-".to_owned()],
            output: OutputKind::Stylesheet,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        let translations = [("error", "Error"), ("denied", "Access denied")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self { origin: "http://localhost:3000".to_owned(), base_path: "/".to_owned(), translations }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".to_owned(), directory: None, json: false }
    }
}
