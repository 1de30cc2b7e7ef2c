use crate::error::BuildError;
use crate::sourcemap::SourceRewrite;
use moe_domain::config::{BuildSettings, TransformSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Switches taken from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildFlags {
    /// Rebuild whenever an entry file changes.
    pub watch: bool,
    /// Log a bundle composition report after each successful build.
    pub analyze: bool,
}

/// Everything a build run needs, resolved once up front.
///
/// The entry set is fixed at construction; files added later are not
/// picked up until the next run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub entries: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub finish_entry: String,
    pub finished_name: String,
    pub debounce: Duration,
    pub source_rewrite: SourceRewrite,
    pub transforms: Vec<TransformSettings>,
    pub watch: bool,
    pub analyze: bool,
}

impl BuildConfig {
    /// Globs the entry points and validates the settings.
    ///
    /// # Errors
    /// Returns [`BuildError::Pattern`] for a malformed glob or rewrite regex and
    /// [`BuildError::Config`] when nothing matches or a setting is unusable.
    pub fn from_settings(settings: &BuildSettings, flags: BuildFlags) -> Result<Self, BuildError> {
        let entries = resolve_entries(&settings.source_dir, &settings.entry_pattern)?;
        if entries.is_empty() {
            return Err(BuildError::Config {
                message: format!(
                    "no entry points match '{}'",
                    settings.source_dir.join(&settings.entry_pattern).display()
                )
                .into(),
                context: Some("build.entry_pattern".into()),
            });
        }
        debug!(count = entries.len(), "Resolved entry points");

        if settings.finished_name.is_empty() || settings.finished_name.contains(['/', '\\']) {
            return Err(BuildError::Config {
                message: format!("'{}' is not a plain file name", settings.finished_name).into(),
                context: Some("build.finished_name".into()),
            });
        }

        for transform in &settings.transforms {
            if transform.extensions.is_empty() {
                return Err(BuildError::Config {
                    message: format!("transform '{}' handles no extensions", transform.name).into(),
                    context: Some("build.transforms".into()),
                });
            }
        }

        Ok(Self {
            entries,
            out_dir: settings.out_dir.clone(),
            finish_entry: settings.finish_entry.clone(),
            finished_name: settings.finished_name.clone(),
            debounce: Duration::from_millis(settings.debounce_ms),
            source_rewrite: SourceRewrite::from_settings(&settings.source_rewrite)?,
            transforms: settings.transforms.clone(),
            watch: flags.watch,
            analyze: flags.analyze,
        })
    }

    /// Directories watch mode subscribes to: the distinct parents of the entries.
    #[must_use]
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> =
            self.entries.iter().filter_map(|e| e.parent().map(Path::to_path_buf)).collect();
        roots.sort();
        roots.dedup();
        roots
    }

    /// Bundle the finishing pass reads: `<out_dir>/<finish_entry>.js`.
    #[must_use]
    pub fn finish_input(&self) -> PathBuf {
        self.out_dir.join(format!("{}.js", self.finish_entry))
    }

    /// Final artifact: `<out_dir>/<finished_name>`.
    #[must_use]
    pub fn finished_path(&self) -> PathBuf {
        self.out_dir.join(&self.finished_name)
    }
}

fn resolve_entries(source_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, BuildError> {
    let full = source_dir.join(pattern);
    let full = full.to_str().ok_or_else(|| BuildError::Pattern {
        message: format!("{} is not valid UTF-8", full.display()).into(),
        context: Some("build.entry_pattern".into()),
    })?;

    let paths = glob::glob(full).map_err(|e| BuildError::Pattern {
        message: format!("'{full}': {e}").into(),
        context: Some("build.entry_pattern".into()),
    })?;

    let mut entries = Vec::new();
    for path in paths {
        match path {
            Ok(path) if path.is_file() => entries.push(path),
            Ok(_) => {},
            Err(e) => warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable entry"),
        }
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn settings(dir: &Path) -> BuildSettings {
        BuildSettings {
            source_dir: dir.join("app/javascript"),
            out_dir: dir.join("app/assets/builds"),
            ..BuildSettings::default()
        }
    }

    #[test]
    fn globs_files_only_in_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app/javascript");
        fs::create_dir_all(src.join("nested.d")).unwrap();
        fs::write(src.join("b.less"), "").unwrap();
        fs::write(src.join("application.coffee"), "").unwrap();

        let config = BuildConfig::from_settings(&settings(tmp.path()), BuildFlags::default()).unwrap();

        assert_eq!(config.entries, vec![src.join("application.coffee"), src.join("b.less")]);
        assert_eq!(config.finish_input(), tmp.path().join("app/assets/builds/application.js"));
        assert_eq!(config.finished_path(), tmp.path().join("app/assets/builds/application.jsout"));
        assert_eq!(config.debounce, Duration::from_millis(100));
    }

    #[test]
    fn watch_roots_are_distinct_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app/javascript");
        fs::create_dir_all(src.join("admin")).unwrap();
        fs::write(src.join("application.js"), "").unwrap();
        fs::write(src.join("site.less"), "").unwrap();
        fs::write(src.join("admin/panel.js"), "").unwrap();

        let settings = BuildSettings { entry_pattern: "**/*.*".to_owned(), ..settings(tmp.path()) };
        let config = BuildConfig::from_settings(&settings, BuildFlags::default()).unwrap();

        assert_eq!(config.entries.len(), 3);
        assert_eq!(config.watch_roots(), vec![src.clone(), src.join("admin")]);
    }

    #[test]
    fn no_entries_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BuildConfig::from_settings(&settings(tmp.path()), BuildFlags::default()).unwrap_err();
        assert!(matches!(err, BuildError::Config { .. }));
    }

    #[test]
    fn malformed_glob_is_a_pattern_error() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = BuildSettings { entry_pattern: "[*.js".to_owned(), ..settings(tmp.path()) };
        let err = BuildConfig::from_settings(&settings, BuildFlags::default()).unwrap_err();
        assert!(matches!(err, BuildError::Pattern { .. }));
    }

    #[test]
    fn flags_are_carried() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app/javascript");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("application.js"), "").unwrap();

        let flags = BuildFlags { watch: true, analyze: true };
        let config = BuildConfig::from_settings(&settings(tmp.path()), flags).unwrap();
        assert!(config.watch && config.analyze);
    }
}
