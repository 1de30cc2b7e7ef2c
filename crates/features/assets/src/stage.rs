//! Lifecycle hooks run around every build cycle.

use crate::bundler::BundleOutput;
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildErrorExt};
use crate::fs::write_atomic;
use crate::sourcemap::SourceMap;
use crate::transpiler::Transpiler;
use async_trait::async_trait;
use chrono::Local;
use moe_domain::config::OutputKind;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// What the bundler ended with, as seen by [`Stage::on_end`].
pub type Outcome<'a> = Result<&'a BundleOutput, &'a BuildError>;

/// A build plugin.
///
/// The pipeline calls `on_start` of every stage before bundling and `on_end`
/// of every stage after the bundler's files are written, both in list order.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn on_start(&self, _config: &BuildConfig) -> Result<(), BuildError> {
        Ok(())
    }

    async fn on_end(&self, _config: &BuildConfig, _outcome: Outcome<'_>) -> Result<(), BuildError> {
        Ok(())
    }
}

/// Paths and hash of the finished artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub path: PathBuf,
    pub map_path: PathBuf,
    /// Lowercase hex SHA-256 of the map file's bytes.
    pub hash: String,
}

/// Re-transpiles the finishing entry's bundle and writes the hashed artifact.
///
/// Reads `<out_dir>/<entry>.js` and its map, runs the [`Transpiler`] with the
/// map as input, rewrites the merged source paths, then writes
/// `<finished>` ending in `//# sourceMappingURL=<finished>-<sha256>.map` and
/// `<finished>.map` holding exactly the hashed bytes.
#[derive(Debug)]
pub struct FinishStage {
    transpiler: Arc<dyn Transpiler>,
}

impl FinishStage {
    pub fn new(transpiler: Arc<dyn Transpiler>) -> Self {
        Self { transpiler }
    }

    /// Runs the finishing pass on whatever is currently in `out_dir`.
    ///
    /// # Errors
    /// Returns [`BuildError::Io`] if the bundle or its map cannot be read or the
    /// artifacts cannot be written, [`BuildError::SourceMap`] for a broken map,
    /// and whatever the transpiler reports.
    pub async fn finish(&self, config: &BuildConfig) -> Result<Finished, BuildError> {
        let input = config.finish_input();
        let input_map_path = map_path_of(&input);

        let code = tokio::fs::read_to_string(&input)
            .await
            .context(format!("Read failed: {}", input.display()))?;
        let input_map = tokio::fs::read(&input_map_path)
            .await
            .context(format!("Read failed: {}", input_map_path.display()))?;
        let input_map =
            SourceMap::from_slice(&input_map).context(input_map_path.display().to_string())?;

        let transpiled = self.transpiler.transpile(&code, &input_map).await?;

        let mut map = transpiled.map;
        map.file = Some(config.finished_name.clone());
        config.source_rewrite.apply(&mut map);
        let map_bytes = map.to_vec()?;
        let hash = hex::encode(Sha256::digest(&map_bytes));

        let path = config.finished_path();
        let map_path = map_path_of(&path);
        let output = format!(
            "{}\n//# sourceMappingURL={}-{hash}.map",
            transpiled.code, config.finished_name
        );

        write_atomic(&path, output.as_bytes()).await?;
        write_atomic(&map_path, &map_bytes).await?;

        Ok(Finished { path, map_path, hash })
    }
}

#[async_trait]
impl Stage for FinishStage {
    fn name(&self) -> &'static str {
        "finish"
    }

    async fn on_end(&self, config: &BuildConfig, outcome: Outcome<'_>) -> Result<(), BuildError> {
        let Ok(bundle) = outcome else { return Ok(()) };

        let input = config.finish_input();
        let produced =
            bundle.outputs.iter().any(|o| o.kind == OutputKind::Script && o.path == input);
        if !produced {
            return Err(BuildError::Config {
                message: format!("entry '{}' produced no script bundle", config.finish_entry)
                    .into(),
                context: Some("build.finish_entry".into()),
            });
        }

        let finished = self.finish(config).await?;
        info!(path = %finished.path.display(), hash = %finished.hash, "Finished bundle written");
        Ok(())
    }
}

/// Logs the metafile composition report after each successful build.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyzeStage;

#[async_trait]
impl Stage for AnalyzeStage {
    fn name(&self) -> &'static str {
        "analyze"
    }

    async fn on_end(&self, _config: &BuildConfig, outcome: Outcome<'_>) -> Result<(), BuildError> {
        if let Ok(BundleOutput { metafile: Some(metafile), .. }) = outcome {
            info!("Bundle analysis\n\n{}", metafile.report());
        }
        Ok(())
    }
}

/// Logs the start time and duration of every cycle, failed ones included.
#[derive(Debug, Default)]
pub struct LogStage {
    started: Mutex<Option<Instant>>,
}

#[async_trait]
impl Stage for LogStage {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn on_start(&self, _config: &BuildConfig) -> Result<(), BuildError> {
        *self.started.lock() = Some(Instant::now());
        info!(at = %Local::now().to_rfc3339(), "Build started");
        Ok(())
    }

    async fn on_end(&self, _config: &BuildConfig, _outcome: Outcome<'_>) -> Result<(), BuildError> {
        let elapsed = self.started.lock().take().map_or(0, |t| t.elapsed().as_millis());
        info!(at = %Local::now().to_rfc3339(), "Build finished ({elapsed}ms)");
        Ok(())
    }
}

fn map_path_of(path: &std::path::Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}
