use crate::bundler::{BundleOutput, Bundler, FileBundler};
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildErrorExt};
use crate::stage::{AnalyzeStage, FinishStage, LogStage, Stage};
use crate::transform::{CommandTransform, Transform};
use crate::transpiler::Minifier;
use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Where the pipeline is in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Building,
    Finishing,
    Done,
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Finishing => "finishing",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Drives build cycles: stage starts, bundling, then stage ends.
///
/// One cycle runs at a time. `on_end` hooks only run once the bundler has
/// returned, which means its files are on disk.
#[derive(Debug)]
pub struct Pipeline {
    config: Arc<BuildConfig>,
    transforms: Vec<Arc<dyn Transform>>,
    bundler: Arc<dyn Bundler>,
    stages: Vec<Arc<dyn Stage>>,
    state: watch::Sender<BuildState>,
}

impl Pipeline {
    /// Pipeline with the built-in pieces: one [`CommandTransform`] per configured
    /// compiler, the [`FileBundler`], and the finish, analyze (when enabled) and
    /// log stages in that order.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        let transforms = config
            .transforms
            .iter()
            .cloned()
            .map(|t| Arc::new(CommandTransform::new(t)) as Arc<dyn Transform>)
            .collect();

        let finish = FinishStage::new(Arc::new(Minifier));
        let mut stages: Vec<Arc<dyn Stage>> = vec![Arc::new(finish)];
        if config.analyze {
            stages.push(Arc::new(AnalyzeStage));
        }
        stages.push(Arc::new(LogStage::default()));

        let (state, _) = watch::channel(BuildState::Idle);
        Self { config: Arc::new(config), transforms, bundler: Arc::new(FileBundler), stages, state }
    }

    #[must_use]
    pub fn with_transforms(mut self, transforms: Vec<Arc<dyn Transform>>) -> Self {
        self.transforms = transforms;
        self
    }

    #[must_use]
    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Arc<dyn Stage>>) -> Self {
        self.stages = stages;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<BuildState> {
        self.state.subscribe()
    }

    /// Runs a single build cycle.
    ///
    /// Failures are logged at `error` and leave earlier artifacts in place.
    ///
    /// # Errors
    /// Returns the bundler's error if bundling failed, otherwise the first
    /// error a stage hook reported.
    pub async fn run_once(&self) -> Result<BundleOutput, BuildError> {
        self.set_state(BuildState::Building);

        let mut failure: Option<BuildError> = None;
        for stage in &self.stages {
            if let Err(e) = stage.on_start(&self.config).await {
                error!(stage = stage.name(), error = %e, "Stage failed to start");
                failure.get_or_insert(e);
            }
        }

        let bundled = match failure.take() {
            Some(e) => Err(e),
            None => self.bundler.bundle(&self.config, &self.transforms).await,
        };
        if let Err(e) = &bundled {
            error!(error = %e, "Build failed");
        }

        self.set_state(BuildState::Finishing);
        for stage in &self.stages {
            if let Err(e) = stage.on_end(&self.config, bundled.as_ref()).await {
                error!(stage = stage.name(), error = %e, "Stage failed");
                failure.get_or_insert(e);
            }
        }

        let result = match (bundled, failure) {
            (Err(e), _) | (Ok(_), Some(e)) => Err(e),
            (Ok(output), None) => Ok(output),
        };
        self.set_state(if result.is_ok() { BuildState::Done } else { BuildState::Failed });
        result
    }

    /// Builds once, then rebuilds whenever an entry file changes, until
    /// `shutdown` completes. Failed cycles do not stop the loop.
    ///
    /// File events are collected from a [`notify`] watcher on the entries'
    /// directories. A rebuild starts once no entry event has arrived for the
    /// configured debounce period, so a burst of writes triggers one cycle.
    ///
    /// Returns the number of cycles run.
    ///
    /// # Errors
    /// Returns [`BuildError::Watch`] if the watcher cannot be started.
    pub async fn watch<F>(&self, shutdown: F) -> Result<usize, BuildError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("Failed to start file watcher")?;

        let mut entries = HashSet::with_capacity(self.config.entries.len());
        for entry in &self.config.entries {
            entries.insert(canonical(entry));
        }
        for root in self.config.watch_roots() {
            watcher
                .watch(&canonical(&root), RecursiveMode::NonRecursive)
                .context(format!("Watch failed: {}", root.display()))?;
        }

        let _ = self.run_once().await;
        let mut cycles = 1;
        info!(debounce = ?self.config.debounce, "Watching for changes");

        let mut deadline: Option<Instant> = None;
        loop {
            let due = deadline;
            let rebuild = async move {
                match due {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                () = &mut shutdown => break,
                Some(res) = rx.recv() => match res {
                    Ok(event) if touches_entry(&event, &entries) => {
                        trace!(kind = ?event.kind, paths = ?event.paths, "Entry changed");
                        deadline = Some(Instant::now() + self.config.debounce);
                    },
                    Ok(_) => {},
                    Err(e) => warn!(error = %e, "File watcher error"),
                },
                () = rebuild => {
                    deadline = None;
                    debug!("Change detected");
                    let _ = self.run_once().await;
                    cycles += 1;
                },
            }
        }

        drop(watcher);
        info!(cycles, "Watch stopped");
        Ok(cycles)
    }

    fn set_state(&self, state: BuildState) {
        debug!(%state, "Build state");
        self.state.send_replace(state);
    }
}

/// Content changes, creations, renames and removals of an entry. Reads and
/// metadata-only updates are ignored.
fn touches_entry(event: &notify::Event, entries: &HashSet<PathBuf>) -> bool {
    let relevant = match event.kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => true,
        _ => false,
    };
    relevant && event.paths.iter().any(|p| entries.contains(&canonical(p)))
}

/// Canonical form of `path`, or `path` itself when it cannot be resolved.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RenameMode};

    fn event(kind: EventKind, paths: &[&Path]) -> notify::Event {
        paths.iter().fold(notify::Event::new(kind), |e, p| e.add_path(p.to_path_buf()))
    }

    #[test]
    fn only_entry_content_changes_count() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("application.coffee");
        let other = tmp.path().join("application.staging");
        std::fs::write(&entry, "a()\n").unwrap();
        std::fs::write(&other, "b()\n").unwrap();
        let entries = HashSet::from([canonical(&entry)]);

        let write = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(touches_entry(&event(write, &[&entry]), &entries));
        assert!(!touches_entry(&event(write, &[&other]), &entries));

        let rename = EventKind::Modify(ModifyKind::Name(RenameMode::Both));
        assert!(touches_entry(&event(rename, &[&other, &entry]), &entries));
        assert!(touches_entry(&event(EventKind::Create(CreateKind::File), &[&entry]), &entries));

        let read = EventKind::Access(AccessKind::Any);
        assert!(!touches_entry(&event(read, &[&entry]), &entries));
        let touch = EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any));
        assert!(!touches_entry(&event(touch, &[&entry]), &entries));
    }
}
