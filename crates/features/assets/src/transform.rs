use crate::error::{BuildError, BuildErrorExt};
use crate::sourcemap::SourceMap;
use async_trait::async_trait;
use moe_domain::config::{OutputKind, TransformSettings};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// One entry file read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub code: String,
}

impl SourceFile {
    /// Lowercase extension without the dot, empty if there is none.
    #[must_use]
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

/// Result of compiling one [`SourceFile`].
#[derive(Debug, Clone)]
pub struct Transformed {
    pub code: String,
    /// Map from `code` back to the source file, when the compiler provides one.
    pub map: Option<SourceMap>,
    pub kind: OutputKind,
}

/// A per-file source compiler selected by file extension.
#[async_trait]
pub trait Transform: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Extensions this transform claims, without the leading dot.
    fn extensions(&self) -> &[String];

    fn handles(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }

    async fn transform(&self, source: &SourceFile) -> Result<Transformed, BuildError>;
}

/// Runs an external compiler that reads the source on stdin and prints the
/// result on stdout. A non-zero exit status is a compile failure carrying
/// whatever the compiler wrote to stderr.
///
/// A trailing inline `sourceMappingURL` data comment in the output becomes
/// [`Transformed::map`] and is removed from the code.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    settings: TransformSettings,
}

impl CommandTransform {
    #[must_use]
    pub const fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn extensions(&self) -> &[String] {
        &self.settings.extensions
    }

    async fn transform(&self, source: &SourceFile) -> Result<Transformed, BuildError> {
        let name = self.settings.name.clone();
        trace!(transform = %name, path = %source.path.display(), "Running compiler");

        let mut child = Command::new(&self.settings.command)
            .args(&self.settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BuildError::Compile {
                message: format!("cannot start '{}': {e}", self.settings.command).into(),
                context: Some(name.clone().into()),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| BuildError::Compile {
            message: "compiler stdin is not available".into(),
            context: Some(name.clone().into()),
        })?;
        let input = source.code.as_bytes();
        let feed = async move {
            let written = stdin.write_all(input).await;
            drop(stdin);
            written
        };

        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context(format!("{name}: {}", source.path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::Compile {
                message: format!("{}: {}", source.path.display(), stderr.trim()).into(),
                context: Some(name.into()),
            });
        }
        // A compiler may exit before reading everything; only its status counts.
        if let Err(e) = written {
            debug!(transform = %name, error = %e, "Compiler closed stdin early");
        }

        let code = String::from_utf8(output.stdout).map_err(|e| BuildError::Compile {
            message: format!("{}: output is not UTF-8: {e}", source.path.display()).into(),
            context: Some(name.clone().into()),
        })?;

        let (code, map) = SourceMap::split_inline(&code).context(name)?;
        Ok(Transformed { code, map, kind: self.settings.output })
    }
}

/// Picks the transform for `source` and runs it.
///
/// Without a matching transform `.js` files pass through unchanged; any other
/// extension is a compile failure.
pub(crate) async fn apply(
    transforms: &[std::sync::Arc<dyn Transform>],
    source: &SourceFile,
) -> Result<Transformed, BuildError> {
    if let Some(transform) = transforms.iter().find(|t| t.handles(&source.path)) {
        return transform.transform(source).await.context(transform.name().to_owned());
    }

    if source.extension() == "js" {
        return Ok(Transformed { code: source.code.clone(), map: None, kind: OutputKind::Script });
    }

    Err(BuildError::Compile {
        message: format!("no transform handles {}", source.path.display()).into(),
        context: None,
    })
}

fn extension_of(path: &Path) -> String {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default()
}
