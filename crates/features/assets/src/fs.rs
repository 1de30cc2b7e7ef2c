use crate::error::{BuildError, BuildErrorExt};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `data` to `target` through a temporary sibling and a rename.
///
/// Readers see either the previous file or the complete new one, never a
/// partial write. Parent directories are created as needed.
pub(crate) async fn write_atomic(target: &Path, data: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create {}", parent.display()))?;
    }

    let temp = tmp_path(target);
    let written = async {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .await
            .context(format!("Temp creation failed: {}", temp.display()))?;
        file.write_all(data).await.context(format!("Write failed: {}", temp.display()))?;
        file.sync_all().await.context(format!("Sync failed: {}", temp.display()))?;
        fs::rename(&temp, target)
            .await
            .context(format!("Rename failed: {} -> {}", temp.display(), target.display()))
    }
    .await;

    if written.is_err() {
        let _ = fs::remove_file(&temp).await;
    }
    written
}

fn tmp_path(target: &Path) -> PathBuf {
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target.file_name().and_then(|s| s.to_str()).unwrap_or("artifact");
    target.with_file_name(format!(".{name}.tmp.{}.{counter}", std::process::id()))
}

/// Path of `path` as seen from directory `base`, using `/` separators.
///
/// Both paths are made absolute against the working directory first, so
/// `app/javascript/a.coffee` seen from `app/assets/builds` is
/// `../../javascript/a.coffee`.
pub(crate) fn relative_to(path: &Path, base: &Path) -> Result<String, BuildError> {
    let path = std::path::absolute(path).context(format!("Cannot resolve {}", path.display()))?;
    let base = std::path::absolute(base).context(format!("Cannot resolve {}", base.display()))?;

    let path: Vec<Component<'_>> = normalize(&path);
    let base: Vec<Component<'_>> = normalize(&base);
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();

    let ups = std::iter::repeat_n("..".to_owned(), base.len() - common);
    let downs = path[common..].iter().map(|c| c.as_os_str().to_string_lossy().into_owned());
    Ok(ups.chain(downs).collect::<Vec<_>>().join("/"))
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                }
            },
            other => parts.push(other),
        }
    }
    parts
}
