use crate::config::BuildConfig;
use crate::error::{BuildError, BuildErrorExt};
use crate::fs::{relative_to, write_atomic};
use crate::sourcemap::SourceMap;
use crate::transform::{self, SourceFile, Transform, Transformed};
use async_trait::async_trait;
use moe_domain::config::OutputKind;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One written bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub map_path: PathBuf,
    pub kind: OutputKind,
    pub bytes: usize,
}

/// Everything a bundler run produced. Files are on disk when this exists.
#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
    pub outputs: Vec<OutputFile>,
    /// Present when analysis was requested.
    pub metafile: Option<Metafile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputMeta {
    pub bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputMeta {
    pub bytes: usize,
    /// Bytes each input contributed to this output.
    pub inputs: BTreeMap<String, usize>,
}

/// Composition of a bundle: input sizes and which inputs make up each output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metafile {
    pub inputs: BTreeMap<String, InputMeta>,
    pub outputs: BTreeMap<String, OutputMeta>,
}

impl Metafile {
    /// Human-readable size report.
    ///
    /// Outputs are listed largest first; under each, its inputs by contribution
    /// with their share of the output.
    #[must_use]
    pub fn report(&self) -> String {
        let mut outputs: Vec<(&String, &OutputMeta)> = self.outputs.iter().collect();
        outputs.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes).then_with(|| a.0.cmp(b.0)));

        let mut out = String::new();
        for (path, meta) in outputs {
            let _ = writeln!(out, "  {path}  {}", human_size(meta.bytes));

            let mut inputs: Vec<(&String, &usize)> = meta.inputs.iter().collect();
            inputs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            let last = inputs.len().saturating_sub(1);
            for (i, (input, bytes)) in inputs.into_iter().enumerate() {
                let branch = if i == last { '└' } else { '├' };
                let _ = writeln!(
                    out,
                    "   {branch} {input}  {}  {:.1}%",
                    human_size(*bytes),
                    percent(*bytes, meta.bytes)
                );
            }
            out.push('\n');
        }
        out
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: usize) -> String {
    match bytes {
        b if b < 1024 => format!("{b}b"),
        b if b < 1024 * 1024 => format!("{:.1}kb", b as f64 / 1024.0),
        b => format!("{:.1}mb", b as f64 / (1024.0 * 1024.0)),
    }
}

/// Turns the entry points into written bundles.
///
/// Implementations must have every file durably written before `bundle`
/// returns; finishing stages read them right after.
#[async_trait]
pub trait Bundler: Send + Sync + Debug {
    async fn bundle(
        &self,
        config: &BuildConfig,
        transforms: &[Arc<dyn Transform>],
    ) -> Result<BundleOutput, BuildError>;
}

/// Compiles each entry on its own into `<out_dir>/<stem>.js` or `.css`
/// with an external `.map` next to it.
///
/// All entries are compiled before anything is written, so a failing entry
/// leaves the output directory as it was. Compilers that report no map get a
/// line-for-line map onto the entry, with sources relative to `out_dir`.
/// Two entries that would write the same output file are a
/// [`BuildError::Config`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBundler;

struct Compiled {
    entry: SourceFile,
    output: Transformed,
    name: String,
    path: PathBuf,
}

#[async_trait]
impl Bundler for FileBundler {
    async fn bundle(
        &self,
        config: &BuildConfig,
        transforms: &[Arc<dyn Transform>],
    ) -> Result<BundleOutput, BuildError> {
        let mut compiled = Vec::with_capacity(config.entries.len());
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(config.entries.len());
        for path in &config.entries {
            let code = tokio::fs::read_to_string(path)
                .await
                .context(format!("Read failed: {}", path.display()))?;
            let entry = SourceFile { path: path.clone(), code };
            let output = transform::apply(transforms, &entry).await?;

            let stem = entry.path.file_stem().map_or_else(
                || "bundle".to_owned(),
                |s| s.to_string_lossy().into_owned(),
            );
            let extension = match output.kind {
                OutputKind::Script => "js",
                OutputKind::Stylesheet => "css",
            };
            let name = format!("{stem}.{extension}");
            let out = config.out_dir.join(&name);
            if let Some(first) = claimed.insert(out.clone(), entry.path.clone()) {
                return Err(BuildError::config(format!(
                    "{} and {} both bundle to {name}",
                    first.display(),
                    entry.path.display()
                )))
                .context("build.entry_pattern");
            }

            compiled.push(Compiled { entry, output, name, path: out });
        }

        let mut metafile = config.analyze.then(Metafile::default);
        let mut outputs = Vec::with_capacity(compiled.len());
        for Compiled { entry, output, name, path } in compiled {
            let map_name = format!("{name}.map");
            let map_path = config.out_dir.join(&map_name);

            let source = relative_to(&entry.path, &config.out_dir)?;
            let mut map = match output.map {
                Some(mut map) => {
                    anchor_sources(&mut map, &source, &entry.code);
                    map
                },
                None => {
                    let mut map = SourceMap::identity(&name, source, &output.code);
                    map.sources_content = Some(vec![Some(entry.code.clone())]);
                    map
                },
            };
            map.file = Some(name.clone());

            let trailer = match output.kind {
                OutputKind::Script => format!("//# sourceMappingURL={map_name}"),
                OutputKind::Stylesheet => format!("/*# sourceMappingURL={map_name} */"),
            };
            let code = format!("{}\n{trailer}\n", output.code.trim_end_matches('\n'));

            write_atomic(&path, code.as_bytes()).await?;
            write_atomic(&map_path, &map.to_vec()?).await?;
            debug!(output = %path.display(), bytes = code.len(), "Bundle written");

            if let Some(meta) = metafile.as_mut() {
                let input_key = entry.path.to_string_lossy().into_owned();
                meta.inputs.insert(input_key.clone(), InputMeta { bytes: entry.code.len() });
                meta.outputs.insert(
                    path.to_string_lossy().into_owned(),
                    OutputMeta {
                        bytes: code.len(),
                        inputs: BTreeMap::from([(input_key, output.code.len())]),
                    },
                );
            }

            outputs.push(OutputFile { path, map_path, kind: output.kind, bytes: code.len() });
        }

        Ok(BundleOutput { outputs, metafile })
    }
}

/// Compilers reading stdin leave the source name blank; point those at the entry.
fn anchor_sources(map: &mut SourceMap, source: &str, code: &str) {
    for name in map.sources.iter_mut().filter(|s| s.is_empty()) {
        source.clone_into(name);
    }
    if map.sources_content.is_none() && map.sources.len() == 1 {
        map.sources_content = Some(vec![Some(code.to_owned())]);
    }
}
