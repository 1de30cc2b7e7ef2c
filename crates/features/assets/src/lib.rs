//! # Assets
//!
//! Front-end asset build pipeline.
//!
//! A [`Pipeline`] resolves entry points once from a glob, compiles each one
//! with the [`Transform`] matching its extension, has a [`Bundler`] write one
//! bundle plus external source map per entry, and then hands the result to an
//! ordered list of [`Stage`]s:
//!
//! * [`FinishStage`] re-transpiles the main bundle through a [`Transpiler`],
//!   chains the source maps, rewrites duplicated source paths and writes
//!   `application.jsout` with a SHA-256 stamped map reference.
//! * [`AnalyzeStage`] logs a [`Metafile`] composition report.
//! * [`LogStage`] logs the start and duration of every cycle.
//!
//! ## Example
//!
//! ```rust,no_run
//! use moe_assets::{BuildConfig, BuildFlags, Pipeline};
//! use moe_domain::config::BuildSettings;
//!
//! # async fn example() -> Result<(), moe_assets::BuildError> {
//! let config = BuildConfig::from_settings(&BuildSettings::default(), BuildFlags::default())?;
//! let pipeline = Pipeline::new(config);
//! pipeline.run_once().await?;
//! # Ok(())
//! # }
//! ```

mod bundler;
mod config;
mod error;
mod fs;
mod pipeline;
pub mod sourcemap;
mod stage;
mod transform;
mod transpiler;

pub use crate::bundler::{
    BundleOutput, Bundler, FileBundler, InputMeta, Metafile, OutputFile, OutputMeta,
};
pub use crate::config::{BuildConfig, BuildFlags};
pub use crate::error::{BuildError, BuildErrorExt};
pub use crate::pipeline::{BuildState, Pipeline};
pub use crate::sourcemap::{SourceMap, SourceRewrite};
pub use crate::stage::{AnalyzeStage, FinishStage, Finished, LogStage, Outcome, Stage};
pub use crate::transform::{CommandTransform, SourceFile, Transform, Transformed};
pub use crate::transpiler::{Minifier, Transpiled, Transpiler};
