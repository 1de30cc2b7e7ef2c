#![allow(dead_code)]

use async_trait::async_trait;
use moe_assets::{BuildConfig, BuildError, BuildFlags, SourceFile, SourceMap, Transform, Transformed};
use moe_domain::config::{BuildSettings, OutputKind};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Marker that makes [`FakeCoffee`] reject a file.
pub const SYNTAX_ERROR: &str = "!!syntax";

/// A throwaway project with `app/javascript` and `app/assets/builds`.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/javascript")).unwrap();
        Self { dir }
    }

    pub fn source(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join("app/javascript").join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn settings(&self) -> BuildSettings {
        BuildSettings {
            source_dir: self.dir.path().join("app/javascript"),
            out_dir: self.dir.path().join("app/assets/builds"),
            debounce_ms: 20,
            transforms: Vec::new(),
            ..BuildSettings::default()
        }
    }

    pub fn config(&self, flags: BuildFlags) -> BuildConfig {
        BuildConfig::from_settings(&self.settings(), flags).unwrap()
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join("app/assets/builds").join(name)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.out(name)).unwrap()
    }

    pub fn bytes(&self, name: &str) -> Vec<u8> {
        fs::read(self.out(name)).unwrap()
    }
}

/// Stand-in for the legacy compiler: terminates every line with `;` and
/// reports a map whose source path carries the duplicated prefix the real
/// compiler chain produces.
#[derive(Debug)]
pub struct FakeCoffee {
    extensions: Vec<String>,
}

impl Default for FakeCoffee {
    fn default() -> Self {
        Self { extensions: vec!["coffee".to_owned()] }
    }
}

#[async_trait]
impl Transform for FakeCoffee {
    fn name(&self) -> &str {
        "fake-coffee"
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    async fn transform(&self, source: &SourceFile) -> Result<Transformed, BuildError> {
        if source.code.contains(SYNTAX_ERROR) {
            return Err(BuildError::compile(format!(
                "{}: unexpected token",
                source.path.display()
            )));
        }

        let code: Vec<String> = source.code.lines().map(|l| format!("{l};")).collect();
        let code = code.join("\n");
        let file = source.path.file_name().unwrap().to_string_lossy().into_owned();
        let map = SourceMap::identity(
            "bundle.js",
            format!("../../javascript/nested/app/javascript/{file}"),
            &source.code,
        );
        Ok(Transformed { code, map: Some(map), kind: OutputKind::Script })
    }
}

/// Turns `.less` files into CSS by copying them.
#[derive(Debug)]
pub struct FakeLess {
    extensions: Vec<String>,
}

impl Default for FakeLess {
    fn default() -> Self {
        Self { extensions: vec!["less".to_owned()] }
    }
}

#[async_trait]
impl Transform for FakeLess {
    fn name(&self) -> &str {
        "fake-less"
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    async fn transform(&self, source: &SourceFile) -> Result<Transformed, BuildError> {
        Ok(Transformed { code: source.code.clone(), map: None, kind: OutputKind::Stylesheet })
    }
}
