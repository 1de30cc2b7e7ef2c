mod common;

use async_trait::async_trait;
use common::{FakeCoffee, FakeLess, Project, SYNTAX_ERROR};
use moe_assets::{
    BuildConfig, BuildError, BuildFlags, BuildState, CommandTransform, FinishStage, LogStage,
    Minifier, Outcome, Pipeline, SourceMap, Stage, Transform,
};
use moe_domain::config::{OutputKind, TransformSettings};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::Arc;

fn transforms() -> Vec<Arc<dyn Transform>> {
    vec![Arc::new(FakeCoffee::default()), Arc::new(FakeLess::default())]
}

fn pipeline(project: &Project, flags: BuildFlags) -> Pipeline {
    Pipeline::new(project.config(flags)).with_transforms(transforms())
}

fn suffix_hash(finished: &str) -> &str {
    let marker = "//# sourceMappingURL=application.jsout-";
    let start = finished.rfind(marker).expect("finished file must reference its map") + marker.len();
    finished[start..].strip_suffix(".map").expect("reference must end in .map")
}

#[tokio::test]
async fn build_writes_bundles_and_hashed_finish() {
    let project = Project::new();
    project.source("application.coffee", "init()\n  start()\n");
    project.source("vendor.js", "window.vendor = 1;\n");

    let output = pipeline(&project, BuildFlags::default()).run_once().await.unwrap();
    assert_eq!(output.outputs.len(), 2);
    assert!(output.metafile.is_none());

    let bundle = project.read("application.js");
    assert!(bundle.ends_with("\n//# sourceMappingURL=application.js.map\n"), "{bundle}");
    assert!(project.read("vendor.js").starts_with("window.vendor = 1;\n"));

    let finished = project.read("application.jsout");
    let map_bytes = project.bytes("application.jsout.map");
    assert_eq!(suffix_hash(&finished), hex::encode(Sha256::digest(&map_bytes)));
    assert!(finished.starts_with("init();\nstart();\n//# sourceMappingURL="), "{finished}");

    let map = SourceMap::from_slice(&map_bytes).unwrap();
    assert_eq!(map.file.as_deref(), Some("application.jsout"));
    assert_eq!(map.sources, vec!["../../javascript/application.coffee".to_owned()]);
    let second = map.lines().unwrap()[1][0].origin.unwrap();
    assert_eq!((second.line, second.column), (1, 2));
}

#[tokio::test]
async fn plain_javascript_sources_are_relative_to_out_dir() {
    let project = Project::new();
    project.source("application.js", "a();\n");

    pipeline(&project, BuildFlags::default()).run_once().await.unwrap();

    let map = SourceMap::from_slice(&project.bytes("application.js.map")).unwrap();
    assert_eq!(map.sources, vec!["../../javascript/application.js".to_owned()]);
    assert_eq!(map.sources_content, Some(vec![Some("a();\n".to_owned())]));
}

#[cfg(unix)]
#[tokio::test]
async fn compiler_inline_map_is_chained_into_bundle_and_finish() {
    let project = Project::new();
    project.source("application.coffee", "boot()\n");
    let script = "printf '// Generated by CoffeeScript\\n\\nboot();\\n//# sourceMappingURL=data:application/json;base64,eyJ2ZXJzaW9uIjozLCJzb3VyY2VzIjpbIiJdLCJuYW1lcyI6W10sIm1hcHBpbmdzIjoiOztBQUFBIn0=\\n'";
    let coffee = CommandTransform::new(TransformSettings {
        name: "coffeescript".to_owned(),
        extensions: vec!["coffee".to_owned()],
        command: "sh".to_owned(),
        args: vec!["-c".to_owned(), script.to_owned()],
        output: OutputKind::Script,
    });

    Pipeline::new(project.config(BuildFlags::default()))
        .with_transforms(vec![Arc::new(coffee)])
        .run_once()
        .await
        .unwrap();

    let bundle = project.read("application.js");
    assert_eq!(bundle.matches("sourceMappingURL").count(), 1, "{bundle}");
    let map = SourceMap::from_slice(&project.bytes("application.js.map")).unwrap();
    assert_eq!(map.sources, vec!["../../javascript/application.coffee".to_owned()]);
    assert_eq!(map.sources_content, Some(vec![Some("boot()\n".to_owned())]));
    let lines = map.lines().unwrap();
    assert_eq!(lines[2][0].origin.map(|o| o.line), Some(0));

    let finished = SourceMap::from_slice(&project.bytes("application.jsout.map")).unwrap();
    let boot = finished.lines().unwrap()[1].iter().find_map(|s| s.origin);
    assert_eq!(boot.map(|o| (o.line, o.column)), Some((0, 0)));
}

#[tokio::test]
async fn stylesheets_get_a_css_bundle() {
    let project = Project::new();
    project.source("application.js", "a();\n");
    project.source("site.less", "body { margin: 0 }\n");

    pipeline(&project, BuildFlags::default()).run_once().await.unwrap();

    let css = project.read("site.css");
    assert_eq!(css, "body { margin: 0 }\n/*# sourceMappingURL=site.css.map */\n");
    assert!(project.out("site.css.map").exists());
}

#[tokio::test]
async fn compile_failure_writes_nothing() {
    let project = Project::new();
    project.source("application.coffee", "init()\n");
    project.source("vendor.js", "v();\n");
    let pipeline = pipeline(&project, BuildFlags::default());
    pipeline.run_once().await.unwrap();

    let before = (project.bytes("application.jsout"), project.bytes("vendor.js"));
    project.source("application.coffee", &format!("init()\n{SYNTAX_ERROR}\n"));
    project.source("vendor.js", "changed();\n");

    let err = pipeline.run_once().await.unwrap_err();

    assert!(matches!(err, BuildError::Compile { .. }), "{err}");
    assert_eq!(*pipeline.state().borrow(), BuildState::Failed);
    assert_eq!((project.bytes("application.jsout"), project.bytes("vendor.js")), before);
}

#[tokio::test]
async fn entries_sharing_a_stem_are_rejected() {
    let project = Project::new();
    let coffee = project.source("application.coffee", "init()\n");
    let plain = project.source("application.js", "plain();\n");

    let err = pipeline(&project, BuildFlags::default()).run_once().await.unwrap_err();

    assert!(matches!(err, BuildError::Config { .. }), "{err}");
    let text = err.to_string();
    assert!(text.contains(&coffee.display().to_string()), "{text}");
    assert!(text.contains(&plain.display().to_string()), "{text}");
    assert!(!project.out("application.js").exists());
}

#[tokio::test]
async fn unknown_extension_fails_the_build() {
    let project = Project::new();
    project.source("application.js", "a();\n");
    project.source("types.ts", "let a: number = 1;\n");

    let err = pipeline(&project, BuildFlags::default()).run_once().await.unwrap_err();

    assert!(matches!(err, BuildError::Compile { .. }));
    assert!(!project.out("application.js").exists());
}

#[tokio::test]
async fn missing_finish_entry_fails_the_cycle() {
    let project = Project::new();
    project.source("admin.js", "a();\n");

    let pipeline = pipeline(&project, BuildFlags::default());
    let err = pipeline.run_once().await.unwrap_err();

    assert!(matches!(err, BuildError::Config { .. }), "{err}");
    assert!(project.out("admin.js").exists());
    assert!(!project.out("application.jsout").exists());
}

#[tokio::test]
async fn analyze_collects_a_metafile() {
    let project = Project::new();
    let entry = project.source("application.coffee", "a()\nb()\n");

    let output = pipeline(&project, BuildFlags { analyze: true, ..BuildFlags::default() })
        .run_once()
        .await
        .unwrap();

    let metafile = output.metafile.expect("analyze must produce a metafile");
    let input = entry.to_string_lossy().into_owned();
    assert_eq!(metafile.inputs[&input].bytes, 8);
    let out = &metafile.outputs[&project.out("application.js").to_string_lossy().into_owned()];
    assert_eq!(out.inputs[&input], "a();\nb();".len());
    assert!(metafile.report().contains("100.0%"));
}

/// Records the order of hooks and whether the bundle existed at `on_end`.
#[derive(Debug, Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl Stage for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn on_start(&self, _config: &BuildConfig) -> Result<(), BuildError> {
        self.events.lock().push("start".to_owned());
        Ok(())
    }

    async fn on_end(&self, config: &BuildConfig, outcome: Outcome<'_>) -> Result<(), BuildError> {
        let on_disk = config.finish_input().exists();
        let finished = config.finished_path().exists();
        let ok = outcome.is_ok();
        self.events.lock().push(format!("end ok={ok} bundle={on_disk} finished={finished}"));
        Ok(())
    }
}

#[tokio::test]
async fn stages_end_after_bundle_is_written_in_list_order() {
    let project = Project::new();
    project.source("application.js", "a();\n");
    let recorder = Arc::new(Recorder::default());

    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(FinishStage::new(Arc::new(Minifier))),
        recorder.clone(),
        Arc::new(LogStage::default()),
    ];
    let pipeline = Pipeline::new(project.config(BuildFlags::default())).with_stages(stages);
    pipeline.run_once().await.unwrap();

    assert_eq!(
        *recorder.events.lock(),
        vec!["start".to_owned(), "end ok=true bundle=true finished=true".to_owned()]
    );
}

#[tokio::test]
async fn state_ends_in_done() {
    let project = Project::new();
    project.source("application.js", "a();\n");
    let pipeline = pipeline(&project, BuildFlags::default());
    let state = pipeline.state();
    assert_eq!(*state.borrow(), BuildState::Idle);

    pipeline.run_once().await.unwrap();

    assert_eq!(*state.borrow(), BuildState::Done);
}
