use recipes::{run, Pipeline, PipelineError};
use scribe::{Scribe, ScribeError};
use splice::PatchError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Copies the seed artifacts into a fresh temp dir.
fn seed() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let src = fixtures();
    for entry in WalkDir::new(&src).into_iter().filter_map(|e| e.ok()) {
        let rel = entry.path().strip_prefix(&src).unwrap();
        let dest = tmp.path().join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
    tmp
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_full_pipeline_is_idempotent() {
    let tmp = seed();
    let scribe = Scribe::open(tmp.path()).unwrap();
    let pipeline = Pipeline::builtin().unwrap();

    let first = run(&scribe, pipeline.order()).unwrap();
    assert_eq!(first.len(), pipeline.recipes().len());
    assert!(first.iter().all(|r| r.changed()), "every recipe should edit the seed");
    let after_first = snapshot(tmp.path());

    let second = run(&scribe, pipeline.order()).unwrap();
    assert!(second.iter().all(|r| !r.changed()));
    assert!(second
        .iter()
        .flat_map(|r| &r.artifact.edits)
        .all(|e| !e.changed));
    assert_eq!(snapshot(tmp.path()), after_first);
}

#[test]
fn test_full_pipeline_result() {
    let tmp = seed();
    let scribe = Scribe::open(tmp.path()).unwrap();
    let pipeline = Pipeline::builtin().unwrap();
    run(&scribe, pipeline.order()).unwrap();

    let html = fs::read_to_string(tmp.path().join("public/index.html")).unwrap();
    assert_eq!(html.matches(r#"id="sign-in-btn""#).count(), 1);
    assert_eq!(html.matches(r#"id="auth-modal-overlay""#).count(), 1);
    assert!(!html.contains("<!-- Language Toggle -->"));
    assert!(!html.contains("mode-switcher-btn"));
    assert!(html.contains(r#"<link rel="stylesheet" href="auth-modal.css">"#));

    // Sidebar is the first child of the chat section.
    let chat = html
        .find(r#"<section id="chat-section" class="chat-section hidden">"#)
        .unwrap();
    let sidebar = html.find(r#"id="sidebar-menu""#).unwrap();
    let messages = html.find(r#"id="chat-messages""#).unwrap();
    assert!(chat < sidebar && sidebar < messages);

    // Top-right auth sits right after <body>, before the home section.
    let top_right = html.find(r#"class="top-right-auth""#).unwrap();
    assert!(top_right < html.find("<!-- Home Section -->").unwrap());

    let app = fs::read_to_string(tmp.path().join("public/app.js")).unwrap();
    assert!(app.contains("newChatBtn: document.getElementById('new-chat-btn')"));
    assert!(app.find("function startNewChat()").unwrap() < app.find("// Initialize Application").unwrap());

    let css = fs::read_to_string(tmp.path().join("public/style.css")).unwrap();
    let seed_css = fs::read_to_string(fixtures().join("public/style.css")).unwrap();
    assert!(css.starts_with(&seed_css));

    let search = fs::read_to_string(tmp.path().join("routes/search.js")).unwrap();
    assert!(search.contains("${resourceLanguage}"));
    assert!(search.contains("module.exports = router;"));
}

#[test]
fn test_select_sidebar_pulls_dependencies() {
    let pipeline = Pipeline::builtin().unwrap();
    let names: Vec<&str> = pipeline
        .select(&["sidebar"])
        .unwrap()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["language-selector", "auth-html", "auth-layout", "sidebar"]);
}

#[test]
fn test_selected_run_touches_only_its_artifacts() {
    let tmp = seed();
    let scribe = Scribe::open(tmp.path()).unwrap();
    let pipeline = Pipeline::builtin().unwrap();
    let before = snapshot(tmp.path());

    run(&scribe, pipeline.select(&["chat-section-css"]).unwrap()).unwrap();

    let after = snapshot(tmp.path());
    for (rel, text) in &after {
        if rel != Path::new("public/style.css") {
            assert_eq!(Some(text), before.get(rel), "{} changed", rel.display());
        }
    }
    assert!(after[Path::new("public/style.css")].contains("LANGUAGE SELECTOR DROPDOWN"));
}

#[test]
fn test_missing_anchor_leaves_artifact_untouched() {
    let tmp = seed();
    let index = tmp.path().join("public/index.html");
    let broken = fs::read_to_string(&index)
        .unwrap()
        .replace(r#"<body class="home-state">"#, "<body>");
    fs::write(&index, &broken).unwrap();

    let scribe = Scribe::open(tmp.path()).unwrap();
    let pipeline = Pipeline::builtin().unwrap();
    let err = run(&scribe, pipeline.select(&["auth-layout"]).unwrap()).unwrap_err();

    match err {
        PipelineError::Recipe { recipe, source } => {
            assert_eq!(recipe, "auth-layout");
            assert!(matches!(
                source,
                ScribeError::Patch {
                    source: PatchError::LocatorNotFound { .. },
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Earlier recipes stay applied; the failing one wrote nothing.
    let html = fs::read_to_string(&index).unwrap();
    assert!(html.contains(r#"id="sign-in-btn""#));
    assert!(!html.contains(r#"class="top-right-auth""#));
    assert!(html.contains("      <!-- Sign In Button -->"));
}

#[test]
fn test_missing_artifact_reported() {
    let tmp = seed();
    fs::remove_file(tmp.path().join("routes/search.js")).unwrap();

    let scribe = Scribe::open(tmp.path()).unwrap();
    let pipeline = Pipeline::builtin().unwrap();
    let err = run(&scribe, pipeline.select(&["search-glue"]).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Recipe {
            source: ScribeError::ArtifactNotFound { .. },
            ..
        }
    ));
}

#[test]
fn test_manifest_cannot_patch_outside_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("site");
    fs::create_dir_all(&root).unwrap();
    let outside = tmp.path().join("outside.txt");
    fs::write(&outside, "orig").unwrap();

    let manifest = tmp.path().join("escape.json");
    fs::write(
        &manifest,
        r#"{
            "name": "escape",
            "artifact": "../outside.txt",
            "patches": [{ "name": "tail", "mode": "append", "payload": "appended" }]
        }"#,
    )
    .unwrap();

    let plan = recipes::plan(&manifest).unwrap();
    let scribe = Scribe::open(&root).unwrap();
    let err = run(&scribe, plan.recipes().unwrap()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Recipe {
            source: ScribeError::OutsideRoot { .. },
            ..
        }
    ));
    assert_eq!(fs::read_to_string(&outside).unwrap(), "orig");
}
