use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{create_dir_all, read_to_string, write};
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Lays out a small content tree plus a config file pointing at it.
fn create_project(extra_config: &str) -> TempDir {
    let dir = tempdir().expect("Creating temp project failed");
    let root = dir.path();
    create_dir_all(root.join("content/blog/posts")).unwrap();
    write(root.join("content/blog/blog.md"), "# Blog\n\nWelcome.\n").unwrap();
    write(
        root.join("content/blog/site.json"),
        r#"{"title": "ipsum blog"}"#,
    )
    .unwrap();
    write(
        root.join("content/blog/posts/index.md"),
        "---\ntitle: Archive\n---\nAll posts.\n",
    )
    .unwrap();
    write(
        root.join("content/blog/posts/oakland-activist.md"),
        "Oakland Activist\n================\n\nLorem ipsum.\n",
    )
    .unwrap();
    write(
        root.join("config.yaml"),
        format!("source_dir: content\noutput_dir: public\n{extra_config}"),
    )
    .expect("Writing temp config failed");
    dir
}

fn convert(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("markdown-json").expect("Binary exists");
    cmd.arg("convert")
        .arg("--config")
        .arg(root.join("config.yaml"))
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn convert_consolidates_tree_into_content_json() {
    let project = create_project("");
    convert(project.path()).assert().success();

    let written = read_to_string(project.path().join("public/content.json")).unwrap();
    let tree: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(tree["blog"]["site"]["title"], "ipsum blog");
    assert_eq!(tree["blog"]["blog"]["title"], "Blog");
    assert_eq!(tree["blog"]["posts"]["index"]["title"], "Archive");
    assert_eq!(
        tree["blog"]["posts"]["oakland-activist"]["title"],
        "Oakland Activist"
    );
    assert!(tree["blog"]["posts"]["index"]["updatedAt"].is_string());
}

#[test]
fn command_line_overrides_apply() {
    let project = create_project("mode: single\n");
    convert(project.path())
        .arg("--mode")
        .arg("consolidate")
        .arg("--name")
        .arg("blog.json")
        .arg("--flatten-index")
        .assert()
        .success();

    let written = read_to_string(project.path().join("public/blog.json")).unwrap();
    let tree: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(tree["blog"]["title"], "Blog");
    assert_eq!(tree["blog"]["posts"]["title"], "Archive");
}

#[test]
fn single_mode_writes_one_file_per_document() {
    let project = create_project("mode: single\nstrip_title: true\n");
    convert(project.path()).assert().success();

    let post = read_to_string(project.path().join("public/blog/posts/oakland-activist.json")).unwrap();
    let post: serde_json::Value = serde_json::from_str(&post).unwrap();
    assert_eq!(post["title"], "Oakland Activist");
    assert!(!post["body"].as_str().unwrap().contains("<h1>"));
    assert!(project.path().join("public/blog/site.json").is_file());
    assert!(!project.path().join("public/content.json").exists());
}

#[test]
fn invalid_documents_fail_the_run_but_not_their_siblings() {
    let project = create_project("");
    write(project.path().join("content/invalid.json"), "{ nope").unwrap();

    convert(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid.json is not valid JSON"));

    let written = read_to_string(project.path().join("public/content.json")).unwrap();
    assert!(written.contains("oakland-activist"));
    assert!(!written.contains("invalid"));
}

#[test]
fn missing_config_is_reported() {
    let mut cmd = Command::cargo_bin("markdown-json").expect("Binary exists");
    cmd.arg("convert")
        .arg("--config")
        .arg("does-not-exist.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use markdown_json::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Convert {
            config: std::path::PathBuf::from("dummy.yaml"),
            mode: None,
            name: None,
            flatten_index: false,
            strip_title: false,
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
