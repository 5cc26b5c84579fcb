use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_to_string, write, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("repo-flatten").expect("Binary exists");
    cmd.current_dir(dir)
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_API_URL")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn archive_command_writes_flattened_document() {
    let tmp = tempdir().unwrap();
    let zip_path = tmp.path().join("repo.zip");
    write_zip(&zip_path, &[("src/lib.rs", "pub fn f() {}")]);
    let out_path = tmp.path().join("out.txt");

    cli(tmp.path())
        .arg("archive")
        .arg(&zip_path)
        .arg("--output")
        .arg(&out_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing complete"));

    assert_eq!(
        read_to_string(&out_path).unwrap(),
        "\n#DIRECTORY: src\n\n\n\n+++++ #FILE: lib.rs\n\npub fn f() {}\n\n"
    );
}

#[test]
fn archive_command_defaults_to_first_zip_and_default_output() {
    let tmp = tempdir().unwrap();
    write_zip(&tmp.path().join("project.zip"), &[("hello.txt", "hi")]);

    cli(tmp.path())
        .arg("archive")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using ").and(predicate::str::contains("project.zip")));

    let output = read_to_string(tmp.path().join("gpt-context.txt")).unwrap();
    assert_eq!(output, "\n\n+++++ #FILE: hello.txt\n\nhi\n\n");
}

#[test]
fn archive_command_without_any_zip_fails() {
    let tmp = tempdir().unwrap();

    cli(tmp.path())
        .arg("archive")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No zip files found in current directory"));
}

#[test]
fn request_command_with_upload_prints_result_json() {
    let tmp = tempdir().unwrap();
    let zip_path = tmp.path().join("upload.zip");
    write_zip(&zip_path, &[("a.txt", "alpha")]);

    cli(tmp.path())
        .arg("request")
        .arg("--upload")
        .arg(&zip_path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            r#"{"result":"\n\n+++++ #FILE: a.txt\n\nalpha\n\n"}"#,
        ));
}

#[test]
fn request_command_rejects_non_zip_upload() {
    let tmp = tempdir().unwrap();
    let notes = tmp.path().join("notes.txt");
    write(&notes, "plain text").unwrap();

    cli(tmp.path())
        .arg("request")
        .arg("--upload")
        .arg(&notes)
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#"{"error":"Only zip files are allowed"}"#));
}

#[test]
fn request_command_without_repo_url_is_an_error_response() {
    let tmp = tempdir().unwrap();
    let body = tmp.path().join("body.json");
    write(&body, r#"{"token": "abc"}"#).unwrap();

    cli(tmp.path())
        .arg("request")
        .arg("--body")
        .arg(&body)
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#"{"error":"No repo URL provided"}"#))
        .stderr(predicate::str::contains("400"));
}

#[test]
fn github_command_rejects_non_github_url() {
    let tmp = tempdir().unwrap();

    cli(tmp.path())
        .arg("github")
        .arg("https://example.com/owner/repo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a GitHub repository URL"));
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

    use repo_flatten::cli::{run, Cli, Commands};

    let cli = Cli {
        config: None,
        command: Commands::Archive {
            path: Some(std::path::PathBuf::from("missing.zip")),
            output: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "a missing archive must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
