use assert_cmd::Command;
use chrono::{Duration, SecondsFormat, Utc};
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::tempdir;

fn content_backup() -> Command {
    Command::cargo_bin("content-backup").expect("Binary exists")
}

#[test]
fn sync_skips_when_marker_is_from_today() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("last_run_timestamp.txt");
    let today = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    fs::write(&marker, &today).unwrap();

    // The settings document does not exist: the gate must stop the run before it is read.
    content_backup()
        .arg("sync")
        .arg("--config")
        .arg(dir.path().join("missing-config.json"))
        .arg("--marker")
        .arg(&marker)
        .assert()
        .success()
        .stdout(predicate::str::contains("already run today"));

    assert_eq!(fs::read_to_string(&marker).unwrap(), today);
}

#[test]
fn sync_fails_on_missing_config_and_leaves_no_marker() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("last_run_timestamp.txt");

    content_backup()
        .arg("sync")
        .arg("--config")
        .arg(dir.path().join("missing-config.json"))
        .arg("--marker")
        .arg(&marker)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));

    assert!(!marker.exists());
}

#[test]
fn sync_corrupt_marker_policy_is_selectable() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("last_run_timestamp.txt");
    fs::write(&marker, "garbage").unwrap();
    let config = dir.path().join("missing-config.json");

    content_backup()
        .args(["sync", "--config"])
        .arg(&config)
        .arg("--marker")
        .arg(&marker)
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));

    content_backup()
        .args(["sync", "--on-corrupt-marker", "skip", "--config"])
        .arg(&config)
        .arg("--marker")
        .arg(&marker)
        .assert()
        .success()
        .stdout(predicate::str::contains("already run today"));

    assert_eq!(fs::read_to_string(&marker).unwrap(), "garbage");
}

/// Answers each incoming connection with the next canned JSON body.
fn serve_json(bodies: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for body in bodies {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut request_body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut request_body);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

#[test]
fn sync_without_assets_never_reads_storage_credentials() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("last_run_timestamp.txt");
    let base = serve_json(vec![r#"{"access_token":"T1"}"#, r#"{"items":[]}"#]);
    let config = dir.path().join("config.json");
    fs::write(
        &config,
        serde_json::json!({
            "salesforce": {
                "client_id": "client-123",
                "client_secret": "s3cret",
                "auth_url": format!("{base}/v2/token"),
                "content_url": format!("{base}/asset/v1/content/assets"),
            },
            "google_cloud": {"bucket_name": "content-backups"},
            "settings": {"backup_prefix": "backups/"},
        })
        .to_string(),
    )
    .unwrap();

    content_backup()
        .current_dir(dir.path())
        .env("GOOGLE_APPLICATION_CREDENTIALS", dir.path().join("no-such-key.json"))
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .arg("--marker")
        .arg(&marker)
        .assert()
        .success()
        .stdout(predicate::str::contains("No new or updated content assets found."));

    assert!(marker.exists());
}

#[test]
fn sync_rejects_unknown_corrupt_marker_policy() {
    content_backup()
        .args(["sync", "--on-corrupt-marker", "ignore"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ignore"));
}

#[test]
fn status_reports_marker_state() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("last_run_timestamp.txt");

    content_backup()
        .arg("status")
        .arg("--marker")
        .arg(&marker)
        .assert()
        .success()
        .stdout(predicate::str::contains("No backup recorded yet."))
        .stdout(predicate::str::contains("Already ran today: no"));

    let last_week = (Utc::now() - Duration::days(7)).to_rfc3339_opts(SecondsFormat::Micros, true);
    fs::write(&marker, &last_week).unwrap();
    content_backup()
        .arg("status")
        .arg("--marker")
        .arg(&marker)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Last backup: {last_week}")))
        .stdout(predicate::str::contains("Already ran today: no"));

    fs::write(&marker, Utc::now().to_rfc3339()).unwrap();
    content_backup()
        .arg("status")
        .arg("--marker")
        .arg(&marker)
        .assert()
        .success()
        .stdout(predicate::str::contains("Already ran today: yes"));
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
        self.events.lock().unwrap().push(format!("{event:?}"));
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

    use content_backup::cli::{run, Cli, Commands};

    let dir = tempdir().unwrap();
    let cli = Cli {
        command: Commands::Status {
            marker: dir.path().join("marker"),
        },
    };

    run(cli).await.expect("status succeeds without a marker");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
