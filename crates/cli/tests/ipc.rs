//! End-to-end IPC tests: a real server and tracker behind a temp socket

use cli_lib::ipc::{self, DaemonStatus, IpcClient, IpcError, IpcServer, Request, TickAck};
use journal::Journal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tracker::{Tracker, TrackerSettings};
use tt_core::{TestClock, WatchInfo};

struct Harness {
    tmp: TempDir,
    socket: PathBuf,
    tracker: Tracker,
    clock: Arc<TestClock>,
    server: JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let socket = tmp.path().join("run").join("tt.sock");
        let clock = Arc::new(TestClock::new(5_000));
        let settings = TrackerSettings {
            sync_interval: Duration::from_millis(50),
            tick_flush_interval: Duration::from_millis(50),
            quiet_period: Duration::ZERO,
            poll_interval: Duration::from_millis(20),
            ..TrackerSettings::default()
        };
        let tracker = Tracker::new(
            Box::new(Journal::temporary().unwrap()),
            clock.clone(),
            settings,
        );

        let listener = ipc::bind(&socket).unwrap();
        let server = tokio::spawn(IpcServer::new(tracker.clone()).serve(listener));

        Self {
            tmp,
            socket,
            tracker,
            clock,
            server,
        }
    }

    fn dir(&self, name: &str) -> PathBuf {
        let path = self.tmp.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    async fn client(&self) -> IpcClient {
        IpcClient::connect(&self.socket).await.unwrap()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_and_list() {
    let harness = Harness::start();
    let dir = harness.dir("project");
    let mut client = harness.client().await;

    let info = client.watch(&dir, None).await.unwrap();
    assert_eq!(info.dir, dir);
    assert_eq!(info.label, "project");

    let watches: Vec<WatchInfo> = client.watches().await.unwrap();
    assert_eq!(watches.len(), 1);
    assert_eq!(watches[0].dir, dir);
    assert_eq!(watches[0].last_write, Some(5_000));

    harness.tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nested_watch_is_already_watched() {
    let harness = Harness::start();
    let outer = harness.dir("outer");
    let inner = harness.dir("outer/inner");
    let mut client = harness.client().await;

    client.watch(&outer, Some("work".to_string())).await.unwrap();

    let err = client.watch(&inner, None).await.unwrap_err();
    assert_eq!(err.kind(), Some("already_watched"));

    // the connection stays usable after an error reply
    assert_eq!(client.watches().await.unwrap().len(), 1);

    harness.tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ticks_become_intervals() {
    let harness = Harness::start();
    let mut client = harness.client().await;

    let ack: TickAck = client
        .call(&Request::Tick {
            label: "reading".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(ack.time, 5_000);

    harness.clock.set(5_100);
    client
        .request(&Request::Tick {
            label: "reading".to_string(),
        })
        .await
        .unwrap();

    let response = client.intervals(4_000, 6_000).await.unwrap();
    assert_eq!(response.intervals.len(), 1);
    assert_eq!(response.intervals[0].start, 5_000);
    assert!(response.intervals[0].end >= 5_100);
    assert!(response.by_label.contains_key("reading"));

    harness.tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_validation_errors_have_kinds() {
    let harness = Harness::start();
    let mut client = harness.client().await;

    let err = client
        .request(&Request::Tick {
            label: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some("invalid_request"));

    let err = client.intervals(10, 5).await.unwrap_err();
    assert_eq!(err.kind(), Some("invalid_request"));

    let err = client
        .request(&Request::Unwatch {
            dir: PathBuf::from("/never/watched"),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some("not_watched"));

    harness.tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_line_gets_bad_request() {
    let harness = Harness::start();
    let stream = UnixStream::connect(&harness.socket).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"{\"op\":\"dance\"}\n").await.unwrap();
    let reply = lines.next_line().await.unwrap().unwrap();
    assert!(reply.contains("\"kind\":\"bad_request\""));

    writer.write_all(b"{\"op\":\"status\"}\n").await.unwrap();
    let reply = lines.next_line().await.unwrap().unwrap();
    assert!(reply.starts_with("{\"status\":\"ok\""));

    harness.tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_and_shutdown() {
    let harness = Harness::start();
    let dir = harness.dir("a");
    let mut client = harness.client().await;
    client.watch(&dir, None).await.unwrap();

    let status: DaemonStatus = client.status().await.unwrap();
    assert_eq!(status.pid, std::process::id());
    assert_eq!(status.tracker.desired_watches, 1);
    assert_eq!(status.tracker.live_watches, 1);

    client.request(&Request::Shutdown).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), harness.server)
        .await
        .expect("server stopped")
        .unwrap();
    assert!(harness.tracker.shutdown_token().is_cancelled());
}

#[tokio::test]
async fn test_connect_without_daemon() {
    let tmp = TempDir::new().unwrap();
    let err = match IpcClient::connect(&tmp.path().join("missing.sock")).await {
        Ok(_) => panic!("connected to a missing socket"),
        Err(e) => e,
    };
    assert!(matches!(err, IpcError::NotRunning(ref path) if path.ends_with("missing.sock")));
}

#[test]
fn test_bind_replaces_stale_socket() {
    let tmp = TempDir::new().unwrap();
    let socket = tmp.path().join("tt.sock");
    std::fs::write(&socket, b"left over").unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let _listener = ipc::bind(&socket).unwrap();
        assert!(Path::new(&socket).exists());
        UnixStream::connect(&socket).await.unwrap();
    });
}
