//! IPC between CLI and daemon
//!
//! Newline-delimited JSON over a Unix socket: one request object per line,
//! answered by one response object per line. A connection may carry any
//! number of requests.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};
use tracker::{Tracker, TrackerError, TrackerStatus};
use tt_core::{IntervalsResponse, Timestamp, WatchInfo};

/// Request sent to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Watch {
        dir: PathBuf,
        #[serde(default)]
        label: Option<String>,
    },
    Unwatch {
        dir: PathBuf,
    },
    Tick {
        label: String,
    },
    Watches,
    Intervals {
        start: Timestamp,
        end: Timestamp,
    },
    Status,
    Clear,
    Shutdown,
}

/// Daemon reply to a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        #[serde(default)]
        result: Value,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl Response {
    pub fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(result) => Response::Ok { result },
            Err(e) => Response::error("internal", e.to_string()),
        }
    }

    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Response::Error {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

impl From<TrackerError> for Response {
    fn from(err: TrackerError) -> Self {
        Response::error(err.kind(), err.to_string())
    }
}

/// Result of `Request::Status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub uptime_secs: u64,
    pub tracker: TrackerStatus,
}

/// Result of `Request::Tick`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickAck {
    pub time: Timestamp,
}

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("daemon is not running (no socket at {0:?})")]
    NotRunning(PathBuf),

    #[error("ipc i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed ipc message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("daemon closed the connection")]
    Closed,

    /// The daemon handled the request and reported a failure
    #[error("{message}")]
    Daemon { kind: String, message: String },
}

impl IpcError {
    pub fn kind(&self) -> Option<&str> {
        match self {
            IpcError::Daemon { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// Bind the daemon socket, replacing a stale one
pub fn bind(socket_path: &Path) -> io::Result<UnixListener> {
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::remove_file(socket_path) {
        Ok(()) => debug!(path = %socket_path.display(), "removed stale socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(socket_path)
}

/// IPC server for the daemon
pub struct IpcServer {
    tracker: Tracker,
    started: Instant,
}

impl IpcServer {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            started: Instant::now(),
        }
    }

    /// Accept connections until the tracker shuts down
    pub async fn serve(self, listener: UnixListener) {
        let shutdown = self.tracker.shutdown_token();
        let server = std::sync::Arc::new(self);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let server = std::sync::Arc::clone(&server);
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream).await {
                                debug!(error = %e, "ipc connection ended with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept ipc connection"),
                },
            }
        }

        debug!("ipc server stopped");
    }

    async fn handle_connection(&self, stream: UnixStream) -> io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => {
                    info!(?request, "ipc request");
                    let response = self.handle(request);
                    if let Response::Error { kind, message } = &response {
                        info!(kind = %kind, message = %message, "ipc request failed");
                    }
                    response
                }
                Err(e) => Response::error("bad_request", e.to_string()),
            };

            let mut payload = serde_json::to_vec(&response).map_err(io::Error::other)?;
            payload.push(b'\n');
            writer.write_all(&payload).await?;
        }

        Ok(())
    }

    /// Run one request against the tracker
    pub fn handle(&self, request: Request) -> Response {
        let tracker = &self.tracker;
        let result = match request {
            Request::Watch { dir, label } => tracker
                .start_watch(&dir, label.as_deref().unwrap_or(""))
                .map(|info| Response::ok(&info)),
            Request::Unwatch { dir } => tracker.stop_watch(&dir).map(|()| Response::ok(&())),
            Request::Tick { label } => tracker
                .record_tick(&label)
                .map(|time| Response::ok(&TickAck { time })),
            Request::Watches => tracker.get_watches().map(|watches| Response::ok(&watches)),
            Request::Intervals { start, end } => tracker
                .get_intervals(start, end)
                .map(|response| Response::ok(&response)),
            Request::Status => tracker.status().map(|status| {
                Response::ok(&DaemonStatus {
                    pid: std::process::id(),
                    uptime_secs: self.started.elapsed().as_secs(),
                    tracker: status,
                })
            }),
            Request::Clear => tracker.clear().map(|()| Response::ok(&())),
            Request::Shutdown => {
                tracker.shutdown();
                Ok(Response::ok(&()))
            }
        };

        result.unwrap_or_else(Response::from)
    }
}

/// IPC client for communicating with the daemon
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl IpcClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, IpcError> {
        let stream = match UnixStream::connect(socket_path).await {
            Ok(stream) => stream,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
                ) =>
            {
                return Err(IpcError::NotRunning(socket_path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Send a request and return its raw result
    pub async fn request(&mut self, request: &Request) -> Result<Value, IpcError> {
        let mut payload = serde_json::to_vec(request)?;
        payload.push(b'\n');
        self.writer.write_all(&payload).await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(IpcError::Closed);
        }

        match serde_json::from_str(&line)? {
            Response::Ok { result } => Ok(result),
            Response::Error { kind, message } => Err(IpcError::Daemon { kind, message }),
        }
    }

    /// Send a request and decode its result as `T`
    pub async fn call<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, IpcError> {
        let value = self.request(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn watch(
        &mut self,
        dir: &Path,
        label: Option<String>,
    ) -> Result<WatchInfo, IpcError> {
        self.call(&Request::Watch {
            dir: dir.to_path_buf(),
            label,
        })
        .await
    }

    pub async fn watches(&mut self) -> Result<Vec<WatchInfo>, IpcError> {
        self.call(&Request::Watches).await
    }

    pub async fn intervals(
        &mut self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<IntervalsResponse, IpcError> {
        self.call(&Request::Intervals { start, end }).await
    }

    pub async fn status(&mut self) -> Result<DaemonStatus, IpcError> {
        self.call(&Request::Status).await
    }
}
