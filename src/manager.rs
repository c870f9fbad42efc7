//! Extension manager process
//!
//! The manager is a sidecar process hosting every extension worker. One framed
//! stream multiplexes all sessions: lifecycle requests from the host, extension
//! requests and events from the workers, and correlated responses both ways.
//! Lifecycle requests are matched to replies through a pending map keyed by
//! request id, the same way an RPC client matches responses on a shared pipe.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{HostError, Result};
use crate::frame::{Frame, FrameReader, FrameType, FrameWriter};
use crate::protocol::{
    Event, IpcMessage, LoadCommand, ManagerRequest, ManagerRequestData, ManagerResponse,
    ManagerResponseData, QualifiedEvent, QualifiedRequest, QualifiedResponse, Response,
};

/// Default timeout for lifecycle requests
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Traffic arriving from extension workers, consumed by the runtime
#[derive(Debug)]
pub enum ManagerInbound {
    Request(QualifiedRequest),
    Event(QualifiedEvent),
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ManagerResponse>>>>;

/// Handle to the extension manager sidecar
pub struct ExtensionManager {
    child: Mutex<Option<Child>>,
    outbound: mpsc::UnboundedSender<IpcMessage>,
    pending: PendingMap,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<ManagerInbound>>>,
    connected: Arc<AtomicBool>,
    request_timeout_secs: u64,
    /// Sessions loaded from a development bundle, tracked so the UI can
    /// decorate them
    development_sessions: Mutex<HashSet<String>>,
}

/// Locate the worker runtime on PATH. Prefers the bundled `lumen-node`
/// build and falls back to a system `node`.
pub fn runtime_executable() -> Result<PathBuf> {
    find_in_path("lumen-node")
        .or_else(|| find_in_path("node"))
        .ok_or_else(|| HostError::Spawn("no 'lumen-node' or 'node' executable on PATH".into()))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

impl ExtensionManager {
    /// Spawn the manager process and wire up the framed stream
    pub fn spawn(entrypoint: &Path) -> Result<Self> {
        let executable = runtime_executable()?;
        let mut child = Command::new(&executable)
            .arg(entrypoint)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HostError::Spawn(format!("{}: {e}", executable.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Spawn("manager stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::Spawn("manager stdout not captured".into()))?;

        let mut manager = Self::wire(stdout, stdin, DEFAULT_REQUEST_TIMEOUT_SECS);
        manager.child = Mutex::new(Some(child));
        Ok(manager)
    }

    /// Build a manager over an existing duplex stream. Used by tests and by
    /// hosts that adopt an already-running manager.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::from_stream_with_timeout(stream, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn from_stream_with_timeout<S>(stream: S, request_timeout_secs: u64) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        Self::wire(read, write, request_timeout_secs)
    }

    fn wire<R, W>(read: R, write: W, request_timeout_secs: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<IpcMessage>();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel::<ManagerInbound>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let mut writer = FrameWriter::new(write);
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let payload = match serde_json::to_vec(&msg) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("failed to serialize outbound message: {e}");
                        continue;
                    }
                };
                if let Err(e) = writer.write_frame(&Frame::data(payload)).await {
                    error!("failed to write to manager stream: {e}");
                    break;
                }
            }
            // Sender side is gone, tell the peer we are done
            let _ = writer.write_frame(&Frame::close()).await;
        });

        let mut reader = FrameReader::new(read);
        let reader_pending = pending.clone();
        let reader_connected = connected.clone();
        tokio::spawn(async move {
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => match frame.frame_type {
                        FrameType::Data => {
                            Self::handle_frame(&frame.payload, &reader_pending, &inbox_tx)
                        }
                        FrameType::Error => {
                            warn!(
                                "manager error frame: {}",
                                String::from_utf8_lossy(&frame.payload)
                            );
                        }
                        FrameType::Close => {
                            debug!("manager closed the stream");
                            break;
                        }
                    },
                    Ok(None) => {
                        debug!("manager stream ended");
                        break;
                    }
                    Err(e) => {
                        error!("failed to read from manager stream: {e}");
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            // Unblock every caller still waiting for a lifecycle reply
            reader_pending.lock().unwrap().clear();
        });

        Self {
            child: Mutex::new(None),
            outbound,
            pending,
            inbox: Mutex::new(Some(inbox_rx)),
            connected,
            request_timeout_secs,
            development_sessions: Mutex::new(HashSet::new()),
        }
    }

    fn handle_frame(
        payload: &[u8],
        pending: &PendingMap,
        inbox: &mpsc::UnboundedSender<ManagerInbound>,
    ) {
        let msg: IpcMessage = match serde_json::from_slice(payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("discarding undecodable manager frame: {e}");
                return;
            }
        };
        match msg {
            IpcMessage::ManagerResponse(response) => {
                let tx = pending.lock().unwrap().remove(&response.request_id);
                match tx {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => warn!(
                        request_id = %response.request_id,
                        "manager response matches no pending request"
                    ),
                }
            }
            IpcMessage::ExtensionRequest(request) => {
                let _ = inbox.send(ManagerInbound::Request(request));
            }
            IpcMessage::ExtensionEvent(event) => {
                let _ = inbox.send(ManagerInbound::Event(event));
            }
            other => warn!("unexpected inbound message: {other:?}"),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Take the inbound traffic receiver. Yields once; the runtime owns it.
    pub fn take_inbox(&self) -> Option<mpsc::UnboundedReceiver<ManagerInbound>> {
        self.inbox.lock().unwrap().take()
    }

    /// Sender for correlated replies and host-emitted events, cloneable for
    /// deferred dispatch tasks
    pub fn sender(&self) -> mpsc::UnboundedSender<IpcMessage> {
        self.outbound.clone()
    }

    async fn request(&self, data: ManagerRequestData) -> Result<ManagerResponse> {
        if !self.is_connected() {
            return Err(HostError::NotConnected);
        }
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .insert(request_id.clone(), tx);

        let sent = self.outbound.send(IpcMessage::ManagerRequest(ManagerRequest {
            request_id: request_id.clone(),
            data,
        }));
        if sent.is_err() {
            self.pending.lock().unwrap().remove(&request_id);
            return Err(HostError::NotConnected);
        }

        match tokio::time::timeout(Duration::from_secs(self.request_timeout_secs), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(HostError::NotConnected),
            Err(_) => {
                self.pending.lock().unwrap().remove(&request_id);
                Err(HostError::Timeout(self.request_timeout_secs))
            }
        }
    }

    /// Ask the manager to boot a command; resolves with the new session id
    pub async fn load_command(&self, load: LoadCommand) -> Result<String> {
        let response = self.request(ManagerRequestData::Load(load)).await?;
        if let Some(error) = response.error {
            return Err(HostError::Manager(error.message));
        }
        match response.data {
            Some(ManagerResponseData::Load { session_id }) => Ok(session_id),
            other => Err(HostError::Manager(format!(
                "unexpected load reply: {other:?}"
            ))),
        }
    }

    /// Ask the manager to tear down a session
    pub async fn unload_command(&self, session_id: &str) -> Result<()> {
        let response = self
            .request(ManagerRequestData::Unload {
                session_id: session_id.to_string(),
            })
            .await?;
        if let Some(error) = response.error {
            return Err(HostError::Manager(error.message));
        }
        Ok(())
    }

    /// Liveness probe
    pub async fn ping(&self) -> Result<()> {
        let response = self.request(ManagerRequestData::Ping).await?;
        if let Some(error) = response.error {
            return Err(HostError::Manager(error.message));
        }
        Ok(())
    }

    /// Send a correlated reply into a session
    pub fn send_response(&self, session_id: &str, response: Response) -> Result<()> {
        self.outbound
            .send(IpcMessage::ExtensionResponse(QualifiedResponse {
                session_id: session_id.to_string(),
                response,
            }))
            .map_err(|_| HostError::NotConnected)
    }

    /// Emit an out-of-band event into a session, e.g. to invoke a handler the
    /// extension registered
    pub fn emit_event(&self, session_id: &str, event: Event) -> Result<()> {
        self.outbound
            .send(IpcMessage::ExtensionEvent(QualifiedEvent {
                session_id: session_id.to_string(),
                event,
            }))
            .map_err(|_| HostError::NotConnected)
    }

    /// Invoke a handler the extension registered, by id
    pub fn emit_generic_event(
        &self,
        session_id: &str,
        handler_id: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<()> {
        self.emit_event(
            session_id,
            Event::Generic {
                handler_id: handler_id.to_string(),
                args,
            },
        )
    }

    pub fn add_development_session(&self, session_id: &str) {
        self.development_sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string());
    }

    pub fn remove_development_session(&self, session_id: &str) {
        self.development_sessions.lock().unwrap().remove(session_id);
    }

    pub fn has_development_session(&self, session_id: &str) -> bool {
        self.development_sessions
            .lock()
            .unwrap()
            .contains(session_id)
    }

    /// Drop the connection and kill the sidecar if this handle spawned it
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let child = self.child.lock().unwrap().take();
        if let Some(mut child) = child {
            let _ = child.kill().await;
        }
    }
}
