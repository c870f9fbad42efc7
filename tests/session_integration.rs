//! Session lifecycle integration tests
//!
//! End-to-end tests over an in-memory duplex stream: the test plays the
//! extension-manager process frame by frame while a real `CommandRuntime`
//! drives the host side. Covers the load/unload lifecycle, request routing
//! across domains, deferred correlation, cancellation on unload, crash
//! handling, and session-id gating.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;

use lumen_extension_host::frame::{Frame, FrameReader, FrameType, FrameWriter};
use lumen_extension_host::manifest::{CommandEnv, CommandManifest, CommandMode};
use lumen_extension_host::navigation::{NavCall, RecordingNavigation};
use lumen_extension_host::protocol::{
    ClipboardContent, ClipboardRequest, IpcMessage, ManagerRequestData, ManagerResponse,
    ManagerResponseData, OauthRequest, OauthResponse, Request, StorageRequest, StorageResponse,
    UiRequest,
};
use lumen_extension_host::services::memory::MemoryOauthBroker;
use lumen_extension_host::services::{HostServices, OauthAuthorizeRequest, OauthBroker};
use lumen_extension_host::{
    CommandRuntime, DomainError, Event, ExtensionManager, LaunchProps, ManagerInbound,
    QualifiedEvent, QualifiedRequest, RequestPayload, Response, ResponsePayload, RuntimeState,
};

// ─── Harness ─────────────────────────────────────────────────────

/// The far side of the stream, playing the extension-manager process
struct Worker {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
    session_id: String,
}

struct Host {
    runtime: CommandRuntime,
    inbox: mpsc::UnboundedReceiver<ManagerInbound>,
    nav: Arc<RecordingNavigation>,
}

impl Host {
    /// Pump one inbound message from the stream into the runtime
    async fn pump(&mut self) {
        match timeout(Duration::from_secs(1), self.inbox.recv())
            .await
            .expect("no inbound message within 1s")
            .expect("inbox closed")
        {
            ManagerInbound::Request(req) => self.runtime.handle_request(req).await,
            ManagerInbound::Event(event) => self.runtime.handle_event(event),
        }
    }
}

impl Worker {
    async fn recv(&mut self) -> IpcMessage {
        let frame = timeout(Duration::from_secs(1), self.reader.read_frame())
            .await
            .expect("no frame within 1s")
            .unwrap()
            .expect("stream closed");
        assert_eq!(frame.frame_type, FrameType::Data);
        serde_json::from_slice(&frame.payload).unwrap()
    }

    async fn send(&mut self, msg: &IpcMessage) {
        let payload = serde_json::to_vec(msg).unwrap();
        self.writer
            .write_frame(&Frame::data(payload))
            .await
            .unwrap();
    }

    /// Answer the pending `Load` lifecycle request with this worker's
    /// session id
    async fn answer_load(&mut self) {
        loop {
            if let IpcMessage::ManagerRequest(req) = self.recv().await {
                assert!(matches!(req.data, ManagerRequestData::Load(_)));
                self.send(&IpcMessage::ManagerResponse(ManagerResponse {
                    request_id: req.request_id,
                    data: Some(ManagerResponseData::Load {
                        session_id: self.session_id.clone(),
                    }),
                    error: None,
                }))
                .await;
                return;
            }
        }
    }

    async fn send_request(&mut self, request_id: Option<&str>, payload: RequestPayload) {
        let session_id = self.session_id.clone();
        self.send(&IpcMessage::ExtensionRequest(QualifiedRequest {
            session_id,
            request: Request {
                request_id: request_id.map(str::to_string),
                payload,
            },
        }))
        .await;
    }

    async fn send_event(&mut self, event: Event) {
        let session_id = self.session_id.clone();
        self.send(&IpcMessage::ExtensionEvent(QualifiedEvent {
            session_id,
            event,
        }))
        .await;
    }

    /// Read messages until a correlated response for this session arrives
    async fn recv_response(&mut self) -> Response {
        loop {
            if let IpcMessage::ExtensionResponse(qualified) = self.recv().await {
                assert_eq!(qualified.session_id, self.session_id);
                return qualified.response;
            }
        }
    }
}

fn manifest(mode: CommandMode) -> Arc<CommandManifest> {
    Arc::new(CommandManifest {
        command_id: "track-issues".into(),
        extension_id: "acme.tracker".into(),
        extension_name: "tracker".into(),
        author: "acme".into(),
        title: "Track Issues".into(),
        mode,
        entrypoint: "dist/track-issues.js".into(),
        icon: "bug".into(),
        asset_path: PathBuf::from("/opt/ext/acme.tracker/assets"),
        preferences: vec![],
        arguments: vec![],
        default_disabled: false,
    })
}

/// Capture host-side tracing when running with `RUST_LOG` set
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Stand up a running session over a duplex stream
async fn session_with(mode: CommandMode, services: HostServices) -> (Host, Worker) {
    init_tracing();
    let (host_side, worker_side) = tokio::io::duplex(64 * 1024);
    let manager = Arc::new(ExtensionManager::from_stream(host_side));
    let inbox = manager.take_inbox().unwrap();
    let nav = Arc::new(RecordingNavigation::default());

    let mut runtime = CommandRuntime::new(manifest(mode), services, nav.clone(), manager);
    let (read, write) = tokio::io::split(worker_side);
    let mut worker = Worker {
        reader: FrameReader::new(read),
        writer: FrameWriter::new(write),
        session_id: "sess-1".into(),
    };

    let (load, _) = tokio::join!(runtime.load(LaunchProps::default()), worker.answer_load());
    load.unwrap();
    assert_eq!(runtime.state(), RuntimeState::Running);

    (
        Host {
            runtime,
            inbox,
            nav,
        },
        worker,
    )
}

async fn session(mode: CommandMode) -> (Host, Worker) {
    session_with(mode, HostServices::in_memory()).await
}

// ─── Lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn test_view_session_pushes_frame_before_first_render() {
    let (mut host, mut worker) = session(CommandMode::View).await;

    // The empty view frame exists before the extension renders anything
    assert_eq!(host.nav.calls()[0], NavCall::PushView);

    worker
        .send_request(
            None,
            RequestPayload::Ui(UiRequest::Render {
                json: r#"{"type":"list","children":[]}"#.into(),
            }),
        )
        .await;
    host.pump().await;

    let calls = host.nav.calls();
    let push = calls.iter().position(|c| *c == NavCall::PushView).unwrap();
    let render = calls
        .iter()
        .position(|c| matches!(c, NavCall::Render(_)))
        .unwrap();
    assert!(push < render);
}

#[tokio::test]
async fn test_unload_is_idempotent_and_notifies_manager() {
    let (mut host, mut worker) = session(CommandMode::NoView).await;

    host.runtime.unload();
    host.runtime.unload();
    assert_eq!(host.runtime.state(), RuntimeState::Unloaded);

    match worker.recv().await {
        IpcMessage::ManagerRequest(req) => match req.data {
            ManagerRequestData::Unload { session_id } => assert_eq!(session_id, "sess-1"),
            other => panic!("unexpected lifecycle request: {other:?}"),
        },
        other => panic!("unexpected message: {other:?}"),
    }
}

// ─── Routing ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_storage_roundtrip_over_the_wire() {
    let (mut host, mut worker) = session(CommandMode::NoView).await;

    worker
        .send_request(
            Some("r1"),
            RequestPayload::Storage(StorageRequest::Set {
                key: "cursor".into(),
                value: json!(42),
            }),
        )
        .await;
    host.pump().await;
    assert!(worker.recv_response().await.result.is_some());

    worker
        .send_request(
            Some("r2"),
            RequestPayload::Storage(StorageRequest::Get {
                key: "cursor".into(),
            }),
        )
        .await;
    host.pump().await;

    let response = worker.recv_response().await;
    assert_eq!(response.request_id.as_deref(), Some("r2"));
    match response.result {
        Some(ResponsePayload::Storage(StorageResponse::Value { value })) => {
            assert_eq!(value, json!(42))
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_storage_miss_answers_not_found() {
    let (mut host, mut worker) = session(CommandMode::NoView).await;

    worker
        .send_request(
            Some("r1"),
            RequestPayload::Storage(StorageRequest::Get {
                key: "never-set".into(),
            }),
        )
        .await;
    host.pump().await;

    let response = worker.recv_response().await;
    let error = response.error.expect("expected an error response");
    assert_eq!(
        error.kind,
        lumen_extension_host::ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_failing_request_leaves_session_running() {
    let (mut host, mut worker) = session(CommandMode::View).await;

    // Render payloads that do not parse fail that request only
    worker
        .send_request(
            Some("bad"),
            RequestPayload::Ui(UiRequest::Render {
                json: "{not json".into(),
            }),
        )
        .await;
    host.pump().await;
    let response = worker.recv_response().await;
    assert_eq!(
        response.error.unwrap().kind,
        lumen_extension_host::ErrorKind::InvalidArgument
    );

    worker
        .send_request(
            Some("good"),
            RequestPayload::Clipboard(ClipboardRequest::Copy {
                content: ClipboardContent::Text {
                    text: "still alive".into(),
                },
                concealed: false,
            }),
        )
        .await;
    host.pump().await;
    let response = worker.recv_response().await;
    assert_eq!(response.request_id.as_deref(), Some("good"));
    assert!(response.result.is_some());
    assert_eq!(host.runtime.state(), RuntimeState::Running);
}

#[tokio::test]
async fn test_foreign_session_id_gets_no_response() {
    let (mut host, mut worker) = session(CommandMode::NoView).await;

    worker
        .send(&IpcMessage::ExtensionRequest(QualifiedRequest {
            session_id: "sess-from-last-launch".into(),
            request: Request {
                request_id: Some("stale".into()),
                payload: RequestPayload::Storage(StorageRequest::Clear),
            },
        }))
        .await;
    host.pump().await;

    // Follow with a valid request; the first reply must answer it, not the
    // stale one
    worker
        .send_request(Some("fresh"), RequestPayload::Storage(StorageRequest::List))
        .await;
    host.pump().await;
    let response = worker.recv_response().await;
    assert_eq!(response.request_id.as_deref(), Some("fresh"));
}

// ─── Deferred correlation ────────────────────────────────────────

#[tokio::test]
async fn test_oauth_authorize_resolves_by_request_id() {
    let services = HostServices {
        oauth: Arc::new(MemoryOauthBroker::granting("grant-code-7")),
        ..HostServices::in_memory()
    };
    let (mut host, mut worker) = session_with(CommandMode::NoView, services).await;

    worker
        .send_request(
            Some("auth-1"),
            RequestPayload::Oauth(OauthRequest::Authorize {
                provider_name: "GitHub".into(),
                url: "https://example.com/auth".into(),
                description: None,
            }),
        )
        .await;
    host.pump().await;

    let response = worker.recv_response().await;
    assert_eq!(response.request_id.as_deref(), Some("auth-1"));
    match response.result {
        Some(ResponsePayload::Oauth(OauthResponse::Authorized { code })) => {
            assert_eq!(code, "grant-code-7")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_deferred_without_request_id_answers_invalid_argument() {
    let (mut host, mut worker) = session(CommandMode::View).await;

    worker
        .send_request(
            None,
            RequestPayload::Ui(UiRequest::ConfirmAlert {
                title: "Delete?".into(),
                description: "cannot be undone".into(),
                primary_title: "Delete".into(),
                dismiss_title: "Cancel".into(),
            }),
        )
        .await;
    host.pump().await;

    let response = worker.recv_response().await;
    assert!(response.request_id.is_none());
    assert_eq!(
        response.error.unwrap().kind,
        lumen_extension_host::ErrorKind::InvalidArgument
    );
}

/// Broker whose consent flow never finishes, keeping dispatches in flight
struct StalledBroker;

#[async_trait]
impl OauthBroker for StalledBroker {
    async fn authorize(&self, _request: OauthAuthorizeRequest) -> Result<String, DomainError> {
        futures::future::pending().await
    }

    async fn tokens(
        &self,
        _extension_id: &str,
        _provider_id: &str,
    ) -> Option<lumen_extension_host::protocol::OauthTokens> {
        None
    }

    async fn set_tokens(
        &self,
        _extension_id: &str,
        _provider_id: &str,
        _tokens: lumen_extension_host::protocol::OauthTokens,
    ) {
    }

    async fn remove_tokens(&self, _extension_id: &str, _provider_id: &str) -> bool {
        false
    }
}

#[tokio::test]
async fn test_unload_cancels_every_pending_dispatch() {
    let services = HostServices {
        oauth: Arc::new(StalledBroker),
        ..HostServices::in_memory()
    };
    let (mut host, mut worker) = session_with(CommandMode::NoView, services).await;

    for i in 0..5 {
        let request_id = format!("auth-{i}");
        worker
            .send_request(
                Some(&request_id),
                RequestPayload::Oauth(OauthRequest::Authorize {
                    provider_name: "GitHub".into(),
                    url: "https://example.com/auth".into(),
                    description: None,
                }),
            )
            .await;
        host.pump().await;
    }

    host.runtime.unload();

    // The only traffic after unload is the lifecycle request; no cancelled
    // dispatch may answer
    match worker.recv().await {
        IpcMessage::ManagerRequest(req) => {
            assert!(matches!(req.data, ManagerRequestData::Unload { .. }))
        }
        other => panic!("unexpected message after unload: {other:?}"),
    }
    let silence = timeout(Duration::from_millis(100), worker.recv_response()).await;
    assert!(silence.is_err(), "a cancelled dispatch responded");
}

// ─── Events ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_crash_event_shows_crash_screen_and_keeps_session() {
    let (mut host, mut worker) = session(CommandMode::View).await;

    worker
        .send_event(Event::Crash {
            text: "ReferenceError: api is not defined".into(),
        })
        .await;
    host.pump().await;

    let calls = host.nav.calls();
    assert!(calls.contains(&NavCall::PopToRoot {
        clear_search: false
    }));
    assert!(calls.contains(&NavCall::PushErrorView(
        "ReferenceError: api is not defined".into()
    )));
    assert!(calls.contains(&NavCall::SetTitle("Track Issues - Crash handler".into())));
    assert_eq!(host.runtime.state(), RuntimeState::Running);

    // The session is still answering requests until its owner unloads it
    worker
        .send_request(Some("after"), RequestPayload::Storage(StorageRequest::List))
        .await;
    host.pump().await;
    assert_eq!(
        worker.recv_response().await.request_id.as_deref(),
        Some("after")
    );
}

#[tokio::test]
async fn test_generic_event_is_ignored() {
    let (mut host, mut worker) = session(CommandMode::NoView).await;
    let calls_before = host.nav.calls().len();

    worker
        .send_event(Event::Generic {
            handler_id: "selection-changed".into(),
            args: vec![json!("item-3")],
        })
        .await;
    host.pump().await;

    assert_eq!(host.nav.calls().len(), calls_before);
    assert_eq!(host.runtime.state(), RuntimeState::Running);
}

// ─── Preferences ─────────────────────────────────────────────────

#[tokio::test]
async fn test_load_forwards_resolved_preference_values() {
    let services = HostServices::in_memory();
    let root_items = Arc::new(
        lumen_extension_host::services::memory::MemoryRootItems::default(),
    );
    root_items.set_preference_values(
        "extension.acme.tracker.track-issues",
        HashMap::from([("apiToken".to_string(), json!("secret"))]),
    );
    let services = HostServices {
        root_items,
        ..services
    };

    let (host_side, worker_side) = tokio::io::duplex(64 * 1024);
    let manager = Arc::new(ExtensionManager::from_stream(host_side));
    let nav = Arc::new(RecordingNavigation::default());
    let mut runtime = CommandRuntime::new(
        manifest(CommandMode::NoView),
        services,
        nav,
        manager,
    );

    let (read, write) = tokio::io::split(worker_side);
    let mut reader = FrameReader::new(read);
    let mut writer = FrameWriter::new(write);

    let load = runtime.load(LaunchProps {
        env: CommandEnv::Production,
        argument_values: HashMap::from([("query".to_string(), json!("open"))]),
        data_dir: PathBuf::from("/tmp/lumen/acme.tracker"),
    });
    let observe = async {
        let frame = reader.read_frame().await.unwrap().unwrap();
        let msg: IpcMessage = serde_json::from_slice(&frame.payload).unwrap();
        let IpcMessage::ManagerRequest(req) = msg else {
            panic!("expected a lifecycle request");
        };
        let ManagerRequestData::Load(load) = &req.data else {
            panic!("expected a load request");
        };
        assert_eq!(load.preference_values["apiToken"], json!("secret"));
        assert_eq!(load.argument_values["query"], json!("open"));
        assert_eq!(load.data_dir, "/tmp/lumen/acme.tracker");

        let reply = IpcMessage::ManagerResponse(ManagerResponse {
            request_id: req.request_id.clone(),
            data: Some(ManagerResponseData::Load {
                session_id: "sess-p".into(),
            }),
            error: None,
        });
        writer
            .write_frame(&Frame::data(serde_json::to_vec(&reply).unwrap()))
            .await
            .unwrap();
    };
    let (load, _) = tokio::join!(load, observe);
    load.unwrap();
    assert_eq!(runtime.session_id(), Some("sess-p"));
}
