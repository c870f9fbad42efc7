//! Extension Host Protocol Type Definitions
//!
//! Defines the wire types exchanged with the extension-manager process. One
//! framed stream multiplexes every session: each request, response, and event
//! is qualified with the session id it belongs to. Request payloads are tagged
//! unions, one arm per capability domain, and each arm is itself a union of
//! that domain's operations, so routing is an exhaustive match at every level.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ErrorKind;
use crate::manifest::{CommandEnv, CommandMode};

// ============================================================================
// Envelope
// ============================================================================

/// Top-level message on the host <-> manager stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IpcMessage {
    /// host -> manager: lifecycle request (load/unload/ping)
    ManagerRequest(ManagerRequest),
    /// manager -> host: reply to a lifecycle request
    ManagerResponse(ManagerResponse),
    /// manager -> host: request issued by a running extension
    ExtensionRequest(QualifiedRequest),
    /// host -> manager: correlated reply to an extension request
    ExtensionResponse(QualifiedResponse),
    /// either direction: out-of-band event, not tied to a request
    ExtensionEvent(QualifiedEvent),
}

/// Lifecycle request sent to the manager process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRequest {
    pub request_id: String,
    pub data: ManagerRequestData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ManagerRequestData {
    Load(LoadCommand),
    #[serde(rename_all = "camelCase")]
    Unload {
        session_id: String,
    },
    Ping,
}

/// Everything the manager needs to boot one command inside a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCommand {
    pub entrypoint: String,
    pub env: CommandEnv,
    pub extension_id: String,
    pub command_id: String,
    pub extension_name: String,
    pub author: String,
    pub mode: CommandMode,
    #[serde(default)]
    pub preference_values: HashMap<String, Value>,
    #[serde(default)]
    pub argument_values: HashMap<String, Value>,
    pub data_dir: String,
}

/// Reply to a [`ManagerRequest`], correlated by `request_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerResponse {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ManagerResponseData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ManagerResponseData {
    #[serde(rename_all = "camelCase")]
    Load {
        session_id: String,
    },
    Ack,
}

/// Generic error payload: a structured kind plus a human-readable message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

// ============================================================================
// Extension requests
// ============================================================================

/// An extension request qualified with the session that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedRequest {
    pub session_id: String,
    pub request: Request,
}

/// An inbound request: a domain-tagged payload, plus a request id when the
/// caller expects a deferred reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub payload: RequestPayload,
}

/// Domain-tagged request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "payload", rename_all = "camelCase")]
pub enum RequestPayload {
    Ui(UiRequest),
    Storage(StorageRequest),
    App(AppRequest),
    Clipboard(ClipboardRequest),
    FileSearch(FileSearchRequest),
    WindowManagement(WmRequest),
    Command(CommandRequest),
    Oauth(OauthRequest),
}

impl RequestPayload {
    /// Domain tag as it appears on the wire, for logging
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Ui(_) => "ui",
            Self::Storage(_) => "storage",
            Self::App(_) => "app",
            Self::Clipboard(_) => "clipboard",
            Self::FileSearch(_) => "fileSearch",
            Self::WindowManagement(_) => "windowManagement",
            Self::Command(_) => "command",
            Self::Oauth(_) => "oauth",
        }
    }
}

// ----------------------------------------------------------------------------
// UI domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum UiRequest {
    /// Render tree produced by the extension reconciler, still carried as JSON
    Render { json: String },
    SetSearchText { text: String },
    PushView,
    PopView,
    #[serde(rename_all = "camelCase")]
    PopToRoot { clear_search: bool },
    #[serde(rename_all = "camelCase")]
    ShowToast {
        title: String,
        style: ToastStyle,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    HideToast,
    #[serde(rename_all = "camelCase")]
    CloseMainWindow {
        pop_to_root: PopToRootKind,
        clear_root_search: bool,
    },
    ShowHud { text: String },
    #[serde(rename_all = "camelCase")]
    ConfirmAlert {
        title: String,
        description: String,
        primary_title: String,
        dismiss_title: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToastStyle {
    Success,
    Info,
    Warning,
    Error,
    Dynamic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PopToRootKind {
    #[default]
    Default,
    Immediate,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum UiResponse {
    Ack,
    ConfirmAlert { confirmed: bool },
}

// ----------------------------------------------------------------------------
// Storage domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum StorageRequest {
    Get { key: String },
    Set { key: String, value: Value },
    Remove { key: String },
    Clear,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum StorageResponse {
    Value { value: Value },
    Ack,
    Removed { removed: bool },
    Keys { keys: Vec<String> },
}

// ----------------------------------------------------------------------------
// App domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum AppRequest {
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    GetDefault {
        target: String,
    },
    #[serde(rename_all = "camelCase")]
    Open {
        target: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_id: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum AppResponse {
    List { apps: Vec<Application> },
    Default { app: Option<Application> },
    Ack,
}

/// An installed application as exposed to extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    pub icon: String,
}

// ----------------------------------------------------------------------------
// Clipboard domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClipboardRequest {
    Copy {
        content: ClipboardContent,
        #[serde(default)]
        concealed: bool,
    },
    Paste {
        content: ClipboardContent,
    },
    ReadContent,
    Clear,
}

/// Content an extension can place on the clipboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClipboardContent {
    Text {
        text: String,
    },
    Html {
        html: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Path {
        path: String,
    },
}

/// What the host read back from the clipboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardReading {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClipboardResponse {
    Ack,
    Content { content: ClipboardReading },
}

// ----------------------------------------------------------------------------
// File search domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FileSearchRequest {
    #[serde(rename_all = "camelCase")]
    Search {
        query: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_results: Option<usize>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FileSearchResponse {
    Results { files: Vec<FileHit> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHit {
    pub path: String,
    pub name: String,
}

// ----------------------------------------------------------------------------
// Window management domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum WmRequest {
    Ping,
    GetActiveWindow,
    #[serde(rename_all = "camelCase")]
    GetWindows {
        #[serde(skip_serializing_if = "Option::is_none")]
        workspace_id: Option<String>,
    },
    GetActiveWorkspace,
    #[serde(rename_all = "camelCase")]
    SetWindowBounds {
        window_id: String,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum WmResponse {
    Ping { alive: bool },
    ActiveWindow { window: Window },
    Windows { windows: Vec<Window> },
    ActiveWorkspace { workspace: Option<Workspace> },
}

/// A top-level window known to the window manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub id: String,
    pub title: String,
    pub wm_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<Application>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

// ----------------------------------------------------------------------------
// Command domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CommandRequest {
    UpdateMetadata {
        #[serde(skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
    },
    GetPreferenceValues,
    #[serde(rename_all = "camelCase")]
    Launch {
        command_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CommandResponse {
    Ack,
    PreferenceValues { values: HashMap<String, Value> },
}

// ----------------------------------------------------------------------------
// OAuth domain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OauthRequest {
    #[serde(rename_all = "camelCase")]
    Authorize {
        provider_name: String,
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GetTokens { provider_id: String },
    #[serde(rename_all = "camelCase")]
    SetTokens {
        provider_id: String,
        tokens: OauthTokens,
    },
    #[serde(rename_all = "camelCase")]
    RemoveTokens { provider_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OauthResponse {
    Authorized { code: String },
    Tokens { tokens: OauthTokens },
    Ack,
}

/// A stored token set for one OAuth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OauthTokens {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// A response qualified with the session it answers into
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedResponse {
    pub session_id: String,
    pub response: Response,
}

/// Correlated reply: a domain payload on success, a structured error otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponsePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl Response {
    pub fn ok(request_id: Option<String>, result: ResponsePayload) -> Self {
        Self {
            request_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(request_id: Option<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            request_id,
            result: None,
            error: Some(ErrorResponse {
                kind,
                message: message.into(),
            }),
        }
    }
}

/// Domain-tagged response payload, mirroring [`RequestPayload`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "payload", rename_all = "camelCase")]
pub enum ResponsePayload {
    Ui(UiResponse),
    Storage(StorageResponse),
    App(AppResponse),
    Clipboard(ClipboardResponse),
    FileSearch(FileSearchResponse),
    WindowManagement(WmResponse),
    Command(CommandResponse),
    Oauth(OauthResponse),
}

// ============================================================================
// Events
// ============================================================================

/// An event qualified with its session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedEvent {
    pub session_id: String,
    pub event: Event,
}

/// Out-of-band notification, never correlated to a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Event {
    /// The extension worker crashed; `text` is the crash report
    Crash { text: String },
    /// Extension point with no mandated host reaction. Also used host -> worker
    /// to invoke registered handlers (e.g. `pop-view`).
    #[serde(rename_all = "camelCase")]
    Generic {
        handler_id: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}
