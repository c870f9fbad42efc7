//! In-memory service implementations
//!
//! Backing for tests and headless use. All state lives behind `Mutex`es so the
//! implementations can be shared across sessions as `Arc<dyn ...>` handles.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{
    AppService, AssetResolver, ClipboardService, CopyOptions, FileSearchService, OauthAuthorizeRequest,
    OauthBroker, RootItemManager, StorageBackend, ToastService, WindowManagerService,
};
use crate::error::DomainError;
use crate::protocol::{
    Application, ClipboardContent, ClipboardReading, FileHit, OauthTokens, ToastStyle, Window,
    Workspace,
};

/// Namespaced key-value store over a nested map
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, HashMap<String, Value>>>,
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap()
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) {
        self.entries
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    async fn remove(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get_mut(namespace)
            .map(|ns| ns.remove(key).is_some())
            .unwrap_or(false)
    }

    async fn clear(&self, namespace: &str) {
        self.entries.lock().unwrap().remove(namespace);
    }

    async fn keys(&self, namespace: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Clipboard holding a single reading
#[derive(Default)]
pub struct MemoryClipboard {
    current: Mutex<ClipboardReading>,
    /// Copies observed, newest last. Concealed copies are recorded too; a real
    /// backend would only keep them out of history.
    copies: Mutex<Vec<(ClipboardContent, CopyOptions)>>,
}

impl MemoryClipboard {
    pub fn copy_count(&self) -> usize {
        self.copies.lock().unwrap().len()
    }
}

#[async_trait]
impl ClipboardService for MemoryClipboard {
    async fn copy_content(&self, content: ClipboardContent, options: CopyOptions) {
        let reading = match &content {
            ClipboardContent::Text { text } => ClipboardReading {
                text: text.clone(),
                ..Default::default()
            },
            ClipboardContent::Html { html, text } => ClipboardReading {
                text: text.clone().unwrap_or_default(),
                html: Some(html.clone()),
                file: None,
            },
            ClipboardContent::Path { path } => ClipboardReading {
                text: path.clone(),
                html: None,
                file: Some(path.clone()),
            },
        };
        *self.current.lock().unwrap() = reading;
        self.copies.lock().unwrap().push((content, options));
    }

    async fn read_content(&self) -> ClipboardReading {
        self.current.lock().unwrap().clone()
    }

    async fn clear(&self) {
        *self.current.lock().unwrap() = ClipboardReading::default();
    }
}

/// Fixed application table
pub struct StaticAppDb {
    apps: Vec<Application>,
    launched: Mutex<Vec<(String, Vec<String>)>>,
}

impl Default for StaticAppDb {
    fn default() -> Self {
        Self {
            apps: vec![
                Application {
                    id: "org.mozilla.firefox".into(),
                    name: "Firefox".into(),
                    icon: "firefox".into(),
                },
                Application {
                    id: "org.gnome.TextEditor".into(),
                    name: "Text Editor".into(),
                    icon: "text-editor".into(),
                },
            ],
            launched: Mutex::new(Vec::new()),
        }
    }
}

impl StaticAppDb {
    pub fn with_apps(apps: Vec<Application>) -> Self {
        Self {
            apps,
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn launched(&self) -> Vec<(String, Vec<String>)> {
        self.launched.lock().unwrap().clone()
    }
}

impl AppService for StaticAppDb {
    fn list(&self) -> Vec<Application> {
        self.apps.clone()
    }

    fn find_openers(&self, _target: &str) -> Vec<Application> {
        self.apps.clone()
    }

    fn find_default_opener(&self, _target: &str) -> Option<Application> {
        self.apps.first().cloned()
    }

    fn find_by_id(&self, id: &str) -> Option<Application> {
        self.apps.iter().find(|app| app.id == id).cloned()
    }

    fn launch(&self, app: &Application, args: &[String]) -> bool {
        self.launched
            .lock()
            .unwrap()
            .push((app.id.clone(), args.to_vec()));
        true
    }
}

/// Substring search over a fixed file list
#[derive(Default)]
pub struct MemoryFileIndex {
    files: Vec<FileHit>,
}

impl MemoryFileIndex {
    pub fn with_files(files: Vec<FileHit>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl FileSearchService for MemoryFileIndex {
    async fn search(&self, query: &str, max_results: usize) -> Vec<FileHit> {
        let needle = query.to_lowercase();
        self.files
            .iter()
            .filter(|hit| hit.name.to_lowercase().contains(&needle))
            .take(max_results)
            .cloned()
            .collect()
    }
}

/// Window manager with a fixed window set
pub struct StaticWindowManager {
    pub available: bool,
    windows: Vec<Window>,
    workspace: Option<Workspace>,
    pastes: Mutex<usize>,
}

impl Default for StaticWindowManager {
    fn default() -> Self {
        Self {
            available: true,
            windows: Vec::new(),
            workspace: None,
            pastes: Mutex::new(0),
        }
    }
}

impl StaticWindowManager {
    pub fn with_windows(windows: Vec<Window>, workspace: Option<Workspace>) -> Self {
        Self {
            available: true,
            windows,
            workspace,
            pastes: Mutex::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Default::default()
        }
    }

    pub fn paste_count(&self) -> usize {
        *self.pastes.lock().unwrap()
    }
}

impl WindowManagerService for StaticWindowManager {
    fn ping(&self) -> bool {
        self.available
    }

    fn active_window(&self) -> Option<Window> {
        self.windows.iter().find(|w| w.active).cloned()
    }

    fn list_windows(&self) -> Vec<Window> {
        self.windows.clone()
    }

    fn active_workspace(&self) -> Option<Workspace> {
        self.workspace.clone()
    }

    fn paste_to_focused_window(&self) {
        *self.pastes.lock().unwrap() += 1;
    }
}

/// Root item registry backed by maps
#[derive(Default)]
pub struct MemoryRootItems {
    preferences: Mutex<HashMap<String, HashMap<String, Value>>>,
    subtitles: Mutex<HashMap<String, Option<String>>>,
    launchable: Mutex<Vec<String>>,
    launches: Mutex<Vec<String>>,
}

impl MemoryRootItems {
    pub fn set_preference_values(&self, unique_id: &str, values: HashMap<String, Value>) {
        self.preferences
            .lock()
            .unwrap()
            .insert(unique_id.to_string(), values);
    }

    pub fn register_launchable(&self, command_id: &str) {
        self.launchable.lock().unwrap().push(command_id.to_string());
    }

    pub fn subtitle_override(&self, unique_id: &str) -> Option<Option<String>> {
        self.subtitles.lock().unwrap().get(unique_id).cloned()
    }

    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

impl RootItemManager for MemoryRootItems {
    fn preference_values(&self, unique_id: &str) -> HashMap<String, Value> {
        self.preferences
            .lock()
            .unwrap()
            .get(unique_id)
            .cloned()
            .unwrap_or_default()
    }

    fn set_subtitle_override(&self, unique_id: &str, subtitle: Option<String>) {
        self.subtitles
            .lock()
            .unwrap()
            .insert(unique_id.to_string(), subtitle);
    }

    fn launch(&self, command_id: &str) -> bool {
        let known = self
            .launchable
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == command_id);
        if known {
            self.launches.lock().unwrap().push(command_id.to_string());
        }
        known
    }
}

/// Consent broker that resolves from a pre-seeded answer, plus a token map
#[derive(Default)]
pub struct MemoryOauthBroker {
    /// Code handed out by `authorize`; `None` simulates the user dismissing
    /// the consent screen
    pub grant: Mutex<Option<String>>,
    tokens: Mutex<HashMap<(String, String), OauthTokens>>,
}

impl MemoryOauthBroker {
    pub fn granting(code: &str) -> Self {
        Self {
            grant: Mutex::new(Some(code.to_string())),
            tokens: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl OauthBroker for MemoryOauthBroker {
    async fn authorize(&self, request: OauthAuthorizeRequest) -> Result<String, DomainError> {
        match self.grant.lock().unwrap().clone() {
            Some(code) => Ok(code),
            None => Err(DomainError::permission_denied(format!(
                "authorization for '{}' was dismissed",
                request.provider_name
            ))),
        }
    }

    async fn tokens(&self, extension_id: &str, provider_id: &str) -> Option<OauthTokens> {
        self.tokens
            .lock()
            .unwrap()
            .get(&(extension_id.to_string(), provider_id.to_string()))
            .cloned()
    }

    async fn set_tokens(&self, extension_id: &str, provider_id: &str, tokens: OauthTokens) {
        self.tokens
            .lock()
            .unwrap()
            .insert((extension_id.to_string(), provider_id.to_string()), tokens);
    }

    async fn remove_tokens(&self, extension_id: &str, provider_id: &str) -> bool {
        self.tokens
            .lock()
            .unwrap()
            .remove(&(extension_id.to_string(), provider_id.to_string()))
            .is_some()
    }
}

/// Toast surface that records what it was asked to show
#[derive(Default)]
pub struct RecordingToast {
    shown: Mutex<Vec<(String, ToastStyle, Option<String>)>>,
    cleared: Mutex<usize>,
}

impl RecordingToast {
    pub fn shown(&self) -> Vec<(String, ToastStyle, Option<String>)> {
        self.shown.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        *self.cleared.lock().unwrap()
    }
}

impl ToastService for RecordingToast {
    fn set_toast(&self, title: &str, style: ToastStyle, message: Option<&str>) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), style, message.map(str::to_string)));
    }

    fn clear(&self) {
        *self.cleared.lock().unwrap() += 1;
    }
}

/// Asset search-path registry
#[derive(Default)]
pub struct MemoryAssetResolver {
    paths: Mutex<Vec<PathBuf>>,
}

impl MemoryAssetResolver {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl AssetResolver for MemoryAssetResolver {
    fn add_path(&self, path: &Path) {
        self.paths.lock().unwrap().push(path.to_path_buf());
    }

    fn remove_path(&self, path: &Path) {
        self.paths.lock().unwrap().retain(|p| p != path);
    }
}
