//! Host service boundaries
//!
//! Capability routers only ever touch the host through these traits. Each
//! router is handed `Arc`s to exactly the services it needs at session load;
//! the in-memory implementations in [`memory`] back tests and headless use.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::DomainError;
use crate::protocol::{
    Application, ClipboardContent, ClipboardReading, FileHit, OauthTokens, ToastStyle, Window,
    Workspace,
};

/// Options applied when placing content on the clipboard
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Concealed entries are kept out of clipboard history
    pub concealed: bool,
}

/// Key-value storage, namespaced per extension
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value>;
    async fn set(&self, namespace: &str, key: &str, value: Value);
    /// Returns true if the key existed
    async fn remove(&self, namespace: &str, key: &str) -> bool;
    async fn clear(&self, namespace: &str);
    async fn keys(&self, namespace: &str) -> Vec<String>;
}

/// System clipboard access
#[async_trait]
pub trait ClipboardService: Send + Sync {
    async fn copy_content(&self, content: ClipboardContent, options: CopyOptions);
    async fn read_content(&self) -> ClipboardReading;
    async fn clear(&self);
}

/// Application database lookups and launching
pub trait AppService: Send + Sync {
    fn list(&self) -> Vec<Application>;
    /// Applications able to open the given target (url, path, mime)
    fn find_openers(&self, target: &str) -> Vec<Application>;
    fn find_default_opener(&self, target: &str) -> Option<Application>;
    fn find_by_id(&self, id: &str) -> Option<Application>;
    fn launch(&self, app: &Application, args: &[String]) -> bool;
}

/// Indexed file search. Implementations must run scans off the event thread.
#[async_trait]
pub trait FileSearchService: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<FileHit>;
}

/// Window manager provider
pub trait WindowManagerService: Send + Sync {
    /// Whether a window management provider is reachable at all
    fn ping(&self) -> bool;
    fn active_window(&self) -> Option<Window>;
    fn list_windows(&self) -> Vec<Window>;
    fn active_workspace(&self) -> Option<Workspace>;
    /// Forward a paste keystroke to the window that had focus before the
    /// launcher opened
    fn paste_to_focused_window(&self);
}

/// Root item registry: resolved preference values and launch-by-id
pub trait RootItemManager: Send + Sync {
    fn preference_values(&self, unique_id: &str) -> HashMap<String, Value>;
    fn set_subtitle_override(&self, unique_id: &str, subtitle: Option<String>);
    /// Queue another root item for launch. Returns false for unknown ids.
    fn launch(&self, command_id: &str) -> bool;
}

/// Authorization payload handed to the consent broker
#[derive(Debug, Clone)]
pub struct OauthAuthorizeRequest {
    pub provider_name: String,
    pub url: String,
    pub description: Option<String>,
}

/// OAuth consent flow and per-extension token store
#[async_trait]
pub trait OauthBroker: Send + Sync {
    /// Walk the user through the consent flow; resolves with the authorization
    /// code once the provider redirects back
    async fn authorize(&self, request: OauthAuthorizeRequest) -> Result<String, DomainError>;
    async fn tokens(&self, extension_id: &str, provider_id: &str) -> Option<OauthTokens>;
    async fn set_tokens(&self, extension_id: &str, provider_id: &str, tokens: OauthTokens);
    async fn remove_tokens(&self, extension_id: &str, provider_id: &str) -> bool;
}

/// Transient toast surface at the bottom of the launcher window
pub trait ToastService: Send + Sync {
    fn set_toast(&self, title: &str, style: ToastStyle, message: Option<&str>);
    fn clear(&self);
}

/// Search-path registry for `extension://` asset URLs
pub trait AssetResolver: Send + Sync {
    fn add_path(&self, path: &Path);
    fn remove_path(&self, path: &Path);
}

/// Shared handles to every host service a session may need.
///
/// One instance is shared by all sessions; routers receive clones of the
/// individual `Arc`s, never the bundle itself.
#[derive(Clone)]
pub struct HostServices {
    pub storage: Arc<dyn StorageBackend>,
    pub clipboard: Arc<dyn ClipboardService>,
    pub apps: Arc<dyn AppService>,
    pub file_search: Arc<dyn FileSearchService>,
    pub window_manager: Arc<dyn WindowManagerService>,
    pub root_items: Arc<dyn RootItemManager>,
    pub oauth: Arc<dyn OauthBroker>,
    pub toast: Arc<dyn ToastService>,
    pub assets: Arc<dyn AssetResolver>,
}

impl HostServices {
    /// Fully in-memory service set, used by tests and headless tooling
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(memory::MemoryStorage::default()),
            clipboard: Arc::new(memory::MemoryClipboard::default()),
            apps: Arc::new(memory::StaticAppDb::default()),
            file_search: Arc::new(memory::MemoryFileIndex::default()),
            window_manager: Arc::new(memory::StaticWindowManager::default()),
            root_items: Arc::new(memory::MemoryRootItems::default()),
            oauth: Arc::new(memory::MemoryOauthBroker::default()),
            toast: Arc::new(memory::RecordingToast::default()),
            assets: Arc::new(memory::MemoryAssetResolver::default()),
        }
    }
}
