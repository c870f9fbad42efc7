//! Request dispatch
//!
//! The dispatcher is a router of routers: it owns one capability router per
//! domain and forwards each request payload to the matching one. Domain
//! routing is a pure exhaustive match; the dispatcher itself never inspects
//! operation payloads.

use std::sync::Arc;

use tracing::debug;

use crate::error::DomainError;
use crate::manifest::CommandManifest;
use crate::navigation::NavigationController;
use crate::protocol::RequestPayload;
use crate::router::{
    AppRouter, ClipboardRouter, CommandRouter, FileSearchRouter, OauthRouter, RouteOutcome,
    StorageRouter, UiRouter, WmRouter,
};
use crate::services::HostServices;

/// Per-session router registry
pub struct Dispatcher {
    ui: UiRouter,
    storage: StorageRouter,
    app: AppRouter,
    clipboard: ClipboardRouter,
    file_search: FileSearchRouter,
    wm: WmRouter,
    command: CommandRouter,
    oauth: OauthRouter,
}

impl Dispatcher {
    /// Build the full router set for one session. Each router receives only
    /// the service handles it needs.
    pub fn new(
        services: &HostServices,
        navigation: Arc<NavigationController>,
        manifest: &CommandManifest,
    ) -> Self {
        Self {
            ui: UiRouter::new(navigation, services.toast.clone()),
            storage: StorageRouter::new(services.storage.clone(), &manifest.extension_id),
            app: AppRouter::new(services.apps.clone()),
            clipboard: ClipboardRouter::new(
                services.clipboard.clone(),
                services.window_manager.clone(),
            ),
            file_search: FileSearchRouter::new(services.file_search.clone()),
            wm: WmRouter::new(services.window_manager.clone()),
            command: CommandRouter::new(services.root_items.clone(), manifest.unique_id()),
            oauth: OauthRouter::new(services.oauth.clone(), manifest.extension_id.clone()),
        }
    }

    /// Route one payload to its domain router
    pub async fn dispatch(&self, payload: RequestPayload) -> Result<RouteOutcome, DomainError> {
        debug!(domain = payload.domain(), "dispatching request");
        match payload {
            RequestPayload::Ui(req) => self.ui.route(req).await,
            RequestPayload::Storage(req) => self.storage.route(req).await,
            RequestPayload::App(req) => self.app.route(req).await,
            RequestPayload::Clipboard(req) => self.clipboard.route(req).await,
            RequestPayload::FileSearch(req) => self.file_search.route(req).await,
            RequestPayload::WindowManagement(req) => self.wm.route(req).await,
            RequestPayload::Command(req) => self.command.route(req).await,
            RequestPayload::Oauth(req) => self.oauth.route(req).await,
        }
    }
}
