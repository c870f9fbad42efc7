//! Command runtime
//!
//! One `CommandRuntime` per executing command. It owns the session lifecycle
//! (`Unloaded -> Loading -> Running -> Unloaded`), gates inbound traffic on the
//! active session id, dispatches requests through the router registry, and
//! correlates deferred outcomes through the pending table. Teardown is a
//! synchronous drain: after `unload` returns, no request is answered and no
//! deferred dispatch will emit.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::dispatch::Dispatcher;
use crate::error::{ErrorKind, HostError, Result};
use crate::manager::ExtensionManager;
use crate::manifest::{CommandEnv, CommandManifest, CommandMode};
use crate::navigation::{NavigationController, NavigationHandle};
use crate::pending::PendingDispatches;
use crate::protocol::{
    Event, LoadCommand, QualifiedEvent, QualifiedRequest, Response,
};
use crate::router::RouteOutcome;
use crate::services::HostServices;

/// Suffix icon decorating development sessions on the navigation bar
const DEVELOPMENT_SUFFIX_ICON: &str = "hammer";

/// Launch-time inputs that are not part of the static manifest
#[derive(Debug, Clone)]
pub struct LaunchProps {
    pub env: CommandEnv,
    pub argument_values: HashMap<String, Value>,
    pub data_dir: PathBuf,
}

impl Default for LaunchProps {
    fn default() -> Self {
        Self {
            env: CommandEnv::Production,
            argument_values: HashMap::new(),
            data_dir: PathBuf::new(),
        }
    }
}

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Unloaded,
    Loading,
    Running,
}

struct Session {
    session_id: String,
    env: CommandEnv,
    dispatcher: Dispatcher,
    pending: PendingDispatches,
}

/// Session controller for one executing command
pub struct CommandRuntime {
    manifest: Arc<CommandManifest>,
    services: HostServices,
    navigation: Arc<NavigationController>,
    manager: Arc<ExtensionManager>,
    state: State,
}

enum State {
    Unloaded,
    Loading,
    Running(Session),
}

impl CommandRuntime {
    pub fn new(
        manifest: Arc<CommandManifest>,
        services: HostServices,
        navigation: Arc<dyn NavigationHandle>,
        manager: Arc<ExtensionManager>,
    ) -> Self {
        let navigation = Arc::new(NavigationController::new(navigation, manifest.clone()));
        Self {
            manifest,
            services,
            navigation,
            manager,
            state: State::Unloaded,
        }
    }

    pub fn state(&self) -> RuntimeState {
        match self.state {
            State::Unloaded => RuntimeState::Unloaded,
            State::Loading => RuntimeState::Loading,
            State::Running(_) => RuntimeState::Running,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            State::Running(session) => Some(&session.session_id),
            _ => None,
        }
    }

    pub fn navigation(&self) -> &Arc<NavigationController> {
        &self.navigation
    }

    /// Boot the command inside the manager and bring the session to `Running`.
    ///
    /// The view frame for `View`-mode commands is pushed before the worker
    /// starts so the first render has a surface to hydrate. A load failure
    /// rolls every side effect back and surfaces the error.
    pub async fn load(&mut self, props: LaunchProps) -> Result<()> {
        if !matches!(self.state, State::Unloaded) {
            return Err(HostError::SessionState(
                "load requires an unloaded session".into(),
            ));
        }
        self.state = State::Loading;

        self.services.assets.add_path(&self.manifest.asset_path);
        if self.manifest.mode == CommandMode::View {
            self.navigation.push_view();
        }
        if props.env == CommandEnv::Development {
            self.navigation
                .handle()
                .set_navigation_suffix_icon(Some(DEVELOPMENT_SUFFIX_ICON));
        }

        let preference_values = self
            .services
            .root_items
            .preference_values(&self.manifest.unique_id());
        let load = LoadCommand {
            entrypoint: self.manifest.entrypoint.clone(),
            env: props.env,
            extension_id: self.manifest.extension_id.clone(),
            command_id: self.manifest.command_id.clone(),
            extension_name: self.manifest.extension_name.clone(),
            author: self.manifest.author.clone(),
            mode: self.manifest.mode,
            preference_values,
            argument_values: props.argument_values,
            data_dir: props.data_dir.to_string_lossy().into_owned(),
        };

        let session_id = match self.manager.load_command(load).await {
            Ok(session_id) => session_id,
            Err(e) => {
                warn!(command = %self.manifest.unique_id(), "load failed: {e}");
                self.services.assets.remove_path(&self.manifest.asset_path);
                if self.manifest.mode == CommandMode::View {
                    self.navigation.pop_view();
                }
                self.navigation.handle().set_navigation_suffix_icon(None);
                self.state = State::Unloaded;
                return Err(e);
            }
        };

        if props.env == CommandEnv::Development {
            self.manager.add_development_session(&session_id);
        }

        let dispatcher = Dispatcher::new(&self.services, self.navigation.clone(), &self.manifest);
        let pending = PendingDispatches::new(session_id.clone(), self.manager.sender());
        info!(
            command = %self.manifest.unique_id(),
            session_id = %session_id,
            "command session running"
        );
        self.state = State::Running(Session {
            session_id,
            env: props.env,
            dispatcher,
            pending,
        });
        Ok(())
    }

    /// Handle one inbound request from the manager stream.
    ///
    /// Requests tagged with a stale or foreign session id are dropped without
    /// a reply. A failing request is answered with an error response and the
    /// session keeps running.
    pub async fn handle_request(&self, qualified: QualifiedRequest) {
        let State::Running(session) = &self.state else {
            trace!("dropping request for inactive session");
            return;
        };
        if qualified.session_id != session.session_id {
            trace!(
                session_id = %qualified.session_id,
                "dropping request tagged with a foreign session id"
            );
            return;
        }

        let request_id = qualified.request.request_id;
        let domain = qualified.request.payload.domain();
        let response = match session.dispatcher.dispatch(qualified.request.payload).await {
            Ok(RouteOutcome::Immediate(payload)) => Response::ok(request_id, payload),
            Ok(RouteOutcome::Deferred(fut)) => {
                let Some(request_id) = request_id else {
                    self.answer(
                        session,
                        Response::error(
                            None,
                            ErrorKind::InvalidArgument,
                            "deferred operation requires a request id",
                        ),
                    );
                    return;
                };
                session.pending.register(request_id, fut);
                return;
            }
            Ok(RouteOutcome::Unhandled) => Response::error(
                request_id,
                ErrorKind::NoHandler,
                format!("operation not handled by the '{domain}' router"),
            ),
            Err(err) => Response::error(request_id, err.kind, err.message),
        };
        self.answer(session, response);
    }

    fn answer(&self, session: &Session, response: Response) {
        if let Err(e) = self.manager.send_response(&session.session_id, response) {
            warn!("failed to send response: {e}");
        }
    }

    /// Handle one out-of-band event from the manager stream
    pub fn handle_event(&self, qualified: QualifiedEvent) {
        let State::Running(session) = &self.state else {
            trace!("dropping event for inactive session");
            return;
        };
        if qualified.session_id != session.session_id {
            trace!(
                session_id = %qualified.session_id,
                "dropping event tagged with a foreign session id"
            );
            return;
        }

        match qualified.event {
            Event::Crash { text } => {
                // The session stays formally running until its owner unloads it
                warn!(
                    command = %self.manifest.unique_id(),
                    "extension worker crashed"
                );
                self.navigation.show_crash(&text);
            }
            Event::Generic { handler_id, .. } => {
                debug!(handler_id = %handler_id, "ignoring generic event");
            }
        }
    }

    /// Tear the session down. Safe to call in any state, any number of times.
    pub fn unload(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Unloaded);
        let session = match state {
            State::Unloaded => return,
            State::Loading => {
                // Load never completed; undo the eager decorations
                self.services.assets.remove_path(&self.manifest.asset_path);
                self.navigation.handle().set_navigation_suffix_icon(None);
                return;
            }
            State::Running(session) => session,
        };

        self.services.assets.remove_path(&self.manifest.asset_path);
        self.navigation.handle().set_navigation_suffix_icon(None);
        self.services.toast.clear();

        if session.env == CommandEnv::Development {
            self.manager.remove_development_session(&session.session_id);
        }

        // Fire and forget. A hung manager must not stall the event thread.
        let manager = self.manager.clone();
        let session_id = session.session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.unload_command(&session_id).await {
                debug!(session_id = %session_id, "manager unload failed: {e}");
            }
        });

        session.pending.cancel_all();
        info!(
            command = %self.manifest.unique_id(),
            session_id = %session.session_id,
            "command session unloaded"
        );
    }
}
