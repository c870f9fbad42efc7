//! # lumen-extension-host
//!
//! Extension host protocol and command runtime for the Lumen launcher.
//!
//! ## Overview
//!
//! Launcher extensions run out of process, sandboxed inside a long-lived
//! extension-manager sidecar. This crate implements the host side of that
//! boundary: it boots commands, speaks the framed wire protocol, routes every
//! capability request an extension makes (UI, storage, apps, clipboard, file
//! search, window management, command metadata, OAuth) to the host service
//! that can answer it, and correlates deferred answers back to their callers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use lumen_extension_host::{
//!     CommandRuntime, ExtensionManager, HostServices, LaunchProps,
//!     manifest::CommandManifest, navigation::RecordingNavigation,
//! };
//!
//! # async fn example(manifest: Arc<CommandManifest>) -> lumen_extension_host::Result<()> {
//! let manager = Arc::new(ExtensionManager::spawn("manager/dist/index.js".as_ref())?);
//! let services = HostServices::in_memory();
//! let navigation = Arc::new(RecordingNavigation::default());
//!
//! let mut runtime = CommandRuntime::new(manifest, services, navigation, manager.clone());
//! runtime.load(LaunchProps::default()).await?;
//!
//! // Pump inbound traffic into the runtime
//! let mut inbox = manager.take_inbox().unwrap();
//! while let Some(inbound) = inbox.recv().await {
//!     match inbound {
//!         lumen_extension_host::ManagerInbound::Request(req) => {
//!             runtime.handle_request(req).await
//!         }
//!         lumen_extension_host::ManagerInbound::Event(event) => runtime.handle_event(event),
//!     }
//! }
//! runtime.unload();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **CommandRuntime** — session lifecycle state machine, one per command
//! - **Dispatcher** — router registry, one exhaustive match per domain
//! - **PendingDispatches** — correlation table for deferred outcomes
//! - **ExtensionManager** — sidecar process handle and message bus
//! - **HostServices** — trait seams to everything the host provides

pub mod dispatch;
pub mod error;
pub mod frame;
pub mod manager;
pub mod manifest;
pub mod navigation;
pub mod pending;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod services;

// Re-export core types
pub use dispatch::Dispatcher;
pub use error::{DomainError, ErrorKind, HostError, Result};
pub use manager::{runtime_executable, ExtensionManager, ManagerInbound};
pub use pending::PendingDispatches;
pub use protocol::{
    Event, IpcMessage, LoadCommand, QualifiedEvent, QualifiedRequest, QualifiedResponse, Request,
    RequestPayload, Response, ResponsePayload,
};
pub use runtime::{CommandRuntime, LaunchProps, RuntimeState};
pub use services::HostServices;
