//! Capability routers
//!
//! One router per capability domain. A router translates its domain's request
//! union into calls against the host services it was constructed with, and
//! wraps the result back into the domain's response union. Routers are built
//! once per session at load time and never shared across sessions.

pub mod app;
pub mod clipboard;
pub mod command;
pub mod file_search;
pub mod oauth;
pub mod storage;
pub mod ui;
pub mod wm;

pub use app::AppRouter;
pub use clipboard::ClipboardRouter;
pub use command::CommandRouter;
pub use file_search::FileSearchRouter;
pub use oauth::OauthRouter;
pub use storage::StorageRouter;
pub use ui::UiRouter;
pub use wm::WmRouter;

use futures::future::BoxFuture;

use crate::error::DomainError;
use crate::protocol::ResponsePayload;

/// Future resolving a deferred routing outcome
pub type RouteFuture = BoxFuture<'static, Result<ResponsePayload, DomainError>>;

/// Result of routing one request payload
pub enum RouteOutcome {
    /// Result known synchronously; answered before the next request dispatches
    Immediate(ResponsePayload),
    /// Result depends on an operation that suspends; correlated by request id
    Deferred(RouteFuture),
    /// The operation is not implemented by this router (protocol skew)
    Unhandled,
}

impl RouteOutcome {
    /// Convenience for handlers whose result is already at hand
    pub fn immediate(payload: ResponsePayload) -> Result<Self, DomainError> {
        Ok(Self::Immediate(payload))
    }
}

impl std::fmt::Debug for RouteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(payload) => f.debug_tuple("Immediate").field(payload).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Unhandled => f.write_str("Unhandled"),
        }
    }
}
