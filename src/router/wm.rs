//! Window management request router
//!
//! Backed by whichever window manager provider the host detected. Ping is the
//! one operation answered regardless of availability; everything else fails
//! cleanly when no provider is reachable.

use std::sync::Arc;

use super::RouteOutcome;
use crate::error::DomainError;
use crate::protocol::{ResponsePayload, WmRequest, WmResponse};
use crate::services::WindowManagerService;

pub struct WmRouter {
    window_manager: Arc<dyn WindowManagerService>,
}

impl WmRouter {
    pub fn new(window_manager: Arc<dyn WindowManagerService>) -> Self {
        Self { window_manager }
    }

    /// Every operation except Ping requires a reachable provider
    fn require_provider(&self) -> Result<(), DomainError> {
        if self.window_manager.ping() {
            Ok(())
        } else {
            Err(DomainError::internal(
                "no window manager provider is available",
            ))
        }
    }

    pub async fn route(&self, req: WmRequest) -> Result<RouteOutcome, DomainError> {
        match req {
            WmRequest::Ping => RouteOutcome::immediate(ResponsePayload::WindowManagement(
                WmResponse::Ping {
                    alive: self.window_manager.ping(),
                },
            )),
            WmRequest::GetActiveWindow => {
                self.require_provider()?;
                let window = self
                    .window_manager
                    .active_window()
                    .ok_or_else(|| DomainError::not_found("no window is focused"))?;
                RouteOutcome::immediate(ResponsePayload::WindowManagement(
                    WmResponse::ActiveWindow { window },
                ))
            }
            WmRequest::GetWindows { workspace_id } => {
                self.require_provider()?;
                let mut windows = self.window_manager.list_windows();
                if let Some(ws) = workspace_id {
                    windows.retain(|w| w.workspace.as_deref() == Some(ws.as_str()));
                }
                RouteOutcome::immediate(ResponsePayload::WindowManagement(WmResponse::Windows {
                    windows,
                }))
            }
            WmRequest::GetActiveWorkspace => {
                self.require_provider()?;
                let workspace = self.window_manager.active_workspace();
                RouteOutcome::immediate(ResponsePayload::WindowManagement(
                    WmResponse::ActiveWorkspace { workspace },
                ))
            }
            // Accepted by no provider yet
            WmRequest::SetWindowBounds { .. } => Ok(RouteOutcome::Unhandled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::protocol::{Window, Workspace};
    use crate::services::memory::StaticWindowManager;

    fn window(id: &str, workspace: Option<&str>, active: bool) -> Window {
        Window {
            id: id.into(),
            title: format!("window {id}"),
            wm_class: "demo".into(),
            workspace: workspace.map(str::to_string),
            active,
            app: None,
        }
    }

    #[tokio::test]
    async fn test_ping_reports_availability() {
        let router = WmRouter::new(Arc::new(StaticWindowManager::unavailable()));
        match router.route(WmRequest::Ping).await.unwrap() {
            RouteOutcome::Immediate(ResponsePayload::WindowManagement(WmResponse::Ping {
                alive,
            })) => assert!(!alive),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_queries() {
        let router = WmRouter::new(Arc::new(StaticWindowManager::unavailable()));
        let err = router.route(WmRequest::GetActiveWindow).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_get_windows_filters_by_workspace() {
        let wm = StaticWindowManager::with_windows(
            vec![
                window("w1", Some("ws1"), true),
                window("w2", Some("ws2"), false),
            ],
            Some(Workspace {
                id: "ws1".into(),
                name: "main".into(),
            }),
        );
        let router = WmRouter::new(Arc::new(wm));

        match router
            .route(WmRequest::GetWindows {
                workspace_id: Some("ws2".into()),
            })
            .await
            .unwrap()
        {
            RouteOutcome::Immediate(ResponsePayload::WindowManagement(WmResponse::Windows {
                windows,
            })) => {
                assert_eq!(windows.len(), 1);
                assert_eq!(windows[0].id, "w2");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_active_window_not_found() {
        let wm = StaticWindowManager::with_windows(vec![window("w1", None, false)], None);
        let router = WmRouter::new(Arc::new(wm));
        let err = router.route(WmRequest::GetActiveWindow).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_set_window_bounds_is_unhandled() {
        let router = WmRouter::new(Arc::new(StaticWindowManager::default()));
        let outcome = router
            .route(WmRequest::SetWindowBounds {
                window_id: "w1".into(),
                x: 0,
                y: 0,
                width: 800,
                height: 600,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, RouteOutcome::Unhandled));
    }
}
