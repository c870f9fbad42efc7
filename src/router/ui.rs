//! UI request router
//!
//! Navigation, toast, and window operations requested by the extension. The
//! only deferred operation is `confirmAlert`, which resolves once the user
//! picks an answer.

use serde_json::Value;
use std::sync::Arc;

use super::{RouteFuture, RouteOutcome};
use crate::error::DomainError;
use crate::navigation::{AlertOptions, CloseWindowOptions, NavigationController, PopToRootOptions};
use crate::protocol::{ResponsePayload, UiRequest, UiResponse};
use crate::services::ToastService;

pub struct UiRouter {
    navigation: Arc<NavigationController>,
    toast: Arc<dyn ToastService>,
}

impl UiRouter {
    pub fn new(navigation: Arc<NavigationController>, toast: Arc<dyn ToastService>) -> Self {
        Self { navigation, toast }
    }

    pub async fn route(&self, req: UiRequest) -> Result<RouteOutcome, DomainError> {
        let response = match req {
            UiRequest::Render { json } => {
                let tree: Value = serde_json::from_str(&json).map_err(|e| {
                    DomainError::invalid_argument(format!("render tree is not valid JSON: {e}"))
                })?;
                self.navigation.handle().render(tree);
                UiResponse::Ack
            }
            UiRequest::SetSearchText { text } => {
                self.navigation.handle().set_search_text(&text);
                UiResponse::Ack
            }
            UiRequest::PushView => {
                self.navigation.push_view();
                UiResponse::Ack
            }
            UiRequest::PopView => {
                self.navigation.pop_view();
                UiResponse::Ack
            }
            UiRequest::PopToRoot { clear_search } => {
                self.navigation
                    .handle()
                    .pop_to_root(PopToRootOptions { clear_search });
                UiResponse::Ack
            }
            UiRequest::ShowToast {
                title,
                style,
                message,
            } => {
                self.toast.set_toast(&title, style, message.as_deref());
                UiResponse::Ack
            }
            UiRequest::HideToast => {
                self.toast.clear();
                UiResponse::Ack
            }
            UiRequest::CloseMainWindow {
                pop_to_root,
                clear_root_search,
            } => {
                self.navigation.handle().close_window(CloseWindowOptions {
                    pop_to_root,
                    clear_root_search,
                });
                UiResponse::Ack
            }
            UiRequest::ShowHud { text } => {
                self.navigation.handle().close_window(CloseWindowOptions::default());
                self.navigation.handle().show_hud(&text);
                UiResponse::Ack
            }
            UiRequest::ConfirmAlert {
                title,
                description,
                primary_title,
                dismiss_title,
            } => {
                return Ok(RouteOutcome::Deferred(self.confirm_alert(AlertOptions {
                    title,
                    description,
                    primary_title,
                    dismiss_title,
                })));
            }
        };

        RouteOutcome::immediate(ResponsePayload::Ui(response))
    }

    fn confirm_alert(&self, alert: AlertOptions) -> RouteFuture {
        let handle = self.navigation.handle().clone();
        Box::pin(async move {
            let confirmed = handle.confirm_alert(alert).await;
            Ok(ResponsePayload::Ui(UiResponse::ConfirmAlert { confirmed }))
        })
    }
}
