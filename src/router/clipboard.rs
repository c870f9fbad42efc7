//! Clipboard request router
//!
//! Paste is copy plus a forwarded paste keystroke to the window that had
//! focus before the launcher opened.

use std::sync::Arc;

use super::RouteOutcome;
use crate::error::DomainError;
use crate::protocol::{ClipboardRequest, ClipboardResponse, ResponsePayload};
use crate::services::{ClipboardService, CopyOptions, WindowManagerService};

pub struct ClipboardRouter {
    clipboard: Arc<dyn ClipboardService>,
    window_manager: Arc<dyn WindowManagerService>,
}

impl ClipboardRouter {
    pub fn new(
        clipboard: Arc<dyn ClipboardService>,
        window_manager: Arc<dyn WindowManagerService>,
    ) -> Self {
        Self {
            clipboard,
            window_manager,
        }
    }

    pub async fn route(&self, req: ClipboardRequest) -> Result<RouteOutcome, DomainError> {
        let response = match req {
            ClipboardRequest::Copy { content, concealed } => {
                self.clipboard
                    .copy_content(content, CopyOptions { concealed })
                    .await;
                ClipboardResponse::Ack
            }
            ClipboardRequest::Paste { content } => {
                self.clipboard
                    .copy_content(content, CopyOptions::default())
                    .await;
                self.window_manager.paste_to_focused_window();
                ClipboardResponse::Ack
            }
            ClipboardRequest::ReadContent => ClipboardResponse::Content {
                content: self.clipboard.read_content().await,
            },
            ClipboardRequest::Clear => {
                self.clipboard.clear().await;
                ClipboardResponse::Ack
            }
        };

        RouteOutcome::immediate(ResponsePayload::Clipboard(response))
    }
}
