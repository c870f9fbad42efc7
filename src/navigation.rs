//! Navigation boundary
//!
//! The host UI owns the navigation stack; this core only pushes frames for
//! extension views, surfaces crash screens, and decorates the navigation bar.
//! Rendering itself happens on the other side of [`NavigationHandle`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::manifest::CommandManifest;
use crate::protocol::PopToRootKind;

/// Options for popping the navigation stack back to root
#[derive(Debug, Clone, Copy, Default)]
pub struct PopToRootOptions {
    pub clear_search: bool,
}

/// Options for closing the launcher window
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseWindowOptions {
    pub pop_to_root: PopToRootKind,
    pub clear_root_search: bool,
}

/// Alert presented for `confirmAlert` requests
#[derive(Debug, Clone)]
pub struct AlertOptions {
    pub title: String,
    pub description: String,
    pub primary_title: String,
    pub dismiss_title: String,
}

/// Host-side navigation surface consumed by the runtime and the UI router.
#[async_trait]
pub trait NavigationHandle: Send + Sync {
    /// Push an empty extension view frame for later hydration
    fn push_view(&self);
    /// Push a full-screen error view rendering the given text
    fn push_error_view(&self, text: &str);
    fn pop_view(&self);
    fn pop_to_root(&self, options: PopToRootOptions);
    fn set_navigation_title(&self, text: &str);
    fn set_navigation_icon(&self, icon: &str);
    /// `None` clears the decoration
    fn set_navigation_suffix_icon(&self, icon: Option<&str>);
    fn set_search_text(&self, text: &str);
    fn close_window(&self, options: CloseWindowOptions);
    fn show_hud(&self, text: &str);
    /// Hand a parsed render tree to the view layer for hydration
    fn render(&self, tree: Value);
    /// Present a confirmation dialog; resolves with the user's choice
    async fn confirm_alert(&self, alert: AlertOptions) -> bool;
}

/// Session-scoped view of the navigation stack.
///
/// Wraps the shared [`NavigationHandle`] with the command identity so pushed
/// views get their default title and icon, and keeps a count of the frames
/// this session owns.
pub struct NavigationController {
    handle: Arc<dyn NavigationHandle>,
    manifest: Arc<CommandManifest>,
    views: AtomicUsize,
}

impl NavigationController {
    pub fn new(handle: Arc<dyn NavigationHandle>, manifest: Arc<CommandManifest>) -> Self {
        Self {
            handle,
            manifest,
            views: AtomicUsize::new(0),
        }
    }

    pub fn handle(&self) -> &Arc<dyn NavigationHandle> {
        &self.handle
    }

    /// Push an empty view and apply the command's title and icon
    pub fn push_view(&self) {
        self.handle.push_view();
        self.handle.set_navigation_title(&self.manifest.title);
        self.handle.set_navigation_icon(&self.manifest.icon);
        self.views.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pop_view(&self) {
        if self.views.load(Ordering::Relaxed) > 0 {
            self.handle.pop_view();
            self.views.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn view_count(&self) -> usize {
        self.views.load(Ordering::Relaxed)
    }

    /// Replace the stack with a crash screen for this command
    pub fn show_crash(&self, text: &str) {
        self.handle.pop_to_root(PopToRootOptions::default());
        self.handle.push_error_view(text);
        self.handle
            .set_navigation_title(&format!("{} - Crash handler", self.manifest.title));
        self.handle.set_navigation_icon(&self.manifest.icon);
    }
}

/// Recorded navigation call, for assertions in tests
#[derive(Debug, Clone, PartialEq)]
pub enum NavCall {
    PushView,
    PushErrorView(String),
    PopView,
    PopToRoot { clear_search: bool },
    SetTitle(String),
    SetIcon(String),
    SetSuffixIcon(Option<String>),
    SetSearchText(String),
    CloseWindow,
    ShowHud(String),
    Render(Value),
    ConfirmAlert(String),
}

/// Navigation double that records every call and answers alerts from a preset.
#[derive(Default)]
pub struct RecordingNavigation {
    calls: Mutex<Vec<NavCall>>,
    /// Answer returned by `confirm_alert`
    pub confirm_answer: bool,
}

impl RecordingNavigation {
    pub fn confirming(answer: bool) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            confirm_answer: answer,
        }
    }

    pub fn calls(&self) -> Vec<NavCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: NavCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NavigationHandle for RecordingNavigation {
    fn push_view(&self) {
        self.record(NavCall::PushView);
    }

    fn push_error_view(&self, text: &str) {
        self.record(NavCall::PushErrorView(text.to_string()));
    }

    fn pop_view(&self) {
        self.record(NavCall::PopView);
    }

    fn pop_to_root(&self, options: PopToRootOptions) {
        self.record(NavCall::PopToRoot {
            clear_search: options.clear_search,
        });
    }

    fn set_navigation_title(&self, text: &str) {
        self.record(NavCall::SetTitle(text.to_string()));
    }

    fn set_navigation_icon(&self, icon: &str) {
        self.record(NavCall::SetIcon(icon.to_string()));
    }

    fn set_navigation_suffix_icon(&self, icon: Option<&str>) {
        self.record(NavCall::SetSuffixIcon(icon.map(str::to_string)));
    }

    fn set_search_text(&self, text: &str) {
        self.record(NavCall::SetSearchText(text.to_string()));
    }

    fn close_window(&self, _options: CloseWindowOptions) {
        self.record(NavCall::CloseWindow);
    }

    fn show_hud(&self, text: &str) {
        self.record(NavCall::ShowHud(text.to_string()));
    }

    fn render(&self, tree: Value) {
        self.record(NavCall::Render(tree));
    }

    async fn confirm_alert(&self, alert: AlertOptions) -> bool {
        self.record(NavCall::ConfirmAlert(alert.title));
        self.confirm_answer
    }
}
