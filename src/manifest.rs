//! Command manifests
//!
//! Static descriptions of installable commands, loaded from an extension's
//! package description at discovery time and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution mode declared by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandMode {
    /// Produces a navigable screen the UI hydrates from render trees
    View,
    /// Fire-and-forget: runs to completion without a screen
    NoView,
}

/// Environment a command runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandEnv {
    Development,
    Production,
}

/// A preference declared by the command, resolved by the host at launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceDefinition {
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// An argument declared by the command, supplied by the user at launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentDefinition {
    pub name: String,
    pub placeholder: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
}

/// Static description of one installable command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandManifest {
    /// Command identifier, unique within its extension
    pub command_id: String,
    /// Owning extension identifier
    pub extension_id: String,
    /// Extension repository name
    pub extension_name: String,
    /// Extension author or owner
    pub author: String,
    /// Display title
    pub title: String,
    pub mode: CommandMode,
    /// Worker entrypoint, relative to the extension bundle
    pub entrypoint: String,
    /// Icon reference rendered next to the command
    pub icon: String,
    /// Directory holding the extension's bundled assets
    pub asset_path: PathBuf,
    #[serde(default)]
    pub preferences: Vec<PreferenceDefinition>,
    #[serde(default)]
    pub arguments: Vec<ArgumentDefinition>,
    /// Commands shipped disabled until the user opts in
    #[serde(default)]
    pub default_disabled: bool,
}

impl CommandManifest {
    /// Fully-qualified id used to key preference storage
    pub fn unique_id(&self) -> String {
        format!("extension.{}.{}", self.extension_id, self.command_id)
    }
}
