//! The host page as seen by the controller.
//!
//! Everything the controller does to the DOM goes through [`HostPage`]. Nodes
//! are opaque [`NodeId`] handles owned by the adapter.

mod cdp;
mod locator;
mod memory;

pub use cdp::CdpPage;
pub use locator::{AncestorOf, Css, Locator, MountPoint, Probe, Requirement};
pub use memory::{MemoryPage, MountedFragment};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::ui::UiState;

pub type NodeId = u64;

/// How the foreign iframe is placed relative to its mount node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentLayout {
    /// Covers the mount node (player replacement)
    Overlay,
    /// Fixed-position panel floating over the page
    FloatingPanel,
}

/// The foreign UI: a wrapper element holding one iframe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub wrapper_id: String,
    pub frame_id: String,
    pub src: String,
    pub title: String,
    pub layout: FragmentLayout,
}

#[async_trait]
pub trait HostPage: Send + Sync {
    async fn current_url(&self) -> Result<String>;

    /// First element matching a CSS selector
    async fn query(&self, selector: &str) -> Result<Option<NodeId>>;

    /// Nearest ancestor-or-self of `node` matching `selector`
    async fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>>;

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>>;

    async fn text(&self, node: NodeId) -> Result<Option<String>>;

    /// Attach `fragment` under `parent`, returning the wrapper node
    async fn mount(&self, parent: NodeId, fragment: &Fragment) -> Result<NodeId>;

    /// Remove a node created by [`HostPage::mount`]
    async fn unmount(&self, node: NodeId) -> Result<()>;

    /// Hide a native element without removing it (media is paused and muted)
    async fn hide_native(&self, node: NodeId) -> Result<()>;

    /// Undo [`HostPage::hide_native`]
    async fn restore_native(&self, node: NodeId) -> Result<()>;

    /// Post a string message into the iframe with the given id. No reply is
    /// expected; an error means the frame could not be reached.
    async fn post_message(&self, frame_id: &str, payload: &str) -> Result<()>;

    /// Attach the control surface under `anchor`. Idempotent.
    async fn install_controls(&self, anchor: NodeId) -> Result<()>;

    /// Reflect the UI state in the installed controls
    async fn render(&self, ui: &UiState) -> Result<()>;
}
