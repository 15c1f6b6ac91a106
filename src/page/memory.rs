use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Fragment, HostPage, NodeId};
use crate::error::{Result, YtotError};
use crate::ui::UiState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedFragment {
    pub node: NodeId,
    pub parent: NodeId,
    pub fragment: Fragment,
}

#[derive(Debug, Default)]
struct Inner {
    url: String,
    next_id: NodeId,
    selectors: HashMap<String, NodeId>,
    failing_selectors: HashSet<String>,
    closest: HashMap<(NodeId, String), NodeId>,
    parents: HashMap<NodeId, NodeId>,
    texts: HashMap<NodeId, String>,
    mounted: BTreeMap<NodeId, MountedFragment>,
    hidden: BTreeSet<NodeId>,
    max_hidden: usize,
    hide_log: Vec<(NodeId, bool)>,
    messages: Vec<(String, String)>,
    query_counts: HashMap<String, usize>,
    controls: Option<NodeId>,
    renders: Vec<UiState>,
    fail_post: bool,
    fail_mount: bool,
}

impl Inner {
    fn alloc(&mut self) -> NodeId {
        self.next_id += 1;
        self.next_id
    }
}

/// Scripted in-memory page.
///
/// Selectors are matched literally: a node is found by exactly the selector
/// it was registered under. Every mutation the controller makes is recorded
/// for inspection. Clones share the same page.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        let page = Self::default();
        page.state().url = url.into();
        page
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a detached node reachable only through ancestry links
    pub fn add_node(&self) -> NodeId {
        self.state().alloc()
    }

    /// Create a node matched by `selector`
    pub fn add(&self, selector: &str) -> NodeId {
        let mut state = self.state();
        let node = state.alloc();
        state.selectors.insert(selector.to_string(), node);
        node
    }

    pub fn remove_selector(&self, selector: &str) {
        self.state().selectors.remove(selector);
    }

    /// Queries for `selector` return an error instead of a result
    pub fn fail_queries(&self, selector: &str) {
        self.state().failing_selectors.insert(selector.to_string());
    }

    pub fn set_closest(&self, node: NodeId, selector: &str, ancestor: NodeId) {
        self.state()
            .closest
            .insert((node, selector.to_string()), ancestor);
    }

    pub fn set_parent(&self, child: NodeId, parent: NodeId) {
        self.state().parents.insert(child, parent);
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        self.state().texts.insert(node, text.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.state().url = url.to_string();
    }

    pub fn fail_post(&self, fail: bool) {
        self.state().fail_post = fail;
    }

    pub fn fail_mount(&self, fail: bool) {
        self.state().fail_mount = fail;
    }

    pub fn mounted(&self) -> Vec<MountedFragment> {
        self.state().mounted.values().cloned().collect()
    }

    pub fn hidden(&self) -> Vec<NodeId> {
        self.state().hidden.iter().copied().collect()
    }

    /// Most native nodes ever hidden at the same time
    pub fn max_hidden(&self) -> usize {
        self.state().max_hidden
    }

    /// `(node, hidden)` in the order the controller toggled them
    pub fn hide_log(&self) -> Vec<(NodeId, bool)> {
        self.state().hide_log.clone()
    }

    /// `(frame_id, payload)` in posting order
    pub fn messages(&self) -> Vec<(String, String)> {
        self.state().messages.clone()
    }

    pub fn query_count(&self, selector: &str) -> usize {
        self.state().query_counts.get(selector).copied().unwrap_or(0)
    }

    pub fn controls_anchor(&self) -> Option<NodeId> {
        self.state().controls
    }

    pub fn last_render(&self) -> Option<UiState> {
        self.state().renders.last().cloned()
    }

    pub fn render_count(&self) -> usize {
        self.state().renders.len()
    }
}

#[async_trait]
impl HostPage for MemoryPage {
    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        let mut state = self.state();
        *state.query_counts.entry(selector.to_string()).or_default() += 1;
        if state.failing_selectors.contains(selector) {
            return Err(YtotError::Page(format!("invalid selector: {}", selector)));
        }
        Ok(state.selectors.get(selector).copied())
    }

    async fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self
            .state()
            .closest
            .get(&(node, selector.to_string()))
            .copied())
    }

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.state().parents.get(&node).copied())
    }

    async fn text(&self, node: NodeId) -> Result<Option<String>> {
        Ok(self.state().texts.get(&node).cloned())
    }

    async fn mount(&self, parent: NodeId, fragment: &Fragment) -> Result<NodeId> {
        let mut state = self.state();
        if state.fail_mount {
            return Err(YtotError::Page("mount rejected".to_string()));
        }
        let node = state.alloc();
        state.mounted.insert(
            node,
            MountedFragment {
                node,
                parent,
                fragment: fragment.clone(),
            },
        );
        Ok(node)
    }

    async fn unmount(&self, node: NodeId) -> Result<()> {
        self.state().mounted.remove(&node);
        Ok(())
    }

    async fn hide_native(&self, node: NodeId) -> Result<()> {
        let mut state = self.state();
        state.hidden.insert(node);
        state.max_hidden = state.max_hidden.max(state.hidden.len());
        state.hide_log.push((node, true));
        Ok(())
    }

    async fn restore_native(&self, node: NodeId) -> Result<()> {
        let mut state = self.state();
        state.hidden.remove(&node);
        state.hide_log.push((node, false));
        Ok(())
    }

    async fn post_message(&self, frame_id: &str, payload: &str) -> Result<()> {
        let mut state = self.state();
        let reachable = !state.fail_post
            && state
                .mounted
                .values()
                .any(|m| m.fragment.frame_id == frame_id);
        if !reachable {
            return Err(YtotError::Page(format!("frame {} is not reachable", frame_id)));
        }
        state
            .messages
            .push((frame_id.to_string(), payload.to_string()));
        Ok(())
    }

    async fn install_controls(&self, anchor: NodeId) -> Result<()> {
        self.state().controls.get_or_insert(anchor);
        Ok(())
    }

    async fn render(&self, ui: &UiState) -> Result<()> {
        self.state().renders.push(ui.clone());
        Ok(())
    }
}
