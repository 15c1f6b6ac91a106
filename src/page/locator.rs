use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::{HostPage, NodeId};
use crate::error::Result;

/// What the controller needs to find on the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Twitch top navigation exists (page finished its first render)
    NavPresence,
    /// Where the Twitch toolbar button goes
    NavRoot,
    /// Twitch player container
    PlayerRoot,
    /// Native `<video>` hidden while a foreign player is shown
    NativePlayer,
    /// YouTube live chat (page is a livestream)
    ChatRoot,
    /// YouTube channel name link
    ChannelName,
    /// Document body, host of floating panels
    PanelRoot,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::NavPresence => "nav presence",
            Requirement::NavRoot => "nav root",
            Requirement::PlayerRoot => "player root",
            Requirement::NativePlayer => "native player",
            Requirement::ChatRoot => "chat root",
            Requirement::ChannelName => "channel name",
            Requirement::PanelRoot => "panel root",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of finding a node. Probes are read-only.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    async fn probe(&self, page: &dyn HostPage) -> Result<Option<NodeId>>;
}

/// Plain `querySelector`
#[derive(Debug, Clone)]
pub struct Css(pub String);

impl Css {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }
}

#[async_trait]
impl Probe for Css {
    async fn probe(&self, page: &dyn HostPage) -> Result<Option<NodeId>> {
        page.query(&self.0).await
    }
}

/// Find `anchor`, climb to its closest `closest` ancestor, then `parents`
/// more levels up.
#[derive(Debug, Clone)]
pub struct AncestorOf {
    pub anchor: String,
    pub closest: String,
    pub parents: usize,
}

#[async_trait]
impl Probe for AncestorOf {
    async fn probe(&self, page: &dyn HostPage) -> Result<Option<NodeId>> {
        let Some(anchor) = page.query(&self.anchor).await? else {
            return Ok(None);
        };
        let Some(mut node) = page.closest(anchor, &self.closest).await? else {
            return Ok(None);
        };
        for _ in 0..self.parents {
            match page.parent(node).await? {
                Some(parent) => node = parent,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountPoint {
    pub requirement: Requirement,
    pub node: NodeId,
    /// Index of the probe that matched
    pub strategy: usize,
}

/// Ordered fallback probes per requirement. First match wins.
#[derive(Debug, Default)]
pub struct Locator {
    strategies: HashMap<Requirement, Vec<Box<dyn Probe>>>,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a probe with the lowest priority so far for `requirement`
    pub fn with(mut self, requirement: Requirement, probe: impl Probe + 'static) -> Self {
        self.strategies
            .entry(requirement)
            .or_default()
            .push(Box::new(probe));
        self
    }

    pub fn with_css(self, requirement: Requirement, selectors: &[&str]) -> Self {
        selectors
            .iter()
            .fold(self, |locator, sel| locator.with(requirement, Css::new(*sel)))
    }

    pub fn strategies(&self, requirement: Requirement) -> usize {
        self.strategies.get(&requirement).map_or(0, Vec::len)
    }

    /// Never fails: probe errors count as "not here" and the next probe runs.
    pub async fn locate(&self, page: &dyn HostPage, requirement: Requirement) -> Option<MountPoint> {
        let probes = self.strategies.get(&requirement)?;
        for (strategy, probe) in probes.iter().enumerate() {
            match probe.probe(page).await {
                Ok(Some(node)) => {
                    return Some(MountPoint {
                        requirement,
                        node,
                        strategy,
                    })
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("Probe {:?} for {} failed: {}", probe, requirement, e);
                }
            }
        }
        None
    }
}
