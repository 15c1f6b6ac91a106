use crate::error::InjectionError;
use crate::page::{HostPage, Locator, NodeId};
use crate::platform::HostProfile;

/// The one foreign embedding currently on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub foreign_id: String,
    /// Bumped for every mount; timers carry it to detect staleness
    pub generation: u64,
    pub frame_id: String,
    /// The frame accepts player commands
    pub sync_enabled: bool,
    /// A speed burst is in flight
    pub syncing: bool,
    mount_node: NodeId,
    hidden_native: Option<NodeId>,
}

impl Session {
    pub fn mount_node(&self) -> NodeId {
        self.mount_node
    }

    pub fn hidden_native(&self) -> Option<NodeId> {
        self.hidden_native
    }
}

/// Owns the session slot. At most one session is mounted at any time.
#[derive(Debug, Default)]
pub struct Injector {
    session: Option<Session>,
    generation: u64,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Mount `foreign_id`, replacing any current session.
    ///
    /// The mount point is located first, so a missing one leaves the current
    /// session untouched. The previous session is fully unmounted (its native
    /// element restored) before the new native element is hidden.
    pub async fn inject(
        &mut self,
        page: &dyn HostPage,
        locator: &Locator,
        profile: &HostProfile,
        foreign_id: &str,
    ) -> Result<&Session, InjectionError> {
        let mount = locator
            .locate(page, profile.mount)
            .await
            .ok_or(InjectionError::MountPointMissing(profile.mount))?;

        self.unmount(page).await;

        let hidden_native = match profile.native {
            Some(requirement) => match locator.locate(page, requirement).await {
                Some(native) => {
                    page.hide_native(native.node)
                        .await
                        .map_err(|e| InjectionError::Failed(e.to_string()))?;
                    Some(native.node)
                }
                None => None,
            },
            None => None,
        };

        let fragment = profile.fragment(foreign_id);
        let mount_node = match page.mount(mount.node, &fragment).await {
            Ok(node) => node,
            Err(e) => {
                if let Some(native) = hidden_native {
                    if let Err(restore_err) = page.restore_native(native).await {
                        tracing::warn!("Could not restore native element: {}", restore_err);
                    }
                }
                return Err(InjectionError::Failed(e.to_string()));
            }
        };

        self.generation += 1;
        tracing::info!(
            "{} injected: {} (generation {})",
            profile.foreign_name(),
            foreign_id,
            self.generation
        );

        Ok(&*self.session.insert(Session {
            foreign_id: foreign_id.to_string(),
            generation: self.generation,
            frame_id: fragment.frame_id,
            sync_enabled: profile.syncable,
            syncing: false,
            mount_node,
            hidden_native,
        }))
    }

    /// Remove the foreign fragment and bring the native element back.
    /// Page errors are logged; the slot is cleared regardless.
    pub async fn unmount(&mut self, page: &dyn HostPage) -> Option<Session> {
        let session = self.session.take()?;

        if let Err(e) = page.unmount(session.mount_node).await {
            tracing::warn!("Could not remove foreign fragment: {}", e);
        }
        if let Some(native) = session.hidden_native {
            if let Err(e) = page.restore_native(native).await {
                tracing::warn!("Could not restore native element: {}", e);
            }
        }

        tracing::info!("Removed {} (generation {})", session.foreign_id, session.generation);
        Some(session)
    }
}
