//! Open-loop speed-burst sync.
//!
//! The embedded player's position cannot be read, so catching up is
//! approximated: push a faster playback rate, wait a fixed time, push the
//! normal rate back. Nothing is acknowledged; success is assumed once the
//! second command went out.

use serde::Serialize;

use super::injection::Session;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::page::HostPage;

/// YouTube iframe API command envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCommand {
    pub event: &'static str,
    pub func: &'static str,
    pub args: Vec<serde_json::Value>,
}

impl PlayerCommand {
    pub fn set_playback_rate(rate: f64) -> Self {
        Self {
            event: "command",
            func: "setPlaybackRate",
            args: vec![serde_json::json!(rate)],
        }
    }

    pub fn to_message(&self) -> String {
        // A struct of strings and numbers always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct SyncDriver {
    burst_rate: f64,
    normal_rate: f64,
    auto_generation: u64,
    auto_running: bool,
}

impl SyncDriver {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            burst_rate: config.burst_rate,
            normal_rate: config.normal_rate,
            auto_generation: 0,
            auto_running: false,
        }
    }

    /// Push the burst rate. Returns `Ok(false)` without sending anything when
    /// the session does not take commands or a burst is already in flight.
    pub async fn begin_burst(
        &self,
        page: &dyn HostPage,
        session: &mut Session,
    ) -> Result<bool, SyncError> {
        if !session.sync_enabled || session.syncing {
            return Ok(false);
        }

        session.syncing = true;
        if let Err(e) = send(page, session, self.burst_rate).await {
            session.syncing = false;
            return Err(e);
        }
        tracing::debug!("Burst started for {}", session.foreign_id);
        Ok(true)
    }

    /// Push the normal rate back. `syncing` is cleared whatever the outcome.
    pub async fn end_burst(
        &self,
        page: &dyn HostPage,
        session: &mut Session,
    ) -> Result<(), SyncError> {
        session.syncing = false;
        send(page, session, self.normal_rate).await?;
        tracing::debug!("Burst finished for {}", session.foreign_id);
        Ok(())
    }

    pub fn auto_running(&self) -> bool {
        self.auto_running
    }

    /// Start the periodic timer. Returns the generation its ticks must carry,
    /// or `None` if it was already running.
    pub fn start_auto(&mut self) -> Option<u64> {
        if self.auto_running {
            return None;
        }
        self.auto_running = true;
        self.auto_generation += 1;
        Some(self.auto_generation)
    }

    /// Stop the periodic timer. Ticks already scheduled become stale.
    pub fn stop_auto(&mut self) -> bool {
        let was_running = self.auto_running;
        self.auto_running = false;
        self.auto_generation += 1;
        was_running
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.auto_running && generation == self.auto_generation
    }
}

async fn send(page: &dyn HostPage, session: &Session, rate: f64) -> Result<(), SyncError> {
    let message = PlayerCommand::set_playback_rate(rate).to_message();
    page.post_message(&session.frame_id, &message)
        .await
        .map_err(|e| SyncError::Dispatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::injection::Injector;
    use crate::page::MemoryPage;
    use crate::platform::Platform;

    async fn mounted(page: &MemoryPage) -> Injector {
        page.add("[data-a-target=\"video-player-layout\"]");
        page.add("video");
        let mut injector = Injector::new();
        injector
            .inject(
                page,
                &Platform::Twitch.locator(),
                &Platform::Twitch.profile(),
                "abc12345678",
            )
            .await
            .unwrap();
        injector
    }

    #[test]
    fn command_envelope_matches_iframe_api() {
        let message = PlayerCommand::set_playback_rate(2.0).to_message();
        let value: serde_json::Value = serde_json::from_str(&message).unwrap();

        assert_eq!(value["event"], "command");
        assert_eq!(value["func"], "setPlaybackRate");
        assert_eq!(value["args"][0].as_f64(), Some(2.0));
    }

    #[tokio::test]
    async fn burst_is_not_reentrant() {
        let page = MemoryPage::new("https://www.twitch.tv/somechannel");
        let mut injector = mounted(&page).await;
        let driver = SyncDriver::new(&SyncConfig::default());
        let session = injector.session_mut().unwrap();

        assert!(driver.begin_burst(&page, session).await.unwrap());
        assert!(session.syncing);
        assert!(!driver.begin_burst(&page, session).await.unwrap());
        assert_eq!(page.messages().len(), 1);

        driver.end_burst(&page, session).await.unwrap();
        assert!(!session.syncing);
        assert_eq!(page.messages().len(), 2);
        assert_eq!(page.messages()[0].0, "ytot-youtube-player");
    }

    #[tokio::test]
    async fn dispatch_failure_resets_syncing() {
        let page = MemoryPage::new("https://www.twitch.tv/somechannel");
        let mut injector = mounted(&page).await;
        page.fail_post(true);
        let driver = SyncDriver::new(&SyncConfig::default());
        let session = injector.session_mut().unwrap();

        let err = driver.begin_burst(&page, session).await.unwrap_err();
        assert!(matches!(err, SyncError::Dispatch(_)));
        assert!(!session.syncing);
    }

    #[test]
    fn auto_generations_go_stale_on_stop() {
        let mut driver = SyncDriver::new(&SyncConfig::default());

        let first = driver.start_auto().unwrap();
        assert!(driver.is_current(first));
        assert_eq!(driver.start_auto(), None);

        assert!(driver.stop_auto());
        assert!(!driver.is_current(first));
        assert!(!driver.stop_auto());

        let second = driver.start_auto().unwrap();
        assert_ne!(first, second);
        assert!(driver.is_current(second));
    }
}
