//! The per-page controller.
//!
//! One [`Controller`] owns everything that happens on a page: the detection
//! loop, the session slot, the sync driver, the association store and the UI
//! snapshot. Events and due timers are handled one at a time, so state never
//! needs locking. Every timer carries the token that was current when it was
//! scheduled and is dropped if that token has moved on.

pub mod detection;
pub mod injection;
pub mod scheduler;
pub mod sync;

pub use detection::{DetectionLoop, DetectionState, Step};
pub use injection::{Injector, Session};
pub use scheduler::{Scheduler, Timer};
pub use sync::{PlayerCommand, SyncDriver};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::{Config, DetectionConfig, SyncConfig};
use crate::error::InjectionError;
use crate::page::{HostPage, Locator};
use crate::platform::{self, HostProfile, IdentitySource, Platform};
use crate::store::{ChannelStore, KvStore};
use crate::ui::{StatusKind, UiState};

/// Input to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The page URL changed (in-app navigation or reload)
    Navigated(String),
    Command(UserCommand),
    Shutdown,
}

/// What the user can do through the controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// "Go" / "Connect" with whatever was typed
    Submit(String),
    SyncNow,
    SetAutoSync(bool),
    /// Unmount and bring the native content back
    Restore,
}

pub struct Controller<P, S> {
    page: P,
    profile: HostProfile,
    locator: Locator,
    store: ChannelStore<S>,
    detection: DetectionLoop,
    injector: Injector,
    sync: SyncDriver,
    scheduler: Scheduler,
    detection_config: DetectionConfig,
    sync_config: SyncConfig,
    ui: UiState,
    url: String,
    local_id: Option<String>,
    prefs_loaded: bool,
    status_stamp: u64,
}

impl<P: HostPage, S: KvStore> Controller<P, S> {
    pub fn new(page: P, store: S, platform: Platform, config: &Config) -> Self {
        let profile = platform.profile();
        let store = ChannelStore::new(store, profile.key_prefix);
        let ui = UiState {
            foreign_name: profile.foreign_name().to_string(),
            ..UiState::default()
        };

        Self {
            page,
            locator: platform.locator(),
            profile,
            store,
            detection: DetectionLoop::new(&config.detection),
            injector: Injector::new(),
            sync: SyncDriver::new(&config.sync),
            scheduler: Scheduler::new(Instant::now()),
            detection_config: config.detection.clone(),
            sync_config: config.sync.clone(),
            ui,
            url: String::new(),
            local_id: None,
            prefs_loaded: false,
            status_stamp: 0,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn session(&self) -> Option<&Session> {
        self.injector.session()
    }

    pub fn detection(&self) -> &DetectionLoop {
        &self.detection
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_identity(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    pub fn auto_sync_running(&self) -> bool {
        self.sync.auto_running()
    }

    /// Page loaded: schedule the first probe.
    pub fn start(&mut self, url: impl Into<String>) {
        self.scheduler.observe(Instant::now());
        self.url = url.into();
        let epoch = self.detection.reset();
        self.scheduler
            .schedule(self.detection_config.initial_delay(), Timer::Probe { epoch });
        tracing::debug!("Detection started on {} (epoch {})", self.url, epoch);
    }

    /// Handle one event. Returns `false` once the controller has shut down.
    pub async fn handle(&mut self, event: Event) -> bool {
        self.scheduler.observe(Instant::now());

        let running = match event {
            Event::Navigated(url) => {
                self.navigated(url).await;
                true
            }
            Event::Command(command) => {
                self.command(command).await;
                true
            }
            Event::Shutdown => {
                self.teardown().await;
                false
            }
        };

        self.render().await;
        running
    }

    /// Fire every timer due by now, in due order.
    pub async fn run_due(&mut self) {
        let now = Instant::now();
        while let Some(timer) = self.scheduler.pop_due(now) {
            self.fire(timer).await;
            self.render().await;
        }
        self.scheduler.observe(now);
    }

    /// Drive the controller until `Shutdown` or until every sender is gone.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) -> Self {
        loop {
            self.run_due().await;
            let next = self.scheduler.next_due();

            tokio::select! {
                event = events.recv() => {
                    let event = event.unwrap_or(Event::Shutdown);
                    if !self.handle(event).await {
                        break;
                    }
                }
                _ = wait_until(next) => {}
            }
        }
        tracing::debug!("Controller stopped");
        self
    }

    async fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::Probe { epoch } => self.probe(epoch).await,
            Timer::BurstEnd { session } => self.burst_end(session).await,
            Timer::ClearStatus { stamp } => self.clear_status(stamp),
            Timer::AutoSync { generation } => self.auto_tick(generation).await,
        }
    }

    async fn command(&mut self, command: UserCommand) {
        if !self.accepts_commands() {
            tracing::warn!("Controls are not active on this page, ignoring {:?}", command);
            return;
        }

        match command {
            UserCommand::Submit(input) => self.submit(&input).await,
            UserCommand::SyncNow => self.sync_now().await,
            UserCommand::SetAutoSync(enabled) => self.set_auto_sync(enabled).await,
            UserCommand::Restore => self.teardown().await,
        }
    }

    /// Only once detection has settled on the current page. Until then the
    /// local identity is unknown and activation may still restore a session.
    fn accepts_commands(&self) -> bool {
        self.ui.controls_installed && self.detection.state() == DetectionState::Found
    }

    // Detection

    async fn navigated(&mut self, url: String) {
        if url == self.url {
            return;
        }
        tracing::info!("Navigated to {}", url);

        self.teardown().await;
        self.url = url;
        self.local_id = None;
        self.ui.suggestion = None;

        let epoch = self.detection.reset();
        self.scheduler
            .schedule(self.detection_config.settle_delay(), Timer::Probe { epoch });
    }

    async fn probe(&mut self, epoch: u64) {
        if epoch != self.detection.epoch() {
            tracing::debug!("Ignoring probe from epoch {}", epoch);
            return;
        }

        let found = self
            .locator
            .locate(&self.page, self.profile.precondition)
            .await
            .is_some();

        match self.detection.observe(epoch, found) {
            Step::Proceed => self.activate().await,
            Step::Retry(delay) => {
                tracing::debug!(
                    "{} not found, retry {} in {:?}",
                    self.profile.precondition,
                    self.detection.attempts(),
                    delay
                );
                self.scheduler.schedule(delay, Timer::Probe { epoch });
            }
            Step::GiveUp => {
                tracing::debug!(
                    "Giving up on {} after {} retries",
                    self.profile.precondition,
                    self.detection.attempts()
                );
            }
            Step::Stale => tracing::debug!("Ignoring probe result for epoch {}", epoch),
        }
    }

    async fn activate(&mut self) {
        let Some(anchor) = self.locator.locate(&self.page, self.profile.controls).await else {
            tracing::debug!("No {} on this page, staying inactive", self.profile.controls);
            return;
        };
        if let Err(e) = self.page.install_controls(anchor.node).await {
            tracing::warn!("Could not install controls: {}", e);
            return;
        }
        self.ui.controls_installed = true;

        if !self.prefs_loaded {
            self.ui.auto_sync = self.store.auto_sync().await;
            self.prefs_loaded = true;
        }

        self.local_id = self.derive_local_identity().await;
        let Some(local_id) = self.local_id.clone() else {
            tracing::debug!("No local channel identity on {}", self.url);
            return;
        };

        match self.store.recall(&local_id).await {
            Some(foreign_id) => {
                tracing::info!("Restoring {} for {}", foreign_id, local_id);
                self.inject(&foreign_id).await;
            }
            None => self.ui.suggestion = Some(local_id),
        }
    }

    async fn derive_local_identity(&self) -> Option<String> {
        match self.profile.identity {
            IdentitySource::PathSegment => platform::channel_from_url(&self.url),
            IdentitySource::ElementText(requirement) => {
                let found = self.locator.locate(&self.page, requirement).await?;
                match self.page.text(found.node).await {
                    Ok(text) => platform::normalize_identity(&text?),
                    Err(e) => {
                        tracing::debug!("Could not read {}: {}", requirement, e);
                        None
                    }
                }
            }
        }
    }

    // Injection

    async fn submit(&mut self, input: &str) {
        match self.profile.parse_foreign(input) {
            Some(foreign_id) => self.inject(&foreign_id).await,
            None => {
                let message = self.profile.invalid_input_message();
                self.set_status(message, StatusKind::Error);
            }
        }
    }

    async fn inject(&mut self, foreign_id: &str) {
        let result = self
            .injector
            .inject(&self.page, &self.locator, &self.profile, foreign_id)
            .await
            .map(|session| session.foreign_id.clone());

        match result {
            Ok(foreign_id) => {
                // A replaced session takes its auto-sync timer with it
                self.stop_auto_sync();
                self.ui.active = true;
                self.ui.foreign_id = Some(foreign_id.clone());
                self.ui.suggestion = None;
                self.set_status(self.profile.mounted_message(), StatusKind::Success);

                if let Some(local_id) = &self.local_id {
                    self.store.remember(local_id, &foreign_id).await;
                }
                if self.ui.auto_sync {
                    self.start_auto_sync();
                }
            }
            Err(InjectionError::MountPointMissing(requirement)) => {
                tracing::warn!("Cannot inject {}: {} missing", foreign_id, requirement);
                self.set_status(self.profile.mount_missing_message(), StatusKind::Error);
            }
            Err(e) => {
                tracing::warn!("Cannot inject {}: {}", foreign_id, e);
                if !self.injector.is_mounted() {
                    self.stop_auto_sync();
                    self.ui.active = false;
                    self.ui.foreign_id = None;
                }
                self.set_status(e.to_string(), StatusKind::Error);
            }
        }
    }

    /// Unmount, stop syncing and reset the session part of the UI.
    async fn teardown(&mut self) {
        self.stop_auto_sync();
        if self.injector.unmount(&self.page).await.is_some() {
            self.ui.active = false;
            self.ui.foreign_id = None;
            self.clear_status_now();
        }
    }

    // Sync

    async fn sync_now(&mut self) {
        let Some(session) = self.injector.session_mut() else {
            return;
        };

        match self.sync.begin_burst(&self.page, session).await {
            Ok(true) => {
                let generation = session.generation;
                self.set_status("⚡ Syncing...", StatusKind::Syncing);
                self.scheduler.schedule(
                    self.sync_config.burst(),
                    Timer::BurstEnd {
                        session: generation,
                    },
                );
            }
            Ok(false) => tracing::debug!("Sync skipped"),
            Err(e) => {
                tracing::warn!("{}", e);
                self.set_status("Sync failed", StatusKind::Error);
            }
        }
    }

    async fn burst_end(&mut self, generation: u64) {
        let Some(session) = self
            .injector
            .session_mut()
            .filter(|s| s.generation == generation && s.syncing)
        else {
            tracing::debug!("Ignoring burst end for session {}", generation);
            return;
        };

        match self.sync.end_burst(&self.page, session).await {
            Ok(()) => {
                let stamp = self.set_status("✓ Synced", StatusKind::Success);
                self.scheduler
                    .schedule(self.sync_config.status_clear(), Timer::ClearStatus { stamp });
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.set_status("Sync failed", StatusKind::Error);
            }
        }
    }

    async fn set_auto_sync(&mut self, enabled: bool) {
        self.ui.auto_sync = enabled;
        self.store.set_auto_sync(enabled).await;

        if enabled && self.injector.is_mounted() {
            self.start_auto_sync();
        } else {
            self.stop_auto_sync();
        }
    }

    fn start_auto_sync(&mut self) {
        if !self.profile.syncable {
            return;
        }
        if let Some(generation) = self.sync.start_auto() {
            self.scheduler
                .schedule(self.sync_config.interval(), Timer::AutoSync { generation });
            tracing::info!("Auto-sync started");
        }
    }

    fn stop_auto_sync(&mut self) {
        if self.sync.stop_auto() {
            tracing::info!("Auto-sync stopped");
        }
        self.scheduler
            .cancel(|timer| matches!(timer, Timer::AutoSync { .. }));
    }

    async fn auto_tick(&mut self, generation: u64) {
        if !self.sync.is_current(generation) {
            tracing::debug!("Ignoring auto-sync tick from generation {}", generation);
            return;
        }
        self.scheduler
            .schedule(self.sync_config.interval(), Timer::AutoSync { generation });

        let idle = self.injector.session().is_some_and(|s| !s.syncing);
        if idle {
            self.sync_now().await;
        }
    }

    // Status

    fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) -> u64 {
        self.status_stamp += 1;
        self.ui.set_status(message, kind);
        self.status_stamp
    }

    fn clear_status_now(&mut self) {
        self.status_stamp += 1;
        self.ui.clear_status();
    }

    fn clear_status(&mut self, stamp: u64) {
        let syncing = self.injector.session().is_some_and(|s| s.syncing);
        if stamp == self.status_stamp && !syncing {
            self.clear_status_now();
        }
    }

    async fn render(&self) {
        if !self.ui.controls_installed {
            return;
        }
        if let Err(e) = self.page.render(&self.ui).await {
            tracing::debug!("Render failed: {}", e);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
