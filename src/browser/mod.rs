//! Reaching a Chromium instance over CDP.

mod discovery;
mod launcher;

pub use discovery::{discover_all_browsers, resolve_browser, BrowserInfo, BrowserType};
pub use launcher::{cdp_websocket_url, BrowserLauncher};

use std::process::Child;

use chromiumoxide::browser::Browser;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::config::BrowserConfig;
use crate::error::{Result, YtotError};

/// A live CDP connection. A browser launched by us is killed on drop.
pub struct BrowserConnection {
    browser: Browser,
    handler: JoinHandle<()>,
    child: Option<Child>,
}

impl BrowserConnection {
    /// Attach to a remote or already running browser, launching one when
    /// nothing answers on the configured port.
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let (ws_url, child) = match &config.cdp_url {
            Some(url) => (url.clone(), None),
            None => match cdp_websocket_url(config.cdp_port).await {
                Ok(url) => {
                    tracing::info!("Attaching to browser on port {}", config.cdp_port);
                    (url, None)
                }
                Err(_) => {
                    let launcher = BrowserLauncher::from_config(config)?;
                    tracing::info!("Launching {}", launcher.browser_info().browser_type.name());
                    let (child, url) = launcher.launch_and_wait().await?;
                    (url, Some(child))
                }
            },
        };

        let (browser, mut handler) = Browser::connect(&ws_url).await.map_err(|e| {
            YtotError::CdpConnectionFailed(format!("Failed to connect to browser: {}", e))
        })?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler,
            child,
        })
    }

    pub async fn open(&self, url: &str) -> Result<Page> {
        self.browser
            .new_page(url)
            .await
            .map_err(|e| YtotError::Page(format!("Failed to open {}: {}", url, e)))
    }

    /// The browser was started by this connection rather than attached to
    pub fn launched(&self) -> bool {
        self.child.is_some()
    }

    pub async fn close(mut self) {
        if self.launched() {
            if let Err(e) = self.browser.close().await {
                tracing::debug!("Browser close failed: {}", e);
            }
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.handler.abort();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for BrowserConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}
