use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;

use super::discovery::{resolve_browser, BrowserInfo};
use crate::config::BrowserConfig;
use crate::error::{Result, YtotError};

/// Starts a Chromium-family browser with remote debugging enabled
pub struct BrowserLauncher {
    browser_info: BrowserInfo,
    cdp_port: u16,
    headless: bool,
    user_data_dir: PathBuf,
    extra_args: Vec<String>,
}

impl BrowserLauncher {
    pub fn from_config(config: &BrowserConfig) -> Result<Self> {
        let browser_info = resolve_browser(config.executable.as_deref())?;
        let user_data_dir = match config.user_data_dir.as_deref() {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).to_string()),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ytot")
                .join("browser-profile"),
        };

        Ok(Self {
            browser_info,
            cdp_port: config.cdp_port,
            headless: config.headless,
            user_data_dir,
            extra_args: config.extra_args.clone(),
        })
    }

    pub fn browser_info(&self) -> &BrowserInfo {
        &self.browser_info
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.cdp_port),
            format!("--user-data-dir={}", self.user_data_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            // Embedded players must start without a click
            "--autoplay-policy=no-user-gesture-required".to_string(),
        ];

        if self.headless {
            args.push("--headless=new".to_string());
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn launch(&self) -> Result<Child> {
        std::fs::create_dir_all(&self.user_data_dir)?;

        let args = self.build_args();
        tracing::debug!(
            "Launching browser: {:?} with args: {:?}",
            self.browser_info.path,
            args
        );

        Command::new(&self.browser_info.path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                YtotError::BrowserLaunchFailed(format!(
                    "Failed to launch {}: {}",
                    self.browser_info.browser_type.name(),
                    e
                ))
            })
    }

    /// Launch and wait until the CDP endpoint answers
    pub async fn launch_and_wait(&self) -> Result<(Child, String)> {
        let child = self.launch()?;

        for attempt in 1..=20 {
            sleep(Duration::from_millis(500)).await;
            match cdp_websocket_url(self.cdp_port).await {
                Ok(ws_url) => {
                    tracing::info!("CDP ready at: {}", ws_url);
                    return Ok((child, ws_url));
                }
                Err(e) => tracing::debug!("CDP not ready yet (attempt {}): {}", attempt, e),
            }
        }

        Err(YtotError::CdpConnectionFailed(
            "Timeout waiting for CDP to be ready".to_string(),
        ))
    }
}

/// Ask a local browser for its browser-level WebSocket URL
pub async fn cdp_websocket_url(port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{}/json/version", port);

    // Localhost must never go through a proxy
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let response = client.get(&url).send().await.map_err(|e| {
        YtotError::CdpConnectionFailed(format!("Failed to connect to CDP: {}", e))
    })?;

    if !response.status().is_success() {
        return Err(YtotError::CdpConnectionFailed(format!(
            "CDP endpoint answered {}",
            response.status()
        )));
    }

    let json: serde_json::Value = response.json().await.map_err(|e| {
        YtotError::CdpConnectionFailed(format!("Failed to parse CDP response: {}", e))
    })?;

    json.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            YtotError::CdpConnectionFailed("No WebSocket URL in CDP response".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::discovery::BrowserType;

    fn launcher(headless: bool) -> BrowserLauncher {
        BrowserLauncher {
            browser_info: BrowserInfo::new(BrowserType::Chromium, PathBuf::from("chromium")),
            cdp_port: 9333,
            headless,
            user_data_dir: PathBuf::from("/tmp/ytot-profile"),
            extra_args: vec!["--mute-audio".to_string()],
        }
    }

    #[test]
    fn args_enable_debugging_and_autoplay() {
        let args = launcher(false).build_args();

        assert_eq!(args[0], "--remote-debugging-port=9333");
        assert!(args.contains(&"--user-data-dir=/tmp/ytot-profile".to_string()));
        assert!(args.contains(&"--autoplay-policy=no-user-gesture-required".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert_eq!(args.last().map(String::as_str), Some("--mute-audio"));
    }

    #[test]
    fn headless_flag_uses_new_mode() {
        assert!(launcher(true)
            .build_args()
            .contains(&"--headless=new".to_string()));
    }
}
