use serde::{Deserialize, Serialize};

/// How `ytot watch` reaches a Chromium instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Browser executable path (overrides auto-discovery)
    pub executable: Option<String>,

    /// CDP port used when launching or attaching to a local browser
    #[serde(default = "default_cdp_port")]
    pub cdp_port: u16,

    /// CDP WebSocket URL (for remote connections)
    pub cdp_url: Option<String>,

    /// User data directory for launched browsers
    pub user_data_dir: Option<String>,

    /// Headless mode
    #[serde(default)]
    pub headless: bool,

    /// Extra browser arguments
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// How often the page URL is polled to detect in-app navigation
    #[serde(default = "default_navigation_poll_ms")]
    pub navigation_poll_ms: u64,
}

fn default_cdp_port() -> u16 {
    9333
}

fn default_navigation_poll_ms() -> u64 {
    500
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            cdp_port: default_cdp_port(),
            cdp_url: None,
            user_data_dir: None,
            headless: false,
            extra_args: Vec::new(),
            navigation_poll_ms: default_navigation_poll_ms(),
        }
    }
}

impl BrowserConfig {
    /// Check if this points at a remote browser
    pub fn is_remote(&self) -> bool {
        self.cdp_url.is_some()
    }

    /// Apply a `--cdp` argument: a bare port or a `ws://` URL
    pub fn apply_cdp_arg(&mut self, cdp: &str) {
        let cdp = cdp.trim();
        match cdp.parse::<u16>() {
            Ok(port) => {
                self.cdp_port = port;
                self.cdp_url = None;
            }
            Err(_) => self.cdp_url = Some(cdp.to_string()),
        }
    }
}
