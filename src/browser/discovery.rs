use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, YtotError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserType {
    Chrome,
    Brave,
    Edge,
    Chromium,
}

impl BrowserType {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "Google Chrome",
            BrowserType::Brave => "Brave",
            BrowserType::Edge => "Microsoft Edge",
            BrowserType::Chromium => "Chromium",
        }
    }

    /// Executable names looked up on `PATH`
    fn binaries(&self) -> &'static [&'static str] {
        match self {
            BrowserType::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            BrowserType::Brave => &["brave-browser", "brave"],
            BrowserType::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
            BrowserType::Chromium => &["chromium", "chromium-browser"],
        }
    }
}

const PRIORITY: [BrowserType; 4] = [
    BrowserType::Chrome,
    BrowserType::Brave,
    BrowserType::Edge,
    BrowserType::Chromium,
];

#[derive(Debug, Clone)]
pub struct BrowserInfo {
    pub browser_type: BrowserType,
    pub path: PathBuf,
    pub version: Option<String>,
}

impl BrowserInfo {
    pub fn new(browser_type: BrowserType, path: PathBuf) -> Self {
        Self {
            browser_type,
            path,
            version: None,
        }
    }

    pub fn with_version(mut self) -> Self {
        self.version = detect_version(&self.path);
        self
    }
}

/// The configured executable, or the best browser found on the system
pub fn resolve_browser(executable: Option<&str>) -> Result<BrowserInfo> {
    match executable {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(path).to_string());
            if !path.exists() {
                return Err(YtotError::BrowserLaunchFailed(format!(
                    "Browser not found at: {}",
                    path.display()
                )));
            }
            // Any Chromium derivative speaks CDP the same way
            Ok(BrowserInfo::new(BrowserType::Chromium, path))
        }
        None => discover_all_browsers()
            .into_iter()
            .next()
            .ok_or(YtotError::BrowserNotFound),
    }
}

/// Every installed browser, highest priority first
pub fn discover_all_browsers() -> Vec<BrowserInfo> {
    PRIORITY
        .iter()
        .filter_map(|browser_type| {
            known_locations(*browser_type)
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
                .or_else(|| {
                    browser_type
                        .binaries()
                        .iter()
                        .find_map(|name| which::which(name).ok())
                })
                .map(|path| BrowserInfo::new(*browser_type, path).with_version())
        })
        .collect()
}

fn known_locations(browser_type: BrowserType) -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        match browser_type {
            BrowserType::Chrome => {
                &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
            }
            BrowserType::Brave => {
                &["/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"]
            }
            BrowserType::Edge => {
                &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
            }
            BrowserType::Chromium => &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
        }
    }

    #[cfg(target_os = "linux")]
    {
        match browser_type {
            BrowserType::Chrome => &["/usr/bin/google-chrome", "/usr/bin/google-chrome-stable"],
            BrowserType::Brave => &["/usr/bin/brave-browser", "/usr/bin/brave"],
            BrowserType::Edge => &["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
            BrowserType::Chromium => &[
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
            ],
        }
    }

    #[cfg(target_os = "windows")]
    {
        match browser_type {
            BrowserType::Chrome => &[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ],
            BrowserType::Brave => {
                &[r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe"]
            }
            BrowserType::Edge => &[
                r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            ],
            BrowserType::Chromium => &[],
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = browser_type;
        &[]
    }
}

/// "Google Chrome 120.0.6099.109" -> "120.0.6099.109"
fn detect_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version(&stdout)
}

fn parse_version(output: &str) -> Option<String> {
    let output = output.trim();
    if output.is_empty() {
        return None;
    }
    let version = output.rsplit(' ').next().unwrap_or(output);
    Some(version.to_string())
}
