//! Host platforms and what differs between them: where things live on the
//! page, what gets embedded, and how channels are identified.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::page::{AncestorOf, Fragment, FragmentLayout, Locator, Requirement};

static VIDEO_ID_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/live/)([a-zA-Z0-9_-]{11})")
            .unwrap(),
        Regex::new(r"youtube\.com/embed/([a-zA-Z0-9_-]{11})").unwrap(),
    ]
});

static CHANNEL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([a-zA-Z0-9_]+)").unwrap());

/// The page the controller runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Twitch channel page; a YouTube player is embedded over the Twitch one
    Twitch,
    /// YouTube watch page; Twitch chat is embedded in a floating panel
    YouTube,
}

impl Platform {
    /// Detect the platform from a page URL
    pub fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if matches("twitch.tv") {
            Some(Platform::Twitch)
        } else if matches("youtube.com") {
            Some(Platform::YouTube)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Twitch => "Twitch",
            Platform::YouTube => "YouTube",
        }
    }

    pub fn profile(self) -> HostProfile {
        match self {
            Platform::Twitch => HostProfile {
                platform: self,
                precondition: Requirement::NavPresence,
                controls: Requirement::NavRoot,
                mount: Requirement::PlayerRoot,
                native: Some(Requirement::NativePlayer),
                identity: IdentitySource::PathSegment,
                syncable: true,
                key_prefix: "ytot",
            },
            Platform::YouTube => HostProfile {
                platform: self,
                precondition: Requirement::ChatRoot,
                controls: Requirement::PanelRoot,
                mount: Requirement::PanelRoot,
                native: None,
                identity: IdentitySource::ElementText(Requirement::ChannelName),
                syncable: false,
                key_prefix: "tcfy",
            },
        }
    }

    /// Selector fallbacks, highest priority first
    pub fn locator(self) -> Locator {
        match self {
            Platform::Twitch => Locator::new()
                .with_css(Requirement::NavPresence, &[".top-nav__menu"])
                .with_css(Requirement::NavRoot, &[".top-nav__menu > div:first-child"])
                .with(
                    Requirement::NavRoot,
                    AncestorOf {
                        anchor: "button[aria-label=\"More Options\"]".to_string(),
                        closest: "div[class]".to_string(),
                        parents: 1,
                    },
                )
                .with_css(
                    Requirement::PlayerRoot,
                    &[
                        "[data-a-target=\"video-player-layout\"]",
                        ".video-player__container",
                        ".video-player",
                    ],
                )
                .with_css(Requirement::NativePlayer, &["video"]),
            Platform::YouTube => Locator::new()
                .with_css(
                    Requirement::ChatRoot,
                    &["ytd-live-chat-frame#chat", "ytd-live-chat-frame", "#chat-container"],
                )
                .with_css(Requirement::ChannelName, &["ytd-channel-name a", "#channel-name a"])
                .with_css(Requirement::PanelRoot, &["body"]),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the local channel identity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// First URL path segment
    PathSegment,
    /// Text of a located element
    ElementText(Requirement),
}

/// Everything the controller needs to know about one host platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    pub platform: Platform,
    /// Must be present before anything is injected
    pub precondition: Requirement,
    /// Where the controls are attached
    pub controls: Requirement,
    /// Where the foreign fragment is attached
    pub mount: Requirement,
    /// Native element hidden while the foreign one is shown
    pub native: Option<Requirement>,
    pub identity: IdentitySource,
    /// The embedded frame accepts player commands
    pub syncable: bool,
    pub key_prefix: &'static str,
}

impl HostProfile {
    /// Name of the embedded platform
    pub fn foreign_name(&self) -> &'static str {
        match self.platform {
            Platform::Twitch => "YouTube",
            Platform::YouTube => "Twitch",
        }
    }

    /// Turn user input into a foreign id
    pub fn parse_foreign(&self, input: &str) -> Option<String> {
        match self.platform {
            Platform::Twitch => extract_video_id(input),
            Platform::YouTube => parse_twitch_channel(input),
        }
    }

    pub fn fragment(&self, foreign_id: &str) -> Fragment {
        match self.platform {
            Platform::Twitch => Fragment {
                wrapper_id: "ytot-youtube-wrapper".to_string(),
                frame_id: "ytot-youtube-player".to_string(),
                src: format!(
                    "https://www.youtube.com/embed/{}?autoplay=1&rel=0&enablejsapi=1",
                    foreign_id
                ),
                title: "YouTube player".to_string(),
                layout: FragmentLayout::Overlay,
            },
            Platform::YouTube => Fragment {
                wrapper_id: "tcfy-panel".to_string(),
                frame_id: "tcfy-frame".to_string(),
                src: format!(
                    "https://www.twitch.tv/embed/{}/chat?parent=www.youtube.com&darkpopout",
                    foreign_id
                ),
                title: format!("Twitch chat: {}", foreign_id),
                layout: FragmentLayout::FloatingPanel,
            },
        }
    }

    pub fn mounted_message(&self) -> &'static str {
        match self.platform {
            Platform::Twitch => "YouTube playing",
            Platform::YouTube => "Twitch chat connected",
        }
    }

    pub fn invalid_input_message(&self) -> &'static str {
        match self.platform {
            Platform::Twitch => "Invalid YouTube URL",
            Platform::YouTube => "Invalid Twitch channel",
        }
    }

    pub fn mount_missing_message(&self) -> &'static str {
        match self.platform {
            Platform::Twitch => "Error: Player not found",
            Platform::YouTube => "Error: Page not ready",
        }
    }
}

/// Extract an 11-character YouTube video id from a watch, short, live or
/// embed URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .map(|caps| caps[1].to_string())
}

/// Lowercase, strip whitespace, keep only `[a-z0-9_]`. Empty results are `None`.
pub fn normalize_identity(raw: &str) -> Option<String> {
    let normalized: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    (!normalized.is_empty()).then_some(normalized)
}

/// Channel from the first path segment of a Twitch URL
pub fn channel_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    CHANNEL_PATH
        .captures(url.path())
        .map(|caps| caps[1].to_lowercase())
}

/// A Twitch channel given as a bare name or a twitch.tv URL
pub fn parse_twitch_channel(input: &str) -> Option<String> {
    let input = input.trim();
    if input.contains("twitch.tv/") {
        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };
        return channel_from_url(&with_scheme);
    }
    normalize_identity(input)
}
