use clap::{Parser, Subcommand, ValueEnum};

use crate::commands;
use crate::config::Config;
use crate::error::Result;
use crate::platform::Platform;

/// ytot - YouTube streams on Twitch, Twitch chat on YouTube
#[derive(Parser)]
#[command(name = "ytot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Browser executable path (overrides auto-discovery)
    #[arg(long, env = "YTOT_BROWSER_PATH", global = true)]
    pub browser_path: Option<String>,

    /// CDP port or WebSocket URL
    #[arg(long, env = "YTOT_CDP", global = true)]
    pub cdp: Option<String>,

    /// Run the browser in headless mode
    #[arg(long, env = "YTOT_HEADLESS", global = true)]
    pub headless: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a Twitch channel or YouTube watch page and run the companion on it
    Watch {
        /// Page URL (twitch.tv/<channel> or a youtube.com watch page)
        url: String,
    },

    /// Remembered channel associations
    Assoc {
        #[command(subcommand)]
        command: AssocCommands,
    },

    /// Search YouTube for live streams
    Search {
        /// Search terms
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Which page's associations to work on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HostArg {
    /// Twitch channel -> YouTube video
    Twitch,
    /// YouTube channel -> Twitch channel
    Youtube,
}

impl From<HostArg> for Platform {
    fn from(host: HostArg) -> Self {
        match host {
            HostArg::Twitch => Platform::Twitch,
            HostArg::Youtube => Platform::YouTube,
        }
    }
}

#[derive(Subcommand)]
pub enum AssocCommands {
    /// List remembered associations
    List {
        #[arg(long, value_enum, default_value = "twitch")]
        host: HostArg,
    },

    /// Show the association for a channel
    Get {
        /// Local channel
        channel: String,

        #[arg(long, value_enum, default_value = "twitch")]
        host: HostArg,
    },

    /// Remember an association (YouTube URL for twitch, channel for youtube)
    Set {
        /// Local channel
        channel: String,

        /// Foreign stream: YouTube URL or Twitch channel
        target: String,

        #[arg(long, value_enum, default_value = "twitch")]
        host: HostArg,
    },

    /// Forget the association for a channel
    Forget {
        /// Local channel
        channel: String,

        #[arg(long, value_enum, default_value = "twitch")]
        host: HostArg,
    },

    /// Show or change the auto-sync preference
    AutoSync {
        /// on or off; omit to show
        state: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., sync.burst_ms)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,
}

impl Cli {
    /// Configuration with the global flags applied
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load()?;

        if let Some(ref path) = self.browser_path {
            config.browser.executable = Some(path.clone());
        }
        if let Some(ref cdp) = self.cdp {
            config.browser.apply_cdp_arg(cdp);
        }
        if self.headless {
            config.browser.headless = true;
        }

        Ok(config)
    }

    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Watch { url } => commands::watch::run(self, url).await,
            Commands::Assoc { command } => commands::assoc::run(self, command).await,
            Commands::Search { query, limit } => commands::search::run(self, query, *limit).await,
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
