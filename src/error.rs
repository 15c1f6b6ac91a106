use thiserror::Error;

use crate::page::Requirement;

#[derive(Error, Debug)]
pub enum YtotError {
    #[error("Browser not found. Please install Chrome, Brave, Edge or Chromium.")]
    BrowserNotFound,

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("CDP connection failed: {0}")]
    CdpConnectionFailed(String),

    #[error("Page operation failed: {0}")]
    Page(String),

    #[error("Unsupported page: {0}")]
    UnsupportedPage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error(transparent)]
    Injection(#[from] InjectionError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, YtotError>;

/// Failures of the mount phase. Neither variant is retried by the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectionError {
    #[error("Mount point not found: {0}")]
    MountPointMissing(Requirement),

    #[error("Injection failed: {0}")]
    Failed(String),
}

/// A speed command could not be delivered to the embedded player.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Sync dispatch failed: {0}")]
    Dispatch(String),
}
