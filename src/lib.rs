//! ytot - cross-injects a YouTube player into Twitch channel pages (and Twitch
//! chat into YouTube watch pages) and keeps the embedded stream loosely in sync.
//!
//! The library is the page controller: detection, injection, the open-loop
//! speed-burst sync protocol and per-channel association storage. The DOM is
//! reached only through [`page::HostPage`], so the same controller drives a
//! live Chromium tab ([`page::CdpPage`]) or a scripted page in tests
//! ([`page::MemoryPage`]).

pub mod browser;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod page;
pub mod platform;
pub mod search;
pub mod store;
pub mod ui;

pub use controller::{Controller, Event, UserCommand};
pub use error::{Result, YtotError};
