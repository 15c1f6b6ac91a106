pub mod assoc;
pub mod config;
pub mod search;
pub mod watch;
