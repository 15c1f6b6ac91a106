use colored::Colorize;

use crate::cli::{AssocCommands, Cli, HostArg};
use crate::error::{Result, YtotError};
use crate::platform::{self, HostProfile, Platform};
use crate::store::{ChannelStore, FileStore};

pub async fn run(cli: &Cli, command: &AssocCommands) -> Result<()> {
    let config = cli.config()?;
    let store = FileStore::new(config.storage.store_path());
    tracing::debug!("Association store: {}", store.path().display());

    match command {
        AssocCommands::List { host } => list(cli, store, *host).await,
        AssocCommands::Get { channel, host } => get(cli, store, *host, channel).await,
        AssocCommands::Set {
            channel,
            target,
            host,
        } => set(cli, store, *host, channel, target).await,
        AssocCommands::Forget { channel, host } => forget(cli, store, *host, channel).await,
        AssocCommands::AutoSync { state } => auto_sync(cli, store, state.as_deref()).await,
    }
}

fn open(store: FileStore, host: HostArg) -> (HostProfile, ChannelStore<FileStore>) {
    let profile = Platform::from(host).profile();
    let channels = ChannelStore::new(store, profile.key_prefix);
    (profile, channels)
}

fn local_channel(raw: &str) -> Result<String> {
    platform::normalize_identity(raw)
        .ok_or_else(|| YtotError::Other(format!("Invalid channel name: {:?}", raw)))
}

async fn list(cli: &Cli, store: FileStore, host: HostArg) -> Result<()> {
    let (profile, channels) = open(store, host);
    let associations = channels.associations().await;

    if cli.json {
        let items: Vec<_> = associations
            .iter()
            .map(|(local, foreign)| serde_json::json!({ "channel": local, "target": foreign }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if associations.is_empty() {
        println!("{}", "No associations remembered.".dimmed());
        return Ok(());
    }

    println!(
        "{} {} -> {}",
        "Associations".bold(),
        profile.platform.name().cyan(),
        profile.foreign_name().cyan()
    );
    for (local, foreign) in associations {
        println!("  {} {}", format!("{:<24}", local).green(), foreign);
    }

    Ok(())
}

async fn get(cli: &Cli, store: FileStore, host: HostArg, channel: &str) -> Result<()> {
    let (_, channels) = open(store, host);
    let local = local_channel(channel)?;
    let foreign = channels.recall(&local).await;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "channel": local, "target": foreign })
        );
    } else {
        match foreign {
            Some(foreign) => println!("{}", foreign),
            None => println!("{}", "(not set)".dimmed()),
        }
    }

    Ok(())
}

async fn set(
    cli: &Cli,
    store: FileStore,
    host: HostArg,
    channel: &str,
    target: &str,
) -> Result<()> {
    let (profile, channels) = open(store, host);
    let local = local_channel(channel)?;
    let foreign = profile
        .parse_foreign(target)
        .ok_or_else(|| YtotError::Other(profile.invalid_input_message().to_string()))?;

    channels.remember(&local, &foreign).await;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "channel": local, "target": foreign })
        );
    } else {
        println!("{} {} -> {}", "✓".green(), local, foreign);
    }

    Ok(())
}

async fn forget(cli: &Cli, store: FileStore, host: HostArg, channel: &str) -> Result<()> {
    let (_, channels) = open(store, host);
    let local = local_channel(channel)?;
    let existed = channels.recall(&local).await.is_some();
    channels.forget(&local).await;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "channel": local, "removed": existed })
        );
    } else if existed {
        println!("{} Forgot {}", "✓".green(), local);
    } else {
        println!("{}", format!("Nothing remembered for {}", local).dimmed());
    }

    Ok(())
}

async fn auto_sync(cli: &Cli, store: FileStore, state: Option<&str>) -> Result<()> {
    // Only the Twitch side has a player to keep in sync
    let (_, channels) = open(store, HostArg::Twitch);

    let enabled = match state {
        None => channels.auto_sync().await,
        Some(raw) => {
            let enabled = parse_switch(raw).ok_or_else(|| {
                YtotError::Other(format!("Expected on or off, got {:?}", raw))
            })?;
            channels.set_auto_sync(enabled).await;
            enabled
        }
    };

    if cli.json {
        println!("{}", serde_json::json!({ "auto_sync": enabled }));
    } else if enabled {
        println!("Auto-sync: {}", "on".green());
    } else {
        println!("Auto-sync: {}", "off".dimmed());
    }

    Ok(())
}

pub(crate) fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_words() {
        assert_eq!(parse_switch("ON"), Some(true));
        assert_eq!(parse_switch(" off "), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }

    #[test]
    fn local_channel_is_normalized() {
        assert_eq!(local_channel("Some Channel").unwrap(), "somechannel");
        assert!(local_channel("!!").is_err());
    }
}
