use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use super::assoc::parse_switch;
use crate::browser::BrowserConnection;
use crate::cli::Cli;
use crate::controller::{Controller, Event, UserCommand};
use crate::error::{Result, YtotError};
use crate::page::{CdpPage, HostPage};
use crate::platform::Platform;
use crate::store::FileStore;

const HELP: &str = "commands: go <url|channel>, sync, auto on|off, restore, quit";

pub async fn run(cli: &Cli, url: &str) -> Result<()> {
    let config = cli.config()?;
    let platform = Platform::from_url(url)
        .ok_or_else(|| YtotError::UnsupportedPage(url.to_string()))?;

    let connection = BrowserConnection::connect(&config.browser).await?;
    let page = CdpPage::new(connection.open(url).await?);
    let start_url = page.current_url().await.unwrap_or_else(|_| url.to_string());

    let store = FileStore::new(config.storage.store_path());
    let mut controller = Controller::new(page.clone(), store, platform, &config);
    controller.start(start_url.clone());

    if !cli.json {
        let browser = if connection.launched() {
            "launched browser"
        } else {
            "attached browser"
        };
        println!(
            "{} {} on {} ({})",
            "Watching".green().bold(),
            start_url,
            platform.name().cyan(),
            browser.dimmed()
        );
        println!("{}", HELP.dimmed());
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let poll = Duration::from_millis(config.browser.navigation_poll_ms.max(50));
    let navigation = tokio::spawn(watch_navigation(page, start_url, poll, tx.clone()));
    let input = tokio::spawn(read_commands(tx.clone()));
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Event::Shutdown);
        }
    });

    let controller = controller.run(rx).await;

    navigation.abort();
    input.abort();
    interrupt.abort();
    connection.close().await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(controller.ui())?);
    } else {
        println!("{}", "Stopped.".dimmed());
    }

    Ok(())
}

/// Poll `location.href` and report changes. In-app navigation does not
/// reload the page, so there is no load event to wait for.
async fn watch_navigation(
    page: CdpPage,
    mut last: String,
    poll: Duration,
    events: UnboundedSender<Event>,
) {
    let mut ticker = tokio::time::interval(poll);
    loop {
        ticker.tick().await;
        let url = match page.current_url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Could not read page URL: {}", e);
                continue;
            }
        };
        if url == last {
            continue;
        }
        if Platform::from_url(&url).is_none() {
            tracing::warn!("Left the supported sites: {}", url);
        }
        last = url.clone();
        if events.send(Event::Navigated(url)).is_err() {
            break;
        }
    }
}

async fn read_commands(events: UnboundedSender<Event>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            // stdin closed: keep running until interrupted
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("stdin read failed: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Some(Ok(event)) => {
                if events.send(event).is_err() {
                    break;
                }
            }
            Some(Err(message)) => eprintln!("{} {}", message.yellow(), HELP.dimmed()),
            None => {}
        }
    }
}

/// One line of user input. Blank lines are `None`.
fn parse_line(line: &str) -> Option<std::result::Result<Event, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let event = match word.to_ascii_lowercase().as_str() {
        "go" | "open" if !rest.is_empty() => {
            Ok(Event::Command(UserCommand::Submit(rest.to_string())))
        }
        "go" | "open" => Err("go needs a URL or channel.".to_string()),
        "sync" => Ok(Event::Command(UserCommand::SyncNow)),
        "auto" => match parse_switch(rest) {
            Some(enabled) => Ok(Event::Command(UserCommand::SetAutoSync(enabled))),
            None => Err("auto takes on or off.".to_string()),
        },
        "restore" => Ok(Event::Command(UserCommand::Restore)),
        "quit" | "exit" => Ok(Event::Shutdown),
        other => Err(format!("Unknown command {:?}.", other)),
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_commands() {
        assert_eq!(
            parse_line("go https://youtu.be/abc12345678"),
            Some(Ok(Event::Command(UserCommand::Submit(
                "https://youtu.be/abc12345678".to_string()
            ))))
        );
        assert_eq!(
            parse_line("  sync "),
            Some(Ok(Event::Command(UserCommand::SyncNow)))
        );
        assert_eq!(
            parse_line("auto off"),
            Some(Ok(Event::Command(UserCommand::SetAutoSync(false))))
        );
        assert_eq!(
            parse_line("restore"),
            Some(Ok(Event::Command(UserCommand::Restore)))
        );
        assert_eq!(parse_line("quit"), Some(Ok(Event::Shutdown)));
    }

    #[test]
    fn rejects_incomplete_or_unknown_input() {
        assert_eq!(parse_line("   "), None);
        assert!(matches!(parse_line("go"), Some(Err(_))));
        assert!(matches!(parse_line("auto sometimes"), Some(Err(_))));
        assert!(matches!(parse_line("dance"), Some(Err(_))));
    }
}
