use colored::Colorize;

use crate::cli::Cli;
use crate::error::Result;
use crate::search::SearchClient;

pub async fn run(cli: &Cli, query: &str, limit: usize) -> Result<()> {
    let client = SearchClient::new()?;
    let mut results = client.search(query).await?;
    results.truncate(limit);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No live streams found.".dimmed());
        return Ok(());
    }

    for result in &results {
        println!("{} {}", "●".red(), result.title.bold());
        println!("  {}  {}", result.channel.cyan(), result.watch_url().dimmed());
    }

    println!(
        "\n{} {}",
        "Next step:".cyan(),
        "ytot assoc set <twitch-channel> \"<url>\"".white()
    );

    Ok(())
}
