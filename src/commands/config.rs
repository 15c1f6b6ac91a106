use colored::Colorize;
use serde_json::Value;

use crate::cli::{Cli, ConfigCommands};
use crate::config::Config;
use crate::error::{Result, YtotError};

pub async fn run(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(cli).await,
        ConfigCommands::Set { key, value } => set(cli, key, value).await,
        ConfigCommands::Get { key } => get(cli, key).await,
        ConfigCommands::Path => path(cli).await,
    }
}

async fn show(cli: &Cli) -> Result<()> {
    let config = Config::load()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| YtotError::ConfigError(e.to_string()))?;
        println!("{}", toml_str);
    }

    Ok(())
}

async fn set(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let config = Config::load()?;
    let config = with_value(&config, key, value)?;
    config.save()?;

    if cli.json {
        println!("{}", serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{} Set {} = {}", "✓".green(), key, value);
    }

    Ok(())
}

async fn get(cli: &Cli, key: &str) -> Result<()> {
    let config = Config::load()?;
    let value = lookup(&config, key)?;

    if cli.json {
        println!("{}", serde_json::json!({ "key": key, "value": value }));
    } else {
        match value {
            Value::Null => println!("{}", "(not set)".dimmed()),
            Value::String(s) => println!("{}", s),
            other => println!("{}", other),
        }
    }

    Ok(())
}

async fn path(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string()
            })
        );
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

fn unknown_key(key: &str) -> YtotError {
    YtotError::ConfigError(format!("Unknown config key: {}", key))
}

/// Value of a dotted key such as `sync.burst_ms`
fn lookup(config: &Config, key: &str) -> Result<Value> {
    let tree = serde_json::to_value(config)?;
    tree.pointer(&pointer(key))
        .cloned()
        .ok_or_else(|| unknown_key(key))
}

/// Copy of `config` with one dotted key replaced. The raw value is read as
/// the type the key already has; `null` keys take strings.
fn with_value(config: &Config, key: &str, raw: &str) -> Result<Config> {
    let mut tree = serde_json::to_value(config)?;
    let slot = tree.pointer_mut(&pointer(key)).ok_or_else(|| unknown_key(key))?;

    let invalid = |expected: &str| {
        YtotError::ConfigError(format!("{} must be {}, got {:?}", key, expected, raw))
    };
    *slot = match &*slot {
        Value::Bool(_) => Value::Bool(raw.parse().map_err(|_| invalid("true or false"))?),
        Value::Number(n) if n.is_f64() => {
            serde_json::json!(raw.parse::<f64>().map_err(|_| invalid("a number"))?)
        }
        Value::Number(_) => serde_json::json!(raw
            .parse::<u64>()
            .map_err(|_| invalid("a non-negative integer"))?),
        Value::Array(_) => Value::Array(
            raw.split_whitespace()
                .map(|arg| Value::String(arg.to_string()))
                .collect(),
        ),
        Value::Object(_) => return Err(invalid("a single value, not a section")),
        Value::Null | Value::String(_) => Value::String(raw.to_string()),
    };

    let config: Config =
        serde_json::from_value(tree).map_err(|e| YtotError::ConfigError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn pointer(key: &str) -> String {
    format!("/{}", key.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_reads_nested_values() {
        let config = Config::default();

        assert_eq!(lookup(&config, "sync.burst_ms").unwrap(), serde_json::json!(5000));
        assert_eq!(lookup(&config, "browser.executable").unwrap(), Value::Null);
        assert!(lookup(&config, "sync.nope").is_err());
    }

    #[test]
    fn with_value_keeps_field_types() {
        let config = Config::default();

        let config = with_value(&config, "sync.burst_rate", "1.5").unwrap();
        assert_eq!(config.sync.burst_rate, 1.5);

        let config = with_value(&config, "browser.headless", "true").unwrap();
        assert!(config.browser.headless);

        let config = with_value(&config, "browser.executable", "/usr/bin/chromium").unwrap();
        assert_eq!(config.browser.executable.as_deref(), Some("/usr/bin/chromium"));

        let config = with_value(&config, "browser.extra_args", "--mute-audio --lang=en").unwrap();
        assert_eq!(config.browser.extra_args, vec!["--mute-audio", "--lang=en"]);
    }

    #[test]
    fn with_value_rejects_bad_input() {
        let config = Config::default();

        assert!(with_value(&config, "detection.max_attempts", "many").is_err());
        assert!(with_value(&config, "sync", "1").is_err());
        assert!(with_value(&config, "sync.normal_rate", "0").is_err());
        assert!(with_value(&config, "nope", "1").is_err());
    }
}
