//! CLI argument parsing and offline command tests

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the ytot binary command
fn ytot() -> Command {
    Command::cargo_bin("ytot").unwrap()
}

/// ytot with the association store inside `dir`
fn ytot_with_store(dir: &TempDir) -> Command {
    let mut cmd = ytot();
    cmd.env("YTOT_STORAGE__PATH", dir.path().join("store.json"));
    cmd
}

mod help {
    use super::*;

    #[test]
    fn shows_help() {
        ytot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ytot"))
            .stdout(predicate::str::contains("watch"))
            .stdout(predicate::str::contains("assoc"));
    }

    #[test]
    fn shows_version() {
        ytot()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ytot"));
    }

    #[test]
    fn watch_requires_url() {
        ytot()
            .arg("watch")
            .assert()
            .failure()
            .stderr(predicate::str::contains("<URL>"));
    }

    #[test]
    fn search_limit_has_default() {
        ytot()
            .args(["search", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[default: 10]"));
    }
}

mod watch_command {
    use super::*;

    #[test]
    fn rejects_unsupported_sites_before_touching_a_browser() {
        ytot()
            .args(["watch", "https://example.com/stream"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("example.com/stream"));
    }
}

mod assoc_command {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();

        ytot_with_store(&dir)
            .args([
                "assoc",
                "set",
                "SomeChannel",
                "https://youtube.com/watch?v=abc12345678",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("somechannel -> abc12345678"));

        ytot_with_store(&dir)
            .args(["assoc", "get", "somechannel"])
            .assert()
            .success()
            .stdout(predicate::str::contains("abc12345678"));

        let raw = std::fs::read_to_string(dir.path().join("store.json")).unwrap();
        assert!(raw.contains("\"ytot_somechannel\": \"abc12345678\""));
    }

    #[test]
    fn set_rejects_invalid_video_url() {
        let dir = TempDir::new().unwrap();

        ytot_with_store(&dir)
            .args(["assoc", "set", "somechannel", "https://example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid YouTube URL"));
    }

    #[test]
    fn youtube_host_stores_twitch_channels() {
        let dir = TempDir::new().unwrap();

        ytot_with_store(&dir)
            .args([
                "assoc",
                "set",
                "Some Channel",
                "twitch.tv/SomeStreamer",
                "--host",
                "youtube",
            ])
            .assert()
            .success();

        ytot_with_store(&dir)
            .args(["--json", "assoc", "list", "--host", "youtube"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"target\": \"somestreamer\""));

        ytot_with_store(&dir)
            .args(["assoc", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No associations"));
    }

    #[test]
    fn forget_removes_association() {
        let dir = TempDir::new().unwrap();

        ytot_with_store(&dir)
            .args(["assoc", "set", "chan1", "https://youtu.be/videoXvideo"])
            .assert()
            .success();

        ytot_with_store(&dir)
            .args(["assoc", "forget", "chan1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Forgot chan1"));

        ytot_with_store(&dir)
            .args(["assoc", "get", "chan1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(not set)"));
    }

    #[test]
    fn auto_sync_preference_toggles() {
        let dir = TempDir::new().unwrap();

        ytot_with_store(&dir)
            .args(["assoc", "auto-sync", "on"])
            .assert()
            .success();

        ytot_with_store(&dir)
            .args(["--json", "assoc", "auto-sync"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"auto_sync\":true"));
    }
}

mod config_command {
    use super::*;

    #[test]
    fn get_reads_defaults_and_env() {
        ytot()
            .env("YTOT_SYNC__BURST_MS", "4000")
            .args(["config", "get", "sync.burst_ms"])
            .assert()
            .success()
            .stdout(predicate::str::contains("4000"));
    }

    #[test]
    fn get_rejects_unknown_key() {
        ytot()
            .args(["config", "get", "sync.warp_factor"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }
}
