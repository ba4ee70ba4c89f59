//! End-to-end CLI tests for the mediafetch binary.

mod support;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary command isolated from the user's config file and log settings.
fn mediafetch(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mediafetch").unwrap();
    cmd.current_dir(workdir)
        .env("XDG_CONFIG_HOME", workdir.join("xdg"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    mediafetch(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Retrieve media"))
        .stdout(predicate::str::contains("--batch"));
}

#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    mediafetch(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mediafetch"));
}

#[test]
fn test_binary_requires_url_or_batch() {
    let dir = TempDir::new().unwrap();
    mediafetch(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let dir = TempDir::new().unwrap();
    mediafetch(dir.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_default_batch_file_fails() {
    let dir = TempDir::new().unwrap();
    mediafetch(dir.path())
        .arg("--batch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("URL file not found"))
        .stderr(predicate::str::contains("addresses.txt"));
}

#[test]
fn test_batch_file_without_valid_urls_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("addresses.txt"),
        "# nothing here\n\nwww.example.com\n",
    )
    .unwrap();
    mediafetch(dir.path())
        .arg("-b")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no valid URLs"));
}

#[test]
fn test_missing_explicit_backend_fails() {
    let dir = TempDir::new().unwrap();
    mediafetch(dir.path())
        .args(["https://vimeo.com/1", "--yt-dlp", "/nonexistent/yt-dlp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("xdg").join("mediafetch");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "threads = 4\n").unwrap();

    mediafetch(dir.path())
        .arg("https://vimeo.com/1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_unreadable_policy_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("sites.json"), "{not json").unwrap();
    mediafetch(dir.path())
        .args(["https://vimeo.com/1", "--policies", "sites.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sites.json"));
}

#[cfg(unix)]
mod with_fake_backend {
    use super::*;
    use crate::support::{install_fake_ytdlp, logged_invocations};

    #[test]
    fn test_single_url_success() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());

        mediafetch(dir.path())
            .arg("https://vimeo.com/1")
            .arg("--yt-dlp")
            .arg(&fake)
            .args(["-d", "media", "-q"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Succeeded: 1"))
            .stdout(predicate::str::contains("Failed:    0"));

        assert!(dir.path().join("media").join("fake.mp4").exists());
    }

    #[test]
    fn test_single_url_failure_exits_one() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());

        mediafetch(dir.path())
            .arg("https://vimeo.com/fail")
            .arg("--yt-dlp")
            .arg(&fake)
            .arg("-q")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("HTTP Error 404"));
    }

    #[test]
    fn test_partial_batch_exits_two_and_lists_failures() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());
        std::fs::write(
            dir.path().join("addresses.txt"),
            concat!(
                "https://vimeo.com/1\n",
                "# skipped comment\n",
                "https://vimeo.com/fail\n",
                "not-a-url\n",
                "https://videa.hu/videok/3\n",
            ),
        )
        .unwrap();

        mediafetch(dir.path())
            .arg("--batch")
            .arg("--yt-dlp")
            .arg(&fake)
            .args(["-w", "2", "-q"])
            .assert()
            .code(2)
            .stdout(predicate::str::contains("Total:     3"))
            .stdout(predicate::str::contains("Succeeded: 2"))
            .stdout(predicate::str::contains("https://vimeo.com/fail"));

        assert_eq!(logged_invocations(dir.path()).len(), 3);
    }

    #[test]
    fn test_all_failed_batch_exits_one() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());
        std::fs::write(
            dir.path().join("list.txt"),
            "https://vimeo.com/fail/1\nhttps://vimeo.com/fail/2\n",
        )
        .unwrap();

        mediafetch(dir.path())
            .args(["-b", "list.txt", "-q", "--yt-dlp"])
            .arg(&fake)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Failed:    2"));
    }

    #[test]
    fn test_info_only_prints_metadata_without_downloading() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());

        mediafetch(dir.path())
            .args(["https://vimeo.com/1", "-i", "-q", "--yt-dlp"])
            .arg(&fake)
            .assert()
            .success()
            .stdout(predicate::str::contains("Title: Fake Clip"))
            .stdout(predicate::str::contains("Formats: 1"));

        assert!(!dir.path().join("downloads").exists());
        let invocations = logged_invocations(dir.path());
        assert!(invocations[0].contains("--skip-download"));
    }

    #[test]
    fn test_format_flag_overrides_site_policy() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());

        mediafetch(dir.path())
            .args([
                "https://videa.hu/videok/1",
                "-f",
                "worst",
                "--quality",
                "high",
                "-q",
                "--yt-dlp",
            ])
            .arg(&fake)
            .assert()
            .success();

        let invocations = logged_invocations(dir.path());
        assert!(invocations[0].starts_with("--format worst "));
    }

    #[test]
    fn test_example_policy_file_passes_age_limit() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());
        let policies = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("policies")
            .join("sites.example.json");

        mediafetch(dir.path())
            .args(["https://xhamster.com/videos/clip-1", "-q", "--policies"])
            .arg(&policies)
            .arg("--yt-dlp")
            .arg(&fake)
            .assert()
            .success();

        let invocations = logged_invocations(dir.path());
        assert!(invocations[0].contains("--age-limit 18"));
        assert!(invocations[0].contains("--add-header Referer:https://xhamster.com/"));
        assert!(!invocations[0].contains("--write-subs"));
    }

    #[test]
    fn test_config_file_supplies_backend_and_format() {
        let dir = TempDir::new().unwrap();
        let fake = install_fake_ytdlp(dir.path());
        let config_dir = dir.path().join("xdg").join("mediafetch");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            format!(
                "yt_dlp_path = \"{}\"\nquality = \"audio-only\" # podcasts\nverbosity = \"quiet\"\n",
                fake.display()
            ),
        )
        .unwrap();

        mediafetch(dir.path())
            .arg("https://vimeo.com/1")
            .assert()
            .success();

        let invocations = logged_invocations(dir.path());
        assert!(invocations[0].starts_with("--format bestaudio[ext=m4a]/bestaudio "));
    }
}
