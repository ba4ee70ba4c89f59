//! Integration tests for the yt-dlp adapter against a fake executable.

#![cfg(unix)]

mod support;

use mediafetch_core::backend::{RetrievalBackend, RetrievalErrorKind, YtDlpBackend};
use mediafetch_core::policy::PolicyResolver;
use tempfile::TempDir;

use support::{install_fake_ytdlp, logged_invocations};

#[tokio::test]
async fn test_retrieve_passes_policy_flags_and_parses_metadata()
-> Result<(), Box<dyn std::error::Error>> {
    let bin_dir = TempDir::new()?;
    let out_dir = TempDir::new()?;
    let backend =
        YtDlpBackend::with_executable(install_fake_ytdlp(bin_dir.path()), out_dir.path())?;

    let url = "https://videa.hu/videok/sample";
    let config = PolicyResolver::default().resolve(url);
    let info = backend.retrieve(url, &config).await?;

    assert_eq!(info.title.as_deref(), Some("Fake Clip"));
    assert_eq!(info.duration, Some(61.5));
    assert_eq!(info.format_count, 1);
    assert!(out_dir.path().join("fake.mp4").exists());

    let invocations = logged_invocations(bin_dir.path());
    assert_eq!(invocations.len(), 1);
    let line = &invocations[0];
    assert!(line.contains("--add-header Referer:https://videa.hu/"));
    assert!(line.contains("--ignore-errors"));
    assert!(line.contains("--no-warnings"));
    assert!(line.contains("--write-info-json"));
    assert!(line.contains("--no-simulate"));
    assert!(line.ends_with(&format!("-- {url}")));
    Ok(())
}

#[tokio::test]
async fn test_inspect_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let bin_dir = TempDir::new()?;
    let out_dir = TempDir::new()?;
    let backend =
        YtDlpBackend::with_executable(install_fake_ytdlp(bin_dir.path()), out_dir.path())?;

    let info = backend.inspect("https://vimeo.com/1").await?;

    assert_eq!(info.uploader.as_deref(), Some("tester"));
    assert!(!out_dir.path().join("fake.mp4").exists());
    let invocations = logged_invocations(bin_dir.path());
    assert!(invocations[0].contains("--skip-download"));
    Ok(())
}

#[tokio::test]
async fn test_failure_output_is_classified() -> Result<(), Box<dyn std::error::Error>> {
    let bin_dir = TempDir::new()?;
    let out_dir = TempDir::new()?;
    let backend =
        YtDlpBackend::with_executable(install_fake_ytdlp(bin_dir.path()), out_dir.path())?;
    let resolver = PolicyResolver::default();

    let url = "https://vimeo.com/fail";
    let Err(err) = backend.retrieve(url, &resolver.resolve(url)).await else {
        return Err("expected a network failure".into());
    };
    assert_eq!(err.kind(), RetrievalErrorKind::NetworkError);
    assert!(err.message().starts_with("[generic] Unable to download webpage"));

    let url = "https://nowhere.test/unsupported";
    let Err(err) = backend.retrieve(url, &resolver.resolve(url)).await else {
        return Err("expected an unsupported failure".into());
    };
    assert_eq!(err.kind(), RetrievalErrorKind::Unsupported);
    Ok(())
}

#[tokio::test]
async fn test_unspawnable_executable_is_other_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let not_executable = dir.path().join("yt-dlp");
    std::fs::write(&not_executable, "plain text")?;
    let backend = YtDlpBackend::with_executable(&not_executable, dir.path())?;

    let Err(err) = backend.inspect("https://vimeo.com/1").await else {
        return Err("expected spawn failure".into());
    };
    assert_eq!(err.kind(), RetrievalErrorKind::Other);
    Ok(())
}
