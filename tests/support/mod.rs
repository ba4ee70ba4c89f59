//! Shared helpers for tests that need a stand-in `yt-dlp` executable.

#![cfg(unix)]
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Shell script mimicking the parts of `yt-dlp` the adapter relies on.
///
/// - logs its arguments, one invocation per line, to `args.log` beside itself
/// - URLs containing `fail` exit 1 with a network-style `ERROR:` line
/// - URLs containing `unsupported` exit 1 with an unsupported-URL error
/// - anything else prints one metadata JSON line; with `--no-simulate` it
///   also writes `<output dir>/fake.mp4`
const FAKE_YTDLP: &str = r#"#!/bin/sh
dir=$(dirname "$0")
echo "$@" >> "$dir/args.log"
output=""
simulate=1
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then output="$arg"; fi
  if [ "$arg" = "--no-simulate" ]; then simulate=0; fi
  prev="$arg"
  url="$arg"
done
case "$url" in
  *unsupported*)
    echo "ERROR: Unsupported URL: $url" >&2
    exit 1
    ;;
  *fail*)
    echo "WARNING: retrying" >&2
    echo "ERROR: [generic] Unable to download webpage: HTTP Error 404: Not Found" >&2
    exit 1
    ;;
esac
if [ "$simulate" = "0" ] && [ -n "$output" ]; then
  touch "$(dirname "$output")/fake.mp4"
fi
echo '{"title": "Fake Clip", "duration": 61.5, "uploader": "tester", "formats": [{"format_id": "18"}]}'
"#;

/// Writes the fake executable into `dir` and returns its path.
pub fn install_fake_ytdlp(dir: &Path) -> PathBuf {
    let path = dir.join("yt-dlp");
    fs::write(&path, FAKE_YTDLP).unwrap();
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Argument lines the fake executable has logged so far.
pub fn logged_invocations(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("args.log"))
        .unwrap_or_default()
        .lines()
        .map(ToString::to_string)
        .collect()
}
