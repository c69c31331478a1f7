// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging setup: console plus a daily rotated file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rotated files kept besides the live one.
const LOG_BACKUPS: usize = 3;

const DEFAULT_DIRECTIVE: &str = "rfcomm_handoff=info";

/// Split a log path into directory and file-name prefix.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ServerLog.log".to_string());
    (dir, prefix)
}

/// Build the rotating appender for `path`.
pub fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let (dir, prefix) = split_log_path(path);
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(LOG_BACKUPS + 1)
        .build(&dir)
        .with_context(|| format!("failed to open log in {}", dir.display()))
}

/// Install the global subscriber.
///
/// The file writer is synchronous: an exec-replace handoff gives no chance
/// to flush a background writer.
pub fn init(log_file: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let appender = file_appender(log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(appender).with_ansi(false))
        .try_init()
        .context("logging already initialized")?;

    Ok(())
}
