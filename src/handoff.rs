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

//! Handoff of the accepted connection to the downstream program.
//!
//! Two strategies exist and a deployment uses exactly one of them:
//!
//! - **exec-replace**: the process image is replaced by the downstream
//!   program, which receives the descriptor number as its only argument.
//!   Precondition: the descriptor is not close-on-exec. Image replacement
//!   keeps the descriptor table, so the number stays valid in the new image.
//! - **file-token**: the descriptor number is written to a file and an
//!   acknowledgement token is sent to the peer before a normal exit.
//!   Deployment constraint: the number only means something to a process
//!   that shares our descriptor table, i.e. a child spawned with the
//!   descriptor inherited. Configure `consumer` to spawn that child.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::RawFd;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::bluetooth::ConnectionHandle;
use crate::error::{Result, SessionError};

/// Downstream program used by exec-replace.
pub const DEFAULT_PROGRAM: &str = "./BTServer";

/// Well-known file for the file-token strategy.
pub const DEFAULT_HANDLE_FILE: &str = "./socket.txt";

/// Acknowledgement sent to the peer by the file-token strategy.
pub const DEFAULT_ACK_TOKEN: &str = "e777";

/// Configured handoff strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum HandoffStrategy {
    ExecReplace {
        program: PathBuf,
    },
    FileToken {
        #[serde(default = "default_handle_file")]
        path: PathBuf,
        #[serde(default = "default_ack_token")]
        token: String,
        /// Child spawned with the descriptor inherited.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        consumer: Option<PathBuf>,
    },
}

fn default_handle_file() -> PathBuf {
    PathBuf::from(DEFAULT_HANDLE_FILE)
}

fn default_ack_token() -> String {
    DEFAULT_ACK_TOKEN.to_string()
}

impl Default for HandoffStrategy {
    fn default() -> Self {
        HandoffStrategy::ExecReplace {
            program: PathBuf::from(DEFAULT_PROGRAM),
        }
    }
}

impl HandoffStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            HandoffStrategy::ExecReplace { .. } => "exec-replace",
            HandoffStrategy::FileToken { .. } => "file-token",
        }
    }
}

/// What a completed handoff did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffRecord {
    ExecReplace {
        argument: String,
    },
    FileToken {
        path: PathBuf,
        value: RawFd,
        token: String,
    },
}

impl fmt::Display for HandoffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffRecord::ExecReplace { argument } => write!(f, "exec-replace({})", argument),
            HandoffRecord::FileToken { path, value, token } => {
                write!(f, "file-token({} <- {}, ack {:?})", path.display(), value, token)
            }
        }
    }
}

/// Transfers an accepted connection away from this process.
pub trait HandoffDispatcher {
    /// On success the handle is no longer owned by the caller.
    ///
    /// The exec-replace strategy does not return when it succeeds.
    fn dispatch(&mut self, handle: ConnectionHandle) -> Result<HandoffRecord>;
}

impl HandoffDispatcher for HandoffStrategy {
    fn dispatch(&mut self, handle: ConnectionHandle) -> Result<HandoffRecord> {
        match self {
            HandoffStrategy::ExecReplace { program } => exec_replace(program, handle),
            HandoffStrategy::FileToken {
                path,
                token,
                consumer,
            } => file_token(path, token, consumer.as_deref(), handle),
        }
    }
}

/// Build the downstream invocation `<program> <handle>`.
pub fn downstream_command(program: &Path, handle_number: RawFd) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg(handle_number.to_string());
    cmd
}

fn exec_replace(program: &Path, handle: ConnectionHandle) -> Result<HandoffRecord> {
    let argument = handle.number().to_string();
    info!("arg string = {} {}", program.display(), argument);

    let err = downstream_command(program, handle.number()).exec();

    // exec only returns on failure; `handle` drops here and closes the connection.
    Err(SessionError::Handoff(format!(
        "failed to exec {}: {}",
        program.display(),
        err
    )))
}

/// Write the descriptor number as decimal text, without a newline.
pub fn write_handle_file(path: &Path, handle_number: RawFd) -> io::Result<()> {
    std::fs::write(path, handle_number.to_string())
}

/// Write the acknowledgement token onto the connection.
pub fn send_token<W: Write>(conn: &mut W, token: &str) -> io::Result<()> {
    conn.write_all(token.as_bytes())?;
    conn.flush()
}

fn file_token(
    path: &Path,
    token: &str,
    consumer: Option<&Path>,
    handle: ConnectionHandle,
) -> Result<HandoffRecord> {
    let value = handle.number();
    info!("Socket = {}", value);

    write_handle_file(path, value).map_err(|e| {
        SessionError::Handoff(format!("failed to write {}: {}", path.display(), e))
    })?;

    let mut conn = File::from(handle.into_owned_fd());
    send_token(&mut conn, token)
        .map_err(|e| SessionError::Handoff(format!("failed to send ack token: {}", e)))?;

    match consumer {
        Some(program) => {
            let child = downstream_command(program, value).spawn().map_err(|e| {
                SessionError::Handoff(format!("failed to spawn {}: {}", program.display(), e))
            })?;
            info!("Consumer {} started (pid {})", program.display(), child.id());
        }
        None => warn!(
            "No consumer configured; handle {} is only usable by a process sharing this descriptor table",
            value
        ),
    }

    Ok(HandoffRecord::FileToken {
        path: path.to_path_buf(),
        value,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixStream;
    use tempfile::TempDir;

    fn accepted() -> (ConnectionHandle, UnixStream) {
        let (ours, peer) = UnixStream::pair().unwrap();
        let handle = ConnectionHandle::inheritable_from(&ours, "AA:BB:CC:DD:EE:FF").unwrap();
        (handle, peer)
    }

    #[test]
    fn test_downstream_argument_is_decimal_handle() {
        let cmd = downstream_command(Path::new("./BTServer"), 17);
        let args: Vec<_> = cmd.get_args().collect();

        assert_eq!(cmd.get_program(), "./BTServer");
        assert_eq!(args, vec!["17"]);
    }

    #[test]
    fn test_handle_file_contains_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("socket.txt");

        write_handle_file(&path, 42).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "42");
    }

    #[test]
    fn test_send_token() {
        let mut sink = Vec::new();
        send_token(&mut sink, DEFAULT_ACK_TOKEN).unwrap();
        assert_eq!(sink, b"e777");
    }

    #[test]
    fn test_file_token_dispatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("socket.txt");
        let (handle, mut peer) = accepted();
        let number = handle.number();

        let mut strategy = HandoffStrategy::FileToken {
            path: path.clone(),
            token: DEFAULT_ACK_TOKEN.to_string(),
            consumer: None,
        };
        let record = strategy.dispatch(handle).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), number.to_string());

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"e777");

        assert_eq!(
            record,
            HandoffRecord::FileToken {
                path,
                value: number,
                token: "e777".into()
            }
        );
    }

    #[test]
    fn test_file_token_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let (handle, _peer) = accepted();

        let mut strategy = HandoffStrategy::FileToken {
            path: dir.path().join("missing").join("socket.txt"),
            token: DEFAULT_ACK_TOKEN.to_string(),
            consumer: None,
        };

        assert!(matches!(
            strategy.dispatch(handle),
            Err(SessionError::Handoff(_))
        ));
    }

    #[test]
    fn test_file_token_peer_gone() {
        let dir = TempDir::new().unwrap();
        let (handle, peer) = accepted();
        drop(peer);

        let mut strategy = HandoffStrategy::FileToken {
            path: dir.path().join("socket.txt"),
            token: DEFAULT_ACK_TOKEN.to_string(),
            consumer: None,
        };

        // Rust ignores SIGPIPE, so the write surfaces as EPIPE.
        assert!(matches!(
            strategy.dispatch(handle),
            Err(SessionError::Handoff(_))
        ));
    }

    #[test]
    fn test_exec_failure_returns_error() {
        let (handle, _peer) = accepted();
        let mut strategy = HandoffStrategy::ExecReplace {
            program: PathBuf::from("/nonexistent/downstream-program"),
        };

        let err = strategy.dispatch(handle).unwrap_err();
        assert!(matches!(err, SessionError::Handoff(_)));
        assert!(err.to_string().contains("/nonexistent/downstream-program"));
    }

    #[test]
    fn test_strategy_deserialize() {
        let strategy: HandoffStrategy = toml::from_str(
            r#"
            strategy = "file-token"
            consumer = "./BTServer"
            "#,
        )
        .unwrap();

        assert_eq!(
            strategy,
            HandoffStrategy::FileToken {
                path: PathBuf::from("./socket.txt"),
                token: "e777".into(),
                consumer: Some(PathBuf::from("./BTServer")),
            }
        );
        assert_eq!(strategy.name(), "file-token");
    }

    #[test]
    fn test_default_strategy() {
        assert_eq!(
            HandoffStrategy::default(),
            HandoffStrategy::ExecReplace {
                program: PathBuf::from("./BTServer")
            }
        );
    }
}
