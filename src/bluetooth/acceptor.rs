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

//! Single-shot connection acceptor.

use tracing::{error, info};

use super::connection::ConnectionHandle;
use super::endpoint::ListeningEndpoint;
use crate::error::{Result, SessionError};

/// Accepts at most one connection over its lifetime.
///
/// There is no timeout and no retry: the call returns when a peer connects
/// or when the endpoint fails underneath it.
#[derive(Debug, Default)]
pub struct ConnectionAcceptor {
    attempted: bool,
}

impl ConnectionAcceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the single accept attempt has been used.
    pub fn attempted(&self) -> bool {
        self.attempted
    }

    /// Wait for one peer on `endpoint`.
    pub async fn accept<E: ListeningEndpoint>(&mut self, endpoint: &mut E) -> Result<ConnectionHandle> {
        if self.attempted {
            return Err(SessionError::Accept("accept already attempted".into()));
        }
        self.attempted = true;

        info!("Waiting for connection on RFCOMM channel {}", endpoint.channel());

        match endpoint.accept().await {
            Ok(handle) => {
                info!("Accepted connection from {}", handle.peer());
                Ok(handle)
            }
            Err(e) => {
                error!("Accept error: {}", e);
                Err(e)
            }
        }
    }
}
