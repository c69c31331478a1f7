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

//! Session error taxonomy.
//!
//! Every variant is fatal to the current run. Recovery is the job of the
//! host supervisor, which restarts the process after it exits.

use thiserror::Error;

/// Errors that terminate a pairing session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The RFCOMM endpoint could not be bound or put into listening state.
    #[error("failed to bind listening endpoint: {0}")]
    Bind(String),

    /// The transport rejected the service descriptor.
    #[error("service advertisement rejected: {0}")]
    Advertisement(String),

    /// Waiting for a peer failed (endpoint torn down, transport error).
    #[error("accept failed: {0}")]
    Accept(String),

    /// The downstream consumer could not be given the connection.
    #[error("handoff failed: {0}")]
    Handoff(String),
}

impl SessionError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Bind(_) => "BindFailure",
            SessionError::Advertisement(_) => "AdvertisementFailure",
            SessionError::Accept(_) => "AcceptFailure",
            SessionError::Handoff(_) => "HandoffFailure",
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
