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

//! RFCOMM listening endpoint.

use bluer::rfcomm::{Listener, SocketAddr};
use bluer::Address;
use tracing::{debug, info};

use super::connection::ConnectionHandle;
use crate::error::{Result, SessionError};

/// A bound, listening connection-oriented endpoint.
#[allow(async_fn_in_trait)]
pub trait ListeningEndpoint {
    /// Channel assigned to the endpoint.
    fn channel(&self) -> u8;

    /// Whether the endpoint is still open.
    fn is_listening(&self) -> bool;

    /// Block until one peer connects.
    async fn accept(&mut self) -> Result<ConnectionHandle>;

    /// Close the endpoint. Closing twice is a no-op.
    fn close(&mut self);
}

/// Source of listening endpoints.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Endpoint: ListeningEndpoint;

    /// Bind and listen.
    async fn listen(&mut self) -> Result<Self::Endpoint>;
}

/// RFCOMM transport on the local adapter.
pub struct RfcommTransport {
    channel: u8,
}

impl RfcommTransport {
    /// `channel` 0 lets the kernel pick the first free channel.
    pub fn new(channel: u8) -> Self {
        Self { channel }
    }
}

impl Transport for RfcommTransport {
    type Endpoint = RfcommEndpoint;

    async fn listen(&mut self) -> Result<RfcommEndpoint> {
        let local_addr = SocketAddr::new(Address::any(), self.channel);
        let listener = Listener::bind(local_addr)
            .await
            .map_err(|e| SessionError::Bind(e.to_string()))?;

        let channel = listener
            .as_ref()
            .local_addr()
            .map_err(|e| SessionError::Bind(e.to_string()))?
            .channel;
        info!("RFCOMM server listening on channel {}", channel);

        Ok(RfcommEndpoint {
            listener: Some(listener),
            channel,
        })
    }
}

/// Listening RFCOMM socket.
pub struct RfcommEndpoint {
    listener: Option<Listener>,
    channel: u8,
}

impl ListeningEndpoint for RfcommEndpoint {
    fn channel(&self) -> u8 {
        self.channel
    }

    fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    async fn accept(&mut self) -> Result<ConnectionHandle> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| SessionError::Accept("endpoint is closed".into()))?;

        let (stream, remote_addr) = listener
            .accept()
            .await
            .map_err(|e| SessionError::Accept(e.to_string()))?;
        debug!("Raw connection from {:?}", remote_addr);

        // The async stream is dropped here; the handle keeps its own copy.
        ConnectionHandle::inheritable_from(&stream, remote_addr.addr.to_string())
            .map_err(|e| SessionError::Accept(format!("failed to take connection: {}", e)))
    }

    fn close(&mut self) {
        if self.listener.take().is_some() {
            info!("RFCOMM listener on channel {} closed", self.channel);
        }
    }
}

impl Drop for RfcommEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}
