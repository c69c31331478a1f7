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

//! One-shot pairing session.
//!
//! ```text
//! INIT -> VISIBLE_ADVERTISING -> CONNECTED -> HANDED_OFF
//!   \            |                  |
//!    +-----------+------------------+-----> FAILED
//! ```
//!
//! A session runs once. The host supervisor restarts the process for the
//! next pairing cycle.

use tracing::{error, info, warn};

use crate::bluetooth::{
    ConnectionAcceptor, DiscoverabilityState, ListeningEndpoint, ServiceAdvertiser,
    ServiceDescriptor, Transport, VisibilityController,
};
use crate::error::{Result, SessionError};
use crate::handoff::{HandoffDispatcher, HandoffRecord};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    VisibleAdvertising,
    Connected,
    HandedOff,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::HandedOff | SessionState::Failed)
    }
}

/// Drives visibility, advertisement, accept and handoff in that order.
pub struct SessionController<V, T, A, H> {
    descriptor: ServiceDescriptor,
    visibility: V,
    transport: T,
    advertiser: A,
    dispatcher: H,
    acceptor: ConnectionAcceptor,
    state: SessionState,
    discoverability: DiscoverabilityState,
}

impl<V, T, A, H> SessionController<V, T, A, H>
where
    V: VisibilityController,
    T: Transport,
    A: ServiceAdvertiser,
    H: HandoffDispatcher,
{
    pub fn new(
        descriptor: ServiceDescriptor,
        visibility: V,
        transport: T,
        advertiser: A,
        dispatcher: H,
    ) -> Self {
        Self {
            descriptor,
            visibility,
            transport,
            advertiser,
            dispatcher,
            acceptor: ConnectionAcceptor::new(),
            state: SessionState::Init,
            discoverability: DiscoverabilityState::Hidden,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn discoverability(&self) -> DiscoverabilityState {
        self.discoverability
    }

    async fn set_discoverable(&mut self, on: bool) {
        self.visibility.set_visible(on).await;
        self.discoverability = DiscoverabilityState::from_flag(on);
    }

    /// Run the session to a terminal state.
    ///
    /// Returns the handoff record on success. With the exec-replace strategy a
    /// successful handoff never returns.
    pub async fn run(&mut self) -> Result<HandoffRecord> {
        if self.state != SessionState::Init || self.acceptor.attempted() {
            let phase = if self.state.is_terminal() {
                "finished"
            } else {
                "started"
            };
            return Err(SessionError::Accept(format!(
                "session already {} (state {:?})",
                phase, self.state
            )));
        }

        info!(
            "Starting session (visibility: {})",
            self.visibility.backend_name()
        );
        self.set_discoverable(true).await;

        let mut endpoint = match self.transport.listen().await {
            Ok(endpoint) => endpoint,
            Err(e) => return Err(self.fail(e).await),
        };

        let advertisement = match self
            .advertiser
            .advertise(&self.descriptor, endpoint.channel())
            .await
        {
            Ok(advertisement) => advertisement,
            Err(e) => {
                endpoint.close();
                return Err(self.fail(e).await);
            }
        };
        self.state = SessionState::VisibleAdvertising;

        let handle = match self.acceptor.accept(&mut endpoint).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = self.fail(e).await;
                self.advertiser.withdraw(advertisement).await;
                endpoint.close();
                return Err(err);
            }
        };

        // Hide and withdraw before the connection is touched.
        self.state = SessionState::Connected;
        self.set_discoverable(false).await;
        self.advertiser.withdraw(advertisement).await;
        endpoint.close();
        debug_assert!(!endpoint.is_listening());

        match self.dispatcher.dispatch(handle) {
            Ok(record) => {
                self.state = SessionState::HandedOff;
                info!("Handoff complete: {}", record);
                Ok(record)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Enter FAILED, restoring discoverability to hidden if it was visible.
    async fn fail(&mut self, err: SessionError) -> SessionError {
        error!("Session failed ({}): {}", err.kind(), err);
        if self.discoverability.is_visible() {
            warn!("Restoring discoverability to hidden");
            self.set_discoverable(false).await;
        }
        self.state = SessionState::Failed;
        err
    }
}
