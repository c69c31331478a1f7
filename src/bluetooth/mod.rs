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

//! Bluetooth module.
//!
//! RFCOMM listener, SDP advertisement and discoverability for the pairing
//! session.

mod acceptor;
mod advertiser;
mod connection;
mod descriptor;
mod endpoint;
mod visibility;

pub use acceptor::ConnectionAcceptor;
pub use advertiser::{
    wait_until_unlisted, ProfileAdvertisement, ProfileAdvertiser, ServiceAdvertiser,
};
pub use connection::{is_close_on_exec, ConnectionHandle};
pub use descriptor::{ServiceDescriptor, DEFAULT_SERVICE_NAME, SERIAL_PORT, SPP_UUID};
pub use endpoint::{ListeningEndpoint, RfcommEndpoint, RfcommTransport, Transport};
pub use visibility::{
    AdapterVisibility, DiscoverabilityState, HciconfigVisibility, Visibility, VisibilityBackend,
    VisibilityController,
};
