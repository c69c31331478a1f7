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

//! Single-shot RFCOMM pairing front-end.
//!
//! Makes the device discoverable, publishes one serial port service record,
//! accepts exactly one connection and hands it to a downstream process.

pub mod bluetooth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handoff;
pub mod logging;
pub mod session;

pub use error::{Result, SessionError};
pub use handoff::{HandoffDispatcher, HandoffRecord, HandoffStrategy};
pub use session::{SessionController, SessionState};
