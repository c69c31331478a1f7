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

//! SDP service advertisement.

use bluer::rfcomm::{Profile, ProfileHandle, Role};
use bluer::{Adapter, Session};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::descriptor::ServiceDescriptor;
use crate::error::{Result, SessionError};

/// Upper bound on waiting for BlueZ to drop the record.
const WITHDRAW_TIMEOUT: Duration = Duration::from_secs(3);

/// Poll interval while waiting for the record to disappear.
const WITHDRAW_POLL: Duration = Duration::from_millis(50);

/// Publishes a service record for a listening channel.
#[allow(async_fn_in_trait)]
pub trait ServiceAdvertiser {
    /// Live advertisement; withdrawn by passing it back.
    type Advertisement;

    async fn advertise(
        &mut self,
        descriptor: &ServiceDescriptor,
        channel: u8,
    ) -> Result<Self::Advertisement>;

    /// Remove the record. Returns once the record is gone, or after a
    /// bounded wait that is logged when it expires.
    async fn withdraw(&mut self, advertisement: Self::Advertisement);
}

/// Wait until `still_listed` reports false, sleeping between checks.
///
/// Sleeping yields to the runtime, so deferred work (such as bluer's
/// unregister task) gets polled. Returns false on timeout.
pub async fn wait_until_unlisted<F, Fut>(
    mut still_listed: F,
    timeout: Duration,
    interval: Duration,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if !still_listed().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(interval).await;
    }
}

/// A registered profile and how to confirm its removal.
pub struct ProfileAdvertisement {
    handle: ProfileHandle,
    uuid: Uuid,
    /// The uuid only showed up in the adapter's list after registration.
    observable: bool,
}

/// Advertiser backed by a BlueZ profile registration.
///
/// The profile carries an explicit SDP record pointing at our own RFCOMM
/// listener. Dropping the profile handle only schedules the unregistration
/// on a spawned task, so withdrawal drops the handle and then waits until the
/// adapter no longer lists the service uuid.
pub struct ProfileAdvertiser {
    session: Session,
    adapter: Adapter,
}

impl ProfileAdvertiser {
    pub fn new(session: Session, adapter: Adapter) -> Self {
        Self { session, adapter }
    }

    async fn adapter_lists(&self, uuid: Uuid) -> bool {
        match self.adapter.uuids().await {
            Ok(uuids) => uuids.unwrap_or_default().contains(&uuid),
            Err(e) => {
                debug!("Failed to read adapter uuids: {}", e);
                false
            }
        }
    }
}

impl ServiceAdvertiser for ProfileAdvertiser {
    type Advertisement = ProfileAdvertisement;

    async fn advertise(
        &mut self,
        descriptor: &ServiceDescriptor,
        channel: u8,
    ) -> Result<ProfileAdvertisement> {
        let uuid = descriptor.service_uuid()?;
        let record = descriptor.sdp_record(channel)?;
        debug!("SDP record:\n{}", record);

        let listed_before = self.adapter_lists(uuid).await;

        let profile = Profile {
            uuid,
            name: Some(descriptor.friendly_name.clone()),
            role: Some(Role::Server),
            service_record: Some(record),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };

        let handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(|e| SessionError::Advertisement(e.to_string()))?;

        let observable = !listed_before && self.adapter_lists(uuid).await;
        if !observable {
            warn!(
                "UUID {} was already listed by the adapter; withdrawal cannot be confirmed",
                uuid
            );
        }

        info!(
            "Advertising '{}' (UUID: {}) on channel {}",
            descriptor.friendly_name, uuid, channel
        );
        Ok(ProfileAdvertisement {
            handle,
            uuid,
            observable,
        })
    }

    async fn withdraw(&mut self, advertisement: ProfileAdvertisement) {
        let ProfileAdvertisement {
            handle,
            uuid,
            observable,
        } = advertisement;
        drop(handle);

        if !observable {
            // Still give the unregister task a chance to run.
            sleep(WITHDRAW_POLL).await;
            warn!("Service advertisement withdrawal requested (unconfirmed)");
            return;
        }

        let this = &*self;
        let removed =
            wait_until_unlisted(|| this.adapter_lists(uuid), WITHDRAW_TIMEOUT, WITHDRAW_POLL)
                .await;
        if removed {
            info!("Service advertisement withdrawn");
        } else {
            warn!(
                "UUID {} still listed {:?} after withdrawal",
                uuid, WITHDRAW_TIMEOUT
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    /// Mirrors bluer: dropping the sender lets a spawned task unregister.
    fn deferred_registration() -> (oneshot::Sender<()>, Arc<AtomicBool>) {
        let (drop_tx, drop_rx) = oneshot::channel::<()>();
        let listed = Arc::new(AtomicBool::new(true));
        let task_listed = listed.clone();
        tokio::spawn(async move {
            let _ = drop_rx.await;
            tokio::task::yield_now().await;
            task_listed.store(false, Ordering::SeqCst);
        });
        (drop_tx, listed)
    }

    #[tokio::test]
    async fn test_wait_polls_deferred_unregistration() {
        let (drop_tx, listed) = deferred_registration();
        drop(drop_tx);

        // Nothing has yielded yet, so the task has not run.
        assert!(listed.load(Ordering::SeqCst));

        let removed = wait_until_unlisted(
            || {
                let listed = listed.clone();
                async move { listed.load(Ordering::SeqCst) }
            },
            Duration::from_secs(1),
            Duration::from_millis(5),
        )
        .await;

        assert!(removed);
        assert!(!listed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_wait_times_out_while_listed() {
        let removed = wait_until_unlisted(
            || async { true },
            Duration::from_millis(30),
            Duration::from_millis(5),
        )
        .await;

        assert!(!removed);
    }
}
