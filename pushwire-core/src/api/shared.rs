// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared Client
//!
//! Lets several async tasks use one [`PushClient`]. Calls are serialized
//! behind a mutex and run on tokio's blocking pool, since the client does
//! blocking socket I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::client::PushClient;
use super::error::{PushError, PushResult};
use crate::delivery::{BatchReport, Outcome};
use crate::network::{ConnectionState, Transport};
use crate::notification::Notification;

/// Cloneable async handle to a push client.
pub struct SharedPushClient<T: Transport + 'static> {
    inner: Arc<Mutex<PushClient<T>>>,
}

impl<T: Transport + 'static> Clone for SharedPushClient<T> {
    fn clone(&self) -> Self {
        SharedPushClient {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> SharedPushClient<T> {
    /// Wraps a client.
    pub fn new(client: PushClient<T>) -> Self {
        SharedPushClient {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    /// Runs `f` with exclusive access to the client on the blocking pool.
    pub async fn with<F, R>(&self, f: F) -> PushResult<R>
    where
        F: FnOnce(&mut PushClient<T>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            // A panic in another call leaves the client usable.
            let mut client = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut *client)
        })
        .await
        .map_err(|e| PushError::TaskFailed(e.to_string()))
    }

    /// Queues a notification. See [`PushClient::add`].
    pub async fn add(&self, notification: Notification) -> PushResult<u32> {
        self.with(move |client| client.add(notification)).await?
    }

    /// Delivers queued notifications. See [`PushClient::send`].
    pub async fn send(&self) -> PushResult<BatchReport> {
        self.with(|client| client.send()).await?
    }

    /// Closes the connection. See [`PushClient::disconnect`].
    pub async fn disconnect(&self) -> PushResult<()> {
        self.with(|client| client.disconnect()).await
    }

    /// Outcome of one notification.
    pub async fn outcome(&self, identifier: u32) -> PushResult<Option<Outcome>> {
        self.with(move |client| client.outcome(identifier)).await
    }

    /// Snapshot of every recorded outcome.
    pub async fn outcomes(&self) -> PushResult<BTreeMap<u32, Outcome>> {
        self.with(|client| client.outcomes().clone()).await
    }

    /// Number of queued notifications.
    pub async fn pending_count(&self) -> PushResult<usize> {
        self.with(|client| client.pending_count()).await
    }

    /// Current connection state.
    pub async fn state(&self) -> PushResult<ConnectionState> {
        self.with(|client| client.state()).await
    }
}
