// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two router-owned background tasks: the 500ms heartbeat ticker and
//! the auth-rotation eviction listener. Grounded on
//! `upstream::health::spawn_health_checker`'s interval-tick,
//! snapshot-then-iterate, parallel-action shape.

use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::code;
use crate::protocol::{HeartbeatAppMessage, HeartbeatClientMessage, Message};

use super::Router;
use std::sync::Arc;

/// Every 500ms, tell each app who it currently owns and tell each bound
/// client whether its app is still alive.
pub async fn run_heartbeat_ticker(router: Arc<Router>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_millis(500));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        for app in router.app_snapshot().await {
            let clients = app.client_ids().await;
            app.enqueue(Message::HeartbeatClient(HeartbeatClientMessage { up: true, clients })).await;
        }

        for client in router.client_snapshot().await {
            let Some(bound_app) = client.bound_app().await else { continue };
            let up = router.app(&bound_app).await.is_some();
            client.enqueue(Message::HeartbeatApp(HeartbeatAppMessage { up })).await;
        }
    }
}

/// Evict every client whose held code no longer passes against the new
/// current code after a rotation or lock-driven code change. Clients were
/// admitted against what was `next_code` at the time; once that becomes
/// `current_code`, anyone still holding an older code is out.
pub async fn run_eviction_listener(router: Arc<Router>, shutdown: CancellationToken) {
    let (_id, mut rotations) = router.auth().add_listener().await;
    loop {
        let new_current = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = rotations.recv() => match next {
                Some(code) => code,
                None => break,
            },
        };

        let stale: Vec<_> = router
            .client_snapshot()
            .await
            .into_iter()
            .filter(|client| !code::equal(&client.auth_code, &new_current))
            .collect();

        join_all(stale.into_iter().map(|client| {
            let router = Arc::clone(&router);
            async move {
                client.evict().await;
                router.remove_client(&client.id).await;
            }
        }))
        .await;
    }
}
