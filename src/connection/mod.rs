// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection types bound to a live socket: [`ClientConn`] (visitor device)
//! and [`AppConn`] (museum display). Both run two cooperative tasks over
//! one socket (receive/dispatch, send) wired up in `transport::ws`; this
//! module holds only the registry-facing handle and message-handling rules.

pub mod app;
pub mod client;

pub use app::AppConn;
pub use client::ClientConn;

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::protocol::Message;

/// Idempotent close bookkeeping shared by both connection kinds.
#[derive(Default)]
pub(crate) struct CloseGuard(AtomicBool);

impl CloseGuard {
    /// Marks closed; returns `true` the first time, `false` on every call
    /// after (so callers only run teardown once).
    pub(crate) fn close_once(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Enqueue onto a bounded send queue: try the non-blocking path first, then
/// fall back to one blocking `send` so a momentarily full queue backpressures
/// the caller instead of dropping the frame. A closed queue (peer already
/// gone) is a silent no-op either way.
pub(crate) async fn enqueue(tx: &mpsc::Sender<Message>, msg: Message) {
    match tx.try_send(msg) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(msg)) => {
            if tx.send(msg).await.is_err() {
                tracing::debug!("send queue closed while backpressured");
            }
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
