// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AuthManager`: owns the rotating code pair, the lock state machine, the
//! auto-cycle timer, and the placard watchdog.
//!
//! Grounded on `upstream::health::spawn_health_checker`'s ticker shape and
//! `credential::broker::CredentialBroker`'s single-service-object-behind-
//! `Arc` construction, generalized to a resettable timer via `Notify`
//! (the same rearm-on-signal idea as `CancellationToken`, but resettable).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::auth::state::{AuthState, Lock};
use crate::code::{self, Code};
use crate::controller::ControllerClient;

/// Opaque handle returned by [`AuthManager::add_listener`], used for O(1)
/// removal.
pub type ListenerId = u64;

pub struct AuthManager {
    state: Mutex<AuthState>,
    listeners: Mutex<Vec<(ListenerId, mpsc::UnboundedSender<Code>)>>,
    next_listener_id: AtomicU64,
    controller: ControllerClient,
    base_url: String,
    auth_timeout: Duration,
    /// Wakes the auto-cycle loop whenever the armed deadline changes, so it
    /// re-reads the deadline instead of sleeping against a stale one.
    timer_notify: Notify,
    shutdown: CancellationToken,
}

impl AuthManager {
    /// Construct the manager, push the initial placard URL, and start the
    /// auto-cycle and placard-watchdog background tasks.
    pub async fn spawn(
        base_url: String,
        controller: ControllerClient,
        auth_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let mut initial = AuthState::new();
        initial.auto_cycle_deadline = Some(Instant::now() + auth_timeout);
        #[cfg(debug_assertions)]
        initial.check_invariants();

        let manager = Arc::new(Self {
            state: Mutex::new(initial),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            controller,
            base_url,
            auth_timeout,
            timer_notify: Notify::new(),
            shutdown,
        });

        let next = manager.state.lock().await.next_code.clone();
        manager.push_placard_url(next.as_ref()).await;

        let auto_cycle = Arc::clone(&manager);
        tokio::spawn(auto_cycle.auto_cycle_loop());
        let watchdog = Arc::clone(&manager);
        tokio::spawn(watchdog.placard_watchdog_loop());

        manager
    }

    /// Timing-safe compare against `current_code`.
    pub async fn check(&self, candidate: &Code) -> bool {
        let guard = self.state.lock().await;
        code::equal(candidate, &guard.current_code)
    }

    /// Timing-safe compare against `next_code`; `false` if `next_code = ⊥`.
    pub async fn check_next(&self, candidate: &Code) -> bool {
        let guard = self.state.lock().await;
        match &guard.next_code {
            Some(next) => code::equal(candidate, next),
            None => false,
        }
    }

    pub async fn current_code(&self) -> Code {
        self.state.lock().await.current_code.clone()
    }

    pub async fn lock_state(&self) -> Lock {
        self.state.lock().await.lock
    }

    /// The code that will become current on the next `advance()`, if any
    /// (`⊥` under `Lock::Closed`). Exposed for callers that need to hand it
    /// out directly — the placard QR target is the obvious one, tests are
    /// the other.
    pub async fn next_code(&self) -> Option<Code> {
        self.state.lock().await.next_code.clone()
    }

    /// Idempotent code rotation. Re-entrant via the auto-cycle timer and
    /// serialized with every other call through `state`'s mutex.
    pub async fn advance(&self) {
        let (current, next, lock) = {
            let mut guard = self.state.lock().await;
            let open = matches!(guard.lock, Lock::Open);
            if open {
                let promoted = guard.next_code.take().unwrap_or_else(Code::generate);
                guard.current_code = promoted;
                guard.next_code = Some(Code::generate());
            }
            guard.auto_cycle_deadline =
                if open { Some(Instant::now() + self.auth_timeout) } else { None };
            #[cfg(debug_assertions)]
            guard.check_invariants();
            (guard.current_code.clone(), guard.next_code.clone(), guard.lock)
        };
        self.timer_notify.notify_one();
        if matches!(lock, Lock::Open) {
            self.fire_listeners(&current).await;
            self.push_placard_url(next.as_ref()).await;
        }
    }

    /// State-machine transition. No-op when `new` equals the current lock.
    pub async fn set_lock(&self, new: Lock) {
        let (current, next) = {
            let mut guard = self.state.lock().await;
            if guard.lock == new {
                return;
            }
            let from = guard.lock;
            guard.previous_lock = from;

            // On any transition *out of* Closed or Capacity(_) and *into*
            // Open, both codes rotate so no stale-state holder carries over
            // (see DESIGN.md for why this departs from the literal
            // transition table).
            match (from, new) {
                (Lock::Open, Lock::Closed) => {
                    guard.next_code = None;
                }
                (Lock::Open, Lock::Capacity(_)) => {
                    guard.next_code = Some(guard.current_code.clone());
                }
                (Lock::Closed, Lock::Open) | (Lock::Capacity(_), Lock::Open) => {
                    guard.current_code = Code::generate();
                    guard.next_code = Some(Code::generate());
                }
                (Lock::Closed, Lock::Capacity(_)) | (Lock::Capacity(_), Lock::Capacity(_)) => {
                    guard.next_code = Some(guard.current_code.clone());
                }
                (Lock::Capacity(_), Lock::Closed) => {
                    guard.next_code = None;
                }
                (Lock::Open, Lock::Open) | (Lock::Closed, Lock::Closed) => {
                    unreachable!("guarded by the early equality check above")
                }
            }

            guard.lock = new;
            guard.auto_cycle_deadline =
                if matches!(new, Lock::Open) { Some(Instant::now() + self.auth_timeout) } else { None };
            #[cfg(debug_assertions)]
            guard.check_invariants();
            (guard.current_code.clone(), guard.next_code.clone())
        };

        self.timer_notify.notify_one();
        self.fire_listeners(&current).await;
        self.push_placard_url(next.as_ref()).await;
        if let Err(e) =
            self.controller.patch_current_experience(serde_json::json!({ "lock": new })).await
        {
            tracing::warn!(err = %e, "failed to push lock state to controller");
        }
    }

    /// Register a rotation listener. Returns a handle for O(1) removal and
    /// a receiver that yields the new current code after every rotation or
    /// lock-driven code change.
    pub async fn add_listener(&self) -> (ListenerId, mpsc::UnboundedReceiver<Code>) {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().await.push((id, tx));
        (id, rx)
    }

    pub async fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().await.retain(|(lid, _)| *lid != id);
    }

    async fn fire_listeners(&self, new_current: &Code) {
        let listeners = self.listeners.lock().await;
        for (_, tx) in listeners.iter() {
            // Best-effort: a listener that dropped its receiver just misses
            // this notification, same shape as a broadcast fan-out.
            let _ = tx.send(new_current.clone());
        }
    }

    async fn push_placard_url(&self, next: Option<&Code>) {
        let result = match next {
            Some(code) => {
                self.controller.patch_placard_url(Some(&format!("{}/c/{code}", self.base_url))).await
            }
            None => self.controller.patch_placard_url(None).await,
        };
        if let Err(e) = result {
            tracing::warn!(err = %e, "failed to push placard url");
        }
    }

    async fn auto_cycle_loop(self: Arc<Self>) {
        loop {
            let deadline = self.state.lock().await.auto_cycle_deadline;
            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                            self.advance().await;
                        }
                        _ = self.timer_notify.notified() => {}
                        _ = self.shutdown.cancelled() => break,
                    }
                }
                None => {
                    tokio::select! {
                        _ = self.timer_notify.notified() => {}
                        _ = self.shutdown.cancelled() => break,
                    }
                }
            }
        }
    }

    async fn placard_watchdog_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match self.controller.get_placard().await {
                Ok(value) => {
                    let is_null = value.get("url").map(|u| u.is_null()).unwrap_or(true);
                    if is_null {
                        let next = self.state.lock().await.next_code.clone();
                        self.push_placard_url(next.as_ref()).await;
                    }
                }
                Err(e) => tracing::debug!(err = %e, "placard watchdog fetch failed"),
            }
        }
    }
}
