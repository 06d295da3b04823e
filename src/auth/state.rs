// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Instant;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::code::Code;

/// Operator lock policy. On the wire this is a boolean-or-integer union:
/// `false` is `Open`, `true` is `Closed`, and a positive integer `n` is
/// `Capacity(n)` — a boolean that happens to equal `1` is never a capacity
/// of `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    Open,
    Closed,
    Capacity(u32),
}

impl Serialize for Lock {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Open => s.serialize_bool(false),
            Self::Closed => s.serialize_bool(true),
            Self::Capacity(n) => s.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for Lock {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        match value {
            serde_json::Value::Bool(false) => Ok(Self::Open),
            serde_json::Value::Bool(true) => Ok(Self::Closed),
            serde_json::Value::Number(n) => {
                let n = n.as_u64().ok_or_else(|| de::Error::custom("capacity must be a positive integer"))?;
                if n == 0 {
                    return Err(de::Error::custom("capacity must be >= 1"));
                }
                Ok(Self::Capacity(n as u32))
            }
            other => Err(de::Error::custom(format!("invalid lock value: {other}"))),
        }
    }
}

/// State owned by the `AuthManager`. `current_code`/`next_code` and `lock`
/// are only ever read/written together, through `AuthManager`'s single
/// mutation lane — this struct has no synchronization of its own.
pub struct AuthState {
    pub current_code: Code,
    pub next_code: Option<Code>,
    pub lock: Lock,
    pub previous_lock: Lock,
    pub auto_cycle_deadline: Option<Instant>,
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            current_code: Code::generate(),
            next_code: Some(Code::generate()),
            lock: Lock::Open,
            previous_lock: Lock::Open,
            auto_cycle_deadline: None,
        }
    }

    /// `next_code = ⊥ ⇔ lock = Closed`, and `current_code ≠ next_code`
    /// unless `lock` is `Capacity(_)`. Checked in tests and debug builds;
    /// a violation indicates a bug in `AuthManager`'s transition logic.
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) {
        debug_assert_eq!(self.next_code.is_none(), matches!(self.lock, Lock::Closed));
        if !matches!(self.lock, Lock::Capacity(_)) {
            if let Some(ref next) = self.next_code {
                debug_assert!(!crate::code::equal(&self.current_code, next));
            }
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_open_serializes_to_false() {
        let json = serde_json::to_value(Lock::Open).expect("serialize");
        assert_eq!(json, serde_json::json!(false));
    }

    #[test]
    fn lock_closed_serializes_to_true() {
        let json = serde_json::to_value(Lock::Closed).expect("serialize");
        assert_eq!(json, serde_json::json!(true));
    }

    #[test]
    fn lock_capacity_serializes_to_integer() {
        let json = serde_json::to_value(Lock::Capacity(2)).expect("serialize");
        assert_eq!(json, serde_json::json!(2));
    }

    #[test]
    fn lock_boolean_true_is_not_capacity_one() {
        let lock: Lock = serde_json::from_value(serde_json::json!(true)).expect("deserialize");
        assert_eq!(lock, Lock::Closed);
        assert_ne!(lock, Lock::Capacity(1));
    }

    #[test]
    fn lock_capacity_zero_is_rejected() {
        let result: Result<Lock, _> = serde_json::from_value(serde_json::json!(0));
        assert!(result.is_err());
    }

    #[test]
    fn lock_round_trip_capacity() {
        let lock = Lock::Capacity(5);
        let json = serde_json::to_value(lock).expect("serialize");
        let back: Lock = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, lock);
    }
}
