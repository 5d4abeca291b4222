//! Cooldown bookkeeping for alert deduplication.
//!
//! The durable alert log is the source of truth for when a device last
//! alerted; [`check_cooldown`] turns that lookup into a decision. The
//! [`CooldownGate`] serializes the lookup-decide-record sequence per
//! (device, alert type) inside one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::alert::AlertType;
use crate::types::Timestamp;

/// Outcome of a cooldown check for one breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// No alert inside the window; the breach should be notified and recorded.
    Eligible,
    /// An alert was recorded too recently.
    Suppressed { remaining: chrono::Duration },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Decide whether a breach at `now` may alert, given the last recorded alert
/// for the same device and type.
///
/// Eligible when there is no prior alert or at least `cooldown` has elapsed.
pub fn check_cooldown(
    last_alert_at: Option<Timestamp>,
    now: Timestamp,
    cooldown: chrono::Duration,
) -> Eligibility {
    let Some(last) = last_alert_at else {
        return Eligibility::Eligible;
    };
    let elapsed = now.signed_duration_since(last);
    if elapsed >= cooldown {
        Eligibility::Eligible
    } else {
        Eligibility::Suppressed {
            remaining: cooldown - elapsed,
        }
    }
}

/// Composite key for cooldown serialization: (device_id, alert_type).
type CooldownKey = (String, AlertType);

/// Keyed async lock over (device, alert type).
///
/// Holding a [`CooldownPermit`] guarantees no other task in this process is
/// between looking up and recording an alert for the same pair.
#[derive(Debug, Default)]
pub struct CooldownGate {
    locks: Mutex<HashMap<CooldownKey, Weak<tokio::sync::Mutex<()>>>>,
}

/// Exclusive hold on one (device, alert type) pair. Released on drop.
#[derive(Debug)]
pub struct CooldownPermit {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the pair.
    pub async fn acquire(&self, device_id: &str, alert_type: AlertType) -> CooldownPermit {
        let lock = self.lock_for(device_id, alert_type);
        CooldownPermit {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of pairs currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_for(&self, device_id: &str, alert_type: AlertType) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop entries nobody holds any more.
        locks.retain(|_, weak| weak.strong_count() > 0);

        let key = (device_id.to_string(), alert_type);
        if let Some(existing) = locks.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(key, Arc::downgrade(&lock));
        lock
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(minute: u32, second: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, minute, second).unwrap()
    }

    #[test]
    fn eligible_without_prior_alert() {
        let e = check_cooldown(None, at(0, 0), chrono::Duration::minutes(10));
        assert_eq!(e, Eligibility::Eligible);
    }

    #[test]
    fn suppressed_inside_window() {
        let e = check_cooldown(Some(at(0, 0)), at(5, 0), chrono::Duration::minutes(10));
        assert_matches!(
            e,
            Eligibility::Suppressed { remaining } if remaining == chrono::Duration::minutes(5)
        );
    }

    #[test]
    fn eligible_exactly_at_window_end() {
        let e = check_cooldown(Some(at(0, 0)), at(10, 0), chrono::Duration::minutes(10));
        assert!(e.is_eligible());
    }

    #[test]
    fn eligible_after_window() {
        let e = check_cooldown(Some(at(0, 0)), at(10, 1), chrono::Duration::minutes(10));
        assert!(e.is_eligible());
    }

    #[test]
    fn zero_cooldown_always_eligible() {
        let e = check_cooldown(Some(at(0, 0)), at(0, 0), chrono::Duration::zero());
        assert!(e.is_eligible());
    }

    #[tokio::test]
    async fn same_pair_is_serialized() {
        let gate = Arc::new(CooldownGate::new());
        let first = gate.acquire("esp32-01", AlertType::TemperatureHigh).await;

        let gate2 = Arc::clone(&gate);
        let waiter = tokio::spawn(async move {
            gate2.acquire("esp32-01", AlertType::TemperatureHigh).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished(), "second acquire should wait");

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("second acquire should complete after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_pairs_do_not_block() {
        let gate = CooldownGate::new();
        let _temp = gate.acquire("esp32-01", AlertType::TemperatureHigh).await;
        let humidity = tokio::time::timeout(
            Duration::from_millis(100),
            gate.acquire("esp32-01", AlertType::HumidityHigh),
        )
        .await;
        assert!(humidity.is_ok());
        let other_device = tokio::time::timeout(
            Duration::from_millis(100),
            gate.acquire("esp32-02", AlertType::TemperatureHigh),
        )
        .await;
        assert!(other_device.is_ok());
    }

    #[tokio::test]
    async fn released_pairs_are_pruned() {
        let gate = CooldownGate::new();
        drop(gate.acquire("a", AlertType::TemperatureHigh).await);
        drop(gate.acquire("b", AlertType::TemperatureHigh).await);
        // Acquiring prunes entries whose permits were dropped.
        let _c = gate.acquire("c", AlertType::HumidityHigh).await;
        assert_eq!(gate.tracked_keys(), 1);
    }
}
