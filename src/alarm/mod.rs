//! Alarm scheduler
//!
//! Process-wide one-shot reminders. Alarms outlive live sessions: a reminder
//! set during a conversation still fires after the session stops. Expiry is
//! delivered as an [`AlarmRing`] on the channel handed out at construction;
//! the announcer (see [`announcer`]) turns rings into spoken notifications.

pub mod announcer;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Identifier of a scheduled alarm
pub type AlarmId = u64;

/// A fired alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRing {
    pub id: AlarmId,
    pub label: String,
}

/// Read-only snapshot of a scheduled alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmInfo {
    /// Unique identifier, monotonically assigned
    pub id: AlarmId,
    /// Absolute fire time
    pub fire_at: DateTime<Utc>,
    /// Human-readable label spoken when the alarm rings
    pub label: String,
}

struct Entry {
    info: AlarmInfo,
    timer: tokio::task::JoinHandle<()>,
}

struct Inner {
    next_id: AlarmId,
    alarms: HashMap<AlarmId, Entry>,
}

/// Schedules one-shot labeled timers
pub struct AlarmScheduler {
    inner: std::sync::Arc<Mutex<Inner>>,
    ring_tx: mpsc::UnboundedSender<AlarmRing>,
}

impl AlarmScheduler {
    /// Create a scheduler and the channel its rings arrive on
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AlarmRing>) {
        let (ring_tx, ring_rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: std::sync::Arc::new(Mutex::new(Inner {
                    next_id: 1,
                    alarms: HashMap::new(),
                })),
                ring_tx,
            },
            ring_rx,
        )
    }

    /// Register a one-shot alarm.
    ///
    /// Returns `None` without registering anything if `fire_at` is in the
    /// past (logged, never an error). Concurrent alarms are independent.
    pub fn set_alarm(&self, fire_at: DateTime<Utc>, label: impl Into<String>) -> Option<AlarmId> {
        let label = label.into();
        let delay = match (fire_at - Utc::now()).to_std() {
            Ok(delay) => delay,
            Err(_) => {
                tracing::warn!(%fire_at, %label, "ignoring alarm in the past");
                return None;
            }
        };

        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let id = inner.next_id;
        inner.next_id += 1;

        let ring_tx = self.ring_tx.clone();
        let ring_label = label.clone();
        let map = std::sync::Arc::clone(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Remove before ringing so a re-entrant list sees it gone
            if let Ok(mut inner) = map.lock() {
                inner.alarms.remove(&id);
            }
            let _ = ring_tx.send(AlarmRing {
                id,
                label: ring_label,
            });
        });

        inner.alarms.insert(
            id,
            Entry {
                info: AlarmInfo {
                    id,
                    fire_at,
                    label: label.clone(),
                },
                timer,
            },
        );

        tracing::info!(id, %fire_at, %label, "alarm set");
        Some(id)
    }

    /// Cancel an alarm; idempotent, no-op if absent or already fired
    pub fn cancel(&self, id: AlarmId) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if let Some(entry) = inner.alarms.remove(&id) {
            entry.timer.abort();
            tracing::info!(id, "alarm cancelled");
        }
    }

    /// Snapshot of currently scheduled alarms
    #[must_use]
    pub fn active(&self) -> Vec<AlarmInfo> {
        self.inner
            .lock()
            .map(|inner| {
                let mut list: Vec<AlarmInfo> =
                    inner.alarms.values().map(|e| e.info.clone()).collect();
                list.sort_by_key(|a| a.id);
                list
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn past_timestamp_registers_nothing() {
        let (scheduler, _rings) = AlarmScheduler::new();

        let id = scheduler.set_alarm(Utc::now() - ChronoDuration::minutes(5), "quá khứ");

        assert!(id.is_none());
        assert!(scheduler.active().is_empty());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (scheduler, _rings) = AlarmScheduler::new();

        let id = scheduler
            .set_alarm(Utc::now() + ChronoDuration::hours(1), "uống nước")
            .unwrap();
        assert_eq!(scheduler.active().len(), 1);

        scheduler.cancel(id);
        assert!(scheduler.active().is_empty());
        // Second cancel: same observable effect
        scheduler.cancel(id);
        assert!(scheduler.active().is_empty());
    }

    #[tokio::test]
    async fn ids_are_monotonic() {
        let (scheduler, _rings) = AlarmScheduler::new();
        let a = scheduler
            .set_alarm(Utc::now() + ChronoDuration::minutes(1), "a")
            .unwrap();
        let b = scheduler
            .set_alarm(Utc::now() + ChronoDuration::minutes(2), "b")
            .unwrap();
        assert!(b > a);
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_rings_once_with_label_and_is_removed() {
        let (scheduler, mut rings) = AlarmScheduler::new();

        scheduler
            .set_alarm(Utc::now() + ChronoDuration::minutes(10), "Gọi mẹ")
            .unwrap();
        assert_eq!(scheduler.active().len(), 1);

        // Fast-forward 10 minutes
        tokio::time::advance(std::time::Duration::from_secs(601)).await;

        let ring = rings.recv().await.unwrap();
        assert_eq!(ring.label, "Gọi mẹ");
        assert!(scheduler.active().is_empty());

        // Exactly once
        assert!(rings.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_alarms_both_fire() {
        let (scheduler, mut rings) = AlarmScheduler::new();
        let at = Utc::now() + ChronoDuration::minutes(1);
        scheduler.set_alarm(at, "một").unwrap();
        scheduler.set_alarm(at, "hai").unwrap();

        tokio::time::advance(std::time::Duration::from_secs(61)).await;

        let mut labels = vec![
            rings.recv().await.unwrap().label,
            rings.recv().await.unwrap().label,
        ];
        labels.sort();
        assert_eq!(labels, vec!["hai".to_string(), "một".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_alarm_never_rings() {
        let (scheduler, mut rings) = AlarmScheduler::new();
        let id = scheduler
            .set_alarm(Utc::now() + ChronoDuration::minutes(1), "hủy")
            .unwrap();
        scheduler.cancel(id);

        tokio::time::advance(std::time::Duration::from_secs(120)).await;
        assert!(rings.try_recv().is_err());
    }
}
