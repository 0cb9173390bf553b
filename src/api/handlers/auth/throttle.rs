//! Heartbeat throttle: at most one session heartbeat write per window.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Decides whether a session heartbeat should be written.
///
/// One entry per session id; stale entries are dropped on every call so the
/// map stays bounded by the number of sessions active within one window.
pub struct HeartbeatThrottle {
    window: Duration,
    entries: Mutex<HashMap<Uuid, Instant>>,
}

impl HeartbeatThrottle {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true at most once per window for a given session id.
    pub(super) async fn should_touch(&self, session_id: Uuid) -> bool {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, touched_at| touched_at.elapsed() < self.window);
        match entries.entry(session_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_call_wins_second_is_throttled() {
        let throttle = HeartbeatThrottle::new(Duration::from_secs(300));
        let session_id = Uuid::new_v4();
        assert!(throttle.should_touch(session_id).await);
        assert!(!throttle.should_touch(session_id).await);
    }

    #[tokio::test]
    async fn sessions_are_throttled_independently() {
        let throttle = HeartbeatThrottle::new(Duration::from_secs(300));
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        assert!(throttle.should_touch(first).await);
        assert!(throttle.should_touch(second).await);
        assert!(!throttle.should_touch(first).await);
    }

    #[tokio::test]
    async fn expired_entries_admit_again() {
        let throttle = HeartbeatThrottle::new(Duration::from_millis(10));
        let session_id = Uuid::new_v4();
        assert!(throttle.should_touch(session_id).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(throttle.should_touch(session_id).await);
    }

    #[tokio::test]
    async fn concurrent_callers_admit_exactly_one() {
        let throttle = Arc::new(HeartbeatThrottle::new(Duration::from_secs(300)));
        let session_id = Uuid::new_v4();

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let throttle = throttle.clone();
            tasks.push(tokio::spawn(async move {
                throttle.should_touch(session_id).await
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap_or(false) {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }
}
