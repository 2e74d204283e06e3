use crate::session::cleanup::{CLEANUP_INTERVAL_SECS, SESSION_TTL_DAYS, is_expired};
use crate::session::types::{DialogState, SessionContext};
use crate::utils::TrashdayError;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, TrashdayError>;

pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

struct Slot {
    context: SessionContext,
    // Key of this sender in `Sessions::order`
    seq: u64,
}

#[derive(Default)]
struct Sessions {
    slots: HashMap<String, Slot>,
    // Access sequence -> sender, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl Sessions {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Marks `sender_id` as most recently used. Returns its slot when present.
    fn touch(&mut self, sender_id: &str) -> Option<&mut Slot> {
        let seq = self.bump();
        let slot = self.slots.get_mut(sender_id)?;
        self.order.remove(&slot.seq);
        self.order.insert(seq, sender_id.to_string());
        slot.seq = seq;
        Some(slot)
    }

    fn insert(&mut self, sender_id: &str, context: SessionContext) {
        let seq = self.bump();
        self.order.insert(seq, sender_id.to_string());
        if let Some(previous) = self
            .slots
            .insert(sender_id.to_string(), Slot { context, seq })
        {
            self.order.remove(&previous.seq);
        }
    }

    fn evict_least_recent(&mut self) -> Option<String> {
        let (_, victim) = self.order.pop_first()?;
        self.slots.remove(&victim);
        Some(victim)
    }

    fn remove_expired(&mut self, ttl: ChronoDuration) -> usize {
        let now = Utc::now();
        let before = self.slots.len();
        let order = &mut self.order;
        self.slots.retain(|_, slot| {
            let keep = !is_expired(slot.context.last_accessed, ttl, now);
            if !keep {
                order.remove(&slot.seq);
            }
            keep
        });
        before - self.slots.len()
    }
}

/// In-memory per-sender dialog state, bounded by capacity and idle TTL.
///
/// Owned by the gateway and shared with the router; there is no global
/// registry.
pub struct SessionManager {
    sessions: Arc<RwLock<Sessions>>,
    capacity: usize,
    ttl: ChronoDuration,
}

impl SessionManager {
    pub fn new(capacity: usize) -> Self {
        Self::with_ttl(capacity, ChronoDuration::days(SESSION_TTL_DAYS))
    }

    pub fn with_ttl(capacity: usize, ttl: ChronoDuration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ensures a session exists for `sender_id`, creating one in
    /// `AwaitingMenu` when absent. Registering an existing sender only
    /// refreshes its access time.
    pub async fn register(&self, sender_id: &str) {
        let mut guard = self.sessions.write().await;

        if let Some(slot) = guard.touch(sender_id) {
            slot.context.touch();
            return;
        }

        if guard.slots.len() >= self.capacity {
            if let Some(evicted) = guard.evict_least_recent() {
                debug!(sender_id = %evicted, "Session capacity reached, evicted least recent");
            }
        }

        guard.insert(sender_id, SessionContext::new(sender_id));
        debug!(sender_id = %sender_id, "Registered new session");
    }

    pub async fn read_context(&self, sender_id: &str) -> Option<DialogState> {
        let guard = self.sessions.read().await;
        guard.slots.get(sender_id).map(|slot| slot.context.state)
    }

    pub async fn update_context(&self, sender_id: &str, state: DialogState) -> Result<()> {
        let mut guard = self.sessions.write().await;

        match guard.touch(sender_id) {
            Some(slot) => {
                slot.context.set_state(state);
                Ok(())
            }
            None => Err(TrashdayError::session(sender_id, "Session not found")),
        }
    }

    /// Returns a copy of the session for `sender_id`.
    pub async fn get_session(&self, sender_id: &str) -> Option<SessionContext> {
        let guard = self.sessions.read().await;
        guard.slots.get(sender_id).map(|slot| slot.context.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.slots.len()
    }

    /// Drops sessions idle for longer than the TTL. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut guard = self.sessions.write().await;
        guard.remove_expired(self.ttl)
    }

    /// Starts a background task that expires idle sessions every hour.
    ///
    /// Returns a JoinHandle for graceful shutdown coordination and a shutdown sender
    /// to signal the task to stop.
    pub fn start_cleanup_task(
        &self,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::mpsc::Sender<()>) {
        let sessions = Arc::clone(&self.sessions);
        let ttl = self.ttl;
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = sessions.write().await.remove_expired(ttl);
                        if removed > 0 {
                            info!(removed = removed, "Expired idle sessions");
                        } else {
                            debug!("Session cleanup cycle found nothing to expire");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Cleanup task received shutdown signal, completing...");
                        break;
                    }
                }
            }
        });

        (handle, shutdown_tx)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_creates_default_context() {
        let manager = SessionManager::default();
        manager.register("U1").await;

        assert_eq!(manager.session_count().await, 1);
        assert_eq!(manager.read_context("U1").await, Some(DialogState::AwaitingMenu));
    }

    #[tokio::test]
    async fn test_register_twice_keeps_one_entry() {
        let manager = SessionManager::default();
        manager.register("U1").await;
        manager
            .update_context("U1", DialogState::AwaitingTerm)
            .await
            .unwrap();
        manager.register("U1").await;

        assert_eq!(manager.session_count().await, 1);
        // Re-registering must not reset state
        assert_eq!(manager.read_context("U1").await, Some(DialogState::AwaitingTerm));
    }

    #[tokio::test]
    async fn test_distinct_senders_are_independent() {
        let manager = SessionManager::default();
        manager.register("U1").await;
        manager.register("U2").await;
        manager
            .update_context("U2", DialogState::AwaitingGarbageType)
            .await
            .unwrap();

        assert_eq!(manager.session_count().await, 2);
        assert_eq!(manager.read_context("U1").await, Some(DialogState::AwaitingMenu));
        assert_eq!(
            manager.read_context("U2").await,
            Some(DialogState::AwaitingGarbageType)
        );
    }

    #[tokio::test]
    async fn test_update_unknown_sender_fails() {
        let manager = SessionManager::default();
        let result = manager.update_context("nobody", DialogState::AwaitingTerm).await;
        assert!(matches!(result, Err(TrashdayError::Session { .. })));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let manager = SessionManager::new(2);
        manager.register("U1").await;
        manager.register("U2").await;
        // Touch U1 so U2 becomes the least recent
        manager.register("U1").await;
        manager.register("U3").await;

        assert_eq!(manager.session_count().await, 2);
        assert!(manager.get_session("U1").await.is_some());
        assert!(manager.get_session("U2").await.is_none());
        assert!(manager.get_session("U3").await.is_some());
    }

    #[tokio::test]
    async fn test_update_context_refreshes_recency() {
        let manager = SessionManager::new(2);
        manager.register("U1").await;
        manager.register("U2").await;
        manager
            .update_context("U1", DialogState::AwaitingTerm)
            .await
            .unwrap();
        manager.register("U3").await;

        assert!(manager.get_session("U1").await.is_some());
        assert!(manager.get_session("U2").await.is_none());
    }

    #[test]
    fn test_access_order_tracks_slots() {
        let mut sessions = Sessions::default();
        for id in ["U1", "U2", "U3"] {
            sessions.insert(id, SessionContext::new(id));
        }
        assert!(sessions.touch("U1").is_some());
        assert!(sessions.touch("nobody").is_none());
        assert_eq!(sessions.order.len(), 3);

        assert_eq!(sessions.evict_least_recent().as_deref(), Some("U2"));
        assert_eq!(sessions.evict_least_recent().as_deref(), Some("U3"));
        assert_eq!(sessions.evict_least_recent().as_deref(), Some("U1"));
        assert_eq!(sessions.evict_least_recent(), None);
        assert!(sessions.slots.is_empty());
    }

    #[test]
    fn test_expiry_drops_order_entries() {
        let mut sessions = Sessions::default();
        sessions.insert("U1", SessionContext::new("U1"));
        sessions.insert("U2", SessionContext::new("U2"));
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(sessions.remove_expired(ChronoDuration::zero()), 2);
        assert!(sessions.order.is_empty());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let manager = SessionManager::new(0);
        assert_eq!(manager.capacity(), 1);
        manager.register("U1").await;
        manager.register("U2").await;
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired_with_zero_ttl() {
        let manager = SessionManager::with_ttl(10, ChronoDuration::zero());
        manager.register("U1").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(manager.cleanup_expired().await, 1);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_fresh_sessions() {
        let manager = SessionManager::default();
        manager.register("U1").await;
        assert_eq!(manager.cleanup_expired().await, 0);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_signal() {
        let manager = SessionManager::default();
        let (handle, shutdown) = manager.start_cleanup_task();
        shutdown.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
