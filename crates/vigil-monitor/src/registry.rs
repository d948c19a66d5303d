//! Session registry: at most one live reviewer channel per session.
//!
//! `connect` always wins: a second connect for the same session replaces the
//! first observer, whose channel then closes. Every registration carries a
//! generation number so that a failed push on a superseded channel can never
//! evict its replacement.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vigil_core::{PushMessage, SessionId};

use crate::shard::ShardedMap;

/// Receiving end handed to a reviewer.
///
/// Yields `None` once the registration was superseded or removed and all
/// buffered messages have been read. Dropping it closes the channel; the
/// registry notices on the next push.
#[derive(Debug)]
pub struct ReviewerChannel {
    session_id: SessionId,
    generation: u64,
    rx: mpsc::UnboundedReceiver<PushMessage>,
}

impl ReviewerChannel {
    /// Session this channel observes
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Registration generation (increases with every connect)
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Option<PushMessage> {
        self.rx.recv().await
    }

    /// Take a buffered message without waiting
    pub fn try_recv(&mut self) -> Option<PushMessage> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving; later pushes to this session fail and disconnect it
    pub fn close(&mut self) {
        self.rx.close();
    }
}

struct Observer {
    generation: u64,
    tx: mpsc::UnboundedSender<PushMessage>,
}

/// Tracks the live reviewer channel of every session
pub struct SessionRegistry {
    observers: ShardedMap<SessionId, Observer>,
    next_generation: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: ShardedMap::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Register the caller as the sole observer of `session_id`
    pub fn connect(&self, session_id: &SessionId) -> ReviewerChannel {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .observers
            .shard(session_id)
            .write()
            .insert(session_id.clone(), Observer { generation, tx });

        if let Some(old) = previous {
            info!(
                session = %session_id,
                superseded = old.generation,
                generation,
                "reviewer reconnected, previous channel superseded"
            );
        } else {
            info!(session = %session_id, generation, "reviewer connected");
        }

        ReviewerChannel {
            session_id: session_id.clone(),
            generation,
            rx,
        }
    }

    /// Remove the observer of `session_id`, if any
    pub fn disconnect(&self, session_id: &SessionId) {
        if self.observers.shard(session_id).write().remove(session_id).is_some() {
            info!(session = %session_id, "reviewer disconnected");
        }
    }

    /// Returns true if an open reviewer channel is registered
    #[must_use]
    pub fn is_live(&self, session_id: &SessionId) -> bool {
        self.observers
            .shard(session_id)
            .read()
            .get(session_id)
            .is_some_and(|o| !o.tx.is_closed())
    }

    /// Number of registered observers
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver `message` to the session's observer.
    ///
    /// Returns true if it was handed to an open channel. A closed channel is
    /// removed and the failure is only logged.
    pub fn push(&self, session_id: &SessionId, message: PushMessage) -> bool {
        let shard = self.observers.shard(session_id);

        let generation = {
            let observers = shard.read();
            let Some(observer) = observers.get(session_id) else {
                debug!(session = %session_id, kind = message.kind(), "no reviewer, push dropped");
                return false;
            };
            match observer.tx.send(message) {
                Ok(()) => return true,
                Err(_) => observer.generation,
            }
        };

        warn!(session = %session_id, generation, "reviewer channel closed, disconnecting");
        let mut observers = shard.write();
        if observers
            .get(session_id)
            .is_some_and(|o| o.generation == generation)
        {
            observers.remove(session_id);
        }
        false
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_core::AnalysisResult;

    fn message(session: &str) -> PushMessage {
        PushMessage::AnalysisResult(AnalysisResult::mock(SessionId::from(session), Utc::now()))
    }

    #[test]
    fn test_connect_push_receive() {
        let registry = SessionRegistry::new();
        let session = SessionId::from("s-1");
        let mut channel = registry.connect(&session);

        assert!(registry.is_live(&session));
        let sent = message("s-1");
        assert!(registry.push(&session, sent.clone()));
        assert_eq!(channel.try_recv(), Some(sent));
        assert!(channel.try_recv().is_none());
    }

    #[test]
    fn test_connect_disconnect_push_is_noop() {
        let registry = SessionRegistry::new();
        let session = SessionId::from("s-1");
        let mut channel = registry.connect(&session);
        registry.disconnect(&session);

        assert!(!registry.is_live(&session));
        assert!(!registry.push(&session, message("s-1")));
        assert!(channel.try_recv().is_none());
        registry.disconnect(&session);
    }

    #[test]
    fn test_last_connect_wins() {
        let registry = SessionRegistry::new();
        let session = SessionId::from("s-1");
        let mut first = registry.connect(&session);
        let mut second = registry.connect(&session);
        assert!(second.generation() > first.generation());

        assert!(registry.push(&session, message("s-1")));
        assert!(first.try_recv().is_none());
        assert!(second.try_recv().is_some());
        assert_eq!(registry.live_count(), 1);
    }

    #[tokio::test]
    async fn test_superseded_channel_ends() {
        let registry = SessionRegistry::new();
        let session = SessionId::from("s-1");
        let mut first = registry.connect(&session);
        let _second = registry.connect(&session);
        assert!(first.recv().await.is_none());
    }

    #[test]
    fn test_closed_channel_is_disconnected_on_push() {
        let registry = SessionRegistry::new();
        let session = SessionId::from("s-1");
        let channel = registry.connect(&session);
        drop(channel);

        assert!(!registry.is_live(&session));
        assert!(!registry.push(&session, message("s-1")));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");
        let mut chan_a = registry.connect(&a);
        let _chan_b = registry.connect(&b);
        registry.disconnect(&b);

        assert!(registry.is_live(&a));
        assert!(registry.push(&a, message("a")));
        assert!(chan_a.try_recv().is_some());
    }
}
