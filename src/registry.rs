//! Conversation-handle registry.
//!
//! The one piece of cross-request shared mutable state: durable conversation
//! history keyed by (application, user, session).  It is constructed once at
//! process start and injected through [`crate::state::AppState`].
//!
//! Two requests may concurrently discover "no handle yet" for the same key;
//! [`SessionRegistry::get_or_create`] resolves that under a single lock, so
//! both requests end up on the same registered handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One remembered turn in a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Durable per-session history.  Appends only; never resets.
#[derive(Debug, Default)]
pub struct ConversationHandle {
    turns: Mutex<Vec<Turn>>,
}

impl ConversationHandle {
    pub fn history(&self) -> Vec<Turn> {
        lock_unpoisoned(&self.turns).clone()
    }

    /// Record one completed exchange: the user turn and the assistant turn.
    pub fn append_exchange(&self, user_text: &str, assistant_text: &str) {
        let mut turns = lock_unpoisoned(&self.turns);
        turns.push(Turn { role: Role::User, text: user_text.to_owned() });
        turns.push(Turn { role: Role::Assistant, text: assistant_text.to_owned() });
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.turns).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    app: String,
    user: String,
    session: String,
}

/// Error returned by [`SessionRegistry::create`] when the key is taken.
#[derive(Debug, thiserror::Error)]
#[error("conversation handle already exists")]
pub struct AlreadyExists;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    handles: Mutex<HashMap<HandleKey, Arc<ConversationHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, app: &str, user: &str, session: &str) -> Option<Arc<ConversationHandle>> {
        let map = lock_unpoisoned(&self.handles);
        map.get(&key(app, user, session)).cloned()
    }

    /// Insert a fresh handle; fails if one already exists for the key.
    pub fn create(
        &self,
        app: &str,
        user: &str,
        session: &str,
    ) -> Result<Arc<ConversationHandle>, AlreadyExists> {
        let mut map = lock_unpoisoned(&self.handles);
        let k = key(app, user, session);
        if map.contains_key(&k) {
            return Err(AlreadyExists);
        }
        let handle = Arc::new(ConversationHandle::default());
        map.insert(k, Arc::clone(&handle));
        Ok(handle)
    }

    /// Get the handle for a key, creating it on first use.  Runs under the
    /// registry lock, so the returned handle is always the registered one
    /// even when creations race each other or a concurrent `remove`.
    pub fn get_or_create(&self, app: &str, user: &str, session: &str) -> Arc<ConversationHandle> {
        let mut map = lock_unpoisoned(&self.handles);
        Arc::clone(map.entry(key(app, user, session)).or_default())
    }

    /// Drop the handle for a deleted session, if any.
    pub fn remove(&self, app: &str, user: &str, session: &str) {
        let mut map = lock_unpoisoned(&self.handles);
        map.remove(&key(app, user, session));
    }
}

fn key(app: &str, user: &str, session: &str) -> HandleKey {
    HandleKey {
        app: app.to_owned(),
        user: user.to_owned(),
        session: session.to_owned(),
    }
}

// A poisoned lock only means another thread panicked mid-append; the map
// itself is still usable.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_then_get_returns_same_handle() {
        let reg = SessionRegistry::new();
        let a = reg.create("csvchat", "default_user", "s1").expect("created");
        let b = reg.get("csvchat", "default_user", "s1").expect("present");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn second_create_conflicts() {
        let reg = SessionRegistry::new();
        reg.create("csvchat", "default_user", "s1").expect("created");
        assert!(reg.create("csvchat", "default_user", "s1").is_err());
    }

    #[test]
    fn history_appends_in_order_and_never_resets() {
        let reg = SessionRegistry::new();
        let h = reg.get_or_create("csvchat", "default_user", "s1");
        h.append_exchange("q1", "a1");
        h.append_exchange("q2", "a2");
        let turns = h.history();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "q1");
        assert_eq!(turns[3].text, "a2");
    }

    #[test]
    fn concurrent_first_use_yields_exactly_one_handle() {
        let reg = Arc::new(SessionRegistry::new());
        let mut joins = Vec::new();
        for _ in 0..8 {
            let reg = Arc::clone(&reg);
            joins.push(std::thread::spawn(move || {
                reg.get_or_create("csvchat", "default_user", "fresh")
            }));
        }
        let handles: Vec<_> = joins
            .into_iter()
            .map(|j| j.join().expect("thread completed"))
            .collect();
        for h in &handles[1..] {
            assert!(Arc::ptr_eq(&handles[0], h));
        }
    }

    #[test]
    fn handle_returned_after_remove_is_the_registered_one() {
        let reg = SessionRegistry::new();
        let first = reg.get_or_create("csvchat", "default_user", "s1");
        reg.remove("csvchat", "default_user", "s1");
        let second = reg.get_or_create("csvchat", "default_user", "s1");
        assert!(!Arc::ptr_eq(&first, &second));
        let registered = reg.get("csvchat", "default_user", "s1").expect("present");
        assert!(Arc::ptr_eq(&second, &registered));
    }

    #[test]
    fn creation_racing_removal_never_yields_an_orphan_handle() {
        let reg = Arc::new(SessionRegistry::new());
        let remover = {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    reg.remove("csvchat", "default_user", "churn");
                }
            })
        };
        for _ in 0..200 {
            reg.get_or_create("csvchat", "default_user", "churn");
        }
        remover.join().expect("remover completed");

        // With the races over, the next handle must be visible to readers.
        let handle = reg.get_or_create("csvchat", "default_user", "churn");
        handle.append_exchange("q", "a");
        let registered = reg.get("csvchat", "default_user", "churn").expect("present");
        assert!(Arc::ptr_eq(&handle, &registered));
        assert_eq!(registered.len(), 2);
    }

    #[test]
    fn remove_forgets_the_session() {
        let reg = SessionRegistry::new();
        reg.get_or_create("csvchat", "default_user", "s1");
        reg.remove("csvchat", "default_user", "s1");
        assert!(reg.get("csvchat", "default_user", "s1").is_none());
    }
}
