//! In-memory session store
//!
//! Maps account id → session token for the lifetime of the process.
//! No eviction, expiry or persistence; re-authorizing an account replaces
//! its token.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::client::{AccountId, SessionToken};

/// Storage for authorized sessions, injected into handlers via `AppState`
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Token stored for `account`, if any
    async fn get(&self, account: AccountId) -> Option<SessionToken>;

    /// Store `token` for `account`, returning the token it replaced
    async fn put(&self, account: AccountId, token: SessionToken) -> Option<SessionToken>;

    async fn contains(&self, account: AccountId) -> bool;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// `SessionStore` backed by a `HashMap` behind an async `RwLock`
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<AccountId, SessionToken>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, account: AccountId) -> Option<SessionToken> {
        self.sessions.read().await.get(&account).cloned()
    }

    async fn put(&self, account: AccountId, token: SessionToken) -> Option<SessionToken> {
        self.sessions.write().await.insert(account, token)
    }

    async fn contains(&self, account: AccountId) -> bool {
        self.sessions.read().await.contains_key(&account)
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
