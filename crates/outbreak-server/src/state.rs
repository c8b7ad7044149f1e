use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::auth::AuthConfig;
use crate::config::ServerConfig;
use crate::feed::FeedStore;
use crate::registry::GameRegistry;

pub type SharedRegistry = Arc<RwLock<GameRegistry>>;
pub type SharedFeed = Arc<RwLock<FeedStore>>;

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub feed: SharedFeed,
    pub auth: AuthConfig,
    pub sse_subscriber_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let auth = AuthConfig {
            admin_token: config.auth.admin_token.clone(),
        };
        let feed = FeedStore::with_capacity(
            config.limits.max_feed_items,
            config.limits.broadcast_capacity,
        );
        Self {
            registry: Arc::new(RwLock::new(GameRegistry::new())),
            feed: Arc::new(RwLock::new(feed)),
            auth,
            sse_subscriber_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// RAII counter for live SSE subscriptions.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
