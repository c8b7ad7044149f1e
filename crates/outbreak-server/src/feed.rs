use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use outbreak_core::events::GameEvent;
use outbreak_core::game::GameId;

/// Default maximum number of feed items kept before the oldest are evicted.
const DEFAULT_MAX_FEED_ITEMS: usize = 500;

/// Default broadcast channel capacity for feed fan-out.
const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// One item on the public game feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub game_id: GameId,
    #[serde(flatten)]
    pub event: GameEvent,
}

/// In-memory, bounded feed with broadcast fan-out.
pub struct FeedStore {
    items: VecDeque<FeedItem>,
    broadcast_tx: broadcast::Sender<FeedItem>,
    max_items: usize,
    next_seq: u64,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_FEED_ITEMS, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a FeedStore with configurable capacity limits.
    pub fn with_capacity(max_items: usize, broadcast_capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            items: VecDeque::new(),
            broadcast_tx,
            max_items,
            next_seq: 1,
        }
    }

    /// Record a game event on the feed. Evicts the oldest item if at
    /// capacity, and broadcasts the item to all subscribers.
    pub fn push(&mut self, game_id: GameId, at: DateTime<Utc>, event: GameEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let item = FeedItem {
            seq,
            at,
            game_id,
            event,
        };
        let _ = self.broadcast_tx.send(item.clone());
        self.items.push_back(item);
        while self.items.len() > self.max_items {
            self.items.pop_front();
        }
        seq
    }

    /// Record a batch of events stamped with the same instant.
    pub fn push_all(
        &mut self,
        game_id: GameId,
        at: DateTime<Utc>,
        events: impl IntoIterator<Item = GameEvent>,
    ) {
        for event in events {
            self.push(game_id, at, event);
        }
    }

    /// The most recent `count` items, newest first.
    pub fn recent(&self, count: usize) -> Vec<&FeedItem> {
        self.items.iter().rev().take(count).collect()
    }

    /// Subscribe to the broadcast channel for new items.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedItem> {
        self.broadcast_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::game::GameStage;
    use uuid::Uuid;

    fn stage_event() -> GameEvent {
        GameEvent::StageChanged {
            from: GameStage::Created,
            to: GameStage::OpenRegistration,
        }
    }

    #[test]
    fn push_assigns_increasing_seq() {
        let mut feed = FeedStore::new();
        let game_id = Uuid::new_v4();
        let at = Utc::now();
        let first = feed.push(game_id, at, stage_event());
        let second = feed.push(game_id, at, GameEvent::PlayerJoined { entry_id: 1 });
        assert!(second > first);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn eviction_at_capacity() {
        let mut feed = FeedStore::with_capacity(2, 16);
        let game_id = Uuid::new_v4();
        let at = Utc::now();
        for i in 1..=3 {
            feed.push(game_id, at, GameEvent::PlayerJoined { entry_id: i });
        }
        assert_eq!(feed.len(), 2);
        let recent = feed.recent(10);
        assert_eq!(recent[0].seq, 3);
        assert_eq!(recent[1].seq, 2);
    }

    #[test]
    fn recent_returns_newest_first() {
        let mut feed = FeedStore::new();
        let game_id = Uuid::new_v4();
        let at = Utc::now();
        feed.push(game_id, at, stage_event());
        feed.push(game_id, at, GameEvent::PlayerJoined { entry_id: 7 });
        let recent = feed.recent(1);
        assert_eq!(recent.len(), 1);
        assert!(matches!(
            recent[0].event,
            GameEvent::PlayerJoined { entry_id: 7 }
        ));
    }

    #[tokio::test]
    async fn subscribers_see_new_items() {
        let mut feed = FeedStore::new();
        let mut rx = feed.subscribe();
        let game_id = Uuid::new_v4();
        feed.push(game_id, Utc::now(), stage_event());
        let item = rx.recv().await.unwrap();
        assert_eq!(item.seq, 1);
        assert_eq!(item.game_id, game_id);
    }

    #[test]
    fn feed_item_serializes_with_flattened_event() {
        let item = FeedItem {
            seq: 4,
            at: "2026-04-22T14:15:00Z".parse().unwrap(),
            game_id: Uuid::nil(),
            event: GameEvent::PlayerJoined { entry_id: 2 },
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["seq"], 4);
        assert_eq!(json["kind"], "player_joined");
        assert_eq!(json["entry_id"], 2);
    }
}
