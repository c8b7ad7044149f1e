use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::EntryId;
use crate::game::GameStage;

/// Which side won a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Humans,
    Zombies,
}

/// Something that happened inside a game. Emitted by the mutation and sweep
/// operations on [`crate::game::Game`] and fanned out to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        entry_id: EntryId,
    },
    PlayerLeft {
        entry_id: EntryId,
    },
    StageChanged {
        from: GameStage,
        to: GameStage,
    },
    OriginalZombieChosen {
        entry_id: EntryId,
    },
    KillReported {
        killer: EntryId,
        victim: EntryId,
        kill_time: DateTime<Utc>,
    },
    /// An infected player finished turning and is now a zombie.
    Turned {
        entry_id: EntryId,
    },
    Starved {
        entry_id: EntryId,
        starve_time: DateTime<Utc>,
    },
    /// End-of-game cleanup brought a dead player back because their
    /// starvation fell after the ending instant.
    Resurrected {
        entry_id: EntryId,
    },
    GameEnded {
        winner: Faction,
        at: DateTime<Utc>,
    },
}
