use thiserror::Error;

use crate::game::GameStage;
use crate::entry::PlayerState;

/// Domain-rule violations. Most of these surface when players try to cheat
/// (non-chronological kill reports, acting in the wrong stage), so callers
/// should turn them into friendly errors rather than treating them as bugs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game is {current}, must be {needed}: {reason}")]
    WrongStage {
        current: GameStage,
        needed: GameStage,
        reason: String,
    },

    #[error("player is {current}, must be {needed}: {reason}")]
    WrongState {
        current: PlayerState,
        needed: PlayerState,
        reason: String,
    },

    #[error("{0}")]
    InvalidTime(String),

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("player already has an entry in this game")]
    AlreadyEntered,

    #[error("registration is closed")]
    RegistrationClosed,

    #[error("no original zombie has been chosen")]
    NoOriginalZombie,

    #[error("no candidates in the original zombie pool")]
    NoCandidates,

    #[error("tag_length must be 2-64, got {0}")]
    InvalidTagLength(usize),

    #[error("every free kill tag of this length is already assigned")]
    TagSpaceExhausted,

    #[error("ignore_weekdays only accepts ISO weekday numbers 1-7, got {0}")]
    InvalidWeekday(u8),

    #[error("timezone offset {0} minutes is out of range")]
    InvalidTimezoneOffset(i32),

    #[error("every weekday is ignored, game time cannot advance")]
    AllDaysIgnored,
}
