use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::calendar::GameCalendar;
use crate::error::GameError;

/// Default number of hours before an unfed zombie starves.
pub const DEFAULT_STARVE_HOURS: u32 = 48;
/// Default number of hours a zombie has to report a kill.
pub const DEFAULT_REPORT_HOURS: u32 = 3;
/// Default number of minutes it takes an infected human to turn.
pub const DEFAULT_UNDEAD_MINUTES: u32 = 60;
/// Default length of a player tag.
pub const DEFAULT_TAG_LENGTH: usize = 16;

/// Per-game rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Game-time hours before an unfed zombie starves.
    pub starve_hours: u32,
    /// Hours a zombie has to report a kill after it happened.
    pub report_hours: u32,
    /// Minutes between being tagged and rising as a zombie.
    pub undead_minutes: u32,
    /// Length of generated player tags.
    pub tag_length: usize,
    pub calendar: GameCalendar,
    pub safe_zones: Vec<String>,
    pub rules_notes: Option<String>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            starve_hours: DEFAULT_STARVE_HOURS,
            report_hours: DEFAULT_REPORT_HOURS,
            undead_minutes: DEFAULT_UNDEAD_MINUTES,
            tag_length: DEFAULT_TAG_LENGTH,
            calendar: GameCalendar::default(),
            safe_zones: default_safe_zones(),
            rules_notes: None,
        }
    }
}

fn default_safe_zones() -> Vec<String> {
    [
        "Dorm rooms",
        "Bathrooms",
        "Academic buildings",
        "Library",
        "Health center",
        "Dining halls",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl GameRules {
    /// Check invariants; also covers rules that arrived via deserialization.
    pub fn validate(&self) -> Result<(), GameError> {
        self.calendar.validate()?;
        // Length 1 leaves only 35 possible tags, fewer than a real game's
        // roster, so tag generation could exhaust the space.
        if self.tag_length < 2 || self.tag_length > 64 {
            return Err(GameError::InvalidTagLength(self.tag_length));
        }
        Ok(())
    }

    /// How long a zombie lasts without feeding, in game time.
    pub fn starve_duration(&self) -> Duration {
        Duration::hours(i64::from(self.starve_hours))
    }

    /// How long after a kill it may still be reported, in wall-clock time.
    pub fn report_window(&self) -> Duration {
        Duration::hours(i64::from(self.report_hours))
    }

    /// How long a tagged human stays infected before turning.
    pub fn undead_delay(&self) -> Duration {
        Duration::minutes(i64::from(self.undead_minutes))
    }
}
