use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::{EntryId, PlayerEntry, PlayerState, UserId};
use crate::error::GameError;
use crate::events::{Faction, GameEvent};
use crate::rules::GameRules;

pub type GameId = Uuid;

/// The linear game lifecycle. Stages advance (and retreat) one step at a
/// time under administrator control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStage {
    Created,
    OpenRegistration,
    ClosedRegistration,
    ChooseZombie,
    Started,
    RevealZombie,
    Ended,
}

impl GameStage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::OpenRegistration),
            Self::OpenRegistration => Some(Self::ClosedRegistration),
            Self::ClosedRegistration => Some(Self::ChooseZombie),
            Self::ChooseZombie => Some(Self::Started),
            Self::Started => Some(Self::RevealZombie),
            Self::RevealZombie => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            Self::Created => None,
            Self::OpenRegistration => Some(Self::Created),
            Self::ClosedRegistration => Some(Self::OpenRegistration),
            Self::ChooseZombie => Some(Self::ClosedRegistration),
            Self::Started => Some(Self::ChooseZombie),
            Self::RevealZombie => Some(Self::Started),
            Self::Ended => Some(Self::RevealZombie),
        }
    }
}

impl std::fmt::Display for GameStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::OpenRegistration => "Open registration",
            Self::ClosedRegistration => "Registration closed",
            Self::ChooseZombie => "Choosing original zombie",
            Self::Started => "In progress",
            Self::RevealZombie => "Original zombie revealed",
            Self::Ended => "Ended",
        };
        f.write_str(name)
    }
}

/// How to pick the original zombie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginalZombieChoice {
    /// Uniformly from the volunteer pool.
    Random,
    Entry(EntryId),
}

/// One game of humans versus zombies: its stage, its rules, and every
/// player entry. All mutation goes through the methods here so the
/// stage and state machines stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub display_name: String,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    pub stage: GameStage,
    pub rules: GameRules,
    pub entries: Vec<PlayerEntry>,
    next_entry_id: EntryId,
}

impl Game {
    pub fn new(display_name: impl Into<String>, rules: GameRules, created: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            created,
            started: None,
            ended: None,
            stage: GameStage::Created,
            rules,
            entries: Vec::new(),
            next_entry_id: 1,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.stage >= GameStage::Started && self.stage < GameStage::Ended
    }

    pub fn registration_open(&self) -> bool {
        self.stage == GameStage::OpenRegistration
    }

    pub fn revealed_original_zombie(&self) -> bool {
        self.stage >= GameStage::RevealZombie
    }

    pub fn entry(&self, entry_id: EntryId) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    pub fn entry_mut(&mut self, entry_id: EntryId) -> Option<&mut PlayerEntry> {
        self.entries.iter_mut().find(|e| e.entry_id == entry_id)
    }

    pub fn entry_by_user(&self, user_id: UserId) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| e.user_id == user_id)
    }

    pub fn entry_by_tag(&self, tag: &str) -> Option<&PlayerEntry> {
        let tag = tag.to_ascii_uppercase();
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// At most one entry is the original zombie at any time.
    pub fn original_zombie(&self) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| e.state.is_original_zombie())
    }

    /// Entries that volunteered for the original zombie draw.
    pub fn original_zombie_pool(&self) -> impl Iterator<Item = &PlayerEntry> {
        self.entries.iter().filter(|e| e.original_pool)
    }

    /// Enter the game. Registration must be open; one entry per user.
    pub fn join(
        &mut self,
        user_id: UserId,
        original_pool: bool,
        notify: bool,
    ) -> Result<EntryId, GameError> {
        if !self.registration_open() {
            return Err(GameError::RegistrationClosed);
        }
        if self.entries.iter().any(|e| e.user_id == user_id) {
            return Err(GameError::AlreadyEntered);
        }
        let tag = self.unique_tag()?;
        let entry_id = self.next_entry_id;
        self.next_entry_id += 1;
        let mut entry = PlayerEntry::new(entry_id, user_id, tag);
        entry.original_pool = original_pool;
        entry.notify = notify;
        self.entries.push(entry);
        Ok(entry_id)
    }

    /// Withdraw from the game. Registration must still be open.
    pub fn leave(&mut self, user_id: UserId) -> Result<EntryId, GameError> {
        if !self.registration_open() {
            return Err(GameError::RegistrationClosed);
        }
        let index = self
            .entries
            .iter()
            .position(|e| e.user_id == user_id)
            .ok_or_else(|| GameError::PlayerNotFound(user_id.to_string()))?;
        Ok(self.entries.remove(index).entry_id)
    }

    // Bounded retry: validated rules leave a tag space far larger than any
    // roster, but a hand-built game must not be able to spin this forever.
    fn unique_tag(&self) -> Result<String, GameError> {
        for _ in 0..1000 {
            let tag = PlayerEntry::generate_tag(self.rules.tag_length);
            if !self.entries.iter().any(|e| e.tag == tag) {
                return Ok(tag);
            }
        }
        Err(GameError::TagSpaceExhausted)
    }

    /// Advance one stage. Entering Started stamps the start time and
    /// refreshes the original zombie's death date; entering Ended stamps
    /// the end time and resurrects the dead whose starvation falls after
    /// it, so unreported last-minute kills stay possible.
    pub fn next_stage(&mut self, at: DateTime<Utc>) -> Result<Vec<GameEvent>, GameError> {
        let from = self.stage;
        let to = from.next().ok_or_else(|| GameError::WrongStage {
            current: from,
            needed: GameStage::RevealZombie,
            reason: "the game is already over".to_string(),
        })?;

        if to == GameStage::Started {
            let oz = self
                .entries
                .iter()
                .position(|e| e.state.is_original_zombie())
                .ok_or(GameError::NoOriginalZombie)?;
            self.started = Some(at);
            self.entries[oz].make_original_zombie(at)?;
        }

        self.stage = to;
        let mut events = vec![GameEvent::StageChanged { from, to }];

        if to == GameStage::Ended {
            self.ended = Some(at);
            for entry in &mut self.entries {
                if entry.state.is_dead() && entry.starve_date.is_some_and(|s| s > at) {
                    entry.force_to_zombie(at, &self.rules)?;
                    events.push(GameEvent::Resurrected {
                        entry_id: entry.entry_id,
                    });
                }
            }
            events.push(GameEvent::GameEnded {
                winner: self.winner(),
                at,
            });
        }
        Ok(events)
    }

    /// Retreat one stage. Leaving Started or Ended clears their timestamps;
    /// backing out of ChooseZombie resets every entry.
    pub fn previous_stage(&mut self) -> Result<GameEvent, GameError> {
        let from = self.stage;
        let to = from.prev().ok_or_else(|| GameError::WrongStage {
            current: from,
            needed: GameStage::OpenRegistration,
            reason: "the game is already at the first stage".to_string(),
        })?;
        self.stage = to;
        match from {
            GameStage::Started => self.started = None,
            GameStage::Ended => self.ended = None,
            GameStage::ChooseZombie => {
                for entry in &mut self.entries {
                    entry.reset();
                }
            }
            _ => {}
        }
        Ok(GameEvent::StageChanged { from, to })
    }

    /// Pick the original zombie from the volunteer pool. Only allowed during
    /// the ChooseZombie stage; any previous choice is reset first.
    pub fn choose_original_zombie(
        &mut self,
        choice: OriginalZombieChoice,
        at: DateTime<Utc>,
    ) -> Result<EntryId, GameError> {
        if self.stage != GameStage::ChooseZombie {
            return Err(GameError::WrongStage {
                current: self.stage,
                needed: GameStage::ChooseZombie,
                reason: "the original zombie can only be chosen now".to_string(),
            });
        }
        let index = match choice {
            OriginalZombieChoice::Random => {
                let pool: Vec<usize> = self
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.original_pool)
                    .map(|(i, _)| i)
                    .collect();
                if pool.is_empty() {
                    return Err(GameError::NoCandidates);
                }
                pool[rand::rng().random_range(0..pool.len())]
            }
            OriginalZombieChoice::Entry(entry_id) => {
                let index = self
                    .entries
                    .iter()
                    .position(|e| e.entry_id == entry_id)
                    .ok_or_else(|| GameError::PlayerNotFound(entry_id.to_string()))?;
                if !self.entries[index].original_pool {
                    return Err(GameError::NoCandidates);
                }
                index
            }
        };
        if let Some(previous) = self
            .entries
            .iter()
            .position(|e| e.state.is_original_zombie())
            && previous != index
        {
            self.entries[previous].reset();
        }
        self.entries[index].make_original_zombie(at)?;
        Ok(self.entries[index].entry_id)
    }

    /// Report that `killer_user` tagged the player carrying `victim_tag`.
    /// Returns the (killer, victim) entry ids on success.
    pub fn report_kill(
        &mut self,
        killer_user: UserId,
        victim_tag: &str,
        kill_time: DateTime<Utc>,
        report_time: DateTime<Utc>,
    ) -> Result<(EntryId, EntryId), GameError> {
        if !self.in_progress() {
            return Err(GameError::WrongStage {
                current: self.stage,
                needed: GameStage::Started,
                reason: "the game is not in progress".to_string(),
            });
        }
        let killer_index = self
            .entries
            .iter()
            .position(|e| e.user_id == killer_user)
            .ok_or_else(|| GameError::PlayerNotFound(killer_user.to_string()))?;
        let victim_tag = victim_tag.to_ascii_uppercase();
        let victim_index = self
            .entries
            .iter()
            .position(|e| e.tag == victim_tag)
            .ok_or_else(|| GameError::PlayerNotFound(victim_tag.clone()))?;
        if killer_index == victim_index {
            return Err(GameError::WrongState {
                current: self.entries[killer_index].state,
                needed: PlayerState::Human,
                reason: "you cannot kill yourself".to_string(),
            });
        }

        let (killer, victim) = if killer_index < victim_index {
            let (left, right) = self.entries.split_at_mut(victim_index);
            (&mut left[killer_index], &mut right[0])
        } else {
            let (left, right) = self.entries.split_at_mut(killer_index);
            (&mut right[0], &mut left[victim_index])
        };
        PlayerEntry::record_kill(killer, victim, kill_time, report_time, &self.rules)?;
        Ok((killer.entry_id, victim.entry_id))
    }

    /// Force the game over, advancing through any remaining stages.
    pub fn end(&mut self, at: DateTime<Utc>) -> Result<Vec<GameEvent>, GameError> {
        if !self.in_progress() {
            return Err(GameError::WrongStage {
                current: self.stage,
                needed: GameStage::Started,
                reason: "the game cannot be ended right now".to_string(),
            });
        }
        let mut events = Vec::new();
        while self.stage < GameStage::Ended {
            events.extend(self.next_stage(at)?);
        }
        Ok(events)
    }

    fn winner(&self) -> Faction {
        if self.entries.iter().any(|e| e.state.is_human()) {
            Faction::Humans
        } else {
            Faction::Zombies
        }
    }

    /// The periodic sweep. No-op unless the game is in progress; otherwise
    /// checks the zombie win, turns overdue infected, starves overdue
    /// zombies, and checks the human win. Idempotent for a fixed `now`.
    pub fn update(&mut self, now: DateTime<Utc>) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();
        if !self.in_progress() {
            return Ok(events);
        }
        self.check_zombie_win(&mut events)?;
        if self.in_progress() {
            self.turn_infected(now, &mut events);
            self.starve_overdue(now, &mut events)?;
            self.check_human_win(now, &mut events)?;
        }
        if !events.is_empty() {
            tracing::debug!(game_id = %self.id, count = events.len(), "sweep raised events");
        }
        Ok(events)
    }

    /// Humans all gone: the game ends at the moment the last one fell.
    fn check_zombie_win(&mut self, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        if self.entries.iter().any(|e| e.state.is_human()) {
            return Ok(());
        }
        let last_fall = self
            .entries
            .iter()
            .filter(|e| e.state.is_undead() || e.state.is_infected())
            .filter_map(|e| e.death_date)
            .max();
        if let Some(end_time) = last_fall {
            events.extend(self.end(end_time)?);
        }
        Ok(())
    }

    fn turn_infected(&mut self, now: DateTime<Utc>, events: &mut Vec<GameEvent>) {
        for entry in &mut self.entries {
            if entry.state.is_infected() && entry.death_date.is_some_and(|d| now >= d) {
                entry.state = PlayerState::Zombie;
                events.push(GameEvent::Turned {
                    entry_id: entry.entry_id,
                });
            }
        }
    }

    /// Starve zombies past their feeding time, stamped with the projected
    /// starvation instant rather than the sweep time.
    fn starve_overdue(
        &mut self,
        now: DateTime<Utc>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        for entry in &mut self.entries {
            if !entry.state.is_undead() {
                continue;
            }
            let delta = entry.time_since_last_feeding(now, &self.rules)?;
            if delta >= self.rules.starve_duration() {
                let starve_time = entry.projected_starve_time(&self.rules)?;
                entry.starve(starve_time)?;
                events.push(GameEvent::Starved {
                    entry_id: entry.entry_id,
                    starve_time,
                });
            }
        }
        Ok(())
    }

    /// Zombies all starved and none of the dead can still report a kill:
    /// the humans win, at the moment the last zombie starved.
    fn check_human_win(
        &mut self,
        now: DateTime<Utc>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let threats = self
            .entries
            .iter()
            .any(|e| e.state.is_undead() || e.state.is_infected());
        if threats {
            return Ok(());
        }
        let dead: Vec<&PlayerEntry> = self
            .entries
            .iter()
            .filter(|e| e.state.is_dead())
            .collect();
        if dead.iter().any(|e| e.can_report_kill(now, &self.rules)) {
            return Ok(());
        }
        let last_starve = dead.iter().filter_map(|e| e.starve_date).max();
        if let Some(end_time) = last_starve {
            events.extend(self.end(end_time)?);
        }
        Ok(())
    }

    /// How long the entry survived as a human, in game time. Humans and the
    /// original zombie have no survival time.
    pub fn survival_time(&self, entry: &PlayerEntry) -> Result<Option<Duration>, GameError> {
        if entry.state.is_human() || entry.state.is_original_zombie() {
            return Ok(None);
        }
        match (self.started, entry.death_date) {
            (Some(started), Some(death)) => Ok(Some(self.rules.calendar.elapsed(started, death)?)),
            _ => Ok(None),
        }
    }

    /// How long the entry lasted as a zombie, in game time. Walking zombies
    /// only get one once the game is over.
    pub fn undead_time(&self, entry: &PlayerEntry) -> Result<Option<Duration>, GameError> {
        if entry.state.is_human() {
            return Ok(None);
        }
        if entry.state.is_dead() {
            return match (entry.death_date, entry.starve_date) {
                (Some(death), Some(starve)) => {
                    Ok(Some(self.rules.calendar.elapsed(death, starve)?))
                }
                _ => Ok(None),
            };
        }
        match (entry.death_date, self.ended) {
            (Some(death), Some(ended)) if !self.in_progress() && death <= ended => {
                Ok(Some(self.rules.calendar.elapsed(death, ended)?))
            }
            _ => Ok(None),
        }
    }
}
