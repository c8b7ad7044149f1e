use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::rules::GameRules;

/// Identifier of an entry within one game.
pub type EntryId = u32;

/// Identifier of a registered user, allocated by the registration layer.
pub type UserId = Uuid;

/// Tag alphabet: uppercase ASCII plus digits, with `O` removed (zeros are
/// better).
const TAG_CHARS: &[u8] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ0123456789";

/// Where a player currently stands in the infection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Human,
    /// Tagged by a zombie, not yet turned.
    Infected,
    Zombie,
    OriginalZombie,
    /// A starved zombie.
    Dead,
    /// The original zombie, starved.
    DeadOriginalZombie,
}

impl PlayerState {
    pub fn is_human(self) -> bool {
        self == Self::Human
    }

    pub fn is_infected(self) -> bool {
        self == Self::Infected
    }

    pub fn is_undead(self) -> bool {
        matches!(self, Self::Zombie | Self::OriginalZombie)
    }

    pub fn is_dead(self) -> bool {
        matches!(self, Self::Dead | Self::DeadOriginalZombie)
    }

    pub fn is_original_zombie(self) -> bool {
        matches!(self, Self::OriginalZombie | Self::DeadOriginalZombie)
    }

    /// Player-facing name. Deliberately does not give away whether a dead
    /// zombie was the original one.
    pub fn affiliation(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Infected => "Infected",
            Self::Zombie => "Zombie",
            Self::OriginalZombie => "Original zombie",
            Self::Dead | Self::DeadOriginalZombie => "Dead",
        }
    }

    /// Administrator-facing name.
    pub fn internal_name(self) -> &'static str {
        match self {
            Self::DeadOriginalZombie => "Dead (Original Zombie)",
            other => other.affiliation(),
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.internal_name())
    }
}

/// Per-game player record: lifecycle state plus the timestamps the timing
/// rules hang off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub entry_id: EntryId,
    pub user_id: UserId,
    /// In-game player identifier, printed on the player's card.
    pub tag: String,
    pub state: PlayerState,
    /// When the player died (was tagged); for an infected player this is in
    /// the future and marks when they turn.
    pub death_date: Option<DateTime<Utc>>,
    /// Last feeding time as a zombie.
    pub feed_date: Option<DateTime<Utc>>,
    /// When the player starved.
    pub starve_date: Option<DateTime<Utc>>,
    pub kills: u32,
    pub killed_by: Option<UserId>,
    /// Volunteered for the original zombie draw.
    pub original_pool: bool,
    /// Wants to be notified when the game changes.
    pub notify: bool,
}

impl PlayerEntry {
    pub fn new(entry_id: EntryId, user_id: UserId, tag: String) -> Self {
        Self {
            entry_id,
            user_id,
            tag,
            state: PlayerState::Human,
            death_date: None,
            feed_date: None,
            starve_date: None,
            kills: 0,
            killed_by: None,
            original_pool: false,
            notify: false,
        }
    }

    /// Generate a random player tag of the given length.
    pub fn generate_tag(length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| TAG_CHARS[rng.random_range(0..TAG_CHARS.len())] as char)
            .collect()
    }

    /// Reset volatile in-game statistics back to a fresh human.
    pub fn reset(&mut self) {
        self.state = PlayerState::Human;
        self.death_date = None;
        self.feed_date = None;
        self.starve_date = None;
        self.kills = 0;
        self.killed_by = None;
    }

    /// Turn the player into the original zombie. Calling it again on an
    /// original zombie refreshes the death date (done when the game starts).
    pub fn make_original_zombie(&mut self, at: DateTime<Utc>) -> Result<(), GameError> {
        if self.state.is_human() {
            self.state = PlayerState::OriginalZombie;
            self.death_date = Some(at);
            Ok(())
        } else if self.state == PlayerState::OriginalZombie {
            self.death_date = Some(at);
            Ok(())
        } else {
            Err(GameError::WrongState {
                current: self.state,
                needed: PlayerState::Human,
                reason: "only a human can become the original zombie".to_string(),
            })
        }
    }

    /// Validate and record `killer` tagging `victim`. The caller is
    /// responsible for checking that the game is in progress.
    ///
    /// A dead killer whose kill validates (it happened before they starved)
    /// is revived in the process.
    pub fn record_kill(
        killer: &mut PlayerEntry,
        victim: &mut PlayerEntry,
        kill_time: DateTime<Utc>,
        report_time: DateTime<Utc>,
        rules: &GameRules,
    ) -> Result<(), GameError> {
        if !(killer.state.is_undead() || killer.state.is_dead()) {
            return Err(GameError::WrongState {
                current: killer.state,
                needed: PlayerState::Zombie,
                reason: "killer must be a zombie".to_string(),
            });
        }
        if kill_time > report_time {
            return Err(GameError::InvalidTime(
                "you cannot kill someone in the future".to_string(),
            ));
        }
        let after_death = killer.death_date.is_some_and(|d| kill_time <= d);
        let after_feed = killer.feed_date.is_some_and(|d| kill_time <= d);
        if after_death || after_feed {
            return Err(GameError::InvalidTime(
                "kills must be reported chronologically".to_string(),
            ));
        }
        if report_time - kill_time > rules.report_window() {
            return Err(GameError::InvalidTime(
                "kill is not within the report window".to_string(),
            ));
        }
        let starve_delta = killer.time_since_last_feeding(kill_time, rules)?;
        if starve_delta > rules.starve_duration() {
            return Err(GameError::InvalidTime(
                "killer has already starved".to_string(),
            ));
        }
        if !victim.state.is_human() {
            return Err(GameError::WrongState {
                current: victim.state,
                needed: PlayerState::Human,
                reason: "victim must be human".to_string(),
            });
        }

        killer.kills += 1;
        killer.feed_date = Some(kill_time);
        victim.death_date = Some(kill_time + rules.undead_delay());
        victim.state = PlayerState::Infected;
        victim.killed_by = Some(killer.user_id);
        if killer.state.is_dead() {
            killer.starve_date = None;
            killer.state = if killer.state.is_original_zombie() {
                PlayerState::OriginalZombie
            } else {
                PlayerState::Zombie
            };
        }
        Ok(())
    }

    /// Starve the player. Zombies only; the caller checks the game stage.
    pub fn starve(&mut self, at: DateTime<Utc>) -> Result<(), GameError> {
        if !self.state.is_undead() {
            return Err(GameError::WrongState {
                current: self.state,
                needed: PlayerState::Zombie,
                reason: "non-zombies can't starve".to_string(),
            });
        }
        self.starve_date = Some(at);
        self.state = if self.state.is_original_zombie() {
            PlayerState::DeadOriginalZombie
        } else {
            PlayerState::Dead
        };
        Ok(())
    }

    /// The reference instant the feeding clock runs from: the last feeding,
    /// or the player's own death if they have never fed.
    fn feeding_reference(&self) -> Option<DateTime<Utc>> {
        self.feed_date.or(self.death_date)
    }

    /// Game time elapsed since the last feeding. Zero when `at` is before
    /// the reference instant, or when the player was never undead at all.
    pub fn time_since_last_feeding(
        &self,
        at: DateTime<Utc>,
        rules: &GameRules,
    ) -> Result<Duration, GameError> {
        match self.feeding_reference() {
            Some(reference) if at > reference => rules.calendar.elapsed(reference, at),
            _ => Ok(Duration::zero()),
        }
    }

    /// Game time left before the player starves. Negative once overdue.
    pub fn time_before_starving(
        &self,
        at: DateTime<Utc>,
        rules: &GameRules,
    ) -> Result<Duration, GameError> {
        Ok(rules.starve_duration() - self.time_since_last_feeding(at, rules)?)
    }

    /// Projected starvation instant given the current feeding clock. Feeding
    /// again before then extends it.
    pub fn projected_starve_time(&self, rules: &GameRules) -> Result<DateTime<Utc>, GameError> {
        let reference = self.feeding_reference().ok_or(GameError::WrongState {
            current: self.state,
            needed: PlayerState::Zombie,
            reason: "player has never been undead".to_string(),
        })?;
        rules.calendar.project(reference, rules.starve_duration())
    }

    /// Whether the player could still have a kill accepted at `at`. Starved
    /// zombies stay eligible for the length of the report window.
    pub fn can_report_kill(&self, at: DateTime<Utc>, rules: &GameRules) -> bool {
        if self.state.is_human() || self.state.is_infected() {
            return false;
        }
        match self.time_since_last_feeding(at, rules) {
            Ok(duration) => duration <= rules.starve_duration() + rules.report_window(),
            Err(_) => false,
        }
    }

    /// Administrative: back to a fresh human.
    pub fn force_to_human(&mut self) {
        self.reset();
    }

    /// Administrative: infect the player as if just tagged. Any previous
    /// kill history is wiped; infection is inherently a human condition.
    pub fn force_to_infected(&mut self, at: DateTime<Utc>, rules: &GameRules) {
        if self.state.is_infected() {
            return;
        }
        self.reset();
        self.death_date = Some(at + rules.undead_delay());
        self.state = PlayerState::Infected;
    }

    /// Administrative: make the player undead. A dead player is brought
    /// back; their feeding clock is renewed only when their projected
    /// starve time has already passed, so resurrection inside the grace
    /// window keeps the original clock.
    pub fn force_to_zombie(&mut self, at: DateTime<Utc>, rules: &GameRules) -> Result<(), GameError> {
        if self.state.is_undead() {
            Ok(())
        } else if self.state.is_human() || self.state.is_infected() {
            self.death_date = Some(at);
            self.state = PlayerState::Zombie;
            Ok(())
        } else {
            debug_assert!(self.state.is_dead());
            if self.projected_starve_time(rules)? <= at {
                self.feed_date = Some(at);
            }
            self.starve_date = None;
            self.state = if self.state.is_original_zombie() {
                PlayerState::OriginalZombie
            } else {
                PlayerState::Zombie
            };
            Ok(())
        }
    }

    /// Administrative: kill the player outright. Keeps an earlier death
    /// date if one exists, otherwise stamps `at`.
    pub fn force_to_dead(&mut self, at: DateTime<Utc>) {
        if self.state.is_dead() {
            return;
        }
        if self.death_date.is_none_or(|d| d > at) {
            self.death_date = Some(at);
        }
        self.starve_date = Some(at);
        self.state = if self.state.is_original_zombie() {
            PlayerState::DeadOriginalZombie
        } else {
            PlayerState::Dead
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn entry(id: EntryId) -> PlayerEntry {
        PlayerEntry::new(id, Uuid::new_v4(), PlayerEntry::generate_tag(16))
    }

    fn zombie(id: EntryId, died_at: &str) -> PlayerEntry {
        let mut e = entry(id);
        e.state = PlayerState::Zombie;
        e.death_date = Some(utc(died_at));
        e
    }

    #[test]
    fn generated_tags_use_the_restricted_alphabet() {
        for _ in 0..50 {
            let tag = PlayerEntry::generate_tag(16);
            assert_eq!(tag.len(), 16);
            assert!(
                tag.bytes().all(|b| TAG_CHARS.contains(&b)),
                "bad tag: {tag}"
            );
            assert!(!tag.contains('O'));
        }
    }

    #[test]
    fn new_entry_is_a_fresh_human() {
        let e = entry(1);
        assert_eq!(e.state, PlayerState::Human);
        assert!(e.death_date.is_none());
        assert!(e.feed_date.is_none());
        assert!(e.starve_date.is_none());
        assert_eq!(e.kills, 0);
        assert!(e.killed_by.is_none());
    }

    #[test]
    fn human_becomes_original_zombie() {
        let mut e = entry(1);
        let at = utc("2026-04-21T14:15:00Z");
        e.make_original_zombie(at).unwrap();
        assert_eq!(e.state, PlayerState::OriginalZombie);
        assert_eq!(e.death_date, Some(at));
        assert!(e.state.is_undead());
        assert!(e.state.is_original_zombie());

        // Calling again refreshes the death date.
        let later = utc("2026-04-21T15:00:00Z");
        e.make_original_zombie(later).unwrap();
        assert_eq!(e.death_date, Some(later));
    }

    #[test]
    fn non_human_cannot_become_original_zombie() {
        let mut e = zombie(1, "2026-04-21T14:15:00Z");
        let result = e.make_original_zombie(utc("2026-04-21T15:00:00Z"));
        assert!(matches!(result, Err(GameError::WrongState { .. })));
    }

    #[test]
    fn kill_infects_the_victim() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        let mut victim = entry(2);
        let kill_time = utc("2026-04-22T14:15:00Z");

        PlayerEntry::record_kill(&mut killer, &mut victim, kill_time, kill_time, &rules).unwrap();

        assert_eq!(killer.kills, 1);
        assert_eq!(killer.feed_date, Some(kill_time));
        assert_eq!(victim.state, PlayerState::Infected);
        assert_eq!(victim.death_date, Some(kill_time + rules.undead_delay()));
        assert_eq!(victim.killed_by, Some(killer.user_id));
    }

    #[test]
    fn humans_cannot_kill() {
        let rules = GameRules::default();
        let mut killer = entry(1);
        let mut victim = entry(2);
        let at = utc("2026-04-22T14:15:00Z");
        let result = PlayerEntry::record_kill(&mut killer, &mut victim, at, at, &rules);
        assert!(matches!(result, Err(GameError::WrongState { .. })));
    }

    #[test]
    fn future_kills_rejected() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        let mut victim = entry(2);
        let result = PlayerEntry::record_kill(
            &mut killer,
            &mut victim,
            utc("2026-04-22T15:00:00Z"),
            utc("2026-04-22T14:00:00Z"),
            &rules,
        );
        assert!(matches!(result, Err(GameError::InvalidTime(_))));
    }

    #[test]
    fn non_chronological_kills_rejected() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        killer.feed_date = Some(utc("2026-04-22T12:00:00Z"));
        let mut victim = entry(2);
        // At or before the last feed.
        let at = utc("2026-04-22T12:00:00Z");
        let result = PlayerEntry::record_kill(&mut killer, &mut victim, at, at, &rules);
        assert!(matches!(result, Err(GameError::InvalidTime(_))));
    }

    #[test]
    fn late_reports_rejected() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        let mut victim = entry(2);
        let kill_time = utc("2026-04-22T10:00:00Z");
        let report_time = kill_time + rules.report_window() + Duration::minutes(1);
        let result =
            PlayerEntry::record_kill(&mut killer, &mut victim, kill_time, report_time, &rules);
        assert!(matches!(result, Err(GameError::InvalidTime(_))));
    }

    #[test]
    fn starved_killer_rejected() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        let mut victim = entry(2);
        // 49h after death with a 48h starve time.
        let kill_time = utc("2026-04-23T15:15:00Z");
        let result =
            PlayerEntry::record_kill(&mut killer, &mut victim, kill_time, kill_time, &rules);
        assert!(matches!(result, Err(GameError::InvalidTime(_))));
    }

    #[test]
    fn victim_must_be_human() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        let mut victim = zombie(2, "2026-04-21T14:15:00Z");
        let at = utc("2026-04-22T14:15:00Z");
        let result = PlayerEntry::record_kill(&mut killer, &mut victim, at, at, &rules);
        assert!(matches!(result, Err(GameError::WrongState { .. })));
    }

    #[test]
    fn valid_kill_revives_a_dead_killer() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        killer.state = PlayerState::Dead;
        killer.starve_date = Some(utc("2026-04-23T14:15:00Z"));
        let mut victim = entry(2);
        // The kill happened well before the starve, reported within window.
        let kill_time = utc("2026-04-22T14:15:00Z");
        let report_time = kill_time + Duration::hours(2);
        PlayerEntry::record_kill(&mut killer, &mut victim, kill_time, report_time, &rules)
            .unwrap();
        assert_eq!(killer.state, PlayerState::Zombie);
        assert!(killer.starve_date.is_none());
    }

    #[test]
    fn starve_marks_the_right_dead_state() {
        let at = utc("2026-04-23T14:15:00Z");
        let mut z = zombie(1, "2026-04-21T14:15:00Z");
        z.starve(at).unwrap();
        assert_eq!(z.state, PlayerState::Dead);
        assert_eq!(z.starve_date, Some(at));

        let mut oz = entry(2);
        oz.make_original_zombie(utc("2026-04-21T14:15:00Z")).unwrap();
        oz.starve(at).unwrap();
        assert_eq!(oz.state, PlayerState::DeadOriginalZombie);
        assert_eq!(oz.state.affiliation(), "Dead");
        assert_eq!(oz.state.internal_name(), "Dead (Original Zombie)");
    }

    #[test]
    fn humans_cannot_starve() {
        let mut e = entry(1);
        assert!(e.starve(utc("2026-04-23T14:15:00Z")).is_err());
    }

    #[test]
    fn feeding_clock_falls_back_to_death_date() {
        let rules = GameRules::default();
        let z = zombie(1, "2026-04-21T14:15:00Z");
        let elapsed = z
            .time_since_last_feeding(utc("2026-04-21T20:15:00Z"), &rules)
            .unwrap();
        assert_eq!(elapsed, Duration::hours(6));
        // Before the reference instant the clock reads zero.
        let elapsed = z
            .time_since_last_feeding(utc("2026-04-21T10:00:00Z"), &rules)
            .unwrap();
        assert_eq!(elapsed, Duration::zero());
    }

    #[test]
    fn time_before_starving_counts_down() {
        let rules = GameRules::default();
        let z = zombie(1, "2026-04-21T14:15:00Z");
        let left = z
            .time_before_starving(utc("2026-04-22T14:15:00Z"), &rules)
            .unwrap();
        assert_eq!(left, Duration::hours(24));
    }

    #[test]
    fn can_report_kill_respects_the_grace_window() {
        let rules = GameRules::default();
        let z = zombie(1, "2026-04-21T14:15:00Z");
        // 48h starve + 3h report window: eligible at 50h, not at 52h.
        assert!(z.can_report_kill(utc("2026-04-23T16:15:00Z"), &rules));
        assert!(!z.can_report_kill(utc("2026-04-23T18:15:00Z"), &rules));
        // Humans and infected never can.
        assert!(!entry(2).can_report_kill(utc("2026-04-23T16:15:00Z"), &rules));
    }

    #[test]
    fn force_to_human_wipes_everything() {
        let rules = GameRules::default();
        let mut killer = zombie(1, "2026-04-21T14:15:00Z");
        let mut victim = entry(2);
        let at = utc("2026-04-22T14:15:00Z");
        PlayerEntry::record_kill(&mut killer, &mut victim, at, at, &rules).unwrap();

        killer.force_to_human();
        assert_eq!(killer.state, PlayerState::Human);
        assert_eq!(killer.kills, 0);
        assert!(killer.death_date.is_none() && killer.feed_date.is_none());

        victim.force_to_human();
        assert_eq!(victim.state, PlayerState::Human);
        assert!(victim.killed_by.is_none());
    }

    #[test]
    fn force_to_infected_sets_a_future_death_date() {
        let rules = GameRules::default();
        let at = utc("2026-04-22T14:15:00Z");
        let mut e = entry(1);
        e.force_to_infected(at, &rules);
        assert_eq!(e.state, PlayerState::Infected);
        assert_eq!(e.death_date, Some(at + rules.undead_delay()));

        // Already infected: no-op, death date untouched.
        e.force_to_infected(at + Duration::hours(1), &rules);
        assert_eq!(e.death_date, Some(at + rules.undead_delay()));
    }

    #[test]
    fn force_to_zombie_from_human() {
        let rules = GameRules::default();
        let at = utc("2026-04-22T14:15:00Z");
        let mut e = entry(1);
        e.force_to_zombie(at, &rules).unwrap();
        assert_eq!(e.state, PlayerState::Zombie);
        assert_eq!(e.death_date, Some(at));
    }

    #[test]
    fn resurrection_past_the_starve_time_renews_the_clock() {
        let rules = GameRules::default();
        let at = utc("2026-04-22T14:15:00Z");
        let starve_time = at + rules.starve_duration();
        let resurrect_time = starve_time + Duration::minutes(5);

        let mut e = entry(1);
        e.force_to_zombie(at, &rules).unwrap();
        e.force_to_dead(starve_time);
        e.force_to_zombie(resurrect_time, &rules).unwrap();

        assert_eq!(e.state, PlayerState::Zombie);
        assert_eq!(e.death_date, Some(at));
        assert_eq!(e.feed_date, Some(resurrect_time));
        assert!(e.starve_date.is_none());
    }

    #[test]
    fn resurrection_inside_the_grace_window_keeps_the_clock() {
        let rules = GameRules::default();
        let at = utc("2026-04-22T14:15:00Z");
        let mut e = entry(1);
        e.force_to_zombie(at, &rules).unwrap();
        e.force_to_dead(at + Duration::hours(1));
        e.force_to_zombie(at + Duration::hours(2), &rules).unwrap();
        assert_eq!(e.state, PlayerState::Zombie);
        assert!(e.feed_date.is_none());
        assert!(e.starve_date.is_none());
    }

    #[test]
    fn force_to_dead_preserves_original_zombie_flavor() {
        let start = utc("2026-04-21T14:15:00Z");
        let at = utc("2026-04-22T14:15:00Z");

        let mut oz = entry(1);
        oz.make_original_zombie(start).unwrap();
        oz.force_to_dead(at);
        assert_eq!(oz.state, PlayerState::DeadOriginalZombie);
        // An earlier death date is not tampered with.
        assert_eq!(oz.death_date, Some(start));
        assert_eq!(oz.starve_date, Some(at));

        let mut human = entry(2);
        human.force_to_dead(at);
        assert_eq!(human.state, PlayerState::Dead);
        assert_eq!(human.death_date, Some(at));
        assert_eq!(human.starve_date, Some(at));
    }
}
