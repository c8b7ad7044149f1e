pub mod calendar;
pub mod entry;
pub mod error;
pub mod events;
pub mod game;
pub mod rules;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::entry::UserId;
    use crate::game::{Game, GameStage, OriginalZombieChoice};
    use crate::rules::GameRules;

    pub fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    /// Create a game with `n` joined players, advanced to `stage`. The
    /// target stage must not be past ChooseZombie (starting needs an
    /// original zombie; use [`started_game`] for that).
    pub fn game_with_players(n: usize, stage: GameStage) -> (Game, Vec<UserId>) {
        assert!(stage <= GameStage::ChooseZombie);
        let mut game = Game::new(
            "Test game",
            GameRules::default(),
            utc("2026-04-20T09:00:00Z"),
        );
        game.next_stage(utc("2026-04-20T09:00:00Z")).unwrap();
        let users: Vec<UserId> = (0..n).map(|_| Uuid::new_v4()).collect();
        for user in &users {
            game.join(*user, false, false).unwrap();
        }
        while game.stage < stage {
            game.next_stage(utc("2026-04-20T09:00:00Z")).unwrap();
        }
        (game, users)
    }

    /// Create an in-progress game with `n` players, started on Tuesday
    /// 2026-04-21 at 14:00 UTC. The first user is the original zombie.
    pub fn started_game(n: usize) -> (Game, Vec<UserId>) {
        let (mut game, users) = game_with_players(n, GameStage::ChooseZombie);
        let oz = game.entry_by_user(users[0]).unwrap().entry_id;
        game.entries[0].original_pool = true;
        game.choose_original_zombie(OriginalZombieChoice::Entry(oz), utc("2026-04-21T13:00:00Z"))
            .unwrap();
        game.next_stage(utc("2026-04-21T14:00:00Z")).unwrap();
        (game, users)
    }
}
