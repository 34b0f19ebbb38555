//! Shared selection logic for the per-fixture detail feeds.
//!
//! Each feed fetches for games inside the same date window; what differs is
//! the endpoint, the status the feed applies to, and whether a game already
//! holding the data should be skipped.

use chrono::{DateTime, Duration, Utc};

use crate::models::Game;
use crate::store::Store;

/// Days either side of now that detail data is still worth fetching.
const DETAILS_DELTA_BOTTOM_DAYS: i64 = 3;
const DETAILS_DELTA_TOP_DAYS: i64 = 7;

/// The four per-fixture detail feeds, each carrying its endpoint, status
/// filter and refetch rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Odds,
    Stats,
    Events,
    Lineups,
}

impl DetailKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            DetailKind::Odds => "odds",
            DetailKind::Stats => "fixtures/statistics",
            DetailKind::Events => "fixtures/events",
            DetailKind::Lineups => "fixtures/lineups",
        }
    }

    fn applies_to(&self, game: &Game) -> bool {
        match self {
            // Odds are refetched every cycle to track line movement.
            DetailKind::Odds => game.status.is_not_started(),
            DetailKind::Stats => game.status.is_finished() && game.home_stats.is_none(),
            DetailKind::Events => game.status.is_finished() && game.events.is_none(),
            DetailKind::Lineups => game.status.is_finished() && game.lineups.is_none(),
        }
    }

    /// Fixture ids this feed should fetch right now.
    pub fn games_to_fetch(&self, store: &Store, now: DateTime<Utc>) -> Vec<i64> {
        let date_from = now - Duration::days(DETAILS_DELTA_BOTTOM_DAYS);
        let date_to = now + Duration::days(DETAILS_DELTA_TOP_DAYS);
        store.game_ids_where(|g| {
            g.game_date >= date_from && g.game_date <= date_to && self.applies_to(g)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;
    use crate::store::tests_support::sample_game;

    #[test]
    fn test_window_and_status_selection() {
        let now = Utc::now();
        let mut store = Store::new();
        store.bulk_create_games(vec![
            sample_game(1, GameStatus::NotStarted, now + Duration::days(2)),
            sample_game(2, GameStatus::NotStarted, now + Duration::days(10)),
            sample_game(3, GameStatus::Finished, now - Duration::days(1)),
            sample_game(4, GameStatus::Finished, now - Duration::days(5)),
        ]);

        assert_eq!(DetailKind::Odds.games_to_fetch(&store, now), vec![1]);
        assert_eq!(DetailKind::Stats.games_to_fetch(&store, now), vec![3]);
    }

    #[test]
    fn test_already_fetched_details_are_skipped() {
        let now = Utc::now();
        let mut store = Store::new();
        let mut game = sample_game(1, GameStatus::Finished, now - Duration::hours(4));
        game.events = Some(vec![]);
        store.bulk_create_games(vec![game]);

        assert!(DetailKind::Events.games_to_fetch(&store, now).is_empty());
        assert_eq!(DetailKind::Lineups.games_to_fetch(&store, now), vec![1]);
    }
}
