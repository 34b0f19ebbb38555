pub mod reconcile;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::tasks::BATCH_SIZE;
use crate::models::{Game, GameStatus, Team, Tournament};

/// Hours before kick-off a game becomes eligible for prediction.
const PREDICTION_OFFSET_HOURS: i64 = 48;

/// In-memory entity store keyed by external id, with the bulk read/write
/// surface the pipeline requires. Persistence is a JSON snapshot handled in
/// `crate::data`; the store itself never touches the filesystem.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Store {
    tournaments: HashMap<i64, Tournament>,
    teams: HashMap<i64, Team>,
    games: HashMap<i64, Game>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tournament(&self, external_id: i64) -> Option<&Tournament> {
        self.tournaments.get(&external_id)
    }

    pub fn team(&self, external_id: i64) -> Option<&Team> {
        self.teams.get(&external_id)
    }

    pub fn game(&self, external_id: i64) -> Option<&Game> {
        self.games.get(&external_id)
    }

    pub fn add_tournament(&mut self, tournament: Tournament) {
        self.tournaments.insert(tournament.external_id, tournament);
    }

    /// Tournaments currently in season, ordered by external id.
    pub fn running_tournaments(&self) -> Vec<Tournament> {
        let mut tours: Vec<Tournament> = self
            .tournaments
            .values()
            .filter(|t| t.is_running)
            .cloned()
            .collect();
        tours.sort_by_key(|t| t.external_id);
        tours
    }

    /// Existing teams among the given ids, keyed by external id.
    pub fn teams_by_ids(&self, ids: &[i64]) -> HashMap<i64, Team> {
        ids.iter()
            .filter_map(|id| self.teams.get(id).map(|t| (*id, t.clone())))
            .collect()
    }

    /// Games matching a predicate, ordered by external id.
    pub fn games_where(&self, pred: impl Fn(&Game) -> bool) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.values().filter(|g| pred(g)).cloned().collect();
        games.sort_by_key(|g| g.external_id);
        games
    }

    pub fn game_ids_where(&self, pred: impl Fn(&Game) -> bool) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .games
            .values()
            .filter(|g| pred(g))
            .map(|g| g.external_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Not-started games close enough to kick-off to need pre-game ratings.
    pub fn future_games(&self, now: DateTime<Utc>) -> Vec<Game> {
        let date_to = now + Duration::days(3);
        self.games_where(|g| g.status.is_not_started() && g.game_date <= date_to)
    }

    /// Recently finished games whose ratings may still need applying.
    pub fn finished_games(&self, now: DateTime<Utc>) -> Vec<Game> {
        let date_from = now - Duration::days(1);
        self.games_where(|g| g.status.is_finished() && g.game_date >= date_from)
    }

    /// Games ready for prediction: publishing within the offset window, no
    /// preview yet, ratings frozen and both consumed markets priced.
    pub fn prediction_candidates(&self, now: DateTime<Utc>) -> Vec<Game> {
        let date_to = now + Duration::hours(PREDICTION_OFFSET_HOURS);
        self.games_where(|g| {
            g.status.is_not_started()
                && g.preview.is_none()
                && g.pub_date.is_some_and(|d| d <= date_to)
                && g.has_frozen_ratings()
                && g.outcome_odds().is_some()
                && g.total_odds().is_some()
        })
    }

    /// Bulk-create teams in batches of 100. Returns the number written.
    pub fn bulk_create_teams(&mut self, teams: Vec<Team>) -> usize {
        let mut written = 0;
        for chunk in teams.chunks(BATCH_SIZE) {
            for team in chunk {
                self.teams.insert(team.external_id, team.clone());
                written += 1;
            }
        }
        written
    }

    pub fn bulk_update_teams(&mut self, teams: Vec<Team>) -> usize {
        let mut written = 0;
        for chunk in teams.chunks(BATCH_SIZE) {
            for team in chunk {
                if self.teams.contains_key(&team.external_id) {
                    self.teams.insert(team.external_id, team.clone());
                    written += 1;
                }
            }
        }
        written
    }

    /// Single-record team write, used when a rating reseed must persist
    /// before the rest of the pass.
    pub fn save_team(&mut self, team: Team) {
        self.teams.insert(team.external_id, team);
    }

    pub fn bulk_create_games(&mut self, games: Vec<Game>) -> usize {
        let mut written = 0;
        for chunk in games.chunks(BATCH_SIZE) {
            for game in chunk {
                self.games.insert(game.external_id, game.clone());
                written += 1;
            }
        }
        written
    }

    pub fn bulk_update_games(&mut self, games: Vec<Game>) -> usize {
        let mut written = 0;
        for chunk in games.chunks(BATCH_SIZE) {
            for game in chunk {
                if self.games.contains_key(&game.external_id) {
                    self.games.insert(game.external_id, game.clone());
                    written += 1;
                }
            }
        }
        written
    }

    pub fn bulk_update_tournaments(&mut self, tournaments: Vec<Tournament>) -> usize {
        let mut written = 0;
        for chunk in tournaments.chunks(BATCH_SIZE) {
            for tour in chunk {
                if self.tournaments.contains_key(&tour.external_id) {
                    self.tournaments.insert(tour.external_id, tour.clone());
                    written += 1;
                }
            }
        }
        written
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}
