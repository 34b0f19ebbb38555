//! Scores/fixtures feed: upcoming games and latest results per tournament.
//!
//! This is the identity-creating feed. Teams are get-or-create by external
//! id, games are reconciled against the store, and the publish timestamp is
//! derived here.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::api::tasks::fetch_for_tournaments;
use crate::api::Fetch;
use crate::models::{slugify, Game, GameStatus, Team, Tournament};
use crate::store::reconcile::{game_bulk_update_or_create, team_bulk_get_or_create};
use crate::store::Store;

/// Days either side of today for which scores are fetched.
const SCORES_DELTA_DAYS: i64 = 7;

/// Publishing time in hours relative to the game date.
const PUB_DATE_NORM_HOURS: i64 = 56;
const PUB_DATE_MIN_HOURS: i64 = 2;
const PUB_DATE_LATE_HOURS: i64 = 4;

/// Fixture payload as the API returns it, parsed at the ingestion boundary.
#[derive(Debug, Deserialize)]
pub struct FixturePayload {
    pub fixture: FixtureInfo,
    pub league: LeagueInfo,
    pub teams: TeamsInfo,
    pub score: ScoreInfo,
}

#[derive(Debug, Deserialize)]
pub struct FixtureInfo {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub referee: Option<String>,
    pub venue: VenueInfo,
    pub status: StatusInfo,
}

#[derive(Debug, Deserialize)]
pub struct VenueInfo {
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInfo {
    pub long: String,
}

#[derive(Debug, Deserialize)]
pub struct LeagueInfo {
    pub id: i64,
    pub season: i32,
    pub round: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeamsInfo {
    pub home: TeamRef,
    pub away: TeamRef,
}

#[derive(Debug, Deserialize)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreInfo {
    pub halftime: GoalPair,
    pub fulltime: GoalPair,
    pub extratime: GoalPair,
    pub penalty: GoalPair,
}

#[derive(Debug, Deserialize)]
pub struct GoalPair {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

/// Publish time: 56 hours before kick-off, but never sooner than two hours
/// from now. If that clamp would push publication past kick-off + 4h the game
/// is not published at all.
pub fn derive_pub_date(game_date: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normal = game_date - Duration::hours(PUB_DATE_NORM_HOURS);
    let earliest = now + Duration::hours(PUB_DATE_MIN_HOURS);
    let pub_date = normal.max(earliest);
    if pub_date > game_date + Duration::hours(PUB_DATE_LATE_HOURS) {
        None
    } else {
        Some(pub_date)
    }
}

fn parse_fixtures(values: Vec<Value>) -> Vec<FixturePayload> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed fixture payload");
                None
            }
        })
        .collect()
}

fn build_game(
    payload: &FixturePayload,
    tournament: &Tournament,
    home: &Team,
    away: &Team,
    now: DateTime<Utc>,
) -> Game {
    let game_date = payload.fixture.date;
    let slug = slugify(&format!(
        "{}-{}-{}",
        game_date.format("%Y-%m-%d"),
        home.name,
        away.name
    ));

    Game {
        external_id: payload.fixture.id,
        game_date,
        venue: payload.fixture.venue.name.clone(),
        city: payload.fixture.venue.city.clone(),
        referee: payload.fixture.referee.clone(),
        status: GameStatus::from_long(&payload.fixture.status.long),
        tournament_id: tournament.external_id,
        season: payload.league.season,
        round: payload.league.round.clone(),
        home_team_id: home.external_id,
        away_team_id: away.external_id,
        home_goals_ht: payload.score.halftime.home,
        away_goals_ht: payload.score.halftime.away,
        home_goals_ft: payload.score.fulltime.home,
        away_goals_ft: payload.score.fulltime.away,
        home_goals_et: payload.score.extratime.home,
        away_goals_et: payload.score.extratime.away,
        home_goals_pen: payload.score.penalty.home,
        away_goals_pen: payload.score.penalty.away,
        odds: None,
        home_stats: None,
        away_stats: None,
        events: None,
        lineups: None,
        home_team_class: None,
        away_team_class: None,
        home_team_defence: None,
        home_team_attack: None,
        away_team_defence: None,
        away_team_attack: None,
        prediction: None,
        preview: None,
        pub_date: derive_pub_date(game_date, now),
        slug,
    }
}

/// Stage fetched fixtures into proposed games and reconcile them against the
/// store. Returns (created, updated).
pub fn reconcile_fixtures(
    store: &mut Store,
    payloads: Vec<FixturePayload>,
    now: DateTime<Utc>,
) -> (usize, usize) {
    let tournaments: HashMap<i64, Tournament> = store
        .running_tournaments()
        .into_iter()
        .map(|t| (t.external_id, t))
        .collect();

    let proposed_teams: HashMap<i64, Team> = payloads
        .iter()
        .flat_map(|p| [&p.teams.home, &p.teams.away])
        .map(|t| (t.id, Team::new(t.id, &t.name)))
        .collect();
    let teams = team_bulk_get_or_create(store, proposed_teams);

    let mut proposed_games = HashMap::new();
    for payload in &payloads {
        let Some(tournament) = tournaments.get(&payload.league.id) else {
            continue;
        };
        let (Some(home), Some(away)) = (
            teams.get(&payload.teams.home.id),
            teams.get(&payload.teams.away.id),
        ) else {
            continue;
        };
        proposed_games.insert(
            payload.fixture.id,
            build_game(payload, tournament, home, away, now),
        );
    }

    game_bulk_update_or_create(store, proposed_games)
}

/// Fetch the scores window for every running tournament and reconcile.
pub async fn update<F: Fetch>(fetcher: &F, store: &mut Store, now: DateTime<Utc>) {
    let tours = store.running_tournaments();
    let window = (
        (now - Duration::days(SCORES_DELTA_DAYS)).date_naive(),
        (now + Duration::days(SCORES_DELTA_DAYS)).date_naive(),
    );

    let values = fetch_for_tournaments(fetcher, "fixtures", &tours, Some(window)).await;
    let payloads = parse_fixtures(values);
    let fetched = payloads.len();
    let (created, updated) = reconcile_fixtures(store, payloads, now);
    tracing::info!(fetched, created, updated, "scores update complete");
}
