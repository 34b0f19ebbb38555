//! Standings feed: full table rebuild per running tournament.
//!
//! A standings payload holds one list per group: a single group for ordinary
//! championships, several for cup-style tournaments. The stored snapshot is
//! replaced wholesale on every refresh.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::api::tasks::fetch_for_tournaments;
use crate::api::Fetch;
use crate::models::{StandingRow, StandingStats, Standings};
use crate::store::Store;

#[derive(Debug, Deserialize)]
struct LeaguePayload {
    id: i64,
    standings: Vec<Vec<EntryPayload>>,
}

#[derive(Debug, Deserialize)]
struct EntryPayload {
    rank: u32,
    description: Option<String>,
    team: TeamRefPayload,
    group: String,
    status: Option<String>,
    points: Option<i32>,
    #[serde(rename = "goalsDiff")]
    goals_diff: Option<i32>,
    all: SplitPayload,
    home: SplitPayload,
    away: SplitPayload,
}

#[derive(Debug, Deserialize)]
struct TeamRefPayload {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct SplitPayload {
    played: Option<u32>,
    win: Option<u32>,
    draw: Option<u32>,
    lose: Option<u32>,
    goals: GoalsPayload,
}

#[derive(Debug, Deserialize, Default)]
struct GoalsPayload {
    #[serde(rename = "for")]
    goals_for: Option<u32>,
    against: Option<u32>,
}

/// Record split with points and goal difference taken from the feed when
/// present, computed otherwise.
fn modify_stats(split: &SplitPayload, points: Option<i32>, goals_diff: Option<i32>) -> StandingStats {
    let win = split.win.unwrap_or(0);
    let draw = split.draw.unwrap_or(0);
    let goals_for = split.goals.goals_for.unwrap_or(0);
    let goals_against = split.goals.against.unwrap_or(0);
    StandingStats {
        played: split.played.unwrap_or(0),
        win,
        draw,
        lose: split.lose.unwrap_or(0),
        goals_for,
        goals_against,
        points: points.unwrap_or((win * 3 + draw) as i32),
        goals_diff: goals_diff.unwrap_or(goals_for as i32 - goals_against as i32),
    }
}

fn build_standings(payload: &LeaguePayload, store: &Store) -> Standings {
    let mut standings = Standings::new();
    for group in &payload.standings {
        for entry in group {
            let team_name = store
                .team(entry.team.id)
                .map(|t| t.short_name.clone())
                .unwrap_or_else(|| entry.team.name.clone());
            standings
                .entry(entry.group.clone())
                .or_default()
                .push(StandingRow {
                    rank: entry.rank,
                    rank_description: entry.description.clone(),
                    team_id: entry.team.id,
                    team_name,
                    status: entry.status.clone(),
                    stats_all: modify_stats(&entry.all, entry.points, entry.goals_diff),
                    stats_home: modify_stats(&entry.home, None, None),
                    stats_away: modify_stats(&entry.away, None, None),
                });
        }
    }
    standings
}

fn parse_leagues(values: Vec<Value>) -> Vec<LeaguePayload> {
    values
        .into_iter()
        .filter_map(|value| {
            let league = value.get("league")?.clone();
            match serde_json::from_value(league) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed standings payload");
                    None
                }
            }
        })
        .collect()
}

/// Fetch standings for every running tournament and replace each stored
/// snapshot.
pub async fn update<F: Fetch>(fetcher: &F, store: &mut Store, _now: DateTime<Utc>) {
    let tours = store.running_tournaments();
    let values = fetch_for_tournaments(fetcher, "standings", &tours, None).await;
    let leagues = parse_leagues(values);

    let mut changed = Vec::new();
    for payload in &leagues {
        let Some(tour) = store.tournament(payload.id) else {
            continue;
        };
        let mut tour = tour.clone();
        tour.standings = Some(build_standings(payload, store));
        changed.push(tour);
    }

    let updated = store.bulk_update_tournaments(changed);
    tracing::info!(fetched = leagues.len(), updated, "standings update complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Team, Tournament};
    use serde_json::json;

    fn standings_value() -> Value {
        json!({
            "league": {
                "id": 39,
                "standings": [[
                    {
                        "rank": 1,
                        "description": "Champions League",
                        "team": { "id": 40, "name": "Liverpool" },
                        "group": "Premier League",
                        "status": "same",
                        "points": 9,
                        "goalsDiff": 7,
                        "all": {
                            "played": 3, "win": 3, "draw": 0, "lose": 0,
                            "goals": { "for": 9, "against": 2 },
                        },
                        "home": {
                            "played": 2, "win": 2, "draw": 0, "lose": 0,
                            "goals": { "for": 6, "against": 1 },
                        },
                        "away": {
                            "played": 1, "win": 1, "draw": 0, "lose": 0,
                            "goals": { "for": 3, "against": 1 },
                        },
                    },
                ]],
            },
        })
    }

    #[test]
    fn test_build_standings_prefers_stored_short_name() {
        let mut store = Store::new();
        let mut team = Team::new(40, "Liverpool");
        team.short_name = "LFC".to_string();
        store.bulk_create_teams(vec![team]);

        let leagues = parse_leagues(vec![standings_value()]);
        let standings = build_standings(&leagues[0], &store);

        let rows = &standings["Premier League"];
        assert_eq!(rows[0].team_name, "LFC");
        assert_eq!(rows[0].stats_all.points, 9);
        // Home split has no feed-provided points; computed as win*3 + draw.
        assert_eq!(rows[0].stats_home.points, 6);
        assert_eq!(rows[0].stats_home.goals_diff, 5);
    }

    #[tokio::test]
    async fn test_update_replaces_snapshot_wholesale() {
        struct StubFetcher;
        impl Fetch for StubFetcher {
            async fn fetch(&self, _endpoint: &str, _query: &[(&str, String)]) -> Vec<Value> {
                vec![standings_value()]
            }
        }

        let now = Utc::now();
        let mut store = Store::new();
        let mut tour = Tournament::new(39, "Premier League", "England", 2026);
        // Stale snapshot that must disappear after the refresh.
        tour.standings = Some(Standings::from([("Old Group".to_string(), vec![])]));
        store.add_tournament(tour);

        update(&StubFetcher, &mut store, now).await;

        let standings = store.tournament(39).unwrap().standings.as_ref().unwrap();
        assert!(standings.contains_key("Premier League"));
        assert!(!standings.contains_key("Old Group"));
    }
}
