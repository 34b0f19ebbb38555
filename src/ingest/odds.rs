//! Odds feed: multi-bookmaker odds aggregation and market-class assignment.
//!
//! The raw payload is bookmaker -> market -> outcome -> value. It is
//! normalized to market -> outcome -> values across bookmakers, averaged, and
//! merged into each game's stored (opening, latest) series. The Match Winner
//! averages also bucket both teams into a discrete strength class.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::api::{BatchScheduler, Fetch};
use crate::ingest::details::DetailKind;
use crate::models::{
    GameOdds, Market, OddsSeries, ODDS_SENTINEL, OUTCOME_AWAY, OUTCOME_HOME,
};
use crate::store::Store;

/// Ascending win-odds ladder; a team's class is the first rung its odds do
/// not exceed. Lower class = stronger market favorite.
pub const CLASS_BREAKPOINTS: [f64; 8] = [1.25, 1.6, 2.0, 2.4, 2.95, 3.7, 5.5, 12.0];

fn odd_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Normalize a raw odds payload into market -> outcome -> one value per
/// bookmaker quoting it.
pub fn prepare_odds(data: &[Value]) -> BTreeMap<String, BTreeMap<String, Vec<f64>>> {
    let mut collection: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();

    let bookmakers = data
        .first()
        .and_then(|v| v.get("bookmakers"))
        .and_then(Value::as_array);
    let Some(bookmakers) = bookmakers else {
        return collection;
    };

    for bookie in bookmakers {
        let Some(bets) = bookie.get("bets").and_then(Value::as_array) else {
            continue;
        };
        for bet in bets {
            let Some(name) = bet.get("name").and_then(Value::as_str) else {
                continue;
            };
            let Some(values) = bet.get("values").and_then(Value::as_array) else {
                continue;
            };
            let market = collection.entry(name.to_string()).or_default();
            for entry in values {
                let (Some(outcome), Some(odd)) = (
                    entry.get("value").and_then(Value::as_str),
                    entry.get("odd").and_then(odd_as_f64),
                ) else {
                    continue;
                };
                market.entry(outcome.to_string()).or_default().push(odd);
            }
        }
    }

    collection
}

/// Merge freshly averaged odds into the stored per-game series. The opening
/// slot records the first observed price and never moves afterwards; the
/// latest slot always takes the newest average.
pub fn combine_odds(
    existing: Option<GameOdds>,
    collection: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    now: DateTime<Utc>,
) -> GameOdds {
    let mut odds = existing.unwrap_or_else(|| GameOdds::new(now));

    for (market, outcomes) in collection {
        let stored_market = odds.markets.entry(market).or_default();
        for (outcome, values) in outcomes {
            if values.is_empty() {
                continue;
            }
            let average =
                (values.iter().sum::<f64>() / values.len() as f64 * 100.0).round() / 100.0;
            let series = stored_market
                .entry(outcome)
                .or_insert_with(OddsSeries::sentinel);
            if series.opening == ODDS_SENTINEL {
                series.opening = average;
            }
            series.latest = average;
        }
    }

    odds.updated = now;
    odds
}

/// Class index for one team from its latest win odds: the smallest rung the
/// odds do not exceed, clamped to the ladder's top.
pub fn classify_team(win_odds: f64) -> u8 {
    let mut class = 0;
    while win_odds > CLASS_BREAKPOINTS[class] {
        class += 1;
        if class > CLASS_BREAKPOINTS.len() - 1 {
            return (CLASS_BREAKPOINTS.len() - 1) as u8;
        }
    }
    class as u8
}

/// (home, away) class from the Match Winner market; class 0 for both when
/// the market is absent.
pub fn team_classes(odds: &GameOdds) -> (u8, u8) {
    let home = odds.latest_odds(Market::MatchWinner, OUTCOME_HOME);
    let away = odds.latest_odds(Market::MatchWinner, OUTCOME_AWAY);
    match (home, away) {
        (Some(home), Some(away)) => (classify_team(home), classify_team(away)),
        _ => (0, 0),
    }
}

/// Fetch odds for every not-started game in the detail window, merge them and
/// refresh team classes.
pub async fn update<F: Fetch>(
    fetcher: &F,
    scheduler: &BatchScheduler,
    store: &mut Store,
    now: DateTime<Utc>,
) {
    let kind = DetailKind::Odds;
    let game_ids = kind.games_to_fetch(store, now);
    let details = scheduler.fetch_details(fetcher, kind.endpoint(), &game_ids).await;

    let mut changed = Vec::new();
    for (game_id, payload) in &details {
        let Some(game) = store.game(*game_id) else {
            continue;
        };
        let mut game = game.clone();
        let collection = prepare_odds(payload);
        let combined = combine_odds(game.odds.take(), collection, now);
        let (home_class, away_class) = team_classes(&combined);
        game.odds = Some(combined);
        game.home_team_class = Some(home_class);
        game.away_team_class = Some(away_class);
        changed.push(game);
    }

    let updated = store.bulk_update_games(changed);
    tracing::info!(fetched = details.len(), updated, "odds update complete");
}
