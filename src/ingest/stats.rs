//! Statistics feed: per-team match statistics for finished games.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::api::{BatchScheduler, Fetch};
use crate::ingest::details::DetailKind;
use crate::store::Store;

/// Flatten the `[{type, value}]` list into a key -> value map.
pub fn team_stats(data: &Value) -> HashMap<String, Value> {
    let mut stats = HashMap::new();
    let Some(items) = data.get("statistics").and_then(Value::as_array) else {
        return stats;
    };
    for item in items {
        if let Some(key) = item.get("type").and_then(Value::as_str) {
            stats.insert(
                key.to_string(),
                item.get("value").cloned().unwrap_or(Value::Null),
            );
        }
    }
    stats
}

fn side_team_id(data: &Value) -> Option<i64> {
    data.get("team").and_then(|t| t.get("id")).and_then(Value::as_i64)
}

/// Split a statistics payload into (home, away) by matching team ids.
pub fn split_sides(payload: &[Value], home_team_id: i64) -> Option<(&Value, &Value)> {
    if payload.len() < 2 {
        return None;
    }
    if side_team_id(&payload[0]) == Some(home_team_id) {
        Some((&payload[0], &payload[1]))
    } else if side_team_id(&payload[1]) == Some(home_team_id) {
        Some((&payload[1], &payload[0]))
    } else {
        None
    }
}

pub async fn update<F: Fetch>(
    fetcher: &F,
    scheduler: &BatchScheduler,
    store: &mut Store,
    now: DateTime<Utc>,
) {
    let kind = DetailKind::Stats;
    let game_ids = kind.games_to_fetch(store, now);
    let details = scheduler.fetch_details(fetcher, kind.endpoint(), &game_ids).await;

    let mut changed = Vec::new();
    for (game_id, payload) in &details {
        let Some(game) = store.game(*game_id) else {
            continue;
        };
        let Some((home, away)) = split_sides(payload, game.home_team_id) else {
            tracing::warn!(game_id, "statistics payload does not match the game's teams");
            continue;
        };
        let mut game = game.clone();
        game.home_stats = Some(team_stats(home));
        game.away_stats = Some(team_stats(away));
        changed.push(game);
    }

    let updated = store.bulk_update_games(changed);
    tracing::info!(fetched = details.len(), updated, "stats update complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats_payload() -> Vec<Value> {
        vec![
            json!({
                "team": { "id": 45 },
                "statistics": [
                    { "type": "Shots on Goal", "value": 3 },
                    { "type": "Ball Possession", "value": "41%" },
                ],
            }),
            json!({
                "team": { "id": 40 },
                "statistics": [
                    { "type": "Shots on Goal", "value": 9 },
                    { "type": "Ball Possession", "value": "59%" },
                ],
            }),
        ]
    }

    #[test]
    fn test_split_sides_aligns_by_team_id() {
        let payload = stats_payload();
        let (home, away) = split_sides(&payload, 40).unwrap();
        assert_eq!(side_team_id(home), Some(40));
        assert_eq!(side_team_id(away), Some(45));
    }

    #[test]
    fn test_team_stats_flattens_entries() {
        let payload = stats_payload();
        let stats = team_stats(&payload[1]);
        assert_eq!(stats["Shots on Goal"], json!(9));
        assert_eq!(stats["Ball Possession"], json!("59%"));
    }

    #[test]
    fn test_split_sides_rejects_foreign_payload() {
        let payload = stats_payload();
        assert!(split_sides(&payload, 99).is_none());
    }
}
