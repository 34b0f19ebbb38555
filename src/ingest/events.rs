//! Events feed: goals, cards and substitutions for finished games.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::{BatchScheduler, Fetch};
use crate::ingest::details::DetailKind;
use crate::store::Store;

/// Strip payload bloat before storing: the team object collapses to its id.
pub fn prepare_events(data: &[Value]) -> Vec<Value> {
    data.iter()
        .cloned()
        .map(|mut item| {
            if let Some(id) = item.get("team").and_then(|t| t.get("id")).cloned() {
                item["team"] = id;
            }
            item
        })
        .collect()
}

pub async fn update<F: Fetch>(
    fetcher: &F,
    scheduler: &BatchScheduler,
    store: &mut Store,
    now: DateTime<Utc>,
) {
    let kind = DetailKind::Events;
    let game_ids = kind.games_to_fetch(store, now);
    let details = scheduler.fetch_details(fetcher, kind.endpoint(), &game_ids).await;

    let mut changed = Vec::new();
    for (game_id, payload) in &details {
        let Some(game) = store.game(*game_id) else {
            continue;
        };
        let mut game = game.clone();
        game.events = Some(prepare_events(payload));
        changed.push(game);
    }

    let updated = store.bulk_update_games(changed);
    tracing::info!(fetched = details.len(), updated, "events update complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_events_collapses_team_to_id() {
        let data = vec![json!({
            "time": { "elapsed": 23 },
            "team": { "id": 40, "name": "Liverpool", "logo": "https://..." },
            "type": "Goal",
        })];

        let events = prepare_events(&data);
        assert_eq!(events[0]["team"], json!(40));
        assert_eq!(events[0]["type"], json!("Goal"));
    }
}
