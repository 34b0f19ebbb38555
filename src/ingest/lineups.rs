//! Lineups feed: starting elevens and coaches for finished games.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::{BatchScheduler, Fetch};
use crate::ingest::details::DetailKind;
use crate::store::Store;

/// Strip payload bloat before storing: team names/logos and coach photos are
/// already available elsewhere.
pub fn prepare_lineups(data: &[Value]) -> Vec<Value> {
    data.iter()
        .cloned()
        .map(|mut item| {
            if let Some(team) = item.get_mut("team").and_then(Value::as_object_mut) {
                team.remove("name");
                team.remove("logo");
            }
            if let Some(coach) = item.get_mut("coach").and_then(Value::as_object_mut) {
                coach.remove("photo");
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
    let kind = DetailKind::Lineups;
    let game_ids = kind.games_to_fetch(store, now);
    let details = scheduler.fetch_details(fetcher, kind.endpoint(), &game_ids).await;

    let mut changed = Vec::new();
    for (game_id, payload) in &details {
        let Some(game) = store.game(*game_id) else {
            continue;
        };
        let mut game = game.clone();
        game.lineups = Some(prepare_lineups(payload));
        changed.push(game);
    }

    let updated = store.bulk_update_games(changed);
    tracing::info!(fetched = details.len(), updated, "lineups update complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_lineups_trims_team_and_coach() {
        let data = vec![json!({
            "team": { "id": 40, "name": "Liverpool", "logo": "https://..." },
            "coach": { "id": 1, "name": "A. Slot", "photo": "https://..." },
            "formation": "4-3-3",
        })];

        let lineups = prepare_lineups(&data);
        assert_eq!(lineups[0]["team"], json!({ "id": 40 }));
        assert_eq!(lineups[0]["coach"], json!({ "id": 1, "name": "A. Slot" }));
        assert_eq!(lineups[0]["formation"], json!("4-3-3"));
    }
}
