//! Diff-based reconciliation of freshly fetched entities against the store.
//!
//! Teams are get-or-create only: an id seen before keeps its stored identity
//! (and its ratings) untouched. Games are compared field-by-field over a fixed
//! list, so re-running with identical upstream data issues zero writes.

use std::collections::HashMap;

use crate::models::{Game, Team};
use crate::store::Store;

fn apply_field<T: PartialEq + Clone>(current: &mut T, proposed: &T, changed: &mut bool) {
    if current != proposed {
        *current = proposed.clone();
        *changed = true;
    }
}

/// Resolve every proposed team to a stored identity, creating the unknown
/// ones in bulk. Returns the full external-id -> team mapping.
pub fn team_bulk_get_or_create(
    store: &mut Store,
    proposed: HashMap<i64, Team>,
) -> HashMap<i64, Team> {
    let ids: Vec<i64> = proposed.keys().copied().collect();
    let mut resolved = store.teams_by_ids(&ids);

    let staged: Vec<Team> = proposed
        .into_values()
        .filter(|team| !resolved.contains_key(&team.external_id))
        .collect();

    if !staged.is_empty() {
        let created = store.bulk_create_teams(staged.clone());
        tracing::debug!(created, "created new teams");
        for team in staged {
            resolved.insert(team.external_id, team);
        }
    }

    resolved
}

/// Update-or-create for games. Existing games are overwritten only on the
/// fields the scores feed owns; detail fields (odds, stats, events, lineups,
/// ratings, prediction) belong to their own updaters and are left alone.
/// Returns (created, updated) write counts.
pub fn game_bulk_update_or_create(
    store: &mut Store,
    mut proposed: HashMap<i64, Game>,
) -> (usize, usize) {
    let ids: Vec<i64> = proposed.keys().copied().collect();
    let mut changed_games = Vec::new();

    for id in &ids {
        let Some(existing) = store.game(*id) else {
            continue;
        };
        let new_state = proposed.remove(id).expect("proposed game present");
        let mut game = existing.clone();
        let mut changed = false;

        apply_field(&mut game.game_date, &new_state.game_date, &mut changed);
        apply_field(&mut game.venue, &new_state.venue, &mut changed);
        apply_field(&mut game.city, &new_state.city, &mut changed);
        apply_field(&mut game.referee, &new_state.referee, &mut changed);
        apply_field(&mut game.status, &new_state.status, &mut changed);
        apply_field(&mut game.tournament_id, &new_state.tournament_id, &mut changed);
        apply_field(&mut game.season, &new_state.season, &mut changed);
        apply_field(&mut game.round, &new_state.round, &mut changed);
        apply_field(&mut game.home_team_id, &new_state.home_team_id, &mut changed);
        apply_field(&mut game.away_team_id, &new_state.away_team_id, &mut changed);
        apply_field(&mut game.home_goals_ht, &new_state.home_goals_ht, &mut changed);
        apply_field(&mut game.away_goals_ht, &new_state.away_goals_ht, &mut changed);
        apply_field(&mut game.home_goals_ft, &new_state.home_goals_ft, &mut changed);
        apply_field(&mut game.away_goals_ft, &new_state.away_goals_ft, &mut changed);
        apply_field(&mut game.home_goals_et, &new_state.home_goals_et, &mut changed);
        apply_field(&mut game.away_goals_et, &new_state.away_goals_et, &mut changed);
        apply_field(&mut game.home_goals_pen, &new_state.home_goals_pen, &mut changed);
        apply_field(&mut game.away_goals_pen, &new_state.away_goals_pen, &mut changed);
        apply_field(&mut game.slug, &new_state.slug, &mut changed);

        // Once a preview exists the game is published; re-ingestion must not
        // move its publish time and re-hide it.
        if game.preview.is_none() {
            apply_field(&mut game.pub_date, &new_state.pub_date, &mut changed);
        }

        if changed {
            changed_games.push(game);
        }
    }

    let updated = store.bulk_update_games(changed_games);
    let created = store.bulk_create_games(proposed.into_values().collect());
    (created, updated)
}
