//! Elo-like team ratings driven by expected goals.
//!
//! Every team carries a defence and an attack rating. Before a game the
//! current ratings are frozen onto the game record; after the final whistle
//! both teams' live ratings move by how far the scoreline beat or missed the
//! expectation implied by the ratings.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Team, Tournament};
use crate::store::Store;

/// Ratings older than this are stale and get reseeded.
const RATING_MAX_AGE_DAYS: i64 = 90;

/// Reseeded ratings are backdated by this much so an earlier-dated fixture
/// for the same team cannot trigger a second reseed ahead of this one.
const RESEED_LOOKBACK_DAYS: i64 = 10;

/// Fraction of a rating a single goal is worth.
const GOAL_PRICE_SHARE: f64 = 0.05;

/// Cap on a single game's rating swing, in goal prices.
const MAX_GOAL_SWING: f64 = 3.0;

/// A team's (defence, attack) pair at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub defence: f64,
    pub attack: f64,
}

/// New ratings for both sides after a finished game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingUpdate {
    pub home: Rating,
    pub away: Rating,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Pre-game rating for one team. An unrated or stale team yields `None` for
/// this fixture; if the tournament is a top-level championship the team is
/// reseeded to the tournament's base rating (persisted by the caller) so it
/// is usable from the next fixture on.
pub fn pre_game_rating(
    team: &mut Team,
    tournament: &Tournament,
    as_of: DateTime<Utc>,
) -> Option<Rating> {
    let relevant = team
        .rating_updated
        .is_some_and(|updated| (as_of - updated) < Duration::days(RATING_MAX_AGE_DAYS));

    if team.is_unrated() || !relevant {
        if tournament.is_championship {
            team.defence = tournament.base_rating as f64;
            team.attack = tournament.base_rating as f64;
            team.rating_updated = Some(as_of - Duration::days(RESEED_LOOKBACK_DAYS));
        }
        return None;
    }

    Some(Rating {
        defence: team.defence,
        attack: team.attack,
    })
}

/// Post-game rating adjustment for both teams.
///
/// The goal price is normally 5% of the scorer's own attack rating; a side
/// that out-scored its expectation prices its goals off the opponent's
/// defence instead, so conceding more than expected is what costs rating.
/// The swing is bounded to three goal prices in either direction.
pub fn post_game_rating(
    home: Rating,
    away: Rating,
    home_goals: u32,
    away_goals: u32,
    tour_av_goals: f64,
) -> RatingUpdate {
    let home_goals = home_goals as f64;
    let away_goals = away_goals as f64;

    let home_goals_exp = tour_av_goals * (home.attack / away.defence);
    let away_goals_exp = tour_av_goals * (away.attack / home.defence);

    let home_goal_price = if home_goals > home_goals_exp {
        away.defence * GOAL_PRICE_SHARE
    } else {
        home.attack * GOAL_PRICE_SHARE
    };
    let away_goal_price = if away_goals > away_goals_exp {
        home.defence * GOAL_PRICE_SHARE
    } else {
        away.attack * GOAL_PRICE_SHARE
    };

    let home_delta = ((home_goals - home_goals_exp) * home_goal_price)
        .clamp(-MAX_GOAL_SWING * home_goal_price, MAX_GOAL_SWING * home_goal_price);
    let away_delta = ((away_goals - away_goals_exp) * away_goal_price)
        .clamp(-MAX_GOAL_SWING * away_goal_price, MAX_GOAL_SWING * away_goal_price);

    RatingUpdate {
        home: Rating {
            defence: round1(home.defence - away_delta),
            attack: round1(home.attack + home_delta),
        },
        away: Rating {
            defence: round1(away.defence - home_delta),
            attack: round1(away.attack + away_delta),
        },
    }
}

/// Freeze each side's current rating onto the not-started games close to
/// kick-off. Reseeded teams are persisted immediately so a later game in the
/// same pass sees the new rating.
pub fn assign_pre_game_ratings(store: &mut Store, now: DateTime<Utc>) {
    let future_games = store.future_games(now);
    let mut changed_games = Vec::new();

    for mut game in future_games {
        let Some(tournament) = store.tournament(game.tournament_id).cloned() else {
            continue;
        };

        let mut frozen = [None, None];
        for (slot, team_id) in [(0, game.home_team_id), (1, game.away_team_id)] {
            let Some(team) = store.team(team_id) else {
                continue;
            };
            let mut team = team.clone();
            let before = (team.defence, team.attack, team.rating_updated);
            frozen[slot] = pre_game_rating(&mut team, &tournament, game.game_date);
            if (team.defence, team.attack, team.rating_updated) != before {
                store.save_team(team);
            }
        }

        game.home_team_defence = frozen[0].map(|r| r.defence);
        game.home_team_attack = frozen[0].map(|r| r.attack);
        game.away_team_defence = frozen[1].map(|r| r.defence);
        game.away_team_attack = frozen[1].map(|r| r.attack);
        changed_games.push(game);
    }

    let updated = store.bulk_update_games(changed_games);
    tracing::info!(updated, "pre-game ratings assigned");
}

/// Move both teams' live ratings for every recently finished game whose
/// frozen ratings are present and whose teams have not been updated for this
/// game yet. Re-ingested games are silently skipped by the guard.
pub fn apply_post_game_updates(store: &mut Store, now: DateTime<Utc>) {
    let finished = store.finished_games(now);
    let mut changed_teams = Vec::new();

    for game in finished {
        let (Some(home_def), Some(home_att), Some(away_def), Some(away_att)) = (
            game.home_team_defence,
            game.home_team_attack,
            game.away_team_defence,
            game.away_team_attack,
        ) else {
            continue;
        };
        let (Some(home_goals), Some(away_goals)) = (game.home_goals_ft, game.away_goals_ft) else {
            continue;
        };
        let Some(tournament) = store.tournament(game.tournament_id) else {
            continue;
        };
        let (Some(home_team), Some(away_team)) =
            (store.team(game.home_team_id), store.team(game.away_team_id))
        else {
            continue;
        };
        // Already applied for this game.
        if home_team
            .rating_updated
            .is_some_and(|updated| updated >= game.game_date)
        {
            continue;
        }

        let update = post_game_rating(
            Rating {
                defence: home_def,
                attack: home_att,
            },
            Rating {
                defence: away_def,
                attack: away_att,
            },
            home_goals,
            away_goals,
            tournament.av_goals_per_game,
        );

        let mut home_team = home_team.clone();
        home_team.defence = update.home.defence;
        home_team.attack = update.home.attack;
        home_team.rating_updated = Some(game.game_date);

        let mut away_team = away_team.clone();
        away_team.defence = update.away.defence;
        away_team.attack = update.away.attack;
        away_team.rating_updated = Some(game.game_date);

        // Persist immediately so a second finished game for either team in
        // this pass starts from the moved rating.
        store.save_team(home_team.clone());
        store.save_team(away_team.clone());
        changed_teams.push(home_team);
        changed_teams.push(away_team);
    }

    let updated = store.bulk_update_teams(changed_teams);
    tracing::info!(updated, "post-game ratings applied");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;
    use crate::store::tests_support::sample_game;

    fn championship(base_rating: i32) -> Tournament {
        let mut tour = Tournament::new(39, "Premier League", "England", 2026);
        tour.base_rating = base_rating;
        tour
    }

    #[test]
    fn test_unrated_team_is_reseeded_in_championship() {
        let as_of = Utc::now();
        let mut team = Team::new(40, "Liverpool");
        let tour = championship(1000);

        let rating = pre_game_rating(&mut team, &tour, as_of);

        assert_eq!(rating, None);
        assert_eq!(team.defence, 1000.0);
        assert_eq!(team.attack, 1000.0);
        assert_eq!(team.rating_updated, Some(as_of - Duration::days(10)));
    }

    #[test]
    fn test_unrated_team_in_non_championship_is_left_alone() {
        let as_of = Utc::now();
        let mut team = Team::new(40, "Liverpool");
        let mut tour = championship(1000);
        tour.is_championship = false;

        assert_eq!(pre_game_rating(&mut team, &tour, as_of), None);
        assert_eq!(team.defence, 0.0);
        assert_eq!(team.rating_updated, None);
    }

    #[test]
    fn test_stale_rating_triggers_reseed() {
        let as_of = Utc::now();
        let mut team = Team::new(40, "Liverpool");
        team.defence = 1100.0;
        team.attack = 1050.0;
        team.rating_updated = Some(as_of - Duration::days(120));
        let tour = championship(1000);

        assert_eq!(pre_game_rating(&mut team, &tour, as_of), None);
        assert_eq!(team.defence, 1000.0);
    }

    #[test]
    fn test_fresh_rating_is_returned() {
        let as_of = Utc::now();
        let mut team = Team::new(40, "Liverpool");
        team.defence = 1100.0;
        team.attack = 1050.0;
        team.rating_updated = Some(as_of - Duration::days(7));
        let tour = championship(1000);

        let rating = pre_game_rating(&mut team, &tour, as_of).unwrap();
        assert_eq!(rating.defence, 1100.0);
        assert_eq!(rating.attack, 1050.0);
    }

    #[test]
    fn test_overperformance_prices_goals_off_opponents_defence() {
        let even = Rating {
            defence: 1000.0,
            attack: 1000.0,
        };
        // Expected goals are 1.25 each; home scored 3, so the home goal price
        // switches to the away defence and home attack must rise.
        let update = post_game_rating(even, even, 3, 0, 1.25);

        assert!(update.home.attack > 1000.0);
        assert!(update.away.defence < 1000.0);
        // Away under-performed: its attack drops, home defence gains.
        assert!(update.away.attack < 1000.0);
        assert!(update.home.defence > 1000.0);
    }

    #[test]
    fn test_rating_swing_is_bounded() {
        let strong = Rating {
            defence: 1400.0,
            attack: 1400.0,
        };
        let weak = Rating {
            defence: 700.0,
            attack: 700.0,
        };

        // The bound is three times the goal price actually chosen for the
        // side: the opponent's defence when it out-scored its expectation,
        // its own attack otherwise. Rounding to one decimal allows 0.05.
        let chosen_price = |goals: u32, expected: f64, own_attack: f64, opp_defence: f64| {
            if goals as f64 > expected {
                opp_defence * GOAL_PRICE_SHARE
            } else {
                own_attack * GOAL_PRICE_SHARE
            }
        };
        let tour_av_goals = 1.25;
        let home_expected = tour_av_goals * (strong.attack / weak.defence);
        let away_expected = tour_av_goals * (weak.attack / strong.defence);

        for (hg, ag) in [(9, 0), (0, 9), (5, 5), (0, 0)] {
            let update = post_game_rating(strong, weak, hg, ag, tour_av_goals);
            let home_bound =
                MAX_GOAL_SWING * chosen_price(hg, home_expected, strong.attack, weak.defence);
            let away_bound =
                MAX_GOAL_SWING * chosen_price(ag, away_expected, weak.attack, strong.defence);
            assert!((update.home.attack - strong.attack).abs() <= home_bound + 0.05);
            assert!((update.away.attack - weak.attack).abs() <= away_bound + 0.05);
            assert!((update.home.defence - strong.defence).abs() <= away_bound + 0.05);
            assert!((update.away.defence - weak.defence).abs() <= home_bound + 0.05);
        }
    }

    #[test]
    fn test_assign_freezes_ratings_onto_game() {
        let now = Utc::now();
        let mut store = Store::new();
        store.add_tournament(championship(1000));

        let mut home = Team::new(40, "Liverpool");
        home.defence = 1100.0;
        home.attack = 1060.0;
        home.rating_updated = Some(now - Duration::days(5));
        let mut away = Team::new(45, "Everton");
        away.defence = 950.0;
        away.attack = 920.0;
        away.rating_updated = Some(now - Duration::days(5));
        store.bulk_create_teams(vec![home, away]);

        let mut game = sample_game(1, GameStatus::NotStarted, now + Duration::days(1));
        game.home_team_id = 40;
        game.away_team_id = 45;
        store.bulk_create_games(vec![game]);

        assign_pre_game_ratings(&mut store, now);

        let game = store.game(1).unwrap();
        assert_eq!(game.home_team_defence, Some(1100.0));
        assert_eq!(game.away_team_attack, Some(920.0));
    }

    #[test]
    fn test_post_game_update_applies_once() {
        let now = Utc::now();
        let game_date = now - Duration::hours(3);
        let mut store = Store::new();
        store.add_tournament(championship(1000));

        let mut home = Team::new(40, "Liverpool");
        home.defence = 1000.0;
        home.attack = 1000.0;
        home.rating_updated = Some(game_date - Duration::days(4));
        let mut away = Team::new(45, "Everton");
        away.defence = 1000.0;
        away.attack = 1000.0;
        away.rating_updated = Some(game_date - Duration::days(4));
        store.bulk_create_teams(vec![home, away]);

        let mut game = sample_game(1, GameStatus::Finished, game_date);
        game.home_team_id = 40;
        game.away_team_id = 45;
        game.home_goals_ft = Some(3);
        game.away_goals_ft = Some(0);
        game.home_team_defence = Some(1000.0);
        game.home_team_attack = Some(1000.0);
        game.away_team_defence = Some(1000.0);
        game.away_team_attack = Some(1000.0);
        store.bulk_create_games(vec![game]);

        apply_post_game_updates(&mut store, now);
        let attack_after_first = store.team(40).unwrap().attack;
        assert!(attack_after_first > 1000.0);
        assert_eq!(store.team(40).unwrap().rating_updated, Some(game_date));

        // Re-ingestion of the same finished game must not move ratings again.
        apply_post_game_updates(&mut store, now);
        assert_eq!(store.team(40).unwrap().attack, attack_after_first);
    }

    #[test]
    fn test_games_without_frozen_ratings_are_skipped() {
        let now = Utc::now();
        let mut store = Store::new();
        store.add_tournament(championship(1000));
        store.bulk_create_teams(vec![Team::new(40, "Liverpool"), Team::new(45, "Everton")]);

        let mut game = sample_game(1, GameStatus::Finished, now - Duration::hours(2));
        game.home_team_id = 40;
        game.away_team_id = 45;
        game.home_goals_ft = Some(2);
        game.away_goals_ft = Some(2);
        store.bulk_create_games(vec![game]);

        apply_post_game_updates(&mut store, now);
        assert_eq!(store.team(40).unwrap().defence, 0.0);
    }
}
