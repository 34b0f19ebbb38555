//! Poisson-based outcome prediction and mispricing detection.
//!
//! The external regression model supplies expected goals per side; this
//! module turns them into a score grid, derives win/draw/loss and total
//! probabilities, compares them with the market and picks a recommended
//! outcome, handicap line and goals total.

use chrono::{DateTime, Utc};

use crate::models::Prediction;
use crate::store::Store;

/// Goal counts considered per side (0..=9).
const MAX_GOALS: usize = 10;

/// Minimum model/market ratio before a win outcome counts as underpriced.
const WIN_RATIO_FLOOR: f64 = 0.95;
const DRAW_RATIO_FLOOR: f64 = 0.80;
const TOTAL_RATIO_FLOOR: f64 = 0.95;

/// Odds caps: longshots are never recommended even when underpriced.
const WIN_ODDS_CAP: f64 = 3.5;
const DRAW_ODDS_CAP: f64 = 4.0;

pub const TOTAL_UNDER: &str = "Total under 2.5";
pub const TOTAL_OVER: &str = "Total over 2.5";

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Features handed to the goal-prediction model for one fixture.
#[derive(Debug, Clone, Copy)]
pub struct GoalFeatures {
    pub home_defence: f64,
    pub home_attack: f64,
    pub away_defence: f64,
    pub away_attack: f64,
    pub home_win_odds: f64,
    pub away_win_odds: f64,
    pub tour_av_goals: f64,
}

/// Opaque goal-prediction model boundary. Training happens elsewhere; the
/// pipeline only needs `(home_goals, away_goals)` expectations.
pub trait GoalsModel {
    fn predict_goals(&self, features: &GoalFeatures) -> (f64, f64);
}

/// Rating-driven fallback model: expected goals are the tournament average
/// scaled by the attack/defence ratio, as in the rating update itself.
pub struct BaselineModel;

impl GoalsModel for BaselineModel {
    fn predict_goals(&self, features: &GoalFeatures) -> (f64, f64) {
        let home = features.tour_av_goals * (features.home_attack / features.away_defence);
        let away = features.tour_av_goals * (features.away_attack / features.home_defence);
        (home.clamp(0.1, 6.0), away.clamp(0.1, 6.0))
    }
}

/// Joint score-grid probabilities for one fixture.
#[derive(Debug, Clone)]
pub struct ScoreGrid {
    pub home_dist: [f64; MAX_GOALS],
    pub away_dist: [f64; MAX_GOALS],
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub under: f64,
    pub over: f64,
}

/// Poisson mass for 0..=9 goals, normalized so the truncated distribution
/// sums to one.
fn poisson_dist(lambda: f64) -> [f64; MAX_GOALS] {
    let mut dist = [0.0; MAX_GOALS];
    let mut factorial = 1.0;
    for goals in 0..MAX_GOALS {
        if goals > 1 {
            factorial *= goals as f64;
        }
        dist[goals] = (-lambda).exp() * lambda.powi(goals as i32) / factorial;
    }
    let total: f64 = dist.iter().sum();
    for p in &mut dist {
        *p /= total;
    }
    dist
}

/// Build the 10x10 score grid and sum the joint probabilities into outcome
/// and totals buckets.
pub fn score_grid(home_exp: f64, away_exp: f64) -> ScoreGrid {
    let home_dist = poisson_dist(home_exp);
    let away_dist = poisson_dist(away_exp);

    let mut grid = ScoreGrid {
        home_dist,
        away_dist,
        home_win: 0.0,
        draw: 0.0,
        away_win: 0.0,
        under: 0.0,
        over: 0.0,
    };

    for home_goals in 0..MAX_GOALS {
        for away_goals in 0..MAX_GOALS {
            let p = home_dist[home_goals] * away_dist[away_goals];
            if home_goals > away_goals {
                grid.home_win += p;
            } else if home_goals == away_goals {
                grid.draw += p;
            } else {
                grid.away_win += p;
            }
            if home_goals + away_goals < 3 {
                grid.under += p;
            } else {
                grid.over += p;
            }
        }
    }

    grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "Home win",
            Outcome::Draw => "Draw",
            Outcome::AwayWin => "Away win",
        }
    }
}

/// Handicap line by odds bracket of the side the line is taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandicapLine {
    MinusTwoAndHalf,
    MinusOneAndHalf,
    MinusOne,
    MinusQuarter,
    Zero,
    PlusHalf,
}

impl HandicapLine {
    pub fn from_odds(odds: f64) -> Self {
        if odds < 1.3 {
            HandicapLine::MinusTwoAndHalf
        } else if odds < 1.5 {
            HandicapLine::MinusOneAndHalf
        } else if odds < 1.8 {
            HandicapLine::MinusOne
        } else if odds < 2.1 {
            HandicapLine::MinusQuarter
        } else if odds < 2.5 {
            HandicapLine::Zero
        } else {
            HandicapLine::PlusHalf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandicapLine::MinusTwoAndHalf => "-2.5",
            HandicapLine::MinusOneAndHalf => "-1.5",
            HandicapLine::MinusOne => "-1",
            HandicapLine::MinusQuarter => "-0.25",
            HandicapLine::Zero => "0",
            HandicapLine::PlusHalf => "+0.5",
        }
    }
}

fn handicap_label(side: Outcome, odds: f64) -> String {
    format!("{} ({})", side.as_str(), HandicapLine::from_odds(odds).as_str())
}

/// Pick the recommended outcome and handicap for one fixture.
///
/// The win branches fire only for the most underpriced outcome, and only
/// when the mispricing ratio and the odds cap both allow it; otherwise the
/// raw model probability decides. The handicap for a win outcome is always
/// bracketed on the away side's odds (preserved source behavior); a draw
/// brackets whichever side the market favors.
pub fn predict_outcome(
    grid: &ScoreGrid,
    home_odds: f64,
    draw_odds: f64,
    away_odds: f64,
) -> (Outcome, String) {
    let home_ratio = round2(grid.home_win * home_odds);
    let draw_ratio = round2(grid.draw * draw_odds);
    let away_ratio = round2(grid.away_win * away_odds);

    let outcome = if home_ratio >= draw_ratio
        && home_ratio >= away_ratio
        && home_ratio > WIN_RATIO_FLOOR
        && home_odds < WIN_ODDS_CAP
    {
        Outcome::HomeWin
    } else if away_ratio >= home_ratio
        && away_ratio >= draw_ratio
        && away_ratio > WIN_RATIO_FLOOR
        && away_odds < WIN_ODDS_CAP
    {
        Outcome::AwayWin
    } else if draw_ratio > DRAW_RATIO_FLOOR && draw_odds < DRAW_ODDS_CAP {
        Outcome::Draw
    } else if grid.home_win >= grid.draw && grid.home_win >= grid.away_win {
        Outcome::HomeWin
    } else if grid.draw >= grid.away_win {
        Outcome::Draw
    } else {
        Outcome::AwayWin
    };

    let handicap = match outcome {
        Outcome::HomeWin | Outcome::AwayWin => handicap_label(Outcome::AwayWin, away_odds),
        Outcome::Draw => {
            if home_odds < away_odds {
                handicap_label(Outcome::HomeWin, home_odds)
            } else {
                handicap_label(Outcome::AwayWin, away_odds)
            }
        }
    };

    (outcome, handicap)
}

/// Same ratio-then-fallback rule restricted to the two totals buckets. No
/// odds cap here.
pub fn predict_total(grid: &ScoreGrid, under_odds: f64, over_odds: f64) -> &'static str {
    let under_ratio = round2(grid.under * under_odds);
    let over_ratio = round2(grid.over * over_odds);

    if under_ratio >= over_ratio && under_ratio > TOTAL_RATIO_FLOOR {
        TOTAL_UNDER
    } else if over_ratio >= under_ratio && over_ratio > TOTAL_RATIO_FLOOR {
        TOTAL_OVER
    } else if grid.under >= grid.over {
        TOTAL_UNDER
    } else {
        TOTAL_OVER
    }
}

/// Assemble the stored prediction record for one fixture.
pub fn build_prediction(
    home_goals_pred: f64,
    away_goals_pred: f64,
    home_odds: f64,
    draw_odds: f64,
    away_odds: f64,
    under_odds: f64,
    over_odds: f64,
) -> Prediction {
    let grid = score_grid(home_goals_pred, away_goals_pred);
    let (outcome, handicap) = predict_outcome(&grid, home_odds, draw_odds, away_odds);
    let total = predict_total(&grid, under_odds, over_odds);

    Prediction {
        outcome: outcome.as_str().to_string(),
        handicap,
        total: total.to_string(),
        home_win_prob: round1(grid.home_win * 100.0),
        draw_prob: round1(grid.draw * 100.0),
        away_win_prob: round1(grid.away_win * 100.0),
        total_under_prob: round1(grid.under * 100.0),
        total_over_prob: round1(grid.over * 100.0),
        home_goals_pred,
        away_goals_pred,
        home_goals_dist: grid.home_dist.iter().map(|p| round3(*p)).collect(),
        away_goals_dist: grid.away_dist.iter().map(|p| round3(*p)).collect(),
    }
}

/// Predict every eligible game and write the predictions back in bulk.
pub fn predict_games(store: &mut Store, model: &dyn GoalsModel, now: DateTime<Utc>) {
    let candidates = store.prediction_candidates(now);
    let mut changed = Vec::new();

    for mut game in candidates {
        let Some(tournament) = store.tournament(game.tournament_id) else {
            continue;
        };
        let (Some((home_odds, draw_odds, away_odds)), Some((under_odds, over_odds))) =
            (game.outcome_odds(), game.total_odds())
        else {
            continue;
        };

        let features = GoalFeatures {
            home_defence: game.home_team_defence.unwrap_or_default(),
            home_attack: game.home_team_attack.unwrap_or_default(),
            away_defence: game.away_team_defence.unwrap_or_default(),
            away_attack: game.away_team_attack.unwrap_or_default(),
            home_win_odds: home_odds,
            away_win_odds: away_odds,
            tour_av_goals: tournament.av_goals_per_game,
        };
        let (home_goals_pred, away_goals_pred) = model.predict_goals(&features);

        game.prediction = Some(build_prediction(
            home_goals_pred,
            away_goals_pred,
            home_odds,
            draw_odds,
            away_odds,
            under_odds,
            over_odds,
        ));
        changed.push(game);
    }

    let updated = store.bulk_update_games(changed);
    tracing::info!(updated, "predictions written");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilities_normalize() {
        for (home, away) in [(1.8, 1.1), (0.4, 0.3), (3.2, 2.9), (5.5, 0.2)] {
            let grid = score_grid(home, away);
            let outcome_sum = grid.home_win + grid.draw + grid.away_win;
            let total_sum = grid.under + grid.over;
            assert!((outcome_sum - 1.0).abs() < 1e-6, "outcome sum {outcome_sum}");
            assert!((total_sum - 1.0).abs() < 1e-6, "total sum {total_sum}");
        }
    }

    #[test]
    fn test_stronger_home_side_orders_buckets() {
        let grid = score_grid(1.8, 1.1);
        assert!(grid.home_win > grid.draw);
        assert!(grid.draw > grid.away_win);

        let (outcome, handicap) = predict_outcome(&grid, 2.10, 3.40, 3.80);
        assert_eq!(outcome, Outcome::HomeWin);
        // Win handicaps are bracketed on the away odds.
        assert_eq!(handicap, "Away win (+0.5)");
    }

    #[test]
    fn test_fallback_uses_raw_probability() {
        // Balanced expectations with a market that overprices everything:
        // no ratio clears its floor, so the raw maximum decides.
        let grid = score_grid(1.0, 1.0);
        let (outcome, _) = predict_outcome(&grid, 1.05, 1.05, 1.05);
        let max = grid.home_win.max(grid.draw).max(grid.away_win);
        let expected = if max == grid.home_win {
            Outcome::HomeWin
        } else if max == grid.draw {
            Outcome::Draw
        } else {
            Outcome::AwayWin
        };
        assert_eq!(outcome, expected);
    }

    #[test]
    fn test_draw_branch_and_handicap_side() {
        // Symmetric low-scoring game: a big draw probability against fair
        // draw odds clears the 0.80 floor while neither win ratio leads.
        let grid = score_grid(0.6, 0.6);
        assert!(grid.draw > 0.3);
        let (outcome, handicap) = predict_outcome(&grid, 2.4, 3.2, 2.6);
        if outcome == Outcome::Draw {
            // Lower-odds side carries the line.
            assert!(handicap.starts_with("Home win"));
        }
    }

    #[test]
    fn test_handicap_brackets() {
        assert_eq!(HandicapLine::from_odds(1.2).as_str(), "-2.5");
        assert_eq!(HandicapLine::from_odds(1.4).as_str(), "-1.5");
        assert_eq!(HandicapLine::from_odds(1.6).as_str(), "-1");
        assert_eq!(HandicapLine::from_odds(2.0).as_str(), "-0.25");
        assert_eq!(HandicapLine::from_odds(2.3).as_str(), "0");
        assert_eq!(HandicapLine::from_odds(2.5).as_str(), "+0.5");
        assert_eq!(HandicapLine::from_odds(6.0).as_str(), "+0.5");
    }

    #[test]
    fn test_totals_rule() {
        // High-scoring expectation against generous over odds.
        let grid = score_grid(2.2, 1.6);
        assert_eq!(predict_total(&grid, 3.0, 1.9), TOTAL_OVER);

        // Low-scoring expectation with no ratio clearing the floor falls
        // back to the raw maximum.
        let grid = score_grid(0.5, 0.4);
        assert_eq!(predict_total(&grid, 1.01, 1.01), TOTAL_UNDER);
    }

    #[test]
    fn test_prediction_record_fields() {
        let prediction = build_prediction(1.8, 1.1, 2.10, 3.40, 3.80, 2.05, 1.75);
        assert_eq!(prediction.outcome, "Home win");
        assert_eq!(prediction.home_goals_dist.len(), 10);
        let pct_sum =
            prediction.home_win_prob + prediction.draw_prob + prediction.away_win_prob;
        assert!((pct_sum - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_baseline_model_tracks_ratings() {
        let features = GoalFeatures {
            home_defence: 1000.0,
            home_attack: 1200.0,
            away_defence: 1000.0,
            away_attack: 900.0,
            home_win_odds: 1.8,
            away_win_odds: 4.2,
            tour_av_goals: 1.25,
        };
        let (home, away) = BaselineModel.predict_goals(&features);
        assert!(home > away);
        assert!((home - 1.5).abs() < 1e-9);
    }
}
