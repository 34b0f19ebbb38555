use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Markets this pipeline actually consumes. The upstream payload keys odds by
/// free-form market names; everything downstream dispatches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    MatchWinner,
    GoalsOverUnder,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::MatchWinner => "Match Winner",
            Market::GoalsOverUnder => "Goals Over/Under",
        }
    }
}

/// Outcome keys within the two markets we read.
pub const OUTCOME_HOME: &str = "Home";
pub const OUTCOME_DRAW: &str = "Draw";
pub const OUTCOME_AWAY: &str = "Away";
pub const OUTCOME_UNDER: &str = "Under 2.5";
pub const OUTCOME_OVER: &str = "Over 2.5";

/// Decimal odds used as a "no data yet" placeholder in an odds series.
pub const ODDS_SENTINEL: f64 = 1.0;

/// Opening and latest cross-bookmaker average for one market outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsSeries {
    pub opening: f64,
    pub latest: f64,
}

impl OddsSeries {
    pub fn sentinel() -> Self {
        Self {
            opening: ODDS_SENTINEL,
            latest: ODDS_SENTINEL,
        }
    }

    pub fn has_data(&self) -> bool {
        self.latest != ODDS_SENTINEL
    }
}

/// Per-game odds history: market name -> outcome -> (opening, latest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOdds {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub markets: BTreeMap<String, BTreeMap<String, OddsSeries>>,
}

impl GameOdds {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created: now,
            updated: now,
            markets: BTreeMap::new(),
        }
    }

    pub fn market(&self, market: Market) -> Option<&BTreeMap<String, OddsSeries>> {
        self.markets.get(market.as_str())
    }

    /// Latest average for one outcome of one market, if present and not the
    /// `[1, 1]` sentinel.
    pub fn latest_odds(&self, market: Market, outcome: &str) -> Option<f64> {
        self.market(market)
            .and_then(|outcomes| outcomes.get(outcome))
            .filter(|series| series.has_data())
            .map(|series| series.latest)
    }
}

/// Game status derived from the upstream "long" status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "First Half")]
    FirstHalf,
    #[serde(rename = "Halftime")]
    Halftime,
    #[serde(rename = "Second Half")]
    SecondHalf,
    #[serde(rename = "Extra Time")]
    ExtraTime,
    #[serde(rename = "Penalty Shootout")]
    PenaltyShootout,
    #[serde(rename = "Match Finished")]
    Finished,
    #[serde(other)]
    Other,
}

impl GameStatus {
    pub fn from_long(status: &str) -> Self {
        match status {
            "Not Started" => GameStatus::NotStarted,
            "First Half" => GameStatus::FirstHalf,
            "Halftime" => GameStatus::Halftime,
            "Second Half" => GameStatus::SecondHalf,
            "Extra Time" => GameStatus::ExtraTime,
            "Penalty Shootout" => GameStatus::PenaltyShootout,
            "Match Finished" => GameStatus::Finished,
            _ => GameStatus::Other,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, GameStatus::Finished)
    }

    pub fn is_not_started(&self) -> bool {
        matches!(self, GameStatus::NotStarted)
    }
}

/// One row of a standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub rank: u32,
    pub rank_description: Option<String>,
    pub team_id: i64,
    pub team_name: String,
    pub status: Option<String>,
    pub stats_all: StandingStats,
    pub stats_home: StandingStats,
    pub stats_away: StandingStats,
}

/// Win/draw/loss record split, with points and goal difference filled in when
/// the feed omits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingStats {
    pub played: u32,
    pub win: u32,
    pub draw: u32,
    pub lose: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: i32,
    pub goals_diff: i32,
}

/// Full standings snapshot: group name -> ranked rows. Rebuilt wholesale on
/// every refresh, never merged.
pub type Standings = BTreeMap<String, Vec<StandingRow>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub external_id: i64,
    pub name: String,
    pub country: String,
    pub current_season: i32,
    pub base_rating: i32,
    pub av_goals_per_game: f64,
    pub is_championship: bool,
    pub is_running: bool,
    pub standings: Option<Standings>,
    pub slug: String,
}

impl Tournament {
    pub fn new(external_id: i64, name: &str, country: &str, current_season: i32) -> Self {
        Self {
            external_id,
            name: name.to_string(),
            country: country.to_string(),
            current_season,
            base_rating: 0,
            av_goals_per_game: 1.25,
            is_championship: true,
            is_running: true,
            standings: None,
            slug: slugify(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub external_id: i64,
    pub name: String,
    pub short_name: String,
    pub slug: String,
    /// 0 means the team has never been rated.
    pub defence: f64,
    pub attack: f64,
    pub rating_updated: Option<DateTime<Utc>>,
    pub league_id: Option<i64>,
}

impl Team {
    pub fn new(external_id: i64, name: &str) -> Self {
        Self {
            external_id,
            name: name.to_string(),
            short_name: name.to_string(),
            slug: slugify(&format!("{}-{}", external_id, name)),
            defence: 0.0,
            attack: 0.0,
            rating_updated: None,
            league_id: None,
        }
    }

    pub fn is_unrated(&self) -> bool {
        self.defence == 0.0
    }
}

/// Prediction attached to a game once ratings and odds are finalized.
/// Probabilities are percentages rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: String,
    pub handicap: String,
    pub total: String,
    pub home_win_prob: f64,
    pub draw_prob: f64,
    pub away_win_prob: f64,
    pub total_under_prob: f64,
    pub total_over_prob: f64,
    pub home_goals_pred: f64,
    pub away_goals_pred: f64,
    pub home_goals_dist: Vec<f64>,
    pub away_goals_dist: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub external_id: i64,
    pub game_date: DateTime<Utc>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub referee: Option<String>,
    pub status: GameStatus,
    pub tournament_id: i64,
    pub season: i32,
    pub round: Option<String>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_goals_ht: Option<u32>,
    pub away_goals_ht: Option<u32>,
    pub home_goals_ft: Option<u32>,
    pub away_goals_ft: Option<u32>,
    pub home_goals_et: Option<u32>,
    pub away_goals_et: Option<u32>,
    pub home_goals_pen: Option<u32>,
    pub away_goals_pen: Option<u32>,
    pub odds: Option<GameOdds>,
    pub home_stats: Option<HashMap<String, serde_json::Value>>,
    pub away_stats: Option<HashMap<String, serde_json::Value>>,
    pub events: Option<Vec<serde_json::Value>>,
    pub lineups: Option<Vec<serde_json::Value>>,
    pub home_team_class: Option<u8>,
    pub away_team_class: Option<u8>,
    /// Ratings frozen onto the game when they were assigned, decoupled from
    /// the teams' live ratings.
    pub home_team_defence: Option<f64>,
    pub home_team_attack: Option<f64>,
    pub away_team_defence: Option<f64>,
    pub away_team_attack: Option<f64>,
    pub prediction: Option<Prediction>,
    /// Owned by the preview text layer. Its presence freezes `pub_date`.
    pub preview: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub slug: String,
}

impl Game {
    /// Latest Match Winner odds (home, draw, away), if all three are known.
    pub fn outcome_odds(&self) -> Option<(f64, f64, f64)> {
        let odds = self.odds.as_ref()?;
        Some((
            odds.latest_odds(Market::MatchWinner, OUTCOME_HOME)?,
            odds.latest_odds(Market::MatchWinner, OUTCOME_DRAW)?,
            odds.latest_odds(Market::MatchWinner, OUTCOME_AWAY)?,
        ))
    }

    /// Latest Over/Under 2.5 odds (under, over), if both are known.
    pub fn total_odds(&self) -> Option<(f64, f64)> {
        let odds = self.odds.as_ref()?;
        Some((
            odds.latest_odds(Market::GoalsOverUnder, OUTCOME_UNDER)?,
            odds.latest_odds(Market::GoalsOverUnder, OUTCOME_OVER)?,
        ))
    }

    pub fn has_frozen_ratings(&self) -> bool {
        self.home_team_defence.is_some()
            && self.home_team_attack.is_some()
            && self.away_team_defence.is_some()
            && self.away_team_attack.is_some()
    }
}

/// URL-safe slug: lowercase alphanumerics joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("33-Manchester United"), "33-manchester-united");
        assert_eq!(slugify("  Real   Madrid! "), "real-madrid");
    }

    #[test]
    fn test_status_from_long() {
        assert_eq!(GameStatus::from_long("Not Started"), GameStatus::NotStarted);
        assert_eq!(GameStatus::from_long("Match Finished"), GameStatus::Finished);
        assert_eq!(
            GameStatus::from_long("Time to be defined"),
            GameStatus::Other
        );
        assert!(GameStatus::Finished.is_finished());
        assert!(!GameStatus::FirstHalf.is_not_started());
    }

    #[test]
    fn test_latest_odds_skips_sentinel() {
        let mut odds = GameOdds::new(Utc::now());
        let mut outcomes = BTreeMap::new();
        outcomes.insert(OUTCOME_HOME.to_string(), OddsSeries::sentinel());
        outcomes.insert(
            OUTCOME_AWAY.to_string(),
            OddsSeries {
                opening: 2.5,
                latest: 2.6,
            },
        );
        odds.markets
            .insert(Market::MatchWinner.as_str().to_string(), outcomes);

        assert_eq!(odds.latest_odds(Market::MatchWinner, OUTCOME_HOME), None);
        assert_eq!(
            odds.latest_odds(Market::MatchWinner, OUTCOME_AWAY),
            Some(2.6)
        );
    }
}
