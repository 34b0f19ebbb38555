//! Snapshot persistence and prediction export.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::store::Store;

/// Failures while reading or writing a store snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Load the full store from a JSON snapshot file.
pub fn load_store(path: &Path) -> Result<Store, SnapshotError> {
    let json = std::fs::read_to_string(path)?;
    let store = serde_json::from_str(&json)?;
    Ok(store)
}

/// Save the full store to a JSON snapshot file.
pub fn save_store(store: &Store, path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(store)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct PredictionRow<'a> {
    game: &'a str,
    date: String,
    outcome: &'a str,
    handicap: &'a str,
    total: &'a str,
    home_win_prob: f64,
    draw_prob: f64,
    away_win_prob: f64,
    home_goals_pred: f64,
    away_goals_pred: f64,
}

/// Export every stored prediction to CSV, newest first.
pub fn save_predictions_to_csv(store: &Store, path: &Path) -> Result<usize> {
    let mut games = store.games_where(|g| g.prediction.is_some());
    games.sort_by_key(|g| std::cmp::Reverse(g.game_date));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }
    let mut writer = csv::Writer::from_path(path).context("Failed to create CSV file")?;
    let written = games.len();
    for game in &games {
        let prediction = game.prediction.as_ref().expect("filtered on prediction");
        writer
            .serialize(PredictionRow {
                game: &game.slug,
                date: game.game_date.format("%Y-%m-%d %H:%M").to_string(),
                outcome: &prediction.outcome,
                handicap: &prediction.handicap,
                total: &prediction.total,
                home_win_prob: prediction.home_win_prob,
                draw_prob: prediction.draw_prob,
                away_win_prob: prediction.away_win_prob,
                home_goals_pred: prediction.home_goals_pred,
                away_goals_pred: prediction.away_goals_pred,
            })
            .context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(written)
}
