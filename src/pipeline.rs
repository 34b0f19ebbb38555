//! One ingestion cycle, end to end.
//!
//! Ordering matters: scores run first because they create team and game
//! identities; every feed must land before ratings, and ratings before
//! predictions. A failure isolated to one fixture or tournament degrades to
//! "no data" and never aborts the cycle.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::api::tasks::RATE_LIMIT_PAUSE;
use crate::api::{BatchScheduler, Fetch};
use crate::ingest::details::DetailKind;
use crate::ingest::{events, lineups, odds, scores, standings, stats};
use crate::predict::{predict_games, GoalsModel};
use crate::ratings::{apply_post_game_updates, assign_pre_game_ratings};
use crate::store::Store;

/// Run a full cycle with the production batch scheduler and rate-limit
/// pause.
pub async fn run_cycle<F: Fetch>(
    fetcher: &F,
    store: &mut Store,
    model: &dyn GoalsModel,
    now: DateTime<Utc>,
) {
    run_cycle_with(
        fetcher,
        store,
        model,
        &BatchScheduler::default(),
        RATE_LIMIT_PAUSE,
        now,
    )
    .await
}

/// Cycle with injectable scheduler and inter-stage pause, for tests.
pub async fn run_cycle_with<F: Fetch>(
    fetcher: &F,
    store: &mut Store,
    model: &dyn GoalsModel,
    scheduler: &BatchScheduler,
    stage_pause: Duration,
    now: DateTime<Utc>,
) {
    tracing::info!("ingestion cycle started");

    scores::update(fetcher, store, now).await;

    let odds_pending = !DetailKind::Odds.games_to_fetch(store, now).is_empty();
    odds::update(fetcher, scheduler, store, now).await;

    // Odds are the most expensive detail stage; give the fixed-window rate
    // limit room before the remaining detail feeds. An idle odds stage has
    // spent no budget, so skip the pause.
    if odds_pending {
        tokio::time::sleep(stage_pause).await;
    }

    stats::update(fetcher, scheduler, store, now).await;
    events::update(fetcher, scheduler, store, now).await;
    lineups::update(fetcher, scheduler, store, now).await;
    standings::update(fetcher, store, now).await;

    compute(store, model, now);

    tracing::info!("ingestion cycle complete");
}

/// The synchronous tail of the cycle: ratings and predictions need no I/O
/// and run against whatever the store holds.
pub fn compute(store: &mut Store, model: &dyn GoalsModel, now: DateTime<Utc>) {
    assign_pre_game_ratings(store, now);
    apply_post_game_updates(store, now);
    predict_games(store, model, now);
}
