use chrono::NaiveDate;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::api::Fetch;
use crate::models::Tournament;

/// Store/API batch size shared by detail fetches and bulk writes.
pub const BATCH_SIZE: usize = 100;

/// Detail-lookup batches allowed before the fixed-window rate limit forces a
/// pause.
const BATCHES_PER_WINDOW: usize = 3;

/// Length of the rate-limit pause.
pub const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(90);

/// Splits large fixture-id lists into fixed-size batches and throttles their
/// submission to stay under the upstream per-minute request limit. Each batch
/// fans out one concurrent request per fixture and joins the results; a failed
/// lookup just drops out of the result map.
pub struct BatchScheduler {
    batch_size: usize,
    pause: Duration,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            pause: RATE_LIMIT_PAUSE,
        }
    }
}

impl BatchScheduler {
    /// Scheduler with a custom batch size and pause, for tests.
    pub fn with_limits(batch_size: usize, pause: Duration) -> Self {
        Self { batch_size, pause }
    }

    /// Fetch per-fixture detail data (odds, statistics, events, lineups) for
    /// every id, keyed by the original fixture id. Ids whose fetch came back
    /// empty are omitted.
    pub async fn fetch_details<F: Fetch>(
        &self,
        fetcher: &F,
        endpoint: &str,
        game_ids: &[i64],
    ) -> HashMap<i64, Vec<Value>> {
        let mut details = HashMap::new();

        for (batch_no, batch) in game_ids.chunks(self.batch_size).enumerate() {
            if batch_no > 0 && batch_no % BATCHES_PER_WINDOW == 0 {
                tracing::info!(endpoint, "rate limit window reached, pausing");
                tokio::time::sleep(self.pause).await;
            }

            let responses = join_all(batch.iter().map(|id| {
                let query = vec![("fixture", id.to_string())];
                async move { fetcher.fetch(endpoint, &query).await }
            }))
            .await;

            for (id, response) in batch.iter().zip(responses) {
                if !response.is_empty() {
                    details.insert(*id, response);
                }
            }
        }

        details
    }
}

/// Fetch one endpoint concurrently for every running tournament, flattening
/// all non-empty responses. Tournament counts are small, so this path is not
/// batch-throttled.
pub async fn fetch_for_tournaments<F: Fetch>(
    fetcher: &F,
    endpoint: &str,
    tournaments: &[Tournament],
    window: Option<(NaiveDate, NaiveDate)>,
) -> Vec<Value> {
    let responses = join_all(tournaments.iter().map(|tour| {
        let mut query = vec![
            ("league", tour.external_id.to_string()),
            ("season", tour.current_season.to_string()),
        ];
        if let Some((from, to)) = window {
            query.push(("from", from.to_string()));
            query.push(("to", to.to_string()));
        }
        async move { fetcher.fetch(endpoint, &query).await }
    }))
    .await;

    responses.into_iter().flatten().collect()
}
