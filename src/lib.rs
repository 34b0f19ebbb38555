pub mod api;
pub mod data;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod predict;
pub mod ratings;
pub mod store;

pub use api::{ApiClient, BatchScheduler, Fetch};
pub use models::{Game, GameOdds, GameStatus, Prediction, Team, Tournament};
pub use pipeline::run_cycle;
pub use predict::{BaselineModel, GoalsModel};
pub use store::Store;
