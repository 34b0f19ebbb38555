pub mod details;
pub mod events;
pub mod lineups;
pub mod odds;
pub mod scores;
pub mod standings;
pub mod stats;
