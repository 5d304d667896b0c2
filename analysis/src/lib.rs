//! Synthetic match analysis.
//!
//! Nothing in here looks at video. The generators produce plausible,
//! bounded random data for a game and the aggregator derives statistics
//! from whatever event set it is given. All randomness comes from the
//! caller's [`rand::Rng`], so seeded runs are reproducible.

pub mod events;
pub mod formation;
pub mod roster;
pub mod stats;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Number of events generated per game.
    pub event_count: usize,
    /// Maximum number of events written in one insert.
    pub event_batch_size: usize,
    /// Seconds between two formation snapshots.
    pub formation_interval: u32,
    pub max_players_per_side: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_count: 200,
            event_batch_size: 50,
            formation_interval: 1800,
            max_players_per_side: 11,
        }
    }
}
