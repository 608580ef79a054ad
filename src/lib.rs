pub mod config;
pub mod contest;
pub mod leaderboard;

pub use config::{Config, ConfigError};
pub use contest::{ContestClient, RankError, RankResult, RankSource, UNRANKED};
pub use leaderboard::{build_leaderboard_message, build_leaderboard_pages, fetch_all};
