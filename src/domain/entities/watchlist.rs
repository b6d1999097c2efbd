use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A symbol the user follows without necessarily holding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub symbol: String,
    pub name: Option<String>,
    pub added_at: DateTime<Utc>,
}
