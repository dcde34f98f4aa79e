use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::AnalysisResult;
use crate::gemini::GeminiClient;
use crate::schedule::dashboard::DEFAULT_WINDOW_DAYS;
use crate::schedule::ServiceSlot;
use crate::store::EpisodeStore;

/// Desk parameters operators can change at runtime.
pub struct DeskConfig {
    /// How many days back the dashboard looks.
    pub window_days: u32,
    /// Slots listed per site on the dashboard.
    pub max_slots_per_site: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_slots_per_site: 25,
        }
    }
}

/// An analysis awaiting review before it is saved.
pub struct Draft {
    pub slot: ServiceSlot,
    pub analysis: AnalysisResult,
    pub created_by: String,
}

pub struct AppState {
    pub store: Arc<EpisodeStore>,
    pub gemini: Arc<GeminiClient>,
    /// Discord users allowed to run the desk. Empty means every guild member.
    pub operator_ids: HashSet<u64>,
    pub desk_config: Arc<RwLock<DeskConfig>>,
    /// Unsaved analyses keyed by slot id.
    pub drafts: Arc<RwLock<HashMap<String, Draft>>>,
}

impl AppState {
    pub fn is_operator(&self, user_id: u64) -> bool {
        self.operator_ids.is_empty() || self.operator_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desk_config_defaults() {
        let config = DeskConfig::default();
        assert_eq!(config.window_days, 90);
        assert_eq!(config.max_slots_per_site, 25);
    }
}
