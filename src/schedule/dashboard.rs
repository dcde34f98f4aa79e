use std::collections::HashSet;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{generate, reconcile, CompletedIds, ServiceSlot, Site};

pub const DEFAULT_WINDOW_DAYS: u32 = 90;
/// Longest lookback accepted. Slots are generated in full before rendering.
pub const MAX_WINDOW_DAYS: u32 = 366;

pub fn check_window_days(days: u32) -> Result<u32> {
    if days > MAX_WINDOW_DAYS {
        bail!("window must be at most {} days, got {}", MAX_WINDOW_DAYS, days);
    }
    Ok(days)
}

/// One site's reconciled slots, most recent first.
#[derive(Debug, Clone)]
pub struct SiteColumn {
    pub site: Site,
    pub slots: Vec<ServiceSlot>,
}

impl SiteColumn {
    pub fn published_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_published()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len() - self.published_count()
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub columns: Vec<SiteColumn>,
    /// Set when the record lookup failed. Every slot is then reported pending.
    pub lookup_error: Option<String>,
}

/// Build the status board: generate every site's slots, fetch the completed
/// ids once, and merge.
pub async fn load_dashboard<S: CompletedIds>(
    source: &S,
    sites: &[Site],
    reference_date: NaiveDate,
    window_days: u32,
) -> Dashboard {
    let generated: Vec<(Site, Vec<ServiceSlot>)> = sites
        .iter()
        .map(|site| (site.clone(), generate(site, reference_date, window_days)))
        .collect();

    let (completed, lookup_error) = match source.list_completed_ids().await {
        Ok(ids) => (ids, None),
        Err(e) => {
            warn!(error = %e, "Completed-episode lookup failed, reporting all slots pending");
            (HashSet::new(), Some(format!("{:#}", e)))
        }
    };

    let columns: Vec<SiteColumn> = generated
        .into_iter()
        .map(|(site, slots)| SiteColumn {
            slots: reconcile(slots, &completed),
            site,
        })
        .collect();

    debug!(
        sites = columns.len(),
        completed = completed.len(),
        %reference_date,
        window_days,
        "dashboard loaded"
    );

    Dashboard {
        columns,
        lookup_error,
    }
}
