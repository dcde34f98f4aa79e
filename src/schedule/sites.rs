use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;

use super::{parse_slot_id, ServiceSlot, Site};

/// Sites the media team publishes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteId {
    Campos85,
    Campos153,
}

impl SiteId {
    pub const ALL: [SiteId; 2] = [SiteId::Campos85, SiteId::Campos153];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteId::Campos85 => "campos85",
            SiteId::Campos153 => "campos153",
        }
    }

    /// The weekly service table for this site.
    pub fn site(&self) -> Site {
        match self {
            SiteId::Campos85 => Site::new(self.as_str(), "Campos 85", start(2023, 1, 1))
                .with_rule(0, &["08:00", "10:30", "17:00", "19:30"])
                .with_rule(3, &["20:00"]),
            SiteId::Campos153 => Site::new(self.as_str(), "Campos 153", start(2023, 6, 1))
                .with_rule(0, &["10:00", "19:00"])
                .with_rule(3, &["20:00"]),
        }
    }
}

fn start(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("site start date is a valid calendar date")
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SiteId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown site '{}'", s))
    }
}

pub fn all_sites() -> Vec<Site> {
    SiteId::ALL.iter().map(SiteId::site).collect()
}

/// Resolve a slot id to the scheduled service it names.
///
/// Returns `None` unless the site is known, the date is not before the site's
/// start date, and its rule table holds a service at that weekday and time.
pub fn lookup_slot(id: &str) -> Option<ServiceSlot> {
    let (site_id, date, time) = parse_slot_id(id)?;
    let site_id: SiteId = site_id.parse().ok()?;
    let site = site_id.site();
    if date < site.start_date {
        return None;
    }

    let scheduled = site.times_on(date)?.iter().any(|t| *t == time);
    if !scheduled {
        return None;
    }
    Some(ServiceSlot::new(&site.id, date, &time))
}
