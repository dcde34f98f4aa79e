pub mod dashboard;
pub mod sites;

use std::collections::{BTreeMap, HashSet};
use std::future::Future;

use anyhow::Result;
use chrono::{Datelike, Days, Locale, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day of week as stored in the rule table: 0 = Sunday … 6 = Saturday.
pub type WeekdayIndex = u8;

/// A recurring-service configuration for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
    pub display_name: String,
    /// Earliest date the site held services. Informational only.
    pub start_date: NaiveDate,
    /// Weekday -> `HH:MM` times. Times are not required to be sorted.
    pub weekly_rules: BTreeMap<WeekdayIndex, Vec<String>>,
}

impl Site {
    pub fn new(id: &str, display_name: &str, start_date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            start_date,
            weekly_rules: BTreeMap::new(),
        }
    }

    /// Add (or replace) the times held on `weekday`.
    pub fn with_rule(mut self, weekday: WeekdayIndex, times: &[&str]) -> Self {
        self.weekly_rules
            .insert(weekday, times.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Configured times for the weekday `date` falls on.
    pub fn times_on(&self, date: NaiveDate) -> Option<&[String]> {
        self.weekly_rules
            .get(&weekday_index(date))
            .map(|times| times.as_slice())
    }
}

pub fn weekday_index(date: NaiveDate) -> WeekdayIndex {
    date.weekday().num_days_from_sunday() as WeekdayIndex
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Pending,
    Published,
}

/// One concrete service occurrence. Never persisted; recomputed on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSlot {
    pub id: String,
    pub site_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: SlotStatus,
}

impl ServiceSlot {
    pub fn new(site_id: &str, date: NaiveDate, time: &str) -> Self {
        Self {
            id: slot_id(site_id, date, time),
            site_id: site_id.to_string(),
            date,
            time: time.to_string(),
            status: SlotStatus::Pending,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == SlotStatus::Published
    }

    /// e.g. "12 de maio"
    pub fn formatted_date(&self) -> String {
        self.date
            .format_localized("%d de %B", Locale::pt_BR)
            .to_string()
    }

    /// e.g. "domingo"
    pub fn week_day(&self) -> String {
        self.date.format_localized("%A", Locale::pt_BR).to_string()
    }
}

/// Natural key of a slot: `{site}_{YYYYMMDD}_{HHMM}`.
pub fn slot_id(site_id: &str, date: NaiveDate, time: &str) -> String {
    format!(
        "{}_{}_{}",
        site_id,
        date.format("%Y%m%d"),
        time.replace(':', "")
    )
}

/// Split a slot id back into `(site_id, date, "HH:MM")`.
pub fn parse_slot_id(id: &str) -> Option<(String, NaiveDate, String)> {
    let mut parts = id.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    let site_id = parts.next()?;

    if site_id.is_empty() || time.len() != 4 || !time.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    Some((
        site_id.to_string(),
        date,
        format!("{}:{}", &time[..2], &time[2..]),
    ))
}

/// Expand `site`'s weekly rules over `[reference_date - window_days, reference_date]`.
///
/// Every slot starts out `Pending`. The result is ordered most recent first:
/// date descending, then time descending.
pub fn generate(site: &Site, reference_date: NaiveDate, window_days: u32) -> Vec<ServiceSlot> {
    let start = reference_date
        .checked_sub_days(Days::new(window_days.into()))
        .unwrap_or(NaiveDate::MIN);

    let mut slots: Vec<ServiceSlot> = start
        .iter_days()
        .take_while(|day| *day <= reference_date)
        .filter_map(|day| site.times_on(day).map(|times| (day, times)))
        .flat_map(|(day, times)| {
            times
                .iter()
                .map(move |time| ServiceSlot::new(&site.id, day, time))
        })
        .collect();

    slots.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.time.cmp(&a.time)));
    slots
}

/// Mark every slot whose id is in `completed_ids` as published, the rest as pending.
/// Order and all other fields are left untouched.
pub fn reconcile(slots: Vec<ServiceSlot>, completed_ids: &HashSet<String>) -> Vec<ServiceSlot> {
    slots
        .into_iter()
        .map(|mut slot| {
            slot.status = if completed_ids.contains(&slot.id) {
                SlotStatus::Published
            } else {
                SlotStatus::Pending
            };
            slot
        })
        .collect()
}

/// Source of the ids that already have a persisted episode record.
pub trait CompletedIds {
    fn list_completed_ids(&self) -> impl Future<Output = Result<HashSet<String>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn example_site() -> Site {
        Site::new("site", "Example", ymd(2024, 1, 1))
            .with_rule(0, &["08:00", "10:30"])
            .with_rule(3, &["20:00"])
    }

    #[test]
    fn test_generate_example_week() {
        let slots = generate(&example_site(), ymd(2024, 5, 15), 7);
        let ids: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["site_20240515_2000", "site_20240512_1030", "site_20240512_0800"]
        );
        assert!(slots.iter().all(|s| s.status == SlotStatus::Pending));
        assert_eq!(slots[0].time, "20:00");
        assert_eq!(slots[0].site_id, "site");
    }

    #[test]
    fn test_generate_stays_inside_window() {
        let reference = ymd(2024, 5, 15);
        let slots = generate(&example_site(), reference, 60);
        let earliest = ymd(2024, 3, 16);
        assert!(!slots.is_empty());
        assert!(slots.iter().all(|s| s.date >= earliest && s.date <= reference));
    }

    #[test]
    fn test_generate_counts_per_day_match_rules() {
        let site = example_site();
        let reference = ymd(2024, 5, 15);
        let slots = generate(&site, reference, 30);

        for day in ymd(2024, 4, 15).iter_days().take_while(|d| *d <= reference) {
            let expected = site.times_on(day).map(|t| t.len()).unwrap_or(0);
            let actual = slots.iter().filter(|s| s.date == day).count();
            assert_eq!(actual, expected, "slot count for {}", day);
        }
    }

    #[test]
    fn test_generate_sorted_most_recent_first() {
        let site = Site::new("s", "S", ymd(2024, 1, 1))
            .with_rule(0, &["19:30", "08:00", "17:00", "10:30"])
            .with_rule(6, &["18:00"]);
        let slots = generate(&site, ymd(2024, 6, 30), 45);
        for pair in slots.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.date > b.date || (a.date == b.date && a.time > b.time),
                "{} should come before {}",
                a.id,
                b.id
            );
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let site = example_site();
        let reference = ymd(2024, 5, 15);
        assert_eq!(generate(&site, reference, 90), generate(&site, reference, 90));
    }

    #[test]
    fn test_generate_zero_window() {
        let site = example_site();
        let wednesday = generate(&site, ymd(2024, 5, 15), 0);
        assert_eq!(wednesday.len(), 1);
        assert_eq!(wednesday[0].id, "site_20240515_2000");

        let thursday = generate(&site, ymd(2024, 5, 16), 0);
        assert!(thursday.is_empty());
    }

    #[test]
    fn test_generate_empty_rules() {
        let site = Site::new("empty", "Empty", ymd(2024, 1, 1));
        assert!(generate(&site, ymd(2024, 5, 15), 0).is_empty());
        assert!(generate(&site, ymd(2024, 5, 15), 365).is_empty());
    }

    #[test]
    fn test_reconcile_marks_only_completed() {
        let slots = generate(&example_site(), ymd(2024, 5, 15), 7);
        let done: HashSet<String> = ["site_20240512_0800".to_string()].into_iter().collect();
        let merged = reconcile(slots.clone(), &done);

        assert_eq!(merged.len(), slots.len());
        for (before, after) in slots.iter().zip(&merged) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.date, after.date);
            assert_eq!(before.time, after.time);
            assert_eq!(before.site_id, after.site_id);
        }
        let published: Vec<&str> = merged
            .iter()
            .filter(|s| s.is_published())
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(published, vec!["site_20240512_0800"]);
    }

    #[test]
    fn test_reconcile_resets_stale_status() {
        let mut slot = ServiceSlot::new("site", ymd(2024, 5, 12), "08:00");
        slot.status = SlotStatus::Published;
        let merged = reconcile(vec![slot], &HashSet::new());
        assert_eq!(merged[0].status, SlotStatus::Pending);
    }

    #[test]
    fn test_parse_slot_id() {
        let (site, date, time) = parse_slot_id("campos85_20240512_1930").unwrap();
        assert_eq!(site, "campos85");
        assert_eq!(date, ymd(2024, 5, 12));
        assert_eq!(time, "19:30");

        assert!(parse_slot_id("campos85_2024-05-12_1930").is_none());
        assert!(parse_slot_id("20240512_1930").is_none());
        assert!(parse_slot_id("campos85_20240512_19h3").is_none());
    }

    #[test]
    fn test_presentation_labels() {
        let slot = ServiceSlot::new("site", ymd(2024, 5, 12), "08:00");
        assert!(slot.formatted_date().starts_with("12 de "));
        assert!(!slot.week_day().is_empty());
    }
}
