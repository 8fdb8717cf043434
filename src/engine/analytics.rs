//! Statistics derived from the activity record.
//!
//! Nothing here is persisted: every call rescans the record for a trailing window of
//! calendar days and rebuilds the counters.

use std::collections::BTreeMap;

use chrono::{Days, Local, NaiveDate};
use indexmap::IndexMap;
use tracing::instrument;

use crate::{
    base::{config::MAX_WINDOW_DAYS, error::EngineError},
    engine::report::{self, ReportDocument},
    store::{
        activity::{ActivityEvent, ActivityLog, ActivityRecord, Level},
        responses::ResponseStore,
    },
};

/// Counters for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    /// Informational records.
    pub ok: u64,
    /// Error and critical records.
    pub err: u64,
    pub warn: u64,
    /// Administrative commands executed.
    pub requests: u64,
    /// Automated replies dispatched.
    pub responses: u64,
}

impl DayCounts {
    fn add(&mut self, other: &DayCounts) {
        self.ok += other.ok;
        self.err += other.err;
        self.warn += other.warn;
        self.requests += other.requests;
        self.responses += other.responses;
    }
}

/// Aggregated counters for a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// First day of the window (inclusive).
    pub from: NaiveDate,
    /// Last day of the window (inclusive).
    pub to: NaiveDate,
    /// Per-day counters for days with at least one counted record.
    pub days: BTreeMap<NaiveDate, DayCounts>,
    /// Match counts per trigger, in first-seen order.
    pub triggers: IndexMap<String, u64>,
}

impl Stats {
    fn empty(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            days: BTreeMap::new(),
            triggers: IndexMap::new(),
        }
    }

    /// Counters summed over the whole window.
    pub fn totals(&self) -> DayCounts {
        let mut totals = DayCounts::default();
        for counts in self.days.values() {
            totals.add(counts);
        }
        totals
    }

    /// Triggers by descending frequency; ties keep first-seen order.
    pub fn ranked_triggers(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.triggers.iter().map(|(t, c)| (t.as_str(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Every day of the window in ascending order, zero rows included.
    pub fn daily_table(&self) -> Vec<(NaiveDate, DayCounts)> {
        self.from.iter_days().take_while(|d| *d <= self.to).map(|d| (d, self.days.get(&d).copied().unwrap_or_default())).collect()
    }

    pub fn window_days(&self) -> u64 {
        (self.to - self.from).num_days() as u64 + 1
    }
}

/// First and last day of a window of `window_days` ending on `today`.
pub fn window_bounds(window_days: u32, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let span = window_days.clamp(1, MAX_WINDOW_DAYS) - 1;
    let from = today.checked_sub_days(Days::new(span as u64)).unwrap_or(NaiveDate::MIN);

    (from, today)
}

/// Folds activity lines into counters for the days `from..=to`.
///
/// Malformed lines, reset markers and lines outside the window are skipped.
pub fn aggregate<'a, I>(lines: I, from: NaiveDate, to: NaiveDate) -> Stats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats = Stats::empty(from, to);

    for line in lines {
        let Some(record) = ActivityRecord::parse(line) else {
            continue;
        };

        if record.date < from || record.date > to {
            continue;
        }

        let event = record.event();
        if matches!(event, Some(ActivityEvent::Reset { .. })) {
            continue;
        }

        let day = stats.days.entry(record.date).or_default();

        match record.level {
            Level::Info => day.ok += 1,
            Level::Warning => day.warn += 1,
            Level::Error | Level::Critical => day.err += 1,
            Level::Debug => {}
        }

        match event {
            Some(ActivityEvent::Match { trigger, .. }) => {
                day.responses += 1;
                *stats.triggers.entry(trigger.to_string()).or_default() += 1;
            }
            Some(ActivityEvent::Command { .. }) => day.requests += 1,
            _ => {}
        }
    }

    stats
}

/// Read-only analytics over the activity record and the live trigger table.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct AnalyticsEngine {
    activity: ActivityLog,
    responses: ResponseStore,
}

impl AnalyticsEngine {
    pub fn new(activity: ActivityLog, responses: ResponseStore) -> Self {
        Self { activity, responses }
    }

    /// Summarizes the trailing `window_days` ending today.
    pub fn summarize(&self, window_days: u32) -> Result<Stats, EngineError> {
        self.summarize_at(window_days, Local::now().date_naive())
    }

    #[instrument(skip(self))]
    pub fn summarize_at(&self, window_days: u32, today: NaiveDate) -> Result<Stats, EngineError> {
        let (from, to) = window_bounds(window_days, today);
        let lines = self.activity.read_lines()?;

        Ok(aggregate(lines.iter().map(String::as_str), from, to))
    }

    /// Renders the detailed report for the trailing `window_days` ending today.
    pub fn render_detailed_report(&self, window_days: u32) -> Result<ReportDocument, EngineError> {
        let now = Local::now();
        let stats = self.summarize_at(window_days, now.date_naive())?;

        Ok(report::detailed_report(&stats, self.responses.variation_count(), now.naive_local()))
    }

    pub fn render_detailed_report_at(&self, window_days: u32, today: NaiveDate) -> Result<ReportDocument, EngineError> {
        let stats = self.summarize_at(window_days, today)?;
        let generated_at = today.and_hms_opt(0, 0, 0).unwrap_or_default();

        Ok(report::detailed_report(&stats, self.responses.variation_count(), generated_at))
    }
}
