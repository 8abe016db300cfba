use super::rows;
use crate::config::ScoringConfig;
use crate::dataset::{CellValue, PlanRecord};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

pub(crate) const PLAN_MAX_POINTS: f64 = 10.0;

/// 1900-system spreadsheet serials count days from this origin.
const SERIAL_ORIGIN: (i32, u32, u32) = (1899, 12, 30);

/// Outcome of the plan-submission timeliness rule (max 10 points).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub score: f64,
    pub eligible: usize,
    pub missed: Vec<PlanRecord>,
}

impl PlanOutcome {
    pub fn on_time(&self) -> usize {
        self.eligible - self.missed.len()
    }

    pub fn details(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("submission targets", self.eligible),
            ("submitted on time", self.on_time()),
        ]
    }
}

/// Scores how much of an authority's submission obligation was approved by
/// the cutoff. Rows with unparseable approval dates count against the
/// authority; an unknown authority scores 0 over an empty set.
pub fn score_plan(
    records: &[PlanRecord],
    authority: &str,
    exclude_private: bool,
    config: &ScoringConfig,
) -> PlanOutcome {
    let filtered = rows::for_authority(records, authority);
    let eligible = if exclude_private {
        rows::excluding_owners(
            filtered,
            |record| record.preparing_authority.as_str(),
            &config.private_owners,
        )
    } else {
        filtered
    };

    let on_time: Vec<&PlanRecord> = eligible
        .iter()
        .copied()
        .filter(|record| approved_by(&record.approval, config.submission_cutoff))
        .collect();
    let missed = rows::complement(&eligible, &rows::index_set(&on_time));

    PlanOutcome {
        score: rows::ratio_score(on_time.len(), eligible.len(), PLAN_MAX_POINTS),
        eligible: eligible.len(),
        missed: rows::owned(missed),
    }
}

fn approved_by(approval: &CellValue, cutoff: NaiveDateTime) -> bool {
    match approval {
        CellValue::Number(serial) => {
            serial_to_date(*serial).is_some_and(|date| date <= cutoff.date())
        }
        CellValue::Text(raw) => parse_datetime(raw).is_some_and(|moment| moment <= cutoff),
        CellValue::Empty => false,
    }
}

/// Converts a spreadsheet date serial to a calendar date; the fractional
/// time-of-day part is irrelevant to a calendar-date cutoff and dropped.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let (year, month, day) = SERIAL_ORIGIN;
    NaiveDate::from_ymd_opt(year, month, day)?.checked_add_days(Days::new(serial.trunc() as u64))
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(moment) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(moment.naive_utc());
    }

    if let Ok(moment) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(moment);
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}
