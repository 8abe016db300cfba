use super::rows;
use crate::dataset::OrdinanceRecord;
use serde::Serialize;

pub(crate) const ORDINANCE_MAX_POINTS: f64 = 20.0;

const ENACTED_MARKER: &str = "O";

/// Outcome of the reserve-fund ordinance rule (max 20 points). The rule
/// surfaces no exception rows; the ordinance dataset also has no owner
/// column, so the private-owner exclusion never applies here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrdinanceOutcome {
    pub score: f64,
    pub eligible: usize,
    pub enacted: usize,
}

impl OrdinanceOutcome {
    pub fn details(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("ordinance targets", self.eligible),
            ("ordinances enacted", self.enacted),
        ]
    }
}

pub fn score_ordinance(records: &[OrdinanceRecord], authority: &str) -> OrdinanceOutcome {
    let filtered = rows::for_authority(records, authority);
    let enacted = filtered
        .iter()
        .filter(|record| record.enacted.trim() == ENACTED_MARKER)
        .count();

    OrdinanceOutcome {
        score: rows::ratio_score(enacted, filtered.len(), ORDINANCE_MAX_POINTS),
        eligible: filtered.len(),
        enacted,
    }
}
