mod keyset;
mod maintenance;
mod ordinance;
mod plan;
mod rows;

pub use keyset::{build_key_sets, composite_key, KeySetPair, KEY_SEPARATOR};
pub use maintenance::{score_maintenance, MaintenanceOutcome};
pub use ordinance::{score_ordinance, OrdinanceOutcome};
pub use plan::{score_plan, PlanOutcome};
pub use rows::ratio_score;

use crate::config::ScoringConfig;
use crate::dataset::{FacilityRecord, OrdinanceRecord, PlanRecord, RuleWorkbook};
use serde::Serialize;
use std::str::FromStr;

pub const CATEGORY_PLAN_MISSED: &str = "plan_not_submitted";
pub const CATEGORY_GROUP_INCLUDED: &str = "management_group_included";
pub const CATEGORY_GROUP_EXCLUDED: &str = "management_group_excluded";
pub const CATEGORY_GRADE_PASSED: &str = "target_grade_met";
pub const CATEGORY_GRADE_FAILED: &str = "target_grade_not_met";

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("rule workbook has no sheet for \"{0}\"")]
    MissingRuleSheet(String),
    #[error("unknown scoring rule \"{0}\"")]
    UnknownRule(String),
}

/// The three scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreRule {
    PlanTimeliness,
    Maintenance,
    Ordinance,
}

impl ScoreRule {
    pub fn label(self) -> &'static str {
        match self {
            ScoreRule::PlanTimeliness => "plan submission timeliness",
            ScoreRule::Maintenance => "maintenance target attainment",
            ScoreRule::Ordinance => "reserve-fund ordinance enactment",
        }
    }

    pub fn max_points(self) -> f64 {
        match self {
            ScoreRule::PlanTimeliness => plan::PLAN_MAX_POINTS,
            ScoreRule::Maintenance => maintenance::MAINTENANCE_MAX_POINTS,
            ScoreRule::Ordinance => ordinance::ORDINANCE_MAX_POINTS,
        }
    }
}

impl FromStr for ScoreRule {
    type Err = ScoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plan" | "timeliness" => Ok(ScoreRule::PlanTimeliness),
            "maintenance" => Ok(ScoreRule::Maintenance),
            "ordinance" => Ok(ScoreRule::Ordinance),
            other => Err(ScoreError::UnknownRule(other.to_string())),
        }
    }
}

/// Already-parsed datasets for one scoring run.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    pub plans: Vec<PlanRecord>,
    pub rule_book: RuleWorkbook,
    pub facilities: Vec<FacilityRecord>,
    pub ordinances: Vec<OrdinanceRecord>,
}

/// Outcome of running a single rule in isolation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RuleScore {
    Plan(PlanOutcome),
    Maintenance(MaintenanceOutcome),
    Ordinance(OrdinanceOutcome),
}

impl RuleScore {
    pub fn score(&self) -> f64 {
        match self {
            RuleScore::Plan(outcome) => outcome.score,
            RuleScore::Maintenance(outcome) => outcome.score,
            RuleScore::Ordinance(outcome) => outcome.score,
        }
    }

    pub fn details(&self) -> Vec<(&'static str, usize)> {
        match self {
            RuleScore::Plan(outcome) => outcome.details(),
            RuleScore::Maintenance(outcome) => outcome.details(),
            RuleScore::Ordinance(outcome) => outcome.details(),
        }
    }
}

pub fn score_rule(
    rule: ScoreRule,
    inputs: &ScoreInputs,
    config: &ScoringConfig,
    authority: &str,
    exclude_private: bool,
) -> Result<RuleScore, ScoreError> {
    match rule {
        ScoreRule::PlanTimeliness => Ok(RuleScore::Plan(plan::score_plan(
            &inputs.plans,
            authority,
            exclude_private,
            config,
        ))),
        ScoreRule::Maintenance => Ok(RuleScore::Maintenance(maintenance::score_maintenance(
            &inputs.rule_book,
            &inputs.facilities,
            authority,
            exclude_private,
            config,
        )?)),
        ScoreRule::Ordinance => Ok(RuleScore::Ordinance(ordinance::score_ordinance(
            &inputs.ordinances,
            authority,
        ))),
    }
}

/// Combined result of all three rules for one authority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorityScorecard {
    pub authority: String,
    pub plan: PlanOutcome,
    pub maintenance: MaintenanceOutcome,
    pub ordinance: OrdinanceOutcome,
}

impl AuthorityScorecard {
    pub fn total(&self) -> f64 {
        self.plan.score + self.maintenance.score + self.ordinance.score
    }

    /// Downloadable exception categories, named for export.
    pub fn exception_sheets(&self) -> Vec<ExceptionSheet> {
        vec![
            ExceptionSheet {
                category: CATEGORY_PLAN_MISSED,
                rows: ExceptionRows::Plans(self.plan.missed.clone()),
            },
            ExceptionSheet {
                category: CATEGORY_GROUP_INCLUDED,
                rows: ExceptionRows::Facilities(self.maintenance.included.clone()),
            },
            ExceptionSheet {
                category: CATEGORY_GROUP_EXCLUDED,
                rows: ExceptionRows::Facilities(self.maintenance.excluded.clone()),
            },
            ExceptionSheet {
                category: CATEGORY_GRADE_PASSED,
                rows: ExceptionRows::Facilities(self.maintenance.passed.clone()),
            },
            ExceptionSheet {
                category: CATEGORY_GRADE_FAILED,
                rows: ExceptionRows::Facilities(self.maintenance.failed.clone()),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionSheet {
    pub category: &'static str,
    pub rows: ExceptionRows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExceptionRows {
    Plans(Vec<PlanRecord>),
    Facilities(Vec<FacilityRecord>),
}

impl ExceptionRows {
    pub fn len(&self) -> usize {
        match self {
            ExceptionRows::Plans(rows) => rows.len(),
            ExceptionRows::Facilities(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs all three rules for one authority. Fails whole if any rule fails;
/// partial scorecards are never produced.
pub fn score_authority(
    inputs: &ScoreInputs,
    config: &ScoringConfig,
    authority: &str,
    exclude_private: bool,
) -> Result<AuthorityScorecard, ScoreError> {
    let plan = plan::score_plan(&inputs.plans, authority, exclude_private, config);
    let maintenance = maintenance::score_maintenance(
        &inputs.rule_book,
        &inputs.facilities,
        authority,
        exclude_private,
        config,
    )?;
    let ordinance = ordinance::score_ordinance(&inputs.ordinances, authority);

    Ok(AuthorityScorecard {
        authority: authority.to_string(),
        plan,
        maintenance,
        ordinance,
    })
}
