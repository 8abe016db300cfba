use super::keyset::{self, composite_key};
use super::rows;
use super::ScoreError;
use crate::config::ScoringConfig;
use crate::dataset::{FacilityRecord, RuleWorkbook};
use serde::Serialize;

pub(crate) const MAINTENANCE_MAX_POINTS: f64 = 20.0;

/// Outcome of the maintenance-target rule (max 20 points). The four row
/// sets partition the authority's facilities twice over: management-group
/// membership, then target-grade attainment within the graded subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceOutcome {
    pub score: f64,
    pub included: Vec<FacilityRecord>,
    pub excluded: Vec<FacilityRecord>,
    pub passed: Vec<FacilityRecord>,
    pub failed: Vec<FacilityRecord>,
}

impl MaintenanceOutcome {
    pub fn graded(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    pub fn details(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("management group rows", self.included.len()),
            ("graded rows", self.graded()),
            ("meeting target grade", self.passed.len()),
        ]
    }
}

pub fn score_maintenance(
    workbook: &RuleWorkbook,
    records: &[FacilityRecord],
    authority: &str,
    exclude_private: bool,
    config: &ScoringConfig,
) -> Result<MaintenanceOutcome, ScoreError> {
    let sheet = workbook
        .sheet(authority)
        .ok_or_else(|| ScoreError::MissingRuleSheet(authority.to_string()))?;

    let filtered = rows::for_authority(records, authority);
    let eligible = if exclude_private {
        rows::excluding_owners(filtered, |record| record.owner.as_str(), &config.private_owners)
    } else {
        filtered
    };

    let keys = keyset::build_key_sets(sheet);

    let included: Vec<&FacilityRecord> = eligible
        .iter()
        .copied()
        .filter(|record| {
            keys.group_keys.contains(&composite_key(
                &record.infra_type,
                &record.facility_kind,
                &record.facility_class,
            ))
        })
        .collect();
    let excluded = rows::complement(&eligible, &rows::index_set(&included));

    let graded: Vec<&FacilityRecord> = included
        .iter()
        .copied()
        .filter(|record| {
            let grade = record.grade.trim();
            !config.excluded_grades.iter().any(|entry| entry == grade)
        })
        .collect();

    let passed: Vec<&FacilityRecord> = graded
        .iter()
        .copied()
        .filter(|record| {
            keys.grade_keys.contains(&composite_key(
                &record.infra_type,
                &record.facility_kind,
                &record.grade,
            ))
        })
        .collect();
    let failed = rows::complement(&graded, &rows::index_set(&passed));

    Ok(MaintenanceOutcome {
        score: rows::ratio_score(passed.len(), graded.len(), MAINTENANCE_MAX_POINTS),
        included: rows::owned(included),
        excluded: rows::owned(excluded),
        passed: rows::owned(passed),
        failed: rows::owned(failed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RuleSheet;

    fn record(index: usize, class: &str, grade: &str) -> FacilityRecord {
        FacilityRecord {
            index,
            managing_authority: "Cedar County".to_string(),
            owner: "Cedar Water Works".to_string(),
            infra_type: "Waterworks".to_string(),
            facility_kind: "Treatment Plant".to_string(),
            facility_class: class.to_string(),
            grade: grade.to_string(),
        }
    }

    fn rule_sheet() -> RuleSheet {
        // Class 1 in scope; grades A and B meet the target.
        let mut header = vec!["".to_string(), "".to_string()];
        header.extend((1..=5).map(|n| format!("Class {n}")));
        header.extend(["A", "B", "C", "D", "E", "A+", "B+", "C+", "D+", "E+"].map(str::to_string));

        let mut data = vec!["Waterworks".to_string(), "Treatment Plant".to_string()];
        data.extend((2..17).map(|column| {
            if column == 2 || column == 7 || column == 8 {
                "O".to_string()
            } else {
                String::new()
            }
        }));

        RuleSheet::from_rows(vec![header, data])
    }

    fn workbook() -> RuleWorkbook {
        let mut workbook = RuleWorkbook::new();
        workbook.insert("Cedar County", rule_sheet());
        workbook
    }

    #[test]
    fn missing_sheet_is_a_hard_error_naming_the_authority() {
        let error = score_maintenance(&workbook(), &[], "Polk County", true, &ScoringConfig::default())
            .expect_err("no sheet for Polk County");

        match error {
            ScoreError::MissingRuleSheet(authority) => assert_eq!(authority, "Polk County"),
            other => panic!("expected missing rule sheet, got {other:?}"),
        }
    }

    #[test]
    fn rows_partition_across_group_and_grade_stages() {
        let records = vec![
            record(0, "Class 1", "A"),
            record(1, "Class 1", "C"),
            record(2, "Class 2", "A"),
        ];
        let outcome = score_maintenance(
            &workbook(),
            &records,
            "Cedar County",
            false,
            &ScoringConfig::default(),
        )
        .expect("scores");

        assert_eq!(outcome.included.len(), 2);
        assert_eq!(outcome.excluded.len(), 1);
        assert_eq!(outcome.excluded[0].index, 2);
        assert_eq!(outcome.graded(), 2);
        assert_eq!(outcome.passed.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.score, 10.0);
    }

    #[test]
    fn excluded_grades_leave_the_denominator() {
        let config = ScoringConfig {
            excluded_grades: vec!["Not Rated".to_string()],
            ..ScoringConfig::default()
        };
        let records = vec![
            record(0, "Class 1", "A"),
            record(1, "Class 1", "Not Rated"),
        ];
        let outcome =
            score_maintenance(&workbook(), &records, "Cedar County", false, &config).expect("scores");

        assert_eq!(outcome.included.len(), 2);
        assert_eq!(outcome.graded(), 1);
        assert_eq!(outcome.score, MAINTENANCE_MAX_POINTS);
    }

    #[test]
    fn grade_matching_trims_whitespace_but_not_case() {
        let records = vec![record(0, "Class 1", " A "), record(1, "Class 1", "b")];
        let outcome = score_maintenance(
            &workbook(),
            &records,
            "Cedar County",
            false,
            &ScoringConfig::default(),
        )
        .expect("scores");

        let passed_indices: Vec<usize> = outcome.passed.iter().map(|r| r.index).collect();
        assert_eq!(passed_indices, vec![0]);
    }

    #[test]
    fn denylisted_owners_drop_before_grouping() {
        let config = ScoringConfig {
            private_owners: vec!["Hawkeye Toll Partners".to_string()],
            ..ScoringConfig::default()
        };
        let mut private_row = record(1, "Class 1", "A");
        private_row.owner = "Hawkeye Toll Partners".to_string();
        let records = vec![record(0, "Class 1", "A"), private_row];

        let outcome =
            score_maintenance(&workbook(), &records, "Cedar County", true, &config).expect("scores");
        assert_eq!(outcome.included.len() + outcome.excluded.len(), 1);

        let retained =
            score_maintenance(&workbook(), &records, "Cedar County", false, &config).expect("scores");
        assert_eq!(retained.included.len() + retained.excluded.len(), 2);
    }

    #[test]
    fn no_graded_rows_scores_zero() {
        let records = vec![record(0, "Class 2", "A")];
        let outcome = score_maintenance(
            &workbook(),
            &records,
            "Cedar County",
            false,
            &ScoringConfig::default(),
        )
        .expect("scores");

        assert_eq!(outcome.graded(), 0);
        assert_eq!(outcome.score, 0.0);
    }
}
