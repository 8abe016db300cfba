use crate::dataset::RuleSheet;
use std::collections::HashSet;
use std::ops::Range;

pub const KEY_SEPARATOR: &str = "||";

/// Rule sheets never carry data past this row; the scan tolerates blank
/// gaps instead of stopping at the first one.
const MAX_RULE_ROWS: usize = 500;

const INFRA_COLUMN: usize = 0;
const FACILITY_COLUMN: usize = 1;
const GROUP_COLUMNS: Range<usize> = 2..7;
const GRADE_COLUMNS: Range<usize> = 7..17;

/// Cell marker declaring a combination in scope or meeting target.
const SCOPE_MARKER: &str = "O";

/// Joins the three trimmed parts into a membership key.
pub fn composite_key(infra: &str, facility: &str, tail: &str) -> String {
    [infra.trim(), facility.trim(), tail.trim()].join(KEY_SEPARATOR)
}

/// Key sets derived from one authority's rule sheet: which
/// (infra, facility, class) combinations are managed as a group, and which
/// (infra, facility, grade) combinations meet the target grade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySetPair {
    pub group_keys: HashSet<String>,
    pub grade_keys: HashSet<String>,
}

pub fn build_key_sets(sheet: &RuleSheet) -> KeySetPair {
    let mut pair = KeySetPair::default();
    let bound = sheet.row_count().min(MAX_RULE_ROWS);

    for row in 1..bound {
        let infra = sheet.cell(row, INFRA_COLUMN).map(str::trim).unwrap_or("");
        let facility = sheet
            .cell(row, FACILITY_COLUMN)
            .map(str::trim)
            .unwrap_or("");
        if infra.is_empty() || facility.is_empty() {
            continue;
        }

        collect_markers(sheet, row, GROUP_COLUMNS, infra, facility, &mut pair.group_keys);
        collect_markers(sheet, row, GRADE_COLUMNS, infra, facility, &mut pair.grade_keys);
    }

    pair
}

fn collect_markers(
    sheet: &RuleSheet,
    row: usize,
    columns: Range<usize>,
    infra: &str,
    facility: &str,
    keys: &mut HashSet<String>,
) {
    for column in columns {
        if sheet.cell(row, column) != Some(SCOPE_MARKER) {
            continue;
        }
        let label = sheet.cell(0, column).map(str::trim).unwrap_or("");
        if label.is_empty() {
            continue;
        }
        keys.insert(composite_key(infra, facility, label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        let mut row = vec!["".to_string(), "".to_string()];
        row.extend((1..=5).map(|n| format!("Class {n}")));
        row.extend(["A", "B", "C", "D", "E", "A+", "B+", "C+", "D+", "E+"].map(str::to_string));
        row
    }

    fn data_row(infra: &str, facility: &str, marks: &[usize]) -> Vec<String> {
        let mut row = vec![infra.to_string(), facility.to_string()];
        row.extend((2..17).map(|column| {
            if marks.contains(&column) {
                "O".to_string()
            } else {
                String::new()
            }
        }));
        row
    }

    #[test]
    fn markers_land_in_the_matching_key_set() {
        let sheet = RuleSheet::from_rows(vec![
            header(),
            data_row("Road", "Bridge", &[2, 7, 8]),
        ]);

        let keys = build_key_sets(&sheet);
        assert!(keys.group_keys.contains("Road||Bridge||Class 1"));
        assert_eq!(keys.group_keys.len(), 1);
        assert!(keys.grade_keys.contains("Road||Bridge||A"));
        assert!(keys.grade_keys.contains("Road||Bridge||B"));
        assert_eq!(keys.grade_keys.len(), 2);
    }

    #[test]
    fn scan_skips_incomplete_rows_without_stopping() {
        let sheet = RuleSheet::from_rows(vec![
            header(),
            data_row("Road", "", &[2]),
            data_row("", "Bridge", &[2]),
            data_row("Road", "Tunnel", &[3]),
        ]);

        let keys = build_key_sets(&sheet);
        assert_eq!(keys.group_keys.len(), 1);
        assert!(keys.group_keys.contains("Road||Tunnel||Class 2"));
    }

    #[test]
    fn only_the_exact_marker_counts() {
        let mut lowercase = data_row("Road", "Bridge", &[]);
        lowercase[2] = "o".to_string();
        lowercase[3] = "X".to_string();
        lowercase[4] = "O".to_string();
        let sheet = RuleSheet::from_rows(vec![header(), lowercase]);

        let keys = build_key_sets(&sheet);
        assert_eq!(keys.group_keys.len(), 1);
        assert!(keys.group_keys.contains("Road||Bridge||Class 3"));
    }

    #[test]
    fn key_parts_are_trimmed_before_joining() {
        let sheet = RuleSheet::from_rows(vec![
            header(),
            data_row(" Road ", " Bridge ", &[2]),
        ]);

        let keys = build_key_sets(&sheet);
        assert!(keys.group_keys.contains("Road||Bridge||Class 1"));
        assert_eq!(composite_key(" Road ", "Bridge", " A "), "Road||Bridge||A");
    }

    #[test]
    fn header_row_itself_is_never_scanned_for_markers() {
        let mut labeled_header = header();
        labeled_header[2] = "O".to_string();
        let sheet = RuleSheet::from_rows(vec![labeled_header]);

        let keys = build_key_sets(&sheet);
        assert!(keys.group_keys.is_empty());
        assert!(keys.grade_keys.is_empty());
    }
}
