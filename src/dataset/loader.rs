use super::workbook::{RuleSheet, RuleWorkbook};
use super::{
    CellValue, FacilityRecord, OrdinanceRecord, PlanRecord, FACILITY_HEADER, ORDINANCE_HEADER,
    PLAN_HEADER,
};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected {dataset} header: column {position} should be \"{expected}\", found \"{found}\"")]
    HeaderMismatch {
        dataset: &'static str,
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("malformed {dataset} data: {source}")]
    Csv {
        dataset: &'static str,
        #[source]
        source: csv::Error,
    },
}

pub fn load_plan_records<P: AsRef<Path>>(path: P) -> Result<Vec<PlanRecord>, LoadError> {
    read_plan_records(open(path.as_ref())?)
}

pub fn load_facility_records<P: AsRef<Path>>(path: P) -> Result<Vec<FacilityRecord>, LoadError> {
    read_facility_records(open(path.as_ref())?)
}

pub fn load_ordinance_records<P: AsRef<Path>>(path: P) -> Result<Vec<OrdinanceRecord>, LoadError> {
    read_ordinance_records(open(path.as_ref())?)
}

pub fn read_plan_records<R: Read>(reader: R) -> Result<Vec<PlanRecord>, LoadError> {
    let rows = read_rows(reader, "management plan", &PLAN_HEADER)?;
    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| PlanRecord {
            index,
            managing_authority: field(&row, 0),
            preparing_authority: field(&row, 1),
            approval: CellValue::from_field(row.get(2).unwrap_or("")),
        })
        .collect())
}

pub fn read_facility_records<R: Read>(reader: R) -> Result<Vec<FacilityRecord>, LoadError> {
    let rows = read_rows(reader, "facility performance", &FACILITY_HEADER)?;
    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| FacilityRecord {
            index,
            managing_authority: field(&row, 0),
            owner: field(&row, 1),
            infra_type: field(&row, 2),
            facility_kind: field(&row, 3),
            facility_class: field(&row, 4),
            grade: field(&row, 5),
        })
        .collect())
}

pub fn read_ordinance_records<R: Read>(reader: R) -> Result<Vec<OrdinanceRecord>, LoadError> {
    let rows = read_rows(reader, "ordinance", &ORDINANCE_HEADER)?;
    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| OrdinanceRecord {
            index,
            managing_authority: field(&row, 0),
            enacted: field(&row, 1),
        })
        .collect())
}

/// Reads one rule sheet as a raw grid, header row included.
pub fn read_rule_sheet<R: Read>(reader: R) -> Result<RuleSheet, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            dataset: "rule workbook",
            source,
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RuleSheet::from_rows(rows))
}

/// Loads a rule workbook from a directory holding one CSV sheet per
/// authority; the file stem becomes the sheet name.
pub fn load_rule_workbook<P: AsRef<Path>>(dir: P) -> Result<RuleWorkbook, LoadError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Unreadable {
        path: dir.display().to_string(),
        source,
    })?;

    let mut workbook = RuleWorkbook::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Unreadable {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
            continue;
        }
        let name = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        workbook.insert(name, read_rule_sheet(open(&path)?)?);
    }
    Ok(workbook)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Unreadable {
        path: path.display().to_string(),
        source,
    })
}

fn read_rows<R: Read>(
    reader: R,
    dataset: &'static str,
    expected: &[&'static str],
) -> Result<Vec<csv::StringRecord>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|source| LoadError::Csv { dataset, source })?;
    validate_header(dataset, headers, expected)?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        rows.push(record.map_err(|source| LoadError::Csv { dataset, source })?);
    }
    Ok(rows)
}

/// The expected columns must lead the header; trailing extras are allowed.
fn validate_header(
    dataset: &'static str,
    headers: &csv::StringRecord,
    expected: &[&'static str],
) -> Result<(), LoadError> {
    for (position, expected_name) in expected.iter().enumerate() {
        let found = headers.get(position).unwrap_or("").trim();
        if found != *expected_name {
            return Err(LoadError::HeaderMismatch {
                dataset,
                position,
                expected: expected_name,
                found: found.to_string(),
            });
        }
    }
    Ok(())
}

fn field(row: &csv::StringRecord, position: usize) -> String {
    row.get(position).unwrap_or("").trim().to_string()
}
