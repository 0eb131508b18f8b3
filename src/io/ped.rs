//! # PED Reader
//!
//! Reads the six-column pedigree format:
//! `family individual father mother sex phenotype`.
//! Unknown parents are written as `0` or `.`; the phenotype column is optional.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info_span;

use crate::data::sample::Sex;
use crate::error::{PedSimError, Result};

/// One line of a PED file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PedRecord {
    pub family: String,
    pub id: String,
    pub father: Option<String>,
    pub mother: Option<String>,
    pub sex: Sex,
}

impl PedRecord {
    pub fn new(
        id: impl Into<String>,
        father: Option<&str>,
        mother: Option<&str>,
        sex: Sex,
    ) -> Self {
        Self {
            family: "0".to_string(),
            id: id.into(),
            father: father.map(str::to_string),
            mother: mother.map(str::to_string),
            sex,
        }
    }
}

fn parent_field(field: &str) -> Option<String> {
    match field {
        "0" | "." | "" => None,
        other => Some(other.to_string()),
    }
}

/// Parse PED records from any buffered reader
pub fn parse_ped<R: BufRead>(reader: R) -> Result<Vec<PedRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(PedSimError::parse(
                idx + 1,
                format!("expected at least 5 columns, found {}", fields.len()),
            ));
        }
        records.push(PedRecord {
            family: fields[0].to_string(),
            id: fields[1].to_string(),
            father: parent_field(fields[2]),
            mother: parent_field(fields[3]),
            sex: Sex::from_ped_code(fields[4]),
        });
    }
    Ok(records)
}

/// Read a PED file from disk
pub fn read_ped(path: &Path) -> Result<Vec<PedRecord>> {
    info_span!("ped_read", path = ?path).in_scope(|| {
        let file = File::open(path).map_err(|e| PedSimError::artifact(path, e))?;
        parse_ped(BufReader::new(file))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_trio() {
        let text = "# family file\n\
                    fam1 F 0 0 1 0\n\
                    fam1 M 0 0 2 0\n\
                    \n\
                    fam1 C F M 2 0\n";
        let records = parse_ped(Cursor::new(text)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "F");
        assert_eq!(records[0].sex, Sex::Male);
        assert_eq!(records[1].sex, Sex::Female);
        assert_eq!(records[2].father.as_deref(), Some("F"));
        assert_eq!(records[2].mother.as_deref(), Some("M"));
    }

    #[test]
    fn test_missing_parent_markers() {
        let records = parse_ped(Cursor::new("f A . 0 0\n")).unwrap();
        assert_eq!(records[0].father, None);
        assert_eq!(records[0].mother, None);
        assert_eq!(records[0].sex, Sex::Unknown);
    }

    #[test]
    fn test_short_line_is_parse_error() {
        let err = parse_ped(Cursor::new("f A 0 0 1\nf B 0\n")).unwrap_err();
        match err {
            PedSimError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
