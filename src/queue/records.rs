//! Queue rows and the patient view of them

use serde::Serialize;

/// Number of required input columns (date of service .. member id)
pub const REQUIRED_COLUMNS: usize = 6;

/// 0-based column positions
pub mod col {
    /// Date of service
    pub const DOS: usize = 0;
    /// Subscriber first name
    pub const FIRST_NAME: usize = 1;
    /// Subscriber last name
    pub const LAST_NAME: usize = 2;
    /// Subscriber date of birth
    pub const DOB: usize = 3;
    /// Free-text payer name
    pub const PAYER: usize = 4;
    /// Member / subscriber id
    pub const MEMBER_ID: usize = 5;
    /// Claim marker and terminal status
    pub const STATUS: usize = 6;
    /// Policy begin date
    pub const POLICY_BEGIN: usize = 7;
    /// Policy end date
    pub const POLICY_END: usize = 8;
    /// Evidence link
    pub const EVIDENCE: usize = 9;
}

/// One spreadsheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    /// 1-based sheet row (the header is row 1)
    pub row: usize,
    /// Cell values, possibly shorter than the full column count
    pub values: Vec<String>,
}

impl QueueRecord {
    /// Cell at a 0-based column, trimmed; missing cells read as empty
    pub fn cell(&self, column: usize) -> &str {
        self.values.get(column).map(|v| v.trim()).unwrap_or("")
    }

    /// All six inputs present and no status written yet
    pub fn is_claimable(&self) -> bool {
        (0..REQUIRED_COLUMNS).all(|c| !self.cell(c).is_empty()) && self.cell(col::STATUS).is_empty()
    }
}

/// First claimable row of a full-sheet scan, skipping the header
///
/// `rows[0]` is the header; `rows[i]` is sheet row `i + 1`.
pub fn first_claimable(rows: &[Vec<String>]) -> Option<QueueRecord> {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(i, values)| QueueRecord {
            row: i + 1,
            values: values.clone(),
        })
        .find(QueueRecord::is_claimable)
}

/// Normalized patient inputs for one lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRecord {
    /// Date of service
    pub dos: String,
    /// Subscriber first name
    pub first_name: String,
    /// Subscriber last name
    pub last_name: String,
    /// Subscriber date of birth
    pub dob: String,
    /// Free-text payer name
    pub payer_name: String,
    /// Member / subscriber id
    pub member_id: String,
}

impl From<&QueueRecord> for PatientRecord {
    fn from(record: &QueueRecord) -> Self {
        Self {
            dos: record.cell(col::DOS).to_string(),
            first_name: record.cell(col::FIRST_NAME).to_string(),
            last_name: record.cell(col::LAST_NAME).to_string(),
            dob: record.cell(col::DOB).to_string(),
            payer_name: record.cell(col::PAYER).to_string(),
            member_id: record.cell(col::MEMBER_ID).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_claimable_requires_inputs_and_empty_status() {
        let header = row(&["DOS", "First", "Last", "DOB", "Payer", "Member", "Status"]);
        let rows = vec![
            header,
            row(&["01/01/2025", "Jane", "Doe", "01/01/1990", "UMR", "M1", "Processing..."]),
            row(&["01/01/2025", "", "Doe", "01/01/1990", "UMR", "M2"]),
            row(&["01/01/2025", "John", "Roe", "02/02/1980", "Aetna", "M3", "  "]),
            row(&["01/01/2025", "Ann", "Poe", "03/03/1970", "Cigna", "M4"]),
        ];

        let found = first_claimable(&rows).expect("row 4 is claimable");
        assert_eq!(found.row, 4);
        assert_eq!(found.cell(col::PAYER), "Aetna");
    }

    #[test]
    fn test_header_is_never_claimed() {
        let rows = vec![row(&["a", "b", "c", "d", "e", "f"])];
        assert!(first_claimable(&rows).is_none());
    }

    #[test]
    fn test_patient_record_trims_cells() {
        let record = QueueRecord {
            row: 2,
            values: row(&[" 01/01/2025", "Jane ", "Doe", "01/01/1990", " UMR ", "M12345"]),
        };
        let patient = PatientRecord::from(&record);
        assert_eq!(patient.payer_name, "UMR");
        assert_eq!(patient.first_name, "Jane");
        assert_eq!(patient.dos, "01/01/2025");
    }
}
