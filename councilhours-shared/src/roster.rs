//! Roster CSV parsing
//!
//! Reads the council membership export. The file must carry the columns in
//! [`REQUIRED_COLUMNS`]; `access_code` and `is_admin` are optional. Values are
//! trimmed, fully empty rows are skipped, and rows that cannot become a
//! member are reported as `Row N: ...` without aborting the import.

use thiserror::Error;

use crate::models::member::CreateMember;

pub const MEMBER_NUMBER: &str = "Membership Number";
pub const FIRST_NAME: &str = "First Name";
pub const LAST_NAME: &str = "Last Name";
pub const CELL_PHONE: &str = "Cell Phone";
pub const PRIMARY_EMAIL: &str = "Primary Email";
pub const ACCESS_CODE: &str = "access_code";
pub const IS_ADMIN: &str = "is_admin";

pub const REQUIRED_COLUMNS: [&str; 5] =
    [MEMBER_NUMBER, FIRST_NAME, LAST_NAME, CELL_PHONE, PRIMARY_EMAIL];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Missing required columns in CSV: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV file is empty")]
    Empty,

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Outcome of parsing a roster file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRoster {
    pub members: Vec<CreateMember>,
    /// Rows with no content at all
    pub skipped: usize,
    pub errors: Vec<String>,
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a roster upload
///
/// Invalid UTF-8 is replaced rather than rejected. Fails only when the
/// header row is missing or lacks required columns.
pub fn parse_roster(input: &[u8]) -> Result<ParsedRoster, RosterError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    let text = String::from_utf8_lossy(input);
    if text.trim().is_empty() {
        return Err(RosterError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|&name| column(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RosterError::MissingColumns(missing));
    }

    let access_code_col = column(ACCESS_CODE);
    let is_admin_col = column(IS_ADMIN);

    let mut roster = ParsedRoster::default();

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                roster.errors.push(format!("Row {}: {}", row, err));
                continue;
            }
        };

        if record.iter().all(|value| value.trim().is_empty()) {
            roster.skipped += 1;
            continue;
        }

        let field = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(str::trim)
                .unwrap_or_default()
        };

        let member_number = field(column(MEMBER_NUMBER));
        if member_number.is_empty() {
            roster
                .errors
                .push(format!("Row {}: missing {}", row, MEMBER_NUMBER));
            continue;
        }

        roster.members.push(CreateMember {
            member_number: member_number.to_string(),
            first_name: non_empty(field(column(FIRST_NAME))),
            last_name: non_empty(field(column(LAST_NAME))),
            mobile_phone: non_empty(field(column(CELL_PHONE))),
            email: non_empty(field(column(PRIMARY_EMAIL))),
            is_admin: is_truthy(field(is_admin_col)),
            access_code: non_empty(field(access_code_col)),
        });
    }

    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Membership Number,First Name,Last Name,Cell Phone,Primary Email";

    #[test]
    fn test_parse_basic_roster() {
        let csv = format!(
            "{}\n 1001 , John ,Smith,555-0100,john@example.com\n1002,Mary,Jones,,\n",
            HEADER
        );
        let roster = parse_roster(csv.as_bytes()).unwrap();

        assert_eq!(roster.members.len(), 2);
        assert_eq!(roster.skipped, 0);
        assert!(roster.errors.is_empty());

        let john = &roster.members[0];
        assert_eq!(john.member_number, "1001");
        assert_eq!(john.first_name.as_deref(), Some("John"));
        assert_eq!(john.email.as_deref(), Some("john@example.com"));
        assert!(!john.is_admin);
        assert!(john.access_code.is_none());

        let mary = &roster.members[1];
        assert!(mary.mobile_phone.is_none());
        assert!(mary.email.is_none());
    }

    #[test]
    fn test_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(format!("{}\n1001,A,B,,\n", HEADER).as_bytes());

        let roster = parse_roster(&bytes).unwrap();
        assert_eq!(roster.members.len(), 1);
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let err = parse_roster(b"Membership Number,First Name,Last Name\n1,A,B\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required columns in CSV: Cell Phone, Primary Email"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_roster(b"  \n"), Err(RosterError::Empty)));
    }

    #[test]
    fn test_optional_columns() {
        let csv = format!(
            "{},access_code,is_admin\n1,A,B,,,abc234,Yes\n2,C,D,,,  ,no\n3,E,F,,,,1\n",
            HEADER
        );
        let roster = parse_roster(csv.as_bytes()).unwrap();

        assert_eq!(roster.members[0].access_code.as_deref(), Some("abc234"));
        assert!(roster.members[0].is_admin);
        assert!(roster.members[1].access_code.is_none());
        assert!(!roster.members[1].is_admin);
        assert!(roster.members[2].is_admin);
    }

    #[test]
    fn test_skips_empty_rows_and_reports_bad_ones() {
        let csv = format!("{}\n1001,A,B,,\n , , , ,\n,C,D,,\n1003,E,F,,\n", HEADER);
        let roster = parse_roster(csv.as_bytes()).unwrap();

        assert_eq!(roster.members.len(), 2);
        assert_eq!(roster.skipped, 1);
        assert_eq!(
            roster.errors,
            vec!["Row 3: missing Membership Number".to_string()]
        );
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let csv = format!("{}\n1001,A\n", HEADER);
        let roster = parse_roster(csv.as_bytes()).unwrap();

        assert_eq!(roster.members.len(), 1);
        assert!(roster.members[0].last_name.is_none());
    }

    #[test]
    fn test_truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "Y", " y "] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["", "0", "no", "false", "admin"] {
            assert!(!is_truthy(value), "{value}");
        }
    }
}
