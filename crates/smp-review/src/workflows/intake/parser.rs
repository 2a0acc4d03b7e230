use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::normalizer::{normalize_department, normalize_hostel, normalize_por};
use super::ImportError;
use crate::workflows::review::domain::Program;

/// One normalized account row ready for seeding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IntakeRecord {
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) department: String,
    pub(crate) year: u8,
    pub(crate) hostel: Option<String>,
    pub(crate) pors: Vec<String>,
    pub(crate) program: Program,
    pub(crate) is_admin: bool,
    pub(crate) is_dept_head: bool,
    pub(crate) password: String,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<IntakeRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<IntakeRow>() {
        let row = record?;
        if row.email.is_empty() {
            continue;
        }
        // Year of study starts at 1; a zero means the export column slipped.
        if row.year == 0 {
            return Err(ImportError::Row {
                email: row.email,
                reason: "year of study must be at least 1",
            });
        }
        records.push(row.normalized());
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct IntakeRow {
    email: String,
    name: String,
    department: String,
    year: u8,
    #[serde(default)]
    hostel: String,
    #[serde(default)]
    pors: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    is_admin: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    is_dept_head: bool,
    #[serde(default)]
    program: Option<String>,
    password: String,
}

impl IntakeRow {
    /// Apply the normalization layer to every free-text field. This is the
    /// only place raw survey text becomes canonical; request-time code
    /// never re-normalizes.
    fn normalized(self) -> IntakeRecord {
        let hostel = normalize_hostel(&self.hostel);
        let mut pors: Vec<String> = self
            .pors
            .split([',', ';'])
            .map(normalize_por)
            .filter(|por| !por.is_empty())
            .collect();
        pors.sort();
        pors.dedup();

        IntakeRecord {
            email: self.email.trim().to_string(),
            name: self.name.trim().to_string(),
            department: normalize_department(&self.department),
            year: self.year,
            hostel: (!hostel.is_empty()).then_some(hostel),
            pors,
            program: parse_program(self.program.as_deref()),
            is_admin: self.is_admin,
            is_dept_head: self.is_dept_head,
            password: self.password,
        }
    }
}

/// Missing or unrecognized programme values default to the institute-wide
/// track, matching how legacy exports without the column were seeded.
fn parse_program(raw: Option<&str>) -> Program {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("damp") => Program::Damp,
        _ => Program::Ismp,
    }
}

/// Accepts "true"/"TRUE"/"1"/"yes" style flags; anything else is false.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        raw.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("true" | "1" | "yes")
    ))
}
