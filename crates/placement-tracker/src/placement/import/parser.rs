use super::super::domain::{
    parse_hiring_flow, Company, CompanyId, RoundReached, Student, StudentId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

pub(crate) fn parse_companies<R: Read>(
    reader: R,
    imported_at: DateTime<Utc>,
) -> Result<Vec<Company>, csv::Error> {
    let mut companies = Vec::new();
    for row in csv_reader(reader).deserialize::<CompanyRow>() {
        companies.push(row?.into_company(imported_at));
    }
    Ok(companies)
}

pub(crate) fn parse_students<R: Read>(
    reader: R,
    imported_at: DateTime<Utc>,
) -> Result<Vec<Student>, csv::Error> {
    let mut students = Vec::new();
    for row in csv_reader(reader).deserialize::<StudentRow>() {
        students.push(row?.into_student(imported_at));
    }
    Ok(students)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct CompanyRow {
    id: i64,
    name: String,
    hiring_flow: String,
    ctc_offer: String,
    agreement_years: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    logo_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    updated_at: Option<String>,
}

impl CompanyRow {
    fn into_company(self, imported_at: DateTime<Utc>) -> Company {
        Company {
            id: CompanyId(self.id),
            name: self.name,
            hiring_rounds: parse_hiring_flow(&self.hiring_flow),
            ctc_offer: self.ctc_offer,
            agreement_years: self.agreement_years,
            logo_url: self.logo_url,
            created_at: self
                .created_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(imported_at),
            updated_at: self.updated_at.as_deref().and_then(parse_datetime),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    id: i64,
    company_id: i64,
    name: String,
    student_number: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    linkedin_id: Option<String>,
    max_round_reached: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    updated_at: Option<String>,
}

impl StudentRow {
    fn into_student(self, imported_at: DateTime<Utc>) -> Student {
        Student {
            id: StudentId(self.id),
            company_id: CompanyId(self.company_id),
            name: self.name,
            student_number: self.student_number,
            email: self.email,
            linkedin_id: self.linkedin_id,
            max_round_reached: RoundReached::parse(&self.max_round_reached),
            created_at: self
                .created_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(imported_at),
            updated_at: self.updated_at.as_deref().and_then(parse_datetime),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
pub(crate) fn parse_datetime_for_tests(value: &str) -> Option<DateTime<Utc>> {
    parse_datetime(value)
}
