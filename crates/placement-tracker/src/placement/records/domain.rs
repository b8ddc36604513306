use super::super::domain::{parse_hiring_flow, Company, RoundReached};
use serde::{Deserialize, Serialize};

/// Administrator input for creating or replacing a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDraft {
    pub name: String,
    /// Comma-joined round labels, e.g. `"Aptitude, Coding, HR"`.
    pub hiring_flow: String,
    pub ctc_offer: String,
    pub agreement_years: u32,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// A draft that passed validation, with the hiring flow split into rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCompany {
    pub name: String,
    pub hiring_rounds: Vec<String>,
    pub ctc_offer: String,
    pub agreement_years: u32,
    pub logo_url: Option<String>,
}

impl CompanyDraft {
    pub fn validate(self) -> Result<ValidCompany, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }

        let hiring_rounds = parse_hiring_flow(&self.hiring_flow);
        if hiring_rounds.is_empty() {
            return Err(ValidationError::NoHiringRounds);
        }

        Ok(ValidCompany {
            name,
            hiring_rounds,
            ctc_offer: self.ctc_offer.trim().to_string(),
            agreement_years: self.agreement_years,
            logo_url: non_blank(self.logo_url),
        })
    }
}

/// Administrator input for recording a student under a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDraft {
    pub name: String,
    pub student_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub linkedin_id: Option<String>,
    pub max_round_reached: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidStudent {
    pub name: String,
    pub student_number: String,
    pub email: Option<String>,
    pub linkedin_id: Option<String>,
    pub max_round_reached: RoundReached,
}

impl StudentDraft {
    /// Checks the draft against the hiring rounds `company` declares.
    pub fn validate(self, company: &Company) -> Result<ValidStudent, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }

        let student_number = self.student_number.trim().to_string();
        if student_number.is_empty() {
            return Err(ValidationError::MissingField("student_number"));
        }

        let max_round_reached = RoundReached::parse(&self.max_round_reached);
        if !company.accepts(&max_round_reached) {
            return Err(ValidationError::UnknownRound {
                value: self.max_round_reached.trim().to_string(),
                declared: company.hiring_rounds.len(),
            });
        }

        Ok(ValidStudent {
            name,
            student_number,
            email: non_blank(self.email),
            linkedin_id: non_blank(self.linkedin_id),
            max_round_reached,
        })
    }
}

/// Raw model paper bytes plus the display name the administrator chose.
#[derive(Debug, Clone)]
pub struct PaperUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("at least one hiring round is required")]
    NoHiringRounds,
    #[error("'{value}' is not a round of this company (declared rounds: {declared})")]
    UnknownRound { value: String, declared: usize },
    #[error("uploaded file is empty")]
    EmptyUpload,
    #[error("file type of '{0}' is not allowed")]
    UnsupportedPaperType(String),
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
