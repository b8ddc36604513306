use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored in `max_round_reached` once a student holds an offer.
pub const OFFER_SENTINEL: &str = "Got Offer";
/// Sentinel for students who dropped out before any declared round.
pub const OTHERS_SENTINEL: &str = "Others";
/// Substituted for absent optional fields in rendered output.
pub const MISSING_PLACEHOLDER: &str = "N/A";

const ROUND_PREFIX: &str = "Round ";

macro_rules! record_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(CompanyId);
record_id!(StudentId);
record_id!(ModelPaperId);

/// Furthest point a student reached in a company's hiring process.
///
/// Stored as free text; anything that is neither a sentinel nor a
/// well-formed `Round {n}` key is kept verbatim as [`RoundReached::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoundReached {
    GotOffer,
    Round(u32),
    Others,
    Unrecognized(String),
}

impl RoundReached {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == OFFER_SENTINEL {
            return Self::GotOffer;
        }
        if trimmed == OTHERS_SENTINEL {
            return Self::Others;
        }

        match trimmed.strip_prefix(ROUND_PREFIX) {
            Some(number) => match number.trim().parse::<u32>() {
                Ok(round) => Self::Round(round),
                Err(_) => Self::Unrecognized(trimmed.to_string()),
            },
            None => Self::Unrecognized(trimmed.to_string()),
        }
    }

    pub const fn is_offer(&self) -> bool {
        matches!(self, Self::GotOffer)
    }
}

impl fmt::Display for RoundReached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GotOffer => f.write_str(OFFER_SENTINEL),
            Self::Round(round) => write!(f, "{ROUND_PREFIX}{round}"),
            Self::Others => f.write_str(OTHERS_SENTINEL),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl From<String> for RoundReached {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for RoundReached {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<RoundReached> for String {
    fn from(value: RoundReached) -> Self {
        value.to_string()
    }
}

/// Synthetic key for the round at `position` (1-indexed).
pub fn round_key(position: u32) -> String {
    format!("{ROUND_PREFIX}{position}")
}

/// Splits a comma-joined hiring flow into ordered round labels.
pub fn parse_hiring_flow(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub hiring_rounds: Vec<String>,
    pub ctc_offer: String,
    pub agreement_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Company {
    /// Declared rounds paired with their 1-indexed position.
    pub fn rounds(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.hiring_rounds
            .iter()
            .enumerate()
            .map(|(index, label)| (index as u32 + 1, label.as_str()))
    }

    pub fn round_label(&self, round: u32) -> Option<&str> {
        let index = usize::try_from(round).ok()?.checked_sub(1)?;
        self.hiring_rounds.get(index).map(String::as_str)
    }

    pub fn hiring_flow(&self) -> String {
        self.hiring_rounds.join(", ")
    }

    /// Whether `reached` is a value an administrator may record for this company.
    pub fn accepts(&self, reached: &RoundReached) -> bool {
        match reached {
            RoundReached::GotOffer | RoundReached::Others => true,
            RoundReached::Round(round) => self.round_label(*round).is_some(),
            RoundReached::Unrecognized(_) => false,
        }
    }

    /// Human-readable progress label: the declared round name when it resolves.
    pub fn progress_label(&self, reached: &RoundReached) -> String {
        match reached {
            RoundReached::Round(round) => match self.round_label(*round) {
                Some(label) => label.to_string(),
                None => reached.to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub company_id: CompanyId,
    pub name: String,
    pub student_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub linkedin_id: Option<String>,
    pub max_round_reached: RoundReached,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn email_or_placeholder(&self) -> &str {
        self.email.as_deref().unwrap_or(MISSING_PLACEHOLDER)
    }

    pub fn profile_or_placeholder(&self) -> &str {
        self.linkedin_id.as_deref().unwrap_or(MISSING_PLACEHOLDER)
    }

    pub const fn has_offer(&self) -> bool {
        self.max_round_reached.is_offer()
    }
}

/// Uploaded reference document attached to a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPaper {
    pub id: ModelPaperId,
    pub company_id: CompanyId,
    pub name: String,
    pub url: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}
