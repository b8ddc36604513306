//! Excel and PDF renderings of a placement snapshot.
//!
//! Both encodings are built from the same [`PlacementAggregate`], so sheet and
//! section order follow the caller's company order and row order follows the
//! student ranking.

mod document;
pub mod views;
mod workbook;

use super::aggregate::PlacementAggregate;
use super::domain::{Company, Student};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub use document::build_document;
pub use workbook::build_workbook;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unsupported report format '{0}', expected 'excel' or 'pdf'")]
    UnsupportedFormat(String),
    #[error("failed to build workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to build PDF document: {0}")]
    Document(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Excel,
    Pdf,
}

impl ReportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Excel => XLSX_CONTENT_TYPE,
            Self::Pdf => PDF_CONTENT_TYPE,
        }
    }

    /// `placement_report_YYYYMMDD_HHMMSS.<ext>`
    pub fn file_name(self, generated_at: NaiveDateTime) -> String {
        format!(
            "placement_report_{}.{}",
            generated_at.format("%Y%m%d_%H%M%S"),
            self.extension()
        )
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "excel" => Ok(Self::Excel),
            "pdf" => Ok(Self::Pdf),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excel => f.write_str("excel"),
            Self::Pdf => f.write_str("pdf"),
        }
    }
}

/// Rendered report ready to be streamed back to the caller.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub format: ReportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

pub fn build_report(
    format: ReportFormat,
    companies: &[Company],
    students: &[Student],
    generated_at: NaiveDateTime,
) -> Result<ReportArtifact, ReportError> {
    let aggregate = PlacementAggregate::build(companies, students);
    let bytes = match format {
        ReportFormat::Excel => workbook::render(&aggregate)?,
        ReportFormat::Pdf => document::render(&aggregate, generated_at)?,
    };

    info!(
        %format,
        companies = aggregate.company_count(),
        students = students.len(),
        bytes = bytes.len(),
        "placement report rendered"
    );

    Ok(ReportArtifact {
        format,
        file_name: format.file_name(generated_at),
        bytes,
    })
}

/// Parses `raw` and renders in one step; unknown formats yield no bytes.
pub fn build_report_for(
    raw_format: &str,
    companies: &[Company],
    students: &[Student],
    generated_at: NaiveDateTime,
) -> Result<ReportArtifact, ReportError> {
    let format = raw_format.parse::<ReportFormat>()?;
    build_report(format, companies, students, generated_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|date| date.and_hms_opt(9, 5, 7))
            .expect("valid timestamp")
    }

    #[test]
    fn parses_supported_literals_only() {
        assert_eq!("excel".parse::<ReportFormat>().ok(), Some(ReportFormat::Excel));
        assert_eq!("pdf".parse::<ReportFormat>().ok(), Some(ReportFormat::Pdf));

        for raw in ["csv", "PDF", "", "xlsx"] {
            match raw.parse::<ReportFormat>() {
                Err(ReportError::UnsupportedFormat(value)) => assert_eq!(value, raw),
                other => panic!("expected unsupported format for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn file_name_embeds_generation_timestamp() {
        assert_eq!(
            ReportFormat::Excel.file_name(generated_at()),
            "placement_report_20260314_090507.xlsx"
        );
        assert_eq!(
            ReportFormat::Pdf.file_name(generated_at()),
            "placement_report_20260314_090507.pdf"
        );
    }

    #[test]
    fn content_types_match_encodings() {
        assert_eq!(
            ReportFormat::Pdf.content_type(),
            mime::APPLICATION_PDF.essence_str()
        );
        assert_eq!(ReportFormat::Excel.content_type(), XLSX_CONTENT_TYPE);
    }

    #[test]
    fn unsupported_format_produces_no_artifact() {
        let result = build_report_for("docx", &[], &[], generated_at());
        assert!(matches!(result, Err(ReportError::UnsupportedFormat(_))));
    }
}
