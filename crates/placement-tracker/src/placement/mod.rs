//! Placement tracking: ranking, aggregation, reporting, and the records
//! service that feeds them.

pub mod aggregate;
pub mod domain;
pub mod import;
pub mod ranking;
pub mod records;
pub mod report;

pub use aggregate::{CompanyAggregate, OfferHolder, PlacementAggregate};
pub use domain::{Company, CompanyId, ModelPaper, ModelPaperId, RoundReached, Student, StudentId};
pub use import::{PlacementSnapshot, SnapshotImportError, SnapshotImporter};
pub use report::{
    build_document, build_report, build_report_for, build_workbook, ReportArtifact, ReportError,
    ReportFormat,
};
