//! Loads a placement snapshot from a pair of CSV exports.

mod parser;

use super::domain::{Company, Student};
use chrono::Utc;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug)]
pub enum SnapshotImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for SnapshotImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotImportError::Io(err) => write!(f, "failed to read placement export: {}", err),
            SnapshotImportError::Csv(err) => write!(f, "invalid placement CSV data: {}", err),
        }
    }
}

impl std::error::Error for SnapshotImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotImportError::Io(err) => Some(err),
            SnapshotImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SnapshotImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SnapshotImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Companies and students as read, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementSnapshot {
    pub companies: Vec<Company>,
    pub students: Vec<Student>,
}

pub struct SnapshotImporter;

impl SnapshotImporter {
    pub fn from_paths<C, S>(companies: C, students: S) -> Result<PlacementSnapshot, SnapshotImportError>
    where
        C: AsRef<Path>,
        S: AsRef<Path>,
    {
        let companies = std::fs::File::open(companies)?;
        let students = std::fs::File::open(students)?;
        Self::from_readers(companies, students)
    }

    pub fn from_readers<C: Read, S: Read>(
        companies: C,
        students: S,
    ) -> Result<PlacementSnapshot, SnapshotImportError> {
        let imported_at = Utc::now();
        let snapshot = PlacementSnapshot {
            companies: parser::parse_companies(companies, imported_at)?,
            students: parser::parse_students(students, imported_at)?,
        };

        debug!(
            companies = snapshot.companies.len(),
            students = snapshot.students.len(),
            "placement snapshot imported"
        );
        Ok(snapshot)
    }
}
