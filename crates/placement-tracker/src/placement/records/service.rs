use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::super::aggregate::{CompanyAggregate, PlacementAggregate};
use super::super::domain::{Company, CompanyId, ModelPaper, ModelPaperId, Student, StudentId};
use super::super::report::views::{PlacementSummaryView, RankedStudentView, RoundCountView};
use super::super::report::{build_report, ReportArtifact, ReportError, ReportFormat};
use super::auth::Principal;
use super::domain::{CompanyDraft, PaperUpload, StudentDraft, ValidationError};
use super::repository::{
    NewCompany, NewModelPaper, NewStudent, PlacementRepository, RepositoryError,
};
use super::storage::{paper_extension, paper_media_type, PaperStorage, StorageError};

/// Company page payload: the company, its ranked students, and its papers.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetails {
    pub company: Company,
    pub total_students: usize,
    pub offer_count: usize,
    pub round_summary: String,
    pub round_counts: Vec<RoundCountView>,
    pub students: Vec<RankedStudentView>,
    pub model_papers: Vec<ModelPaper>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyRemoval {
    pub company: Company,
    pub students_removed: usize,
    pub papers_removed: usize,
}

/// Service composing the placement repository and paper storage behind
/// per-call authorization.
pub struct PlacementService<R, S> {
    repository: Arc<R>,
    storage: Arc<S>,
    max_upload_bytes: u64,
}

impl<R, S> PlacementService<R, S>
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    pub fn new(repository: Arc<R>, storage: Arc<S>, max_upload_bytes: u64) -> Self {
        Self {
            repository,
            storage,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn companies(&self, _principal: &Principal) -> Result<Vec<Company>, PlacementServiceError> {
        Ok(self.repository.companies()?)
    }

    pub fn company_details(
        &self,
        _principal: &Principal,
        company_id: CompanyId,
    ) -> Result<CompanyDetails, PlacementServiceError> {
        let company = self.company(company_id)?;
        let students = self.repository.students_for(company_id)?;
        let model_papers = self.repository.papers_for(company_id)?;

        let aggregate = CompanyAggregate::build(&company, students.iter().collect());
        let details = CompanyDetails {
            total_students: aggregate.total_students(),
            offer_count: aggregate.offer_count,
            round_summary: aggregate.round_summary(),
            round_counts: aggregate.round_counts.iter().map(RoundCountView::from).collect(),
            students: aggregate.ranked_views(),
            company: company.clone(),
            model_papers,
        };
        Ok(details)
    }

    pub fn create_company(
        &self,
        principal: &Principal,
        draft: CompanyDraft,
    ) -> Result<Company, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let fields = draft.validate()?;
        let company = self.repository.insert_company(NewCompany {
            fields,
            created_at: Utc::now(),
        })?;

        info!(%admin, company_id = %company.id, name = %company.name, "company created");
        Ok(company)
    }

    pub fn update_company(
        &self,
        principal: &Principal,
        company_id: CompanyId,
        draft: CompanyDraft,
    ) -> Result<Company, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let fields = draft.validate()?;
        let company = self
            .repository
            .update_company(company_id, fields, Utc::now())
            .map_err(|err| not_found_as("company", company_id.0, err))?;

        info!(%admin, company_id = %company.id, "company updated");
        Ok(company)
    }

    /// Deletes the company along with its students, papers, and stored files.
    ///
    /// Records go in one repository call; stored files are removed afterwards
    /// and a failure there only leaves an unreferenced file behind.
    pub fn delete_company(
        &self,
        principal: &Principal,
        company_id: CompanyId,
    ) -> Result<CompanyRemoval, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let cascade = self
            .repository
            .delete_company(company_id)
            .map_err(|err| not_found_as("company", company_id.0, err))?;

        for paper in &cascade.papers {
            if let Err(err) = self.remove_paper(paper) {
                warn!(
                    paper_id = %paper.id,
                    storage_key = %paper.storage_key,
                    error = %err,
                    "stored paper left behind after company delete"
                );
            }
        }

        let papers_removed = cascade.papers.len();
        info!(
            %admin,
            company_id = %cascade.company.id,
            students_removed = cascade.students_removed,
            papers_removed,
            "company deleted"
        );
        Ok(CompanyRemoval {
            company: cascade.company,
            students_removed: cascade.students_removed,
            papers_removed,
        })
    }

    pub fn add_student(
        &self,
        principal: &Principal,
        company_id: CompanyId,
        draft: StudentDraft,
    ) -> Result<Student, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let company = self.company(company_id)?;
        let fields = draft.validate(&company)?;

        let student = self
            .repository
            .insert_student(NewStudent {
                company_id,
                fields,
                created_at: Utc::now(),
            })
            .map_err(|err| not_found_as("company", company_id.0, err))
            .map_err(log_conflict)?;

        info!(%admin, company_id = %company_id, student_id = %student.id, "student added");
        Ok(student)
    }

    pub fn update_student(
        &self,
        principal: &Principal,
        student_id: StudentId,
        draft: StudentDraft,
    ) -> Result<Student, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let existing = self
            .repository
            .student(student_id)?
            .ok_or(PlacementServiceError::NotFound {
                entity: "student",
                id: student_id.0,
            })?;
        let company = self.company(existing.company_id)?;
        let fields = draft.validate(&company)?;

        let student = self
            .repository
            .update_student(student_id, fields, Utc::now())
            .map_err(|err| not_found_as("student", student_id.0, err))
            .map_err(log_conflict)?;

        info!(%admin, student_id = %student.id, "student updated");
        Ok(student)
    }

    pub fn delete_student(
        &self,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<Student, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let student = self
            .repository
            .delete_student(student_id)
            .map_err(|err| not_found_as("student", student_id.0, err))?;

        info!(%admin, student_id = %student.id, "student deleted");
        Ok(student)
    }

    pub fn upload_model_paper(
        &self,
        principal: &Principal,
        company_id: CompanyId,
        upload: PaperUpload,
    ) -> Result<ModelPaper, PlacementServiceError> {
        let admin = require_admin(principal)?;
        self.company(company_id)?;

        let name = upload.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if upload.bytes.is_empty() {
            return Err(ValidationError::EmptyUpload.into());
        }
        let size_bytes = upload.bytes.len() as u64;
        if size_bytes > self.max_upload_bytes {
            return Err(PlacementServiceError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }
        let media_type = paper_media_type(&name)
            .ok_or_else(|| ValidationError::UnsupportedPaperType(name.clone()))?;
        let extension = paper_extension(&name)
            .ok_or_else(|| ValidationError::UnsupportedPaperType(name.clone()))?;

        let storage_key = format!("{}_{}.{}", company_id, Uuid::new_v4().simple(), extension);
        let url = self.storage.store(&storage_key, &upload.bytes)?;

        let inserted = self.repository.insert_paper(NewModelPaper {
            company_id,
            name,
            url,
            storage_key: storage_key.clone(),
            size_bytes,
            uploaded_by: admin.to_string(),
            created_at: Utc::now(),
        });
        let paper = match inserted {
            Ok(paper) => paper,
            Err(err) => {
                if let Err(cleanup) = self.storage.remove(&storage_key) {
                    warn!(%storage_key, error = %cleanup, "orphaned paper upload not removed");
                }
                return Err(not_found_as("company", company_id.0, err));
            }
        };

        info!(
            %admin,
            company_id = %company_id,
            paper_id = %paper.id,
            size_bytes,
            media_type = %media_type,
            "model paper uploaded"
        );
        Ok(paper)
    }

    pub fn delete_model_paper(
        &self,
        principal: &Principal,
        paper_id: ModelPaperId,
    ) -> Result<ModelPaper, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let paper = self
            .repository
            .paper(paper_id)?
            .ok_or(PlacementServiceError::NotFound {
                entity: "model paper",
                id: paper_id.0,
            })?;

        self.remove_paper(&paper)?;
        let paper = self
            .repository
            .delete_paper(paper_id)
            .map_err(|err| not_found_as("model paper", paper_id.0, err))?;

        info!(%admin, paper_id = %paper.id, "model paper deleted");
        Ok(paper)
    }

    pub fn summary(&self, _principal: &Principal) -> Result<PlacementSummaryView, PlacementServiceError> {
        let companies = self.repository.companies()?;
        let students = self.repository.students()?;
        Ok(PlacementAggregate::build(&companies, &students).summary())
    }

    pub fn export_report(
        &self,
        principal: &Principal,
        format: ReportFormat,
        generated_at: NaiveDateTime,
    ) -> Result<ReportArtifact, PlacementServiceError> {
        let admin = require_admin(principal)?;
        let companies = self.repository.companies()?;
        let students = self.repository.students()?;

        let artifact = build_report(format, &companies, &students, generated_at)?;
        info!(%admin, file_name = %artifact.file_name, "report exported");
        Ok(artifact)
    }

    fn company(&self, company_id: CompanyId) -> Result<Company, PlacementServiceError> {
        self.repository
            .company(company_id)?
            .ok_or(PlacementServiceError::NotFound {
                entity: "company",
                id: company_id.0,
            })
    }

    fn remove_paper(&self, paper: &ModelPaper) -> Result<(), StorageError> {
        self.storage.remove(&paper.storage_key)
    }
}

fn require_admin(principal: &Principal) -> Result<&str, PlacementServiceError> {
    match principal {
        Principal::Admin { email } => Ok(email),
        Principal::Student { email, .. } => {
            warn!(%email, "student attempted an administrator operation");
            Err(PlacementServiceError::Forbidden)
        }
    }
}

fn not_found_as(entity: &'static str, id: i64, err: RepositoryError) -> PlacementServiceError {
    match err {
        RepositoryError::NotFound => PlacementServiceError::NotFound { entity, id },
        other => other.into(),
    }
}

fn log_conflict<E: Into<PlacementServiceError>>(err: E) -> PlacementServiceError {
    let err = err.into();
    if let PlacementServiceError::Repository(RepositoryError::Conflict(detail)) = &err {
        warn!(%detail, "student write rejected");
    }
    err
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementServiceError {
    #[error("administrator access required")]
    Forbidden,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
