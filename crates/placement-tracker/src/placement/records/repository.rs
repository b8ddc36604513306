use chrono::{DateTime, Utc};

use super::super::domain::{Company, CompanyId, ModelPaper, ModelPaperId, Student, StudentId};
use super::domain::{ValidCompany, ValidStudent};

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub fields: ValidCompany,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub company_id: CompanyId,
    pub fields: ValidStudent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewModelPaper {
    pub company_id: CompanyId,
    pub name: String,
    pub url: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

/// Records removed together with a company.
#[derive(Debug, Clone)]
pub struct CompanyCascade {
    pub company: Company,
    pub students_removed: usize,
    pub papers: Vec<ModelPaper>,
}

/// Storage abstraction for companies, students, and model papers.
///
/// Implementations assign identifiers and must enforce the
/// `(company_id, student_number)` uniqueness inside the same critical section
/// as the write, returning [`RepositoryError::Conflict`] on collision. Student
/// and paper inserts return [`RepositoryError::NotFound`] when the owning
/// company is gone, checked in that same critical section.
pub trait PlacementRepository: Send + Sync {
    fn companies(&self) -> Result<Vec<Company>, RepositoryError>;
    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn insert_company(&self, company: NewCompany) -> Result<Company, RepositoryError>;
    fn update_company(
        &self,
        id: CompanyId,
        fields: ValidCompany,
        updated_at: DateTime<Utc>,
    ) -> Result<Company, RepositoryError>;
    /// Removes the company, its students, and its paper records in one step.
    fn delete_company(&self, id: CompanyId) -> Result<CompanyCascade, RepositoryError>;

    fn students(&self) -> Result<Vec<Student>, RepositoryError>;
    fn students_for(&self, company_id: CompanyId) -> Result<Vec<Student>, RepositoryError>;
    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;
    fn insert_student(&self, student: NewStudent) -> Result<Student, RepositoryError>;
    fn update_student(
        &self,
        id: StudentId,
        fields: ValidStudent,
        updated_at: DateTime<Utc>,
    ) -> Result<Student, RepositoryError>;
    fn delete_student(&self, id: StudentId) -> Result<Student, RepositoryError>;

    fn papers_for(&self, company_id: CompanyId) -> Result<Vec<ModelPaper>, RepositoryError>;
    fn paper(&self, id: ModelPaperId) -> Result<Option<ModelPaper>, RepositoryError>;
    fn insert_paper(&self, paper: NewModelPaper) -> Result<ModelPaper, RepositoryError>;
    fn delete_paper(&self, id: ModelPaperId) -> Result<ModelPaper, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
