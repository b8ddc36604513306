//! Administrator-managed records (companies, students, model papers), student
//! accounts, and the HTTP surface over them.

pub mod auth;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use auth::{
    AccountRepository, AuthError, AuthService, Credentials, Principal, Registration, Session,
    SessionStore, StudentAccount,
};
pub use domain::{CompanyDraft, PaperUpload, StudentDraft, ValidCompany, ValidStudent, ValidationError};
pub use repository::{
    CompanyCascade, NewCompany, NewModelPaper, NewStudent, PlacementRepository, RepositoryError,
};
pub use router::{placement_router, PlacementApi};
pub use service::{CompanyDetails, CompanyRemoval, PlacementService, PlacementServiceError};
pub use storage::{paper_media_type, PaperStorage, StorageError};
