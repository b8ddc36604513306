use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::AdminCredentials;
use crate::placement::domain::{
    Company, CompanyId, ModelPaper, ModelPaperId, Student, StudentId,
};
use crate::placement::records::{
    placement_router, AccountRepository, AuthService, CompanyDraft, NewCompany, NewModelPaper,
    CompanyCascade, NewStudent, PaperStorage, PlacementRepository, PlacementService, Principal, RepositoryError,
    SessionStore, StorageError, StudentAccount, StudentDraft, ValidCompany, ValidStudent,
};

pub(super) const UPLOAD_LIMIT: u64 = 64;
pub(super) const ADMIN_EMAIL: &str = "admin@college.edu";
pub(super) const ADMIN_PASSWORD: &str = "placement-admin";

pub(super) fn admin() -> Principal {
    Principal::Admin {
        email: ADMIN_EMAIL.to_string(),
    }
}

pub(super) fn student_principal() -> Principal {
    Principal::Student {
        email: "amy@college.edu".to_string(),
        student_number: "21IT001".to_string(),
    }
}

pub(super) fn company_draft(name: &str, hiring_flow: &str) -> CompanyDraft {
    CompanyDraft {
        name: name.to_string(),
        hiring_flow: hiring_flow.to_string(),
        ctc_offer: "8 LPA".to_string(),
        agreement_years: 2,
        logo_url: None,
    }
}

pub(super) fn student_draft(name: &str, number: &str, reached: &str) -> StudentDraft {
    StudentDraft {
        name: name.to_string(),
        student_number: number.to_string(),
        email: None,
        linkedin_id: None,
        max_round_reached: reached.to_string(),
    }
}

pub(super) type TestService = PlacementService<MemoryRepository, MemoryStorage>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryStorage>) {
    let repository = Arc::new(MemoryRepository::default());
    let storage = Arc::new(MemoryStorage::default());
    let service = PlacementService::new(repository.clone(), storage.clone(), UPLOAD_LIMIT);
    (service, repository, storage)
}

pub(super) fn build_auth() -> Arc<AuthService> {
    Arc::new(AuthService::new(
        Arc::new(MemoryAccounts::default()),
        Arc::new(MemorySessions::default()),
        Some(AdminCredentials {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }),
    )
    .expect("auth service builds"))
}

pub(super) fn router_with_service(service: TestService, auth: Arc<AuthService>) -> axum::Router {
    placement_router(Arc::new(service), auth)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
struct Store {
    next_id: i64,
    companies: BTreeMap<CompanyId, Company>,
    students: BTreeMap<StudentId, Student>,
    papers: BTreeMap<ModelPaperId, ModelPaper>,
    vanish_after_lookup: Option<CompanyId>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn number_taken(&self, company_id: CompanyId, number: &str, except: Option<StudentId>) -> bool {
        self.students.values().any(|student| {
            student.company_id == company_id
                && student.student_number == number
                && Some(student.id) != except
        })
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    store: Arc<Mutex<Store>>,
}

impl MemoryRepository {
    pub(super) fn student_count(&self) -> usize {
        self.store.lock().expect("repository mutex poisoned").students.len()
    }

    pub(super) fn paper_count(&self) -> usize {
        self.store.lock().expect("repository mutex poisoned").papers.len()
    }

    /// The next lookup of `id` still returns it, then the company disappears,
    /// as if another request deleted it in between.
    pub(super) fn vanish_after_lookup(&self, id: CompanyId) {
        self.store.lock().expect("repository mutex poisoned").vanish_after_lookup = Some(id);
    }
}

impl PlacementRepository for MemoryRepository {
    fn companies(&self) -> Result<Vec<Company>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.companies.values().cloned().collect())
    }

    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let company = guard.companies.get(&id).cloned();
        if guard.vanish_after_lookup == Some(id) {
            guard.vanish_after_lookup = None;
            guard.companies.remove(&id);
        }
        Ok(company)
    }

    fn insert_company(&self, company: NewCompany) -> Result<Company, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let id = CompanyId(guard.next_id());
        let ValidCompany {
            name,
            hiring_rounds,
            ctc_offer,
            agreement_years,
            logo_url,
        } = company.fields;
        let company = Company {
            id,
            name,
            hiring_rounds,
            ctc_offer,
            agreement_years,
            logo_url,
            created_at: company.created_at,
            updated_at: None,
        };
        guard.companies.insert(id, company.clone());
        Ok(company)
    }

    fn update_company(
        &self,
        id: CompanyId,
        fields: ValidCompany,
        updated_at: DateTime<Utc>,
    ) -> Result<Company, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let company = guard.companies.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        company.name = fields.name;
        company.hiring_rounds = fields.hiring_rounds;
        company.ctc_offer = fields.ctc_offer;
        company.agreement_years = fields.agreement_years;
        company.logo_url = fields.logo_url;
        company.updated_at = Some(updated_at);
        Ok(company.clone())
    }

    fn delete_company(&self, id: CompanyId) -> Result<CompanyCascade, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let company = guard.companies.remove(&id).ok_or(RepositoryError::NotFound)?;
        let before = guard.students.len();
        guard.students.retain(|_, student| student.company_id != id);
        let students_removed = before - guard.students.len();
        let papers: Vec<ModelPaper> = guard
            .papers
            .values()
            .filter(|paper| paper.company_id == id)
            .cloned()
            .collect();
        guard.papers.retain(|_, paper| paper.company_id != id);
        Ok(CompanyCascade {
            company,
            students_removed,
            papers,
        })
    }

    fn students(&self) -> Result<Vec<Student>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.students.values().cloned().collect())
    }

    fn students_for(&self, company_id: CompanyId) -> Result<Vec<Student>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .students
            .values()
            .filter(|student| student.company_id == company_id)
            .cloned()
            .collect())
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.students.get(&id).cloned())
    }

    fn insert_student(&self, student: NewStudent) -> Result<Student, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        if !guard.companies.contains_key(&student.company_id) {
            return Err(RepositoryError::NotFound);
        }
        let fields = student.fields;
        if guard.number_taken(student.company_id, &fields.student_number, None) {
            return Err(RepositoryError::Conflict(fields.student_number));
        }
        let id = StudentId(guard.next_id());
        let stored = Student {
            id,
            company_id: student.company_id,
            name: fields.name,
            student_number: fields.student_number,
            email: fields.email,
            linkedin_id: fields.linkedin_id,
            max_round_reached: fields.max_round_reached,
            created_at: student.created_at,
            updated_at: None,
        };
        guard.students.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_student(
        &self,
        id: StudentId,
        fields: ValidStudent,
        updated_at: DateTime<Utc>,
    ) -> Result<Student, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let company_id = guard
            .students
            .get(&id)
            .map(|student| student.company_id)
            .ok_or(RepositoryError::NotFound)?;
        if guard.number_taken(company_id, &fields.student_number, Some(id)) {
            return Err(RepositoryError::Conflict(fields.student_number));
        }
        let student = guard.students.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        student.name = fields.name;
        student.student_number = fields.student_number;
        student.email = fields.email;
        student.linkedin_id = fields.linkedin_id;
        student.max_round_reached = fields.max_round_reached;
        student.updated_at = Some(updated_at);
        Ok(student.clone())
    }

    fn delete_student(&self, id: StudentId) -> Result<Student, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.students.remove(&id).ok_or(RepositoryError::NotFound)
    }

    fn papers_for(&self, company_id: CompanyId) -> Result<Vec<ModelPaper>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .papers
            .values()
            .filter(|paper| paper.company_id == company_id)
            .cloned()
            .collect())
    }

    fn paper(&self, id: ModelPaperId) -> Result<Option<ModelPaper>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.papers.get(&id).cloned())
    }

    fn insert_paper(&self, paper: NewModelPaper) -> Result<ModelPaper, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        if !guard.companies.contains_key(&paper.company_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = ModelPaperId(guard.next_id());
        let stored = ModelPaper {
            id,
            company_id: paper.company_id,
            name: paper.name,
            url: paper.url,
            storage_key: paper.storage_key,
            size_bytes: paper.size_bytes,
            uploaded_by: paper.uploaded_by,
            created_at: paper.created_at,
        };
        guard.papers.insert(id, stored.clone());
        Ok(stored)
    }

    fn delete_paper(&self, id: ModelPaperId) -> Result<ModelPaper, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.papers.remove(&id).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub(super) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl PaperStorage for MemoryStorage {
    fn store(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("/uploads/{key}"))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryAccounts {
    accounts: Mutex<HashMap<String, StudentAccount>>,
}

impl AccountRepository for MemoryAccounts {
    fn insert(&self, account: StudentAccount) -> Result<StudentAccount, RepositoryError> {
        let mut guard = self.accounts.lock().expect("accounts mutex poisoned");
        if guard.contains_key(&account.email) {
            return Err(RepositoryError::Conflict(account.email));
        }
        guard.insert(account.email.clone(), account.clone());
        Ok(account)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<StudentAccount>, RepositoryError> {
        let guard = self.accounts.lock().expect("accounts mutex poisoned");
        Ok(guard.get(email).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemorySessions {
    sessions: Mutex<HashMap<String, Principal>>,
}

impl SessionStore for MemorySessions {
    fn issue(&self, token: String, principal: Principal) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        guard.insert(token, principal);
        Ok(())
    }

    fn resolve(&self, token: &str) -> Result<Option<Principal>, RepositoryError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.get(token).cloned())
    }

    fn revoke(&self, token: &str) -> Result<bool, RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.remove(token).is_some())
    }
}

/// Storage that refuses every write, for exercising the 500 path.
pub(super) struct OfflineStorage;

impl PaperStorage for OfflineStorage {
    fn store(&self, _key: &str, _bytes: &[u8]) -> Result<String, StorageError> {
        Err(StorageError::Unavailable("bucket offline".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("bucket offline".to_string()))
    }
}
