use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use placement_tracker::placement::domain::{
    Company, CompanyId, ModelPaper, ModelPaperId, Student, StudentId,
};
use placement_tracker::placement::records::{
    AccountRepository, CompanyCascade, NewCompany, NewModelPaper, NewStudent, PaperStorage, PlacementRepository,
    Principal, RepositoryError, SessionStore, StorageError, StudentAccount, ValidCompany,
    ValidStudent,
};
use placement_tracker::placement::PlacementSnapshot;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) upload_dir: Arc<PathBuf>,
}

#[derive(Default)]
struct PlacementStore {
    last_id: i64,
    companies: BTreeMap<CompanyId, Company>,
    students: BTreeMap<StudentId, Student>,
    papers: BTreeMap<ModelPaperId, ModelPaper>,
}

impl PlacementStore {
    fn allocate(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn conflicting_student(
        &self,
        company_id: CompanyId,
        student_number: &str,
        except: Option<StudentId>,
    ) -> Option<&Student> {
        self.students.values().find(|student| {
            student.company_id == company_id
                && student.student_number == student_number
                && Some(student.id) != except
        })
    }
}

/// Process-local store. Every write, including the per-company student
/// number check, happens under one lock acquisition.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPlacementRepository {
    store: Arc<Mutex<PlacementStore>>,
}

impl InMemoryPlacementRepository {
    fn lock(&self) -> Result<MutexGuard<'_, PlacementStore>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("placement store lock poisoned".to_string()))
    }

    /// Loads an imported snapshot, keeping its identifiers.
    pub(crate) fn seed(&self, snapshot: PlacementSnapshot) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        for company in snapshot.companies {
            store.last_id = store.last_id.max(company.id.0);
            store.companies.insert(company.id, company);
        }
        for student in snapshot.students {
            if store
                .conflicting_student(student.company_id, &student.student_number, None)
                .is_some()
            {
                return Err(RepositoryError::Conflict(format!(
                    "student number {} appears twice under company {}",
                    student.student_number, student.company_id
                )));
            }
            store.last_id = store.last_id.max(student.id.0);
            store.students.insert(student.id, student);
        }
        Ok(())
    }
}

impl PlacementRepository for InMemoryPlacementRepository {
    fn companies(&self) -> Result<Vec<Company>, RepositoryError> {
        Ok(self.lock()?.companies.values().cloned().collect())
    }

    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.lock()?.companies.get(&id).cloned())
    }

    fn insert_company(&self, company: NewCompany) -> Result<Company, RepositoryError> {
        let mut store = self.lock()?;
        let id = CompanyId(store.allocate());
        let fields = company.fields;
        let stored = Company {
            id,
            name: fields.name,
            hiring_rounds: fields.hiring_rounds,
            ctc_offer: fields.ctc_offer,
            agreement_years: fields.agreement_years,
            logo_url: fields.logo_url,
            created_at: company.created_at,
            updated_at: None,
        };
        store.companies.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_company(
        &self,
        id: CompanyId,
        fields: ValidCompany,
        updated_at: DateTime<Utc>,
    ) -> Result<Company, RepositoryError> {
        let mut store = self.lock()?;
        let company = store.companies.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        company.name = fields.name;
        company.hiring_rounds = fields.hiring_rounds;
        company.ctc_offer = fields.ctc_offer;
        company.agreement_years = fields.agreement_years;
        company.logo_url = fields.logo_url;
        company.updated_at = Some(updated_at);
        Ok(company.clone())
    }

    fn delete_company(&self, id: CompanyId) -> Result<CompanyCascade, RepositoryError> {
        let mut store = self.lock()?;
        let company = store.companies.remove(&id).ok_or(RepositoryError::NotFound)?;

        let before = store.students.len();
        store.students.retain(|_, student| student.company_id != id);
        let students_removed = before - store.students.len();

        let (papers, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut store.papers)
            .into_iter()
            .partition(|(_, paper)| paper.company_id == id);
        store.papers = kept;

        Ok(CompanyCascade {
            company,
            students_removed,
            papers: papers.into_values().collect(),
        })
    }

    fn students(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self.lock()?.students.values().cloned().collect())
    }

    fn students_for(&self, company_id: CompanyId) -> Result<Vec<Student>, RepositoryError> {
        Ok(self
            .lock()?
            .students
            .values()
            .filter(|student| student.company_id == company_id)
            .cloned()
            .collect())
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    fn insert_student(&self, student: NewStudent) -> Result<Student, RepositoryError> {
        let mut store = self.lock()?;
        if !store.companies.contains_key(&student.company_id) {
            return Err(RepositoryError::NotFound);
        }
        let fields = student.fields;
        if store
            .conflicting_student(student.company_id, &fields.student_number, None)
            .is_some()
        {
            return Err(RepositoryError::Conflict(format!(
                "student number {} already recorded for company {}",
                fields.student_number, student.company_id
            )));
        }

        let id = StudentId(store.allocate());
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
        store.students.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_student(
        &self,
        id: StudentId,
        fields: ValidStudent,
        updated_at: DateTime<Utc>,
    ) -> Result<Student, RepositoryError> {
        let mut store = self.lock()?;
        let company_id = store
            .students
            .get(&id)
            .map(|student| student.company_id)
            .ok_or(RepositoryError::NotFound)?;
        if store
            .conflicting_student(company_id, &fields.student_number, Some(id))
            .is_some()
        {
            return Err(RepositoryError::Conflict(format!(
                "student number {} already recorded for company {}",
                fields.student_number, company_id
            )));
        }

        let student = store.students.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        student.name = fields.name;
        student.student_number = fields.student_number;
        student.email = fields.email;
        student.linkedin_id = fields.linkedin_id;
        student.max_round_reached = fields.max_round_reached;
        student.updated_at = Some(updated_at);
        Ok(student.clone())
    }

    fn delete_student(&self, id: StudentId) -> Result<Student, RepositoryError> {
        self.lock()?
            .students
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }

    fn papers_for(&self, company_id: CompanyId) -> Result<Vec<ModelPaper>, RepositoryError> {
        Ok(self
            .lock()?
            .papers
            .values()
            .filter(|paper| paper.company_id == company_id)
            .cloned()
            .collect())
    }

    fn paper(&self, id: ModelPaperId) -> Result<Option<ModelPaper>, RepositoryError> {
        Ok(self.lock()?.papers.get(&id).cloned())
    }

    fn insert_paper(&self, paper: NewModelPaper) -> Result<ModelPaper, RepositoryError> {
        let mut store = self.lock()?;
        if !store.companies.contains_key(&paper.company_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = ModelPaperId(store.allocate());
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
        store.papers.insert(id, stored.clone());
        Ok(stored)
    }

    fn delete_paper(&self, id: ModelPaperId) -> Result<ModelPaper, RepositoryError> {
        self.lock()?
            .papers
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAccountRepository {
    accounts: Arc<Mutex<HashMap<String, StudentAccount>>>,
}

impl AccountRepository for InMemoryAccountRepository {
    fn insert(&self, account: StudentAccount) -> Result<StudentAccount, RepositoryError> {
        let mut guard = self.accounts.lock().map_err(poisoned)?;
        if guard.contains_key(&account.email) {
            return Err(RepositoryError::Conflict(account.email));
        }
        guard.insert(account.email.clone(), account.clone());
        Ok(account)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<StudentAccount>, RepositoryError> {
        let guard = self.accounts.lock().map_err(poisoned)?;
        Ok(guard.get(email).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Principal>>>,
}

impl SessionStore for InMemorySessionStore {
    fn issue(&self, token: String, principal: Principal) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard.insert(token, principal);
        Ok(())
    }

    fn resolve(&self, token: &str) -> Result<Option<Principal>, RepositoryError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.get(token).cloned())
    }

    fn revoke(&self, token: &str) -> Result<bool, RepositoryError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.remove(token).is_some())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("lock poisoned".to_string())
}

/// Writes papers under the configured upload directory, served at `/uploads/`.
#[derive(Debug, Clone)]
pub(crate) struct LocalPaperStorage {
    root: PathBuf,
}

impl LocalPaperStorage {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PaperStorage for LocalPaperStorage {
    fn store(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.root.join(key), bytes)?;
        Ok(format!("/uploads/{key}"))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.root.join(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement_tracker::placement::domain::RoundReached;

    fn valid_student(number: &str) -> ValidStudent {
        ValidStudent {
            name: "Amy".to_string(),
            student_number: number.to_string(),
            email: None,
            linkedin_id: None,
            max_round_reached: RoundReached::Round(1),
        }
    }

    fn new_company(repository: &InMemoryPlacementRepository) -> Company {
        repository
            .insert_company(NewCompany {
                fields: ValidCompany {
                    name: "Acme".to_string(),
                    hiring_rounds: vec!["Test".to_string()],
                    ctc_offer: "8 LPA".to_string(),
                    agreement_years: 1,
                    logo_url: None,
                },
                created_at: Utc::now(),
            })
            .expect("company stored")
    }

    #[test]
    fn concurrent_inserts_keep_student_numbers_unique() {
        let repository = InMemoryPlacementRepository::default();
        let company = new_company(&repository);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repository = repository.clone();
                std::thread::spawn(move || {
                    repository.insert_student(NewStudent {
                        company_id: company.id,
                        fields: valid_student("S1"),
                        created_at: Utc::now(),
                    })
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .filter(Result::is_ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(repository.students().expect("list").len(), 1);
    }

    fn new_student(company_id: CompanyId, number: &str) -> NewStudent {
        NewStudent {
            company_id,
            fields: valid_student(number),
            created_at: Utc::now(),
        }
    }

    fn new_paper(company_id: CompanyId) -> NewModelPaper {
        NewModelPaper {
            company_id,
            name: "aptitude.pdf".to_string(),
            url: "/uploads/1_a.pdf".to_string(),
            storage_key: "1_a.pdf".to_string(),
            size_bytes: 4,
            uploaded_by: "admin@college.edu".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn company_delete_takes_students_and_papers_with_it() {
        let repository = InMemoryPlacementRepository::default();
        let acme = new_company(&repository);
        let globex = new_company(&repository);
        repository.insert_student(new_student(acme.id, "S1")).expect("insert");
        repository.insert_student(new_student(acme.id, "S2")).expect("insert");
        repository.insert_student(new_student(globex.id, "S1")).expect("insert");
        repository.insert_paper(new_paper(acme.id)).expect("insert");

        let cascade = repository.delete_company(acme.id).expect("delete");
        assert_eq!(cascade.company.id, acme.id);
        assert_eq!(cascade.students_removed, 2);
        assert_eq!(cascade.papers.len(), 1);
        assert_eq!(repository.students().expect("list").len(), 1);
        assert!(repository.papers_for(acme.id).expect("list").is_empty());
        assert!(matches!(
            repository.delete_company(acme.id),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn writes_against_a_deleted_company_leave_no_orphans() {
        let repository = InMemoryPlacementRepository::default();
        let acme = new_company(&repository);
        repository.delete_company(acme.id).expect("delete");

        assert!(matches!(
            repository.insert_student(new_student(acme.id, "S1")),
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repository.insert_paper(new_paper(acme.id)),
            Err(RepositoryError::NotFound)
        ));
        assert!(repository.students().expect("list").is_empty());
    }

    #[test]
    fn racing_delete_and_insert_never_orphans_students() {
        for _ in 0..32 {
            let repository = InMemoryPlacementRepository::default();
            let acme = new_company(&repository);

            let writer = {
                let repository = repository.clone();
                std::thread::spawn(move || {
                    (0..16)
                        .filter(|index| {
                            repository
                                .insert_student(new_student(acme.id, &format!("S{index}")))
                                .is_ok()
                        })
                        .count()
                })
            };
            let cascade = repository.delete_company(acme.id).expect("delete");
            let inserted = writer.join().expect("writer completes");

            let remaining = repository.students().expect("list").len();
            assert_eq!(remaining, 0);
            assert_eq!(cascade.students_removed, inserted);
        }
    }

    #[test]
    fn seeding_keeps_ids_and_continues_allocation() {
        let repository = InMemoryPlacementRepository::default();
        let company = Company {
            id: CompanyId(40),
            name: "Globex".to_string(),
            hiring_rounds: vec!["Test".to_string()],
            ctc_offer: "10 LPA".to_string(),
            agreement_years: 0,
            logo_url: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        repository
            .seed(PlacementSnapshot {
                companies: vec![company],
                students: Vec::new(),
            })
            .expect("seed succeeds");

        let next = new_company(&repository);
        assert_eq!(next.id, CompanyId(41));
        assert!(repository.company(CompanyId(40)).expect("lookup").is_some());
    }

    #[test]
    fn local_storage_round_trips_files() {
        let root = std::env::temp_dir().join(format!("placement-papers-{}", std::process::id()));
        let storage = LocalPaperStorage::new(&root);

        let url = storage.store("1_paper.pdf", b"%PDF").expect("stored");
        assert_eq!(url, "/uploads/1_paper.pdf");
        assert_eq!(std::fs::read(root.join("1_paper.pdf")).expect("read back"), b"%PDF");

        storage.remove("1_paper.pdf").expect("removed");
        storage.remove("1_paper.pdf").expect("missing files are ignored");
        let _ = std::fs::remove_dir_all(root);
    }
}
