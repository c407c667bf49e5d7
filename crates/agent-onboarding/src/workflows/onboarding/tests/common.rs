use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::onboarding::domain::{
    Application, ApplicationKey, ApplicationStatus, ApplicationUpdate, BackgroundCheck,
    BusinessInfo, DocumentKind, DocumentReference, HistoryEntry, LocationInfo, PackageSelection,
    PersonalInfo, PublicApplicationId, ResumeToken, SignatureConsent,
};
use crate::workflows::onboarding::gate::GatePolicy;
use crate::workflows::onboarding::repository::{
    ApplicationRepository, DraftPatch, NewApplication, NotificationError, NotificationPublisher,
    RepositoryError, StatusNotice,
};
use crate::workflows::onboarding::retry::RetryPolicy;
use crate::workflows::onboarding::router::onboarding_router;
use crate::workflows::onboarding::service::OnboardingService;
use crate::workflows::onboarding::OnboardingStep;

#[derive(Default)]
struct MemoryStore {
    sequence: u64,
    records: HashMap<u64, Application>,
    by_public_id: HashMap<String, u64>,
    by_resume_token: HashMap<String, u64>,
    history: Vec<HistoryEntry>,
}

/// Mutex-guarded in-memory repository mirroring the production adapter.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryRepository {
    pub(super) fn history_len(&self) -> usize {
        self.store.lock().expect("repository mutex poisoned").history.len()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, fresh: NewApplication) -> Result<Application, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        if store.by_public_id.contains_key(&fresh.public_id.0)
            || store.by_resume_token.contains_key(&fresh.resume_token.0)
        {
            return Err(RepositoryError::Conflict);
        }

        store.sequence += 1;
        let key = store.sequence;
        let record = Application {
            key: ApplicationKey(key),
            public_id: fresh.public_id,
            resume_token: fresh.resume_token,
            status: fresh.status,
            last_step: fresh.last_step,
            fields: fresh.fields,
            submit_date: None,
            created_at: fresh.created_at,
            updated_at: fresh.updated_at,
        };
        store.by_public_id.insert(record.public_id.0.clone(), key);
        store
            .by_resume_token
            .insert(record.resume_token.0.clone(), key);
        store.records.insert(key, record.clone());
        Ok(record)
    }

    fn fetch_by_public_id(
        &self,
        public_id: &PublicApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        Ok(store
            .by_public_id
            .get(&public_id.0)
            .and_then(|key| store.records.get(key))
            .cloned())
    }

    fn fetch_by_resume_token(
        &self,
        token: &ResumeToken,
    ) -> Result<Option<Application>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        Ok(store
            .by_resume_token
            .get(&token.0)
            .and_then(|key| store.records.get(key))
            .cloned())
    }

    fn update(
        &self,
        key: ApplicationKey,
        patch: DraftPatch,
    ) -> Result<Application, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        let record = store
            .records
            .get_mut(&key.0)
            .ok_or(RepositoryError::NotFound)?;
        record.apply_update(patch.update);
        if let Some(reached) = patch.reached {
            record.advance_last_step(reached);
        }
        record.updated_at = patch.updated_at;
        Ok(record.clone())
    }

    fn update_if_status(
        &self,
        record: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        let stored = store
            .records
            .get(&record.key.0)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict);
        }
        store.records.insert(record.key.0, record.clone());
        Ok(record)
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        store.history.push(entry);
        Ok(())
    }

    fn history(&self, key: ApplicationKey) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        Ok(store
            .history
            .iter()
            .filter(|entry| entry.application == key)
            .cloned()
            .collect())
    }
}

/// Repository double that reports a transient outage for the first
/// `failures` operations, then delegates to an in-memory store.
pub(super) struct FlakyRepository {
    inner: MemoryRepository,
    remaining_failures: AtomicU32,
}

impl FlakyRepository {
    pub(super) fn new(failures: u32) -> Self {
        Self {
            inner: MemoryRepository::default(),
            remaining_failures: AtomicU32::new(failures),
        }
    }

    fn maybe_fail(&self) -> Result<(), RepositoryError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }
}

impl ApplicationRepository for FlakyRepository {
    fn insert(&self, fresh: NewApplication) -> Result<Application, RepositoryError> {
        self.maybe_fail()?;
        self.inner.insert(fresh)
    }

    fn fetch_by_public_id(
        &self,
        public_id: &PublicApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.maybe_fail()?;
        self.inner.fetch_by_public_id(public_id)
    }

    fn fetch_by_resume_token(
        &self,
        token: &ResumeToken,
    ) -> Result<Option<Application>, RepositoryError> {
        self.maybe_fail()?;
        self.inner.fetch_by_resume_token(token)
    }

    fn update(
        &self,
        key: ApplicationKey,
        patch: DraftPatch,
    ) -> Result<Application, RepositoryError> {
        self.maybe_fail()?;
        self.inner.update(key, patch)
    }

    fn update_if_status(
        &self,
        record: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        self.maybe_fail()?;
        self.inner.update_if_status(record, expected)
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<(), RepositoryError> {
        self.maybe_fail()?;
        self.inner.append_history(entry)
    }

    fn history(&self, key: ApplicationKey) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.maybe_fail()?;
        self.inner.history(key)
    }
}

/// Repository double whose backend never comes back.
pub(super) struct UnavailableRepository;

impl UnavailableRepository {
    fn down<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _fresh: NewApplication) -> Result<Application, RepositoryError> {
        Self::down()
    }

    fn fetch_by_public_id(
        &self,
        _public_id: &PublicApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Self::down()
    }

    fn fetch_by_resume_token(
        &self,
        _token: &ResumeToken,
    ) -> Result<Option<Application>, RepositoryError> {
        Self::down()
    }

    fn update(
        &self,
        _key: ApplicationKey,
        _patch: DraftPatch,
    ) -> Result<Application, RepositoryError> {
        Self::down()
    }

    fn update_if_status(
        &self,
        _record: Application,
        _expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        Self::down()
    }

    fn append_history(&self, _entry: HistoryEntry) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn history(&self, _key: ApplicationKey) -> Result<Vec<HistoryEntry>, RepositoryError> {
        Self::down()
    }
}

/// Repository double that holds the first two readers at a barrier, forcing
/// two concurrent step saves to load the same pre-save snapshot before
/// either of their writes lands.
pub(super) struct RendezvousRepository {
    inner: MemoryRepository,
    barrier: Barrier,
    reads: AtomicU32,
}

impl RendezvousRepository {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryRepository::default(),
            barrier: Barrier::new(2),
            reads: AtomicU32::new(0),
        }
    }
}

impl ApplicationRepository for RendezvousRepository {
    fn insert(&self, fresh: NewApplication) -> Result<Application, RepositoryError> {
        self.inner.insert(fresh)
    }

    fn fetch_by_public_id(
        &self,
        public_id: &PublicApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait();
        }
        self.inner.fetch_by_public_id(public_id)
    }

    fn fetch_by_resume_token(
        &self,
        token: &ResumeToken,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_by_resume_token(token)
    }

    fn update(
        &self,
        key: ApplicationKey,
        patch: DraftPatch,
    ) -> Result<Application, RepositoryError> {
        self.inner.update(key, patch)
    }

    fn update_if_status(
        &self,
        record: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        self.inner.update_if_status(record, expected)
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<(), RepositoryError> {
        self.inner.append_history(entry)
    }

    fn history(&self, key: ApplicationKey) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.inner.history(key)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<StatusNotice>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<StatusNotice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notice: StatusNotice) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

/// Publisher double whose transport always fails.
pub(super) struct FailingNotifications;

impl NotificationPublisher for FailingNotifications {
    fn publish(&self, _notice: StatusNotice) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp down".to_string()))
    }
}

pub(super) fn build_service() -> (
    OnboardingService<MemoryRepository, MemoryNotifications>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = OnboardingService::with_retry_policy(
        repository.clone(),
        notifications.clone(),
        GatePolicy::default(),
        RetryPolicy::immediate(),
    );
    (service, repository, notifications)
}

pub(super) fn personal_info() -> PersonalInfo {
    PersonalInfo {
        first_name: "Maria".to_string(),
        last_name: "Santos".to_string(),
        email: "m@example.com".to_string(),
        mobile_number: Some("+639171234567".to_string()),
        birth_date: None,
    }
}

pub(super) fn background_answers() -> BackgroundCheck {
    BackgroundCheck {
        has_criminal_record: Some(false),
        has_pending_case: Some(false),
        previously_terminated_as_agent: Some(false),
    }
}

pub(super) fn business_info() -> BusinessInfo {
    BusinessInfo {
        business_name: "Santos Sari-Sari Store".to_string(),
        nature_of_business: "Retail".to_string(),
        tin: Some("123-456-789-000".to_string()),
        years_operating: Some(4),
    }
}

pub(super) fn location_info() -> LocationInfo {
    LocationInfo {
        region: "NCR".to_string(),
        province: "Metro Manila".to_string(),
        city: "Quezon City".to_string(),
        barangay: "Commonwealth".to_string(),
        street_address: "123 Mabini St".to_string(),
        postal_code: Some("1121".to_string()),
        latitude: Some(14.6969),
        longitude: Some(121.0868),
    }
}

pub(super) fn package_selection() -> PackageSelection {
    PackageSelection {
        code: "standard".to_string(),
        fee: 3500,
    }
}

pub(super) fn document_set() -> Vec<DocumentReference> {
    vec![
        DocumentReference {
            kind: DocumentKind::ValidId,
            file_name: "umid.jpg".to_string(),
            storage_key: "uploads/umid.jpg".to_string(),
        },
        DocumentReference {
            kind: DocumentKind::ProofOfBilling,
            file_name: "meralco.pdf".to_string(),
            storage_key: "uploads/meralco.pdf".to_string(),
        },
        DocumentReference {
            kind: DocumentKind::BusinessPermit,
            file_name: "permit.pdf".to_string(),
            storage_key: "uploads/permit.pdf".to_string(),
        },
    ]
}

pub(super) fn signature_consent() -> SignatureConsent {
    SignatureConsent {
        terms_accepted: true,
        signature_key: Some("uploads/signature.png".to_string()),
    }
}

pub(super) fn personal_update() -> ApplicationUpdate {
    ApplicationUpdate {
        personal: Some(personal_info()),
        ..Default::default()
    }
}

/// Drive an application through every data step so the full gate passes.
pub(super) fn complete_application<R, N>(
    service: &OnboardingService<R, N>,
    public_id: &PublicApplicationId,
) where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let saves = [
        (
            OnboardingStep::Personal,
            ApplicationUpdate {
                personal: Some(personal_info()),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Background,
            ApplicationUpdate {
                background: Some(background_answers()),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Business,
            ApplicationUpdate {
                business: Some(business_info()),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Location,
            ApplicationUpdate {
                location: Some(location_info()),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Package,
            ApplicationUpdate {
                package: Some(package_selection()),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Documents,
            ApplicationUpdate {
                documents: Some(document_set()),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Signature,
            ApplicationUpdate {
                signature: Some(signature_consent()),
                ..Default::default()
            },
        ),
    ];

    for (step, update) in saves {
        let outcome = service
            .save_step(public_id, step, update)
            .expect("step save succeeds");
        assert!(outcome.step_complete, "step {step} should be complete");
    }
}

pub(super) fn onboarding_router_with_service(
    service: OnboardingService<MemoryRepository, MemoryNotifications>,
) -> axum::Router {
    onboarding_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
