use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use agent_onboarding::workflows::onboarding::{
    Application, ApplicationKey, ApplicationRepository, ApplicationStatus, DraftPatch,
    HistoryEntry, NewApplication, NotificationError, NotificationPublisher, PublicApplicationId,
    RepositoryError, ResumeToken, StatusNotice,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct ApplicationStore {
    sequence: u64,
    records: HashMap<u64, Application>,
    by_public_id: HashMap<String, u64>,
    by_resume_token: HashMap<String, u64>,
    history: Vec<HistoryEntry>,
}

/// Mutex-guarded in-memory record store. Stands in for the real database;
/// everything reaches it through the repository trait, so swapping in a
/// persistent backend is a deployment concern.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    store: Arc<Mutex<ApplicationStore>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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

/// Publisher that records status notices in the service log, standing in
/// for the SMS/email transport.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationPublisher;

impl NotificationPublisher for LoggingNotificationPublisher {
    fn publish(&self, notice: StatusNotice) -> Result<(), NotificationError> {
        info!(
            application_id = %notice.application_id.0,
            action = notice.action.label(),
            status = notice.status.label(),
            "status notice dispatched"
        );
        Ok(())
    }
}
