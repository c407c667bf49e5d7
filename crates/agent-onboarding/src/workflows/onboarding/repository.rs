use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationFields, ApplicationKey, ApplicationStatus, ApplicationUpdate,
    HistoryEntry, OnboardingStep, PublicApplicationId, ResumeToken,
};
use super::lifecycle::LifecycleAction;

/// Everything a fresh draft carries before the store assigns its internal
/// key.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub public_id: PublicApplicationId,
    pub resume_token: ResumeToken,
    pub status: ApplicationStatus,
    pub last_step: OnboardingStep,
    pub fields: ApplicationFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One step save, expressed as the sections it overwrites rather than a
/// whole record. The store applies it against its current copy, so two
/// patches touching disjoint sections both land regardless of ordering.
#[derive(Debug, Clone)]
pub struct DraftPatch {
    pub update: ApplicationUpdate,
    /// Watermark the save reached, if its step gate passed.
    pub reached: Option<OnboardingStep>,
    pub updated_at: DateTime<Utc>,
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Lookups by resume token must be exact-match only and indistinguishable
/// from a public-id miss on failure.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, fresh: NewApplication) -> Result<Application, RepositoryError>;
    fn fetch_by_public_id(
        &self,
        public_id: &PublicApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn fetch_by_resume_token(
        &self,
        token: &ResumeToken,
    ) -> Result<Option<Application>, RepositoryError>;
    /// Merge `patch` into the stored record under the store's own
    /// synchronization and return the merged result. Sections absent from
    /// the patch are never rewritten, even by a caller holding a stale read.
    fn update(&self, key: ApplicationKey, patch: DraftPatch)
        -> Result<Application, RepositoryError>;
    /// Compare-and-set on status: persist `record` only if the stored status
    /// still equals `expected`, otherwise fail with `Conflict`. Lifecycle
    /// transitions go through this so a racing double-submit cannot stamp
    /// twice.
    fn update_if_status(
        &self,
        record: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError>;
    fn append_history(&self, entry: HistoryEntry) -> Result<(), RepositoryError>;
    fn history(&self, key: ApplicationKey) -> Result<Vec<HistoryEntry>, RepositoryError>;
}

/// Error enumeration for repository failures. `Unavailable` is the only
/// transient kind and the only one the retry wrapper will re-attempt.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was concurrently modified")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound status-change notices. Delivery is best-effort: a failed notice
/// never rolls back the transition that produced it.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notice: StatusNotice) -> Result<(), NotificationError>;
}

/// Payload handed to the notification subsystem after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub application_id: PublicApplicationId,
    pub action: LifecycleAction,
    pub status: ApplicationStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an application. Never carries the resume
/// token; exposing the public id must not leak resume capability.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_id: PublicApplicationId,
    pub status: &'static str,
    pub last_step: u8,
    pub fields: ApplicationFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationView {
    pub fn from_record(record: &Application) -> Self {
        Self {
            application_id: record.public_id.clone(),
            status: record.status.label(),
            last_step: record.last_step.number(),
            fields: record.fields.clone(),
            submit_date: record.submit_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// The create response: the only payload that ever includes the resume
/// token.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApplicationView {
    pub resume_token: ResumeToken,
    #[serde(flatten)]
    pub application: ApplicationView,
}

impl CreatedApplicationView {
    pub fn from_record(record: &Application) -> Self {
        Self {
            resume_token: record.resume_token.clone(),
            application: ApplicationView::from_record(record),
        }
    }
}

/// One ledger row as exposed to admin tooling.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntryView {
    pub action: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntryView {
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            action: entry.action.label(),
            status: entry.status.label(),
            comment: entry.comment.clone(),
            recorded_at: entry.recorded_at,
        }
    }
}
