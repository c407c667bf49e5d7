use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationStatus, ApplicationUpdate, HistoryEntry, OnboardingStep,
    PublicApplicationId, ResumeToken,
};
use super::gate::{self, GatePolicy, UnmetRequirement, ValidationReport};
use super::identifier;
use super::lifecycle::{self, IllegalTransition, LifecycleAction};
use super::repository::{
    ApplicationRepository, DraftPatch, NewApplication, NotificationPublisher, RepositoryError,
    StatusNotice,
};
use super::retry::{with_retry, RetryPolicy};

/// Service composing identifier generation, the step gate, the lifecycle
/// table, and the retry-wrapped record store.
pub struct OnboardingService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    policy: GatePolicy,
    retry: RetryPolicy,
}

/// Result of a step save: the merged record plus the gate's verdict for the
/// step that was saved.
#[derive(Debug, Clone)]
pub struct StepSaveOutcome {
    pub application: Application,
    pub step: OnboardingStep,
    pub step_complete: bool,
    pub unmet: Vec<UnmetRequirement>,
}

impl<R, N> OnboardingService<R, N>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, policy: GatePolicy) -> Self {
        Self::with_retry_policy(repository, notifications, policy, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        repository: Arc<R>,
        notifications: Arc<N>,
        policy: GatePolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            notifications,
            policy,
            retry,
        }
    }

    /// Open a new empty draft with freshly minted identifiers.
    pub fn create(&self) -> Result<Application, OnboardingError> {
        let now = Utc::now();
        let fresh = NewApplication {
            public_id: identifier::generate_public_id(),
            resume_token: identifier::generate_resume_token(),
            status: ApplicationStatus::Draft,
            last_step: OnboardingStep::Welcome,
            fields: Default::default(),
            created_at: now,
            updated_at: now,
        };

        let record = with_retry(self.retry, || self.repository.insert(fresh.clone()))?;
        info!(application_id = %record.public_id.0, "opened draft application");
        Ok(record)
    }

    /// Fetch by public id.
    pub fn get(&self, public_id: &PublicApplicationId) -> Result<Application, OnboardingError> {
        self.load(public_id)
    }

    /// The resume resolver: exact token match only. A miss is reported
    /// exactly like an unknown public id.
    pub fn resume(&self, token: &ResumeToken) -> Result<Application, OnboardingError> {
        with_retry(self.retry, || self.repository.fetch_by_resume_token(token))?
            .ok_or(OnboardingError::NotFound)
    }

    /// Merge a partial payload for `step` into the draft. The save persists
    /// even when the step is still incomplete; the gate outcome only decides
    /// whether the step watermark advances.
    pub fn save_step(
        &self,
        public_id: &PublicApplicationId,
        step: OnboardingStep,
        update: ApplicationUpdate,
    ) -> Result<StepSaveOutcome, OnboardingError> {
        let record = self.load(public_id)?;
        lifecycle::ensure_editable(record.status)?;

        // Gate the record as this save will leave it. The store re-applies
        // the same merge under its own lock, so a save of another section
        // racing this one cannot be overwritten by our stale read.
        let mut preview = record.clone();
        preview.apply_update(update.clone());
        let unmet = gate::step_requirements(step, &preview.fields, &self.policy);
        let step_complete = unmet.is_empty();
        let reached = if step_complete && step < OnboardingStep::Review {
            step.next()
        } else {
            None
        };

        let patch = DraftPatch {
            update,
            reached,
            updated_at: Utc::now(),
        };
        let application = with_retry(self.retry, || {
            self.repository.update(record.key, patch.clone())
        })?;
        Ok(StepSaveOutcome {
            application,
            step,
            step_complete,
            unmet,
        })
    }

    /// Submit the draft. Fails with `Validation` (listing every incomplete
    /// step) when the full-application gate does not pass, and with an
    /// `IllegalTransition` when the application already left `draft`,
    /// including the loser of a double-submit race.
    pub fn submit(&self, public_id: &PublicApplicationId) -> Result<Application, OnboardingError> {
        let mut record = self.load(public_id)?;
        let from = record.status;
        record.status = lifecycle::transition(from, LifecycleAction::Submit)?;

        gate::submission_check(&record.fields, &self.policy)
            .map_err(OnboardingError::Validation)?;

        let now = Utc::now();
        record.submit_date = Some(now);
        record.advance_last_step(OnboardingStep::Confirmation);
        record.updated_at = now;

        let stored = self.commit_transition(record, from, LifecycleAction::Submit, None)?;
        info!(application_id = %stored.public_id.0, "application submitted");
        Ok(stored)
    }

    /// Reviewer action: move a submitted application into review.
    pub fn start_review(
        &self,
        public_id: &PublicApplicationId,
        comment: Option<String>,
    ) -> Result<Application, OnboardingError> {
        self.review_action(public_id, LifecycleAction::StartReview, comment)
    }

    /// Reviewer action: approve an application under review.
    pub fn approve(
        &self,
        public_id: &PublicApplicationId,
        comment: Option<String>,
    ) -> Result<Application, OnboardingError> {
        self.review_action(public_id, LifecycleAction::Approve, comment)
    }

    /// Reviewer action: reject an application under review.
    pub fn reject(
        &self,
        public_id: &PublicApplicationId,
        comment: Option<String>,
    ) -> Result<Application, OnboardingError> {
        self.review_action(public_id, LifecycleAction::Reject, comment)
    }

    /// Ledger entries for one application, oldest first.
    pub fn history(
        &self,
        public_id: &PublicApplicationId,
    ) -> Result<Vec<HistoryEntry>, OnboardingError> {
        let record = self.load(public_id)?;
        Ok(with_retry(self.retry, || {
            self.repository.history(record.key)
        })?)
    }

    pub fn gate_policy(&self) -> &GatePolicy {
        &self.policy
    }

    fn review_action(
        &self,
        public_id: &PublicApplicationId,
        action: LifecycleAction,
        comment: Option<String>,
    ) -> Result<Application, OnboardingError> {
        let mut record = self.load(public_id)?;
        let from = record.status;
        record.status = lifecycle::transition(from, action)?;
        record.updated_at = Utc::now();

        let stored = self.commit_transition(record, from, action, comment)?;
        info!(
            application_id = %stored.public_id.0,
            status = stored.status.label(),
            "reviewer action applied"
        );
        Ok(stored)
    }

    /// Persist a status change via compare-and-set, append exactly one
    /// ledger entry, then notify best-effort. A CAS conflict means another
    /// request won the race; report it as an illegal transition from the
    /// status that request produced.
    fn commit_transition(
        &self,
        record: Application,
        expected: ApplicationStatus,
        action: LifecycleAction,
        comment: Option<String>,
    ) -> Result<Application, OnboardingError> {
        let stored = match with_retry(self.retry, || {
            self.repository.update_if_status(record.clone(), expected)
        }) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                let current = self.load(&record.public_id)?;
                return Err(IllegalTransition::Action {
                    from: current.status,
                    action,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        let entry = HistoryEntry {
            application: stored.key,
            action,
            status: stored.status,
            comment,
            recorded_at: Utc::now(),
        };
        with_retry(self.retry, || {
            self.repository.append_history(entry.clone())
        })?;

        let notice = StatusNotice {
            application_id: stored.public_id.clone(),
            action,
            status: stored.status,
        };
        if let Err(err) = self.notifications.publish(notice) {
            warn!(
                application_id = %stored.public_id.0,
                error = %err,
                "status notification failed, transition stands"
            );
        }

        Ok(stored)
    }

    fn load(&self, public_id: &PublicApplicationId) -> Result<Application, OnboardingError> {
        with_retry(self.retry, || {
            self.repository.fetch_by_public_id(public_id)
        })?
        .ok_or(OnboardingError::NotFound)
    }
}

/// Error raised by the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// Unknown public id or resume token. Deliberately uniform: callers can
    /// never tell a bad token from a record that never existed.
    #[error("application not found")]
    NotFound,
    #[error("{0}")]
    Validation(ValidationReport),
    #[error(transparent)]
    Transition(#[from] IllegalTransition),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The blocking-pool task carrying a service call panicked or was
    /// cancelled before it produced a result.
    #[error("service task failed: {0}")]
    Worker(tokio::task::JoinError),
}
