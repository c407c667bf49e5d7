//! The application lifecycle and resumable-submission subsystem: draft
//! accumulation across the ten wizard steps, pause/resume via an opaque
//! token, and the reviewer-driven status lifecycle.

pub mod domain;
pub mod gate;
pub mod identifier;
pub mod lifecycle;
pub mod repository;
pub mod retry;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationFields, ApplicationKey, ApplicationStatus, ApplicationUpdate,
    BackgroundCheck, BusinessInfo, DocumentKind, DocumentReference, HistoryEntry, LocationInfo,
    OnboardingStep, PackageSelection, PersonalInfo, PublicApplicationId, ResumeToken,
    SignatureConsent,
};
pub use gate::{GatePolicy, PackageOffer, Requirement, UnmetRequirement, ValidationReport};
pub use lifecycle::{IllegalTransition, LifecycleAction};
pub use repository::{
    ApplicationRepository, ApplicationView, CreatedApplicationView, DraftPatch, HistoryEntryView,
    NewApplication, NotificationError, NotificationPublisher, RepositoryError, StatusNotice,
};
pub use retry::{with_retry, RetryPolicy};
pub use router::onboarding_router;
pub use service::{OnboardingError, OnboardingService, StepSaveOutcome};
