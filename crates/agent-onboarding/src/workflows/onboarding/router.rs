use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Application, ApplicationUpdate, OnboardingStep, PublicApplicationId, ResumeToken,
};
use super::lifecycle::LifecycleAction;
use super::repository::{
    ApplicationRepository, ApplicationView, CreatedApplicationView, HistoryEntryView,
    NotificationPublisher, RepositoryError,
};
use super::service::{OnboardingError, OnboardingService};

/// Router builder exposing the onboarding wizard endpoints.
pub fn onboarding_router<R, N>(service: Arc<OnboardingService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/onboarding/applications",
            post(create_handler::<R, N>),
        )
        .route(
            "/api/v1/onboarding/applications/:application_id",
            get(fetch_handler::<R, N>),
        )
        .route(
            "/api/v1/onboarding/resume/:resume_token",
            get(resume_handler::<R, N>),
        )
        .route(
            "/api/v1/onboarding/applications/:application_id/steps/:step",
            put(save_step_handler::<R, N>),
        )
        .route(
            "/api/v1/onboarding/applications/:application_id/submit",
            post(submit_handler::<R, N>),
        )
        .route(
            "/api/v1/onboarding/applications/:application_id/review",
            post(review_handler::<R, N>),
        )
        .route(
            "/api/v1/onboarding/applications/:application_id/history",
            get(history_handler::<R, N>),
        )
        .with_state(service)
}

/// Reviewer action payload. `submit` is not a reviewer action and has its
/// own endpoint.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: LifecycleAction,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Service calls hit the store synchronously and may sleep in the retry
/// wrapper, so they run on the blocking pool instead of a runtime worker.
async fn run_blocking<T>(
    task: impl FnOnce() -> Result<T, OnboardingError> + Send + 'static,
) -> Result<T, OnboardingError>
where
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(err) => Err(OnboardingError::Worker(err)),
    }
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match run_blocking(move || service.create()).await {
        Ok(record) => {
            let view = CreatedApplicationView::from_record(&record);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn fetch_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = PublicApplicationId(application_id);
    match run_blocking(move || service.get(&id)).await {
        Ok(record) => {
            let view = ApplicationView::from_record(&record);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resume_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
    Path(resume_token): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let token = ResumeToken(resume_token);
    match run_blocking(move || service.resume(&token)).await {
        Ok(record) => {
            let view = ApplicationView::from_record(&record);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn save_step_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
    Path((application_id, step)): Path<(String, u8)>,
    axum::Json(update): axum::Json<ApplicationUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(step) = OnboardingStep::from_number(step) else {
        let payload = json!({ "error": format!("unknown step number {step}") });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    };

    let id = PublicApplicationId(application_id);
    match run_blocking(move || service.save_step(&id, step, update)).await {
        Ok(outcome) => {
            let payload = json!({
                "step": outcome.step.label(),
                "step_complete": outcome.step_complete,
                "unmet": outcome.unmet,
                "application": ApplicationView::from_record(&outcome.application),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = PublicApplicationId(application_id);
    match run_blocking(move || service.submit(&id)).await {
        Ok(record) => {
            let view = ApplicationView::from_record(&record);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = PublicApplicationId(application_id);
    let ReviewRequest { action, comment } = request;
    let call: fn(
        &OnboardingService<R, N>,
        &PublicApplicationId,
        Option<String>,
    ) -> Result<Application, OnboardingError> = match action {
        LifecycleAction::StartReview => OnboardingService::start_review,
        LifecycleAction::Approve => OnboardingService::approve,
        LifecycleAction::Reject => OnboardingService::reject,
        LifecycleAction::Submit => {
            let payload = json!({ "error": "submit is not a reviewer action" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match run_blocking(move || call(&service, &id, comment)).await {
        Ok(record) => {
            let view = ApplicationView::from_record(&record);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<OnboardingService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = PublicApplicationId(application_id);
    match run_blocking(move || service.history(&id)).await {
        Ok(entries) => {
            let views: Vec<HistoryEntryView> =
                entries.iter().map(HistoryEntryView::from_entry).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Shared error mapping. Not-found stays generic so a near-miss resume
/// token is indistinguishable from an id that never existed.
fn error_response(err: OnboardingError) -> Response {
    match err {
        OnboardingError::NotFound => {
            let payload = json!({ "error": "application not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        OnboardingError::Validation(report) => {
            let payload = json!({
                "error": "application data is incomplete",
                "incomplete_steps": report
                    .incomplete_steps()
                    .iter()
                    .map(|step| step.label())
                    .collect::<Vec<_>>(),
                "unmet": report.unmet,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        OnboardingError::Transition(transition) => {
            let payload = json!({ "error": transition.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        OnboardingError::Repository(RepositoryError::Unavailable(_)) => {
            let payload = json!({ "error": "storage temporarily unavailable" });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
        OnboardingError::Repository(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        OnboardingError::Worker(err) => {
            tracing::error!(error = %err, "service task failed");
            let payload = json!({ "error": "internal service error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
