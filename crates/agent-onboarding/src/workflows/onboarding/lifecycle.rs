//! The application lifecycle as an explicit transition table. Every status
//! mutation in the workflow goes through [`transition`]; callers never write
//! a status directly, so illegal paths fail closed in one place.

use serde::{Deserialize, Serialize};

use super::domain::ApplicationStatus;

/// Actions that can move an application between lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Submit,
    StartReview,
    Approve,
    Reject,
}

impl LifecycleAction {
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleAction::Submit => "submit",
            LifecycleAction::StartReview => "start_review",
            LifecycleAction::Approve => "approve",
            LifecycleAction::Reject => "reject",
        }
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised whenever a caller attempts a mutation the current status does not
/// permit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalTransition {
    #[error("action '{action}' is not allowed while the application is {from}")]
    Action {
        from: ApplicationStatus,
        action: LifecycleAction,
    },
    #[error("application is {status} and can no longer be edited")]
    Locked { status: ApplicationStatus },
}

/// The full transition table. `draft` is only left via an explicit submit;
/// review outcomes are reviewer-driven; `approved` and `rejected` are
/// terminal with no reopen or resubmit path.
pub fn transition(
    from: ApplicationStatus,
    action: LifecycleAction,
) -> Result<ApplicationStatus, IllegalTransition> {
    match (from, action) {
        (ApplicationStatus::Draft, LifecycleAction::Submit) => Ok(ApplicationStatus::Submitted),
        (ApplicationStatus::Submitted, LifecycleAction::StartReview) => {
            Ok(ApplicationStatus::UnderReview)
        }
        (ApplicationStatus::UnderReview, LifecycleAction::Approve) => {
            Ok(ApplicationStatus::Approved)
        }
        (ApplicationStatus::UnderReview, LifecycleAction::Reject) => {
            Ok(ApplicationStatus::Rejected)
        }
        (from, action) => Err(IllegalTransition::Action { from, action }),
    }
}

/// Step saves are only legal while the application is still a draft.
pub fn ensure_editable(status: ApplicationStatus) -> Result<(), IllegalTransition> {
    if status == ApplicationStatus::Draft {
        Ok(())
    } else {
        Err(IllegalTransition::Locked { status })
    }
}
