use crate::infra::{InMemoryApplicationRepository, LoggingNotificationPublisher};
use agent_onboarding::error::AppError;
use agent_onboarding::workflows::onboarding::{
    ApplicationUpdate, ApplicationView, BackgroundCheck, BusinessInfo, DocumentKind,
    DocumentReference, GatePolicy, LocationInfo, OnboardingError, OnboardingService,
    OnboardingStep, PackageOffer, PackageSelection, PersonalInfo, SignatureConsent,
};
use chrono::SecondsFormat;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Package code to select during the package step
    #[arg(long, default_value = "standard")]
    pub(crate) package: String,
    /// Stop after submission instead of walking the review lifecycle
    #[arg(long)]
    pub(crate) skip_review: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        package,
        skip_review,
    } = args;

    let policy = GatePolicy::default();
    let Some(offer) = policy
        .packages
        .iter()
        .find(|offer| offer.code == package)
        .cloned()
    else {
        let offered: Vec<&str> = policy
            .packages
            .iter()
            .map(|offer| offer.code.as_str())
            .collect();
        println!(
            "Unknown package '{package}'. Offered packages: {}",
            offered.join(", ")
        );
        return Ok(());
    };

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifications = Arc::new(LoggingNotificationPublisher);
    let service = OnboardingService::new(repository, notifications, policy);

    println!("Agent onboarding demo");
    let record = service.create()?;
    println!(
        "- Opened draft {} (resume token {})",
        record.public_id.0, record.resume_token.0
    );

    match service.submit(&record.public_id) {
        Err(OnboardingError::Validation(report)) => {
            println!("- Premature submit refused: {report}");
        }
        Err(err) => println!("- Premature submit refused: {err}"),
        Ok(_) => println!("- Empty application was unexpectedly accepted"),
    }

    for (step, update) in demo_saves(offer) {
        let outcome = service.save_step(&record.public_id, step, update)?;
        println!(
            "- Saved step {} '{}' ({}) -> reached step {}",
            step.number(),
            step,
            if outcome.step_complete {
                "complete"
            } else {
                "incomplete"
            },
            outcome.application.last_step.number()
        );
        for unmet in &outcome.unmet {
            println!("    still missing: {}", unmet.requirement);
        }
    }

    let submitted = service.submit(&record.public_id)?;
    let submit_date = submitted
        .submit_date
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "unset".to_string());
    println!("- Submitted -> status {} at {}", submitted.status, submit_date);

    let resumed = service.resume(&record.resume_token)?;
    let view = ApplicationView::from_record(&resumed);
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("- Resume payload:\n{json}"),
        Err(err) => println!("- Resume payload unavailable: {err}"),
    }

    if skip_review {
        return Ok(());
    }

    println!("\nReviewer walkthrough");
    let under_review = service.start_review(
        &record.public_id,
        Some("assigned to onboarding desk".to_string()),
    )?;
    println!("- Review started -> status {}", under_review.status);
    let approved = service.approve(
        &record.public_id,
        Some("requirements verified".to_string()),
    )?;
    println!("- Decision -> status {}", approved.status);

    println!("\nLifecycle ledger");
    for entry in service.history(&record.public_id)? {
        println!(
            "- {} {} -> {} ({})",
            entry.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.action.label(),
            entry.status.label(),
            entry.comment.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn demo_saves(offer: PackageOffer) -> Vec<(OnboardingStep, ApplicationUpdate)> {
    vec![
        (
            OnboardingStep::Personal,
            ApplicationUpdate {
                personal: Some(PersonalInfo {
                    first_name: "Juan".to_string(),
                    last_name: "Dela Cruz".to_string(),
                    email: "juan.delacruz@example.ph".to_string(),
                    mobile_number: Some("+639181234567".to_string()),
                    birth_date: None,
                }),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Background,
            ApplicationUpdate {
                background: Some(BackgroundCheck {
                    has_criminal_record: Some(false),
                    has_pending_case: Some(false),
                    previously_terminated_as_agent: Some(false),
                }),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Business,
            ApplicationUpdate {
                business: Some(BusinessInfo {
                    business_name: "Dela Cruz Trading".to_string(),
                    nature_of_business: "General merchandise".to_string(),
                    tin: Some("987-654-321-000".to_string()),
                    years_operating: Some(6),
                }),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Location,
            ApplicationUpdate {
                location: Some(LocationInfo {
                    region: "Region IV-A".to_string(),
                    province: "Laguna".to_string(),
                    city: "Calamba".to_string(),
                    barangay: "Real".to_string(),
                    street_address: "45 Rizal Ave".to_string(),
                    postal_code: Some("4027".to_string()),
                    latitude: Some(14.2117),
                    longitude: Some(121.1653),
                }),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Package,
            ApplicationUpdate {
                package: Some(PackageSelection {
                    code: offer.code,
                    fee: offer.fee,
                }),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Documents,
            ApplicationUpdate {
                documents: Some(vec![
                    DocumentReference {
                        kind: DocumentKind::ValidId,
                        file_name: "drivers-license.jpg".to_string(),
                        storage_key: "demo/drivers-license.jpg".to_string(),
                    },
                    DocumentReference {
                        kind: DocumentKind::ProofOfBilling,
                        file_name: "water-bill.pdf".to_string(),
                        storage_key: "demo/water-bill.pdf".to_string(),
                    },
                    DocumentReference {
                        kind: DocumentKind::BusinessPermit,
                        file_name: "mayors-permit.pdf".to_string(),
                        storage_key: "demo/mayors-permit.pdf".to_string(),
                    },
                ]),
                ..Default::default()
            },
        ),
        (
            OnboardingStep::Signature,
            ApplicationUpdate {
                signature: Some(SignatureConsent {
                    terms_accepted: true,
                    signature_key: Some("demo/signature.png".to_string()),
                }),
                ..Default::default()
            },
        ),
    ]
}
