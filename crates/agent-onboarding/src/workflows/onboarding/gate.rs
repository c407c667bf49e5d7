//! Pure step-completion predicates. The gate never mutates state: it reads
//! the accumulated fields and reports which requirements are still unmet, so
//! the UI can guide the applicant and the service can refuse a premature
//! submit.

use serde::Serialize;

use super::domain::{ApplicationFields, DocumentKind, OnboardingStep};

/// A single unmet condition, addressed to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    FirstName,
    LastName,
    EmailAddress,
    CriminalRecordAnswer,
    PendingCaseAnswer,
    PriorTerminationAnswer,
    BusinessName,
    NatureOfBusiness,
    Region,
    Province,
    City,
    Barangay,
    StreetAddress,
    MapCoordinates,
    PackageSelected,
    PackageKnown,
    PackageFeeMatches,
    RequiredDocument(DocumentKind),
    TermsAccepted,
    SignatureCaptured,
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requirement::FirstName => write!(f, "first name is required"),
            Requirement::LastName => write!(f, "last name is required"),
            Requirement::EmailAddress => write!(f, "a valid email address is required"),
            Requirement::CriminalRecordAnswer => {
                write!(f, "the criminal record question must be answered")
            }
            Requirement::PendingCaseAnswer => {
                write!(f, "the pending case question must be answered")
            }
            Requirement::PriorTerminationAnswer => {
                write!(f, "the prior termination question must be answered")
            }
            Requirement::BusinessName => write!(f, "business name is required"),
            Requirement::NatureOfBusiness => write!(f, "nature of business is required"),
            Requirement::Region => write!(f, "region is required"),
            Requirement::Province => write!(f, "province is required"),
            Requirement::City => write!(f, "city or municipality is required"),
            Requirement::Barangay => write!(f, "barangay is required"),
            Requirement::StreetAddress => write!(f, "street address is required"),
            Requirement::MapCoordinates => write!(f, "a map pin (latitude/longitude) is required"),
            Requirement::PackageSelected => write!(f, "a service package must be selected"),
            Requirement::PackageKnown => write!(f, "the selected package code is not offered"),
            Requirement::PackageFeeMatches => {
                write!(f, "the quoted fee does not match the selected package")
            }
            Requirement::RequiredDocument(kind) => {
                write!(f, "required document '{}' has not been uploaded", kind.label())
            }
            Requirement::TermsAccepted => write!(f, "the terms and conditions must be accepted"),
            Requirement::SignatureCaptured => write!(f, "a signature must be captured"),
        }
    }
}

/// An unmet requirement tagged with the step that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmetRequirement {
    pub step: OnboardingStep,
    pub requirement: Requirement,
}

/// The full pre-submission verdict: every unmet requirement across every
/// step, in step order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub unmet: Vec<UnmetRequirement>,
}

impl ValidationReport {
    /// Distinct incomplete steps, in wizard order.
    pub fn incomplete_steps(&self) -> Vec<OnboardingStep> {
        let mut steps: Vec<OnboardingStep> = Vec::new();
        for entry in &self.unmet {
            if !steps.contains(&entry.step) {
                steps.push(entry.step);
            }
        }
        steps
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<&'static str> = self
            .incomplete_steps()
            .into_iter()
            .map(OnboardingStep::label)
            .collect();
        write!(f, "incomplete steps: {}", steps.join(", "))
    }
}

/// One catalog entry the package step can legally select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOffer {
    pub code: String,
    pub fee: u32,
}

/// Policy dials backing the gate: the package catalog and which document
/// kinds the document subsystem flags as required.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub packages: Vec<PackageOffer>,
    pub required_documents: Vec<DocumentKind>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            packages: vec![
                PackageOffer {
                    code: "starter".to_string(),
                    fee: 1500,
                },
                PackageOffer {
                    code: "standard".to_string(),
                    fee: 3500,
                },
                PackageOffer {
                    code: "premium".to_string(),
                    fee: 7500,
                },
            ],
            required_documents: vec![
                DocumentKind::ValidId,
                DocumentKind::ProofOfBilling,
                DocumentKind::BusinessPermit,
            ],
        }
    }
}

/// Unmet requirements for one step. Empty means the step is complete.
pub fn step_requirements(
    step: OnboardingStep,
    fields: &ApplicationFields,
    policy: &GatePolicy,
) -> Vec<UnmetRequirement> {
    let requirements = match step {
        // Informational steps carry no data.
        OnboardingStep::Welcome | OnboardingStep::Confirmation => Vec::new(),
        OnboardingStep::Personal => personal_requirements(fields),
        OnboardingStep::Background => background_requirements(fields),
        OnboardingStep::Business => business_requirements(fields),
        OnboardingStep::Location => location_requirements(fields),
        OnboardingStep::Package => package_requirements(fields, policy),
        OnboardingStep::Documents => document_requirements(fields, policy),
        OnboardingStep::Signature => signature_requirements(fields),
        OnboardingStep::Review => {
            return full_application_requirements(fields, policy);
        }
    };

    requirements
        .into_iter()
        .map(|requirement| UnmetRequirement { step, requirement })
        .collect()
}

pub fn step_complete(step: OnboardingStep, fields: &ApplicationFields, policy: &GatePolicy) -> bool {
    step_requirements(step, fields, policy).is_empty()
}

/// The pre-submission check: every data step's gate must pass.
pub fn submission_check(
    fields: &ApplicationFields,
    policy: &GatePolicy,
) -> Result<(), ValidationReport> {
    let unmet = full_application_requirements(fields, policy);
    if unmet.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { unmet })
    }
}

fn full_application_requirements(
    fields: &ApplicationFields,
    policy: &GatePolicy,
) -> Vec<UnmetRequirement> {
    OnboardingStep::ALL
        .into_iter()
        .filter(|step| *step < OnboardingStep::Review)
        .flat_map(|step| step_requirements(step, fields, policy))
        .collect()
}

fn personal_requirements(fields: &ApplicationFields) -> Vec<Requirement> {
    let mut unmet = Vec::new();
    match &fields.personal {
        Some(personal) => {
            if personal.first_name.trim().is_empty() {
                unmet.push(Requirement::FirstName);
            }
            if personal.last_name.trim().is_empty() {
                unmet.push(Requirement::LastName);
            }
            if !email_is_valid(&personal.email) {
                unmet.push(Requirement::EmailAddress);
            }
        }
        None => {
            unmet.push(Requirement::FirstName);
            unmet.push(Requirement::LastName);
            unmet.push(Requirement::EmailAddress);
        }
    }
    unmet
}

fn background_requirements(fields: &ApplicationFields) -> Vec<Requirement> {
    let background = fields.background.unwrap_or_default();
    let mut unmet = Vec::new();
    if background.has_criminal_record.is_none() {
        unmet.push(Requirement::CriminalRecordAnswer);
    }
    if background.has_pending_case.is_none() {
        unmet.push(Requirement::PendingCaseAnswer);
    }
    if background.previously_terminated_as_agent.is_none() {
        unmet.push(Requirement::PriorTerminationAnswer);
    }
    unmet
}

fn business_requirements(fields: &ApplicationFields) -> Vec<Requirement> {
    let mut unmet = Vec::new();
    match &fields.business {
        Some(business) => {
            if business.business_name.trim().is_empty() {
                unmet.push(Requirement::BusinessName);
            }
            if business.nature_of_business.trim().is_empty() {
                unmet.push(Requirement::NatureOfBusiness);
            }
        }
        None => {
            unmet.push(Requirement::BusinessName);
            unmet.push(Requirement::NatureOfBusiness);
        }
    }
    unmet
}

fn location_requirements(fields: &ApplicationFields) -> Vec<Requirement> {
    let Some(location) = &fields.location else {
        return vec![
            Requirement::Region,
            Requirement::Province,
            Requirement::City,
            Requirement::Barangay,
            Requirement::StreetAddress,
            Requirement::MapCoordinates,
        ];
    };

    let mut unmet = Vec::new();
    if location.region.trim().is_empty() {
        unmet.push(Requirement::Region);
    }
    if location.province.trim().is_empty() {
        unmet.push(Requirement::Province);
    }
    if location.city.trim().is_empty() {
        unmet.push(Requirement::City);
    }
    if location.barangay.trim().is_empty() {
        unmet.push(Requirement::Barangay);
    }
    if location.street_address.trim().is_empty() {
        unmet.push(Requirement::StreetAddress);
    }
    if location.latitude.is_none() || location.longitude.is_none() {
        unmet.push(Requirement::MapCoordinates);
    }
    unmet
}

fn package_requirements(fields: &ApplicationFields, policy: &GatePolicy) -> Vec<Requirement> {
    let Some(selection) = &fields.package else {
        return vec![Requirement::PackageSelected];
    };

    match policy
        .packages
        .iter()
        .find(|offer| offer.code == selection.code)
    {
        Some(offer) if offer.fee == selection.fee => Vec::new(),
        Some(_) => vec![Requirement::PackageFeeMatches],
        None => vec![Requirement::PackageKnown],
    }
}

fn document_requirements(fields: &ApplicationFields, policy: &GatePolicy) -> Vec<Requirement> {
    let uploaded = fields.documents.as_deref().unwrap_or(&[]);
    policy
        .required_documents
        .iter()
        .filter(|kind| !uploaded.iter().any(|doc| doc.kind == **kind))
        .map(|kind| Requirement::RequiredDocument(*kind))
        .collect()
}

fn signature_requirements(fields: &ApplicationFields) -> Vec<Requirement> {
    let signature = fields.signature.clone().unwrap_or_default();
    let mut unmet = Vec::new();
    if !signature.terms_accepted {
        unmet.push(Requirement::TermsAccepted);
    }
    let captured = signature
        .signature_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());
    if !captured {
        unmet.push(Requirement::SignatureCaptured);
    }
    unmet
}

/// Syntactic email check only: one `@`, non-empty local part, and a dotted
/// domain. Deliverability is not this layer's business.
fn email_is_valid(raw: &str) -> bool {
    let value = raw.trim();
    if value.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let Some((head, tail)) = domain.rsplit_once('.') else {
        return false;
    };
    !head.is_empty() && !tail.is_empty()
}
