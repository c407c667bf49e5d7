use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::lifecycle::LifecycleAction;

/// Internal surrogate key, assigned once by the repository and used for all
/// internal references (history entries, admin tooling). Never shown to
/// applicants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationKey(pub u64);

/// Public-facing opaque identifier, safe to display in URLs and support
/// screens. Possession does not grant resume capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicApplicationId(pub String);

/// High-entropy secret granting cross-device resume access to an
/// application. Issued once at creation and only ever returned by the
/// create response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResumeToken(pub String);

/// Lifecycle status tracked throughout the onboarding workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Terminal states admit no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved | ApplicationStatus::Rejected
        )
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The fixed linear sequence of wizard steps. There is no branching; the
/// numbering is the wire format used by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Welcome,
    Personal,
    Background,
    Business,
    Location,
    Package,
    Documents,
    Signature,
    Review,
    Confirmation,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 10] = [
        OnboardingStep::Welcome,
        OnboardingStep::Personal,
        OnboardingStep::Background,
        OnboardingStep::Business,
        OnboardingStep::Location,
        OnboardingStep::Package,
        OnboardingStep::Documents,
        OnboardingStep::Signature,
        OnboardingStep::Review,
        OnboardingStep::Confirmation,
    ];

    pub const fn number(self) -> u8 {
        match self {
            OnboardingStep::Welcome => 1,
            OnboardingStep::Personal => 2,
            OnboardingStep::Background => 3,
            OnboardingStep::Business => 4,
            OnboardingStep::Location => 5,
            OnboardingStep::Package => 6,
            OnboardingStep::Documents => 7,
            OnboardingStep::Signature => 8,
            OnboardingStep::Review => 9,
            OnboardingStep::Confirmation => 10,
        }
    }

    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(OnboardingStep::Welcome),
            2 => Some(OnboardingStep::Personal),
            3 => Some(OnboardingStep::Background),
            4 => Some(OnboardingStep::Business),
            5 => Some(OnboardingStep::Location),
            6 => Some(OnboardingStep::Package),
            7 => Some(OnboardingStep::Documents),
            8 => Some(OnboardingStep::Signature),
            9 => Some(OnboardingStep::Review),
            10 => Some(OnboardingStep::Confirmation),
            _ => None,
        }
    }

    pub const fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub const fn label(self) -> &'static str {
        match self {
            OnboardingStep::Welcome => "welcome",
            OnboardingStep::Personal => "personal",
            OnboardingStep::Background => "background",
            OnboardingStep::Business => "business",
            OnboardingStep::Location => "location",
            OnboardingStep::Package => "package",
            OnboardingStep::Documents => "documents",
            OnboardingStep::Signature => "signature",
            OnboardingStep::Review => "review",
            OnboardingStep::Confirmation => "confirmation",
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Personal details collected at the start of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

/// The three declarative yes/no screening questions. `None` means the
/// applicant has not answered yet; either answer satisfies the step gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackgroundCheck {
    #[serde(default)]
    pub has_criminal_record: Option<bool>,
    #[serde(default)]
    pub has_pending_case: Option<bool>,
    #[serde(default)]
    pub previously_terminated_as_agent: Option<bool>,
}

/// Business profile of the prospective agent outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub business_name: String,
    pub nature_of_business: String,
    #[serde(default)]
    pub tin: Option<String>,
    #[serde(default)]
    pub years_operating: Option<u8>,
}

/// Address object stored verbatim; geographic consistency is the reference
/// service's concern, not ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub region: String,
    pub province: String,
    pub city: String,
    pub barangay: String,
    pub street_address: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// The service package the applicant signed up for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSelection {
    pub code: String,
    pub fee: u32,
}

/// Document kinds the onboarding flow understands. Which of these are
/// required is a [`super::gate::GatePolicy`] concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ValidId,
    ProofOfBilling,
    BusinessPermit,
    BankStatement,
    Photo,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::ValidId => "valid_id",
            DocumentKind::ProofOfBilling => "proof_of_billing",
            DocumentKind::BusinessPermit => "business_permit",
            DocumentKind::BankStatement => "bank_statement",
            DocumentKind::Photo => "photo",
        }
    }
}

/// Pointer to an uploaded document; the upload mechanics live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub kind: DocumentKind,
    pub file_name: String,
    pub storage_key: String,
}

/// Terms acceptance plus the captured signature artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureConsent {
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub signature_key: Option<String>,
}

/// Everything the wizard accumulates, one optional sub-structure per data
/// step. A section stays `None` until its step is first saved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationFields {
    #[serde(default)]
    pub personal: Option<PersonalInfo>,
    #[serde(default)]
    pub background: Option<BackgroundCheck>,
    #[serde(default)]
    pub business: Option<BusinessInfo>,
    #[serde(default)]
    pub location: Option<LocationInfo>,
    #[serde(default)]
    pub package: Option<PackageSelection>,
    #[serde(default)]
    pub documents: Option<Vec<DocumentReference>>,
    #[serde(default)]
    pub signature: Option<SignatureConsent>,
}

/// Partial payload for a step save. Each present section replaces the stored
/// section wholesale; absent sections are left untouched, so re-applying the
/// same payload is idempotent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(default)]
    pub personal: Option<PersonalInfo>,
    #[serde(default)]
    pub background: Option<BackgroundCheck>,
    #[serde(default)]
    pub business: Option<BusinessInfo>,
    #[serde(default)]
    pub location: Option<LocationInfo>,
    #[serde(default)]
    pub package: Option<PackageSelection>,
    #[serde(default)]
    pub documents: Option<Vec<DocumentReference>>,
    #[serde(default)]
    pub signature: Option<SignatureConsent>,
}

/// The central aggregate: one application per applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub key: ApplicationKey,
    pub public_id: PublicApplicationId,
    pub resume_token: ResumeToken,
    pub status: ApplicationStatus,
    pub last_step: OnboardingStep,
    pub fields: ApplicationFields,
    pub submit_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Merge a partial payload into the accumulated fields. Only sections
    /// present in the update are overwritten.
    pub fn apply_update(&mut self, update: ApplicationUpdate) {
        let ApplicationUpdate {
            personal,
            background,
            business,
            location,
            package,
            documents,
            signature,
        } = update;

        if let Some(personal) = personal {
            self.fields.personal = Some(personal);
        }
        if let Some(background) = background {
            self.fields.background = Some(background);
        }
        if let Some(business) = business {
            self.fields.business = Some(business);
        }
        if let Some(location) = location {
            self.fields.location = Some(location);
        }
        if let Some(package) = package {
            self.fields.package = Some(package);
        }
        if let Some(documents) = documents {
            self.fields.documents = Some(documents);
        }
        if let Some(signature) = signature {
            self.fields.signature = Some(signature);
        }
    }

    /// Advance the step watermark, never moving it backwards. Revisiting an
    /// earlier step leaves the watermark where it was.
    pub fn advance_last_step(&mut self, reached: OnboardingStep) {
        if reached > self.last_step {
            self.last_step = reached;
        }
    }
}

/// One append-only ledger row per lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub application: ApplicationKey,
    pub action: LifecycleAction,
    pub status: ApplicationStatus,
    pub comment: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
