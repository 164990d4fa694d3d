use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cooldown::CooldownStatus;

/// Identifier wrapper for registered clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three independent application tracks offered by the practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Equivalence,
    Residence,
    Partner,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::Equivalence,
        ServiceKind::Residence,
        ServiceKind::Partner,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ServiceKind::Equivalence => "equivalence",
            ServiceKind::Residence => "residence",
            ServiceKind::Partner => "partner",
        }
    }

    /// Whether submissions for this track may carry an uploaded artifact.
    pub const fn accepts_attachment(self) -> bool {
        matches!(self, ServiceKind::Equivalence | ServiceKind::Residence)
    }
}

impl FromStr for ServiceKind {
    type Err = UnknownServiceKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "equivalence" => Ok(ServiceKind::Equivalence),
            "residence" => Ok(ServiceKind::Residence),
            "partner" => Ok(ServiceKind::Partner),
            other => Err(UnknownServiceKind {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown service track '{value}'")]
pub struct UnknownServiceKind {
    pub value: String,
}

/// Adjudication state of one client's submission for one service track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    NotSubmitted,
    Pending,
    Validated,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::NotSubmitted => "not_submitted",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Validated => "validated",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// Per-service status record. `submitted` is monotonic ("has ever
/// submitted"); `rejected_at` and `status == Rejected` always move together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatusRecord {
    pub submitted: bool,
    pub status: SubmissionStatus,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub attachment_ref: Option<String>,
}

impl ServiceStatusRecord {
    /// The state a record takes on any fresh submission: rejection metadata
    /// is cleared atomically with the status change.
    pub fn freshly_submitted(attachment_ref: Option<String>) -> Self {
        Self {
            submitted: true,
            status: SubmissionStatus::Pending,
            rejected_at: None,
            rejection_reason: None,
            attachment_ref,
        }
    }

    pub fn status_view(&self, service: ServiceKind, cooldown: &CooldownStatus) -> ServiceStatusView {
        let cooldown = if self.status == SubmissionStatus::Rejected && !cooldown.eligible {
            Some(CooldownView {
                hours: cooldown.remaining_hours(),
                minutes: cooldown.remaining_minutes(),
            })
        } else {
            None
        };

        ServiceStatusView {
            service: service.label(),
            submitted: self.submitted,
            status: self.status.label(),
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason.clone(),
            cooldown,
        }
    }
}

/// One record per service track, embedded in the client aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatuses {
    pub equivalence: ServiceStatusRecord,
    pub residence: ServiceStatusRecord,
    pub partner: ServiceStatusRecord,
}

impl ServiceStatuses {
    pub fn record(&self, service: ServiceKind) -> &ServiceStatusRecord {
        match service {
            ServiceKind::Equivalence => &self.equivalence,
            ServiceKind::Residence => &self.residence,
            ServiceKind::Partner => &self.partner,
        }
    }

    pub fn record_mut(&mut self, service: ServiceKind) -> &mut ServiceStatusRecord {
        match service {
            ServiceKind::Equivalence => &mut self.equivalence,
            ServiceKind::Residence => &mut self.residence,
            ServiceKind::Partner => &mut self.partner,
        }
    }
}

/// Single-use email verification token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("no verification is pending for this account")]
    NoPendingVerification,
    #[error("verification token does not match")]
    TokenMismatch,
    #[error("verification token has expired")]
    TokenExpired,
}

/// Aggregate root for a registered client. Only the intake service mutates
/// the embedded per-service records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAccount {
    pub id: ClientId,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub verification: Option<VerificationToken>,
    pub services: ServiceStatuses,
}

impl ClientAccount {
    /// A new account starts with all three tracks untouched.
    pub fn new(id: ClientId, email: &str, full_name: &str, password_hash: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            password_hash: password_hash.to_string(),
            email_verified: false,
            verification: None,
            services: ServiceStatuses::default(),
        }
    }

    pub fn issue_verification_token(&mut self, token: &str, expires_at: DateTime<Utc>) {
        self.verification = Some(VerificationToken {
            token: token.to_string(),
            expires_at,
        });
    }

    /// Consume the pending token. Success marks the email verified and nulls
    /// the token; any failure leaves the account untouched.
    pub fn verify_email(
        &mut self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let pending = self
            .verification
            .as_ref()
            .ok_or(VerificationError::NoPendingVerification)?;

        if pending.token != token {
            return Err(VerificationError::TokenMismatch);
        }
        if now >= pending.expires_at {
            return Err(VerificationError::TokenExpired);
        }

        self.email_verified = true;
        self.verification = None;
        Ok(())
    }
}

/// Submission payload, tagged by service track so a payload can never be
/// filed against the wrong record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum ServiceForm {
    Equivalence(EquivalenceForm),
    Residence(ResidenceForm),
    Partner(PartnerForm),
}

impl ServiceForm {
    pub const fn kind(&self) -> ServiceKind {
        match self {
            ServiceForm::Equivalence(_) => ServiceKind::Equivalence,
            ServiceForm::Residence(_) => ServiceKind::Residence,
            ServiceForm::Partner(_) => ServiceKind::Partner,
        }
    }

    /// Check service-specific required fields, reporting the first offending
    /// field by name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ServiceForm::Equivalence(form) => {
                require("diploma_title", &form.diploma_title)?;
                require("institution", &form.institution)?;
                require("country", &form.country)?;
            }
            ServiceForm::Residence(form) => {
                require("current_country", &form.current_country)?;
                require("passport_number", &form.passport_number)?;
            }
            ServiceForm::Partner(form) => {
                require("agency_name", &form.agency_name)?;
                require("registration_number", &form.registration_number)?;
                require("city", &form.city)?;
            }
        }
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Diploma equivalence application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceForm {
    pub diploma_title: String,
    pub institution: String,
    pub graduation_year: u16,
    pub country: String,
}

/// Permanent residence application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidenceForm {
    pub current_country: String,
    pub passport_number: String,
    #[serde(default)]
    pub intended_arrival: Option<String>,
}

/// Travel-agency partnership application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerForm {
    pub agency_name: String,
    pub registration_number: String,
    pub city: String,
}

/// Field-level payload error, surfaced with the offending field name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{field} {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

/// Externally observable shape of one per-service record. The cooldown block
/// is recomputed on every read and present only while resubmission is still
/// blocked.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatusView {
    pub service: &'static str,
    pub submitted: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<CooldownView>,
}

/// Remaining cooldown, floored to whole hours and minutes for display.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CooldownView {
    pub hours: i64,
    pub minutes: i64,
}
