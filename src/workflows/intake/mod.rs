//! Per-service application intake: submission, review, and the rejection
//! cooldown that gates resubmission.
//!
//! Each client carries one independent status record per service track. The
//! [`service::IntakeService`] is the only writer of those records; the
//! [`overlay::OptimisticOverlay`] is a presentation-side cache that is never
//! consulted for business decisions.

pub mod auth;
pub mod cooldown;
pub mod domain;
pub mod overlay;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{AuthorizationError, Caller, StaffId};
pub use cooldown::{rejection_cooldown, CooldownStatus, REJECTION_COOLDOWN_HOURS};
pub use domain::{
    ClientAccount, ClientId, EquivalenceForm, PartnerForm, ResidenceForm, ServiceForm,
    ServiceKind, ServiceStatusRecord, ServiceStatusView, ServiceStatuses, SubmissionStatus,
    ValidationError, VerificationError, VerificationToken,
};
pub use overlay::OptimisticOverlay;
pub use repository::{
    ClientRepository, DispatchError, InMemoryClientRepository, IntakeEvent,
    NotificationDispatcher, RegistrationError, RepositoryError, TracingDispatcher,
};
pub use router::intake_router;
pub use service::{IntakeError, IntakeService};
