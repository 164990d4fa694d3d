use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::auth::{ensure_owner, ensure_read, ensure_staff, AuthorizationError, Caller};
use super::cooldown::{self, rejection_cooldown, CooldownStatus};
use super::domain::{
    ClientId, ServiceForm, ServiceKind, ServiceStatusRecord, ServiceStatusView, SubmissionStatus,
    ValidationError,
};
use super::repository::{
    ClientRepository, IntakeEvent, NotificationDispatcher, RepositoryError,
};

/// The status transition authority. Sole writer of per-service records:
/// every mutation re-derives legality from the authoritative record, never
/// from anything the client claims.
pub struct IntakeService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    cooldown_window: Duration,
}

impl<R, N> IntakeService<R, N>
where
    R: ClientRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self::with_cooldown(repository, notifications, rejection_cooldown())
    }

    pub fn with_cooldown(
        repository: Arc<R>,
        notifications: Arc<N>,
        cooldown_window: Duration,
    ) -> Self {
        Self {
            repository,
            notifications,
            cooldown_window,
        }
    }

    /// File a submission for one service track. Allowed from the initial
    /// state, after a validation (starts a fresh cycle), and after a
    /// rejection once the cooldown has elapsed. A record already pending
    /// review refuses a second submission.
    pub fn submit(
        &self,
        caller: &Caller,
        client_id: &ClientId,
        form: &ServiceForm,
        attachment_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ServiceStatusRecord, IntakeError> {
        ensure_owner(caller, client_id)?;

        let service = form.kind();
        form.validate()?;
        if attachment_ref.is_some() && !service.accepts_attachment() {
            return Err(ValidationError {
                field: "attachment_ref",
                message: format!("not accepted for the {} track", service.label()),
            }
            .into());
        }

        let current = self.current_record(client_id, service)?;
        match current.status {
            SubmissionStatus::Pending => {
                return Err(IntakeError::InvalidTransition {
                    service,
                    current: current.status,
                });
            }
            SubmissionStatus::Rejected => {
                let window = cooldown::evaluate(current.rejected_at, now, self.cooldown_window);
                if !window.eligible {
                    return Err(IntakeError::CooldownActive(window));
                }
            }
            SubmissionStatus::NotSubmitted | SubmissionStatus::Validated => {}
        }

        let next = ServiceStatusRecord::freshly_submitted(attachment_ref);
        let stored = self.write(client_id, service, current.status, next)?;
        self.dispatch(client_id, service, IntakeEvent::Submitted);
        Ok(stored)
    }

    /// Approve a pending submission. Re-validating an already validated
    /// record is a safe no-op so retries cannot double-fire.
    pub fn validate(
        &self,
        caller: &Caller,
        client_id: &ClientId,
        service: ServiceKind,
    ) -> Result<ServiceStatusRecord, IntakeError> {
        ensure_staff(caller)?;

        let current = self.current_record(client_id, service)?;
        match current.status {
            SubmissionStatus::Validated => Ok(current),
            SubmissionStatus::Pending => {
                let next = ServiceStatusRecord {
                    status: SubmissionStatus::Validated,
                    rejected_at: None,
                    rejection_reason: None,
                    ..current
                };
                let stored = self.write(client_id, service, SubmissionStatus::Pending, next)?;
                self.dispatch(client_id, service, IntakeEvent::Validated);
                Ok(stored)
            }
            _ => Err(IntakeError::InvalidTransition {
                service,
                current: current.status,
            }),
        }
    }

    /// Reject a pending submission with a mandatory reason. The rejection
    /// timestamp and reason are stamped together; re-rejecting keeps the
    /// original stamp rather than restarting the cooldown.
    pub fn reject(
        &self,
        caller: &Caller,
        client_id: &ClientId,
        service: ServiceKind,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ServiceStatusRecord, IntakeError> {
        ensure_staff(caller)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError {
                field: "reason",
                message: "must not be empty".to_string(),
            }
            .into());
        }

        let current = self.current_record(client_id, service)?;
        match current.status {
            SubmissionStatus::Rejected => Ok(current),
            SubmissionStatus::Pending => {
                let next = ServiceStatusRecord {
                    status: SubmissionStatus::Rejected,
                    rejected_at: Some(now),
                    rejection_reason: Some(reason.to_string()),
                    ..current
                };
                let stored = self.write(client_id, service, SubmissionStatus::Pending, next)?;
                self.dispatch(client_id, service, IntakeEvent::Rejected);
                Ok(stored)
            }
            _ => Err(IntakeError::InvalidTransition {
                service,
                current: current.status,
            }),
        }
    }

    /// Authoritative record plus a freshly evaluated cooldown. Eligibility
    /// moves with the wall clock, so nothing here is cached.
    pub fn record(
        &self,
        caller: &Caller,
        client_id: &ClientId,
        service: ServiceKind,
        now: DateTime<Utc>,
    ) -> Result<(ServiceStatusRecord, CooldownStatus), IntakeError> {
        ensure_read(caller, client_id)?;
        let record = self.current_record(client_id, service)?;
        let window = cooldown::evaluate(record.rejected_at, now, self.cooldown_window);
        Ok((record, window))
    }

    pub fn status_view(
        &self,
        caller: &Caller,
        client_id: &ClientId,
        service: ServiceKind,
        now: DateTime<Utc>,
    ) -> Result<ServiceStatusView, IntakeError> {
        let (record, window) = self.record(caller, client_id, service, now)?;
        Ok(record.status_view(service, &window))
    }

    /// Render a record against this service's cooldown window.
    pub fn view_of(
        &self,
        record: &ServiceStatusRecord,
        service: ServiceKind,
        now: DateTime<Utc>,
    ) -> ServiceStatusView {
        let window = cooldown::evaluate(record.rejected_at, now, self.cooldown_window);
        record.status_view(service, &window)
    }

    fn current_record(
        &self,
        client_id: &ClientId,
        service: ServiceKind,
    ) -> Result<ServiceStatusRecord, IntakeError> {
        let account = self
            .repository
            .fetch(client_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(account.services.record(service).clone())
    }

    /// Single conditional write. A concurrent writer that got there first
    /// shows up as a stale precondition, reported as an invalid transition
    /// naming the state that actually won.
    fn write(
        &self,
        client_id: &ClientId,
        service: ServiceKind,
        expected: SubmissionStatus,
        next: ServiceStatusRecord,
    ) -> Result<ServiceStatusRecord, IntakeError> {
        match self
            .repository
            .update_status(client_id, service, expected, next)
        {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::StaleStatus { actual }) => Err(IntakeError::InvalidTransition {
                service,
                current: actual,
            }),
            Err(other) => Err(other.into()),
        }
    }

    /// Best-effort notification: a failed dispatch is logged and swallowed,
    /// never unwinding the committed state change.
    fn dispatch(&self, client_id: &ClientId, service: ServiceKind, event: IntakeEvent) {
        if let Err(err) = self.notifications.notify(client_id, service, event) {
            warn!(
                client = %client_id,
                service = service.label(),
                event = event.label(),
                error = %err,
                "notification dispatch failed"
            );
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("operation not allowed while the {} record is {}", .service.label(), .current.label())]
    InvalidTransition {
        service: ServiceKind,
        current: SubmissionStatus,
    },
    #[error(
        "resubmission blocked for another {}h {:02}m",
        .0.remaining_hours(),
        .0.remaining_minutes()
    )]
    CooldownActive(CooldownStatus),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
