use std::collections::HashMap;
use std::sync::Mutex;

use tracing::info;

use super::domain::{ClientAccount, ClientId, ServiceKind, ServiceStatusRecord, SubmissionStatus};

/// Storage abstraction over the client aggregate. Status writes are
/// conditional on the status the caller last observed, so concurrent
/// reviewers racing on the same record cannot both win: the loser sees
/// `StaleStatus` instead of silently overwriting.
pub trait ClientRepository: Send + Sync {
    fn fetch(&self, id: &ClientId) -> Result<Option<ClientAccount>, RepositoryError>;

    fn update_status(
        &self,
        id: &ClientId,
        service: ServiceKind,
        expected: SubmissionStatus,
        next: ServiceStatusRecord,
    ) -> Result<ServiceStatusRecord, RepositoryError>;
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RepositoryError {
    #[error("client not found")]
    NotFound,
    #[error("record changed underneath this write; current status is {}", .actual.label())]
    StaleStatus { actual: SubmissionStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Events handed to the notification boundary after a state change commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeEvent {
    Submitted,
    Validated,
    Rejected,
}

impl IntakeEvent {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeEvent::Submitted => "submitted",
            IntakeEvent::Validated => "validated",
            IntakeEvent::Rejected => "rejected",
        }
    }
}

/// Outbound notification hook (email/WhatsApp adapters live behind this).
/// Dispatch is best-effort: the intake service logs failures and never rolls
/// back the committed state change.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(
        &self,
        client: &ClientId,
        service: ServiceKind,
        event: IntakeEvent,
    ) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Dispatcher that only records the event in the log stream. Stands in for
/// the real email/WhatsApp adapters in the demo binary.
#[derive(Debug, Default, Clone)]
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn notify(
        &self,
        client: &ClientId,
        service: ServiceKind,
        event: IntakeEvent,
    ) -> Result<(), DispatchError> {
        info!(client = %client, service = service.label(), event = event.label(), "intake notification");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistrationError {
    #[error("a client with this email is already registered")]
    DuplicateEmail,
    #[error("a client with this id is already registered")]
    DuplicateId,
}

/// Mutex-guarded map repository backing the demo binary and the test suite.
#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: Mutex<HashMap<ClientId, ClientAccount>>,
}

impl InMemoryClientRepository {
    pub fn register(&self, account: ClientAccount) -> Result<(), RegistrationError> {
        let mut guard = self.clients.lock().expect("client map mutex poisoned");
        if guard.contains_key(&account.id) {
            return Err(RegistrationError::DuplicateId);
        }
        if guard
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(RegistrationError::DuplicateEmail);
        }
        guard.insert(account.id.clone(), account);
        Ok(())
    }
}

impl ClientRepository for InMemoryClientRepository {
    fn fetch(&self, id: &ClientId) -> Result<Option<ClientAccount>, RepositoryError> {
        let guard = self.clients.lock().expect("client map mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_status(
        &self,
        id: &ClientId,
        service: ServiceKind,
        expected: SubmissionStatus,
        next: ServiceStatusRecord,
    ) -> Result<ServiceStatusRecord, RepositoryError> {
        let mut guard = self.clients.lock().expect("client map mutex poisoned");
        let account = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let record = account.services.record_mut(service);

        if record.status != expected {
            return Err(RepositoryError::StaleStatus {
                actual: record.status,
            });
        }

        *record = next;
        Ok(record.clone())
    }
}
