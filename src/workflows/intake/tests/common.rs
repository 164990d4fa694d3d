use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::intake::auth::{Caller, StaffId};
use crate::workflows::intake::domain::{
    ClientAccount, ClientId, EquivalenceForm, PartnerForm, ResidenceForm, ServiceForm,
    ServiceKind, ServiceStatusRecord, SubmissionStatus,
};
use crate::workflows::intake::repository::{
    ClientRepository, DispatchError, InMemoryClientRepository, IntakeEvent,
    NotificationDispatcher, RepositoryError,
};
use crate::workflows::intake::service::IntakeService;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).single().expect("valid instant")
}

pub(super) fn client_id() -> ClientId {
    ClientId("c-100".to_string())
}

pub(super) fn other_client_id() -> ClientId {
    ClientId("c-200".to_string())
}

pub(super) fn owner() -> Caller {
    Caller::Client(client_id())
}

pub(super) fn staff() -> Caller {
    Caller::Staff(StaffId("agent-7".to_string()))
}

pub(super) fn residence_form() -> ServiceForm {
    ServiceForm::Residence(ResidenceForm {
        current_country: "Algeria".to_string(),
        passport_number: "P-4418822".to_string(),
        intended_arrival: Some("2026-06".to_string()),
    })
}

pub(super) fn equivalence_form() -> ServiceForm {
    ServiceForm::Equivalence(EquivalenceForm {
        diploma_title: "Licence en informatique".to_string(),
        institution: "USTHB".to_string(),
        graduation_year: 2021,
        country: "Algeria".to_string(),
    })
}

pub(super) fn partner_form() -> ServiceForm {
    ServiceForm::Partner(PartnerForm {
        agency_name: "Horizon Voyages".to_string(),
        registration_number: "RC-2207-B".to_string(),
        city: "Oran".to_string(),
    })
}

pub(super) fn registered_repository() -> Arc<InMemoryClientRepository> {
    let repository = Arc::new(InMemoryClientRepository::default());
    repository
        .register(ClientAccount::new(
            client_id(),
            "amina@example.com",
            "Amina B.",
            "argon2-hash",
        ))
        .expect("seed client registers");
    repository
        .register(ClientAccount::new(
            other_client_id(),
            "karim@example.com",
            "Karim L.",
            "argon2-hash",
        ))
        .expect("second client registers");
    repository
}

pub(super) fn build_service() -> (
    IntakeService<InMemoryClientRepository, RecordingDispatcher>,
    Arc<InMemoryClientRepository>,
    Arc<RecordingDispatcher>,
) {
    let repository = registered_repository();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = IntakeService::new(repository.clone(), dispatcher.clone());
    (service, repository, dispatcher)
}

/// Drive the named service track into `Pending` at `now`.
pub(super) fn submit_pending(
    service: &IntakeService<InMemoryClientRepository, RecordingDispatcher>,
    form: &ServiceForm,
    now: DateTime<Utc>,
) -> ServiceStatusRecord {
    service
        .submit(&owner(), &client_id(), form, None, now)
        .expect("submission accepted")
}

pub(super) fn stored_record(
    repository: &InMemoryClientRepository,
    service: ServiceKind,
) -> ServiceStatusRecord {
    repository
        .fetch(&client_id())
        .expect("fetch succeeds")
        .expect("client present")
        .services
        .record(service)
        .clone()
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    events: Mutex<Vec<(ClientId, ServiceKind, IntakeEvent)>>,
}

impl RecordingDispatcher {
    pub(super) fn events(&self) -> Vec<(ClientId, ServiceKind, IntakeEvent)> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn notify(
        &self,
        client: &ClientId,
        service: ServiceKind,
        event: IntakeEvent,
    ) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push((client.clone(), service, event));
        Ok(())
    }
}

/// Dispatcher whose transport is always down; submissions must still land.
pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn notify(
        &self,
        _client: &ClientId,
        _service: ServiceKind,
        _event: IntakeEvent,
    ) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("smtp relay offline".to_string()))
    }
}

/// Repository whose conditional write always reports a lost race.
pub(super) struct StaleRepository {
    pub(super) actual: SubmissionStatus,
}

impl ClientRepository for StaleRepository {
    fn fetch(&self, id: &ClientId) -> Result<Option<ClientAccount>, RepositoryError> {
        let mut account = ClientAccount::new(id.clone(), "racer@example.com", "Racer", "hash");
        account.services.record_mut(ServiceKind::Residence).status = SubmissionStatus::Pending;
        account.services.record_mut(ServiceKind::Residence).submitted = true;
        Ok(Some(account))
    }

    fn update_status(
        &self,
        _id: &ClientId,
        _service: ServiceKind,
        _expected: SubmissionStatus,
        _next: ServiceStatusRecord,
    ) -> Result<ServiceStatusRecord, RepositoryError> {
        Err(RepositoryError::StaleStatus {
            actual: self.actual,
        })
    }
}

pub(super) struct UnavailableRepository;

impl ClientRepository for UnavailableRepository {
    fn fetch(&self, _id: &ClientId) -> Result<Option<ClientAccount>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_status(
        &self,
        _id: &ClientId,
        _service: ServiceKind,
        _expected: SubmissionStatus,
        _next: ServiceStatusRecord,
    ) -> Result<ServiceStatusRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
