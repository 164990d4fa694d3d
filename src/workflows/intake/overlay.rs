use std::collections::BTreeSet;

use super::domain::{ClientId, ServiceKind, SubmissionStatus};

/// Client-side "I just submitted" flags, bridging the gap between a form
/// submission and the next authoritative poll so the UI never flashes back
/// to a stale not-submitted state.
///
/// Advisory and presentational only. The intake service re-derives legality
/// from the server record on every mutation; nothing in here is ever
/// consulted for authorization or business decisions.
#[derive(Debug, Default)]
pub struct OptimisticOverlay {
    active: Option<ClientId>,
    flags: BTreeSet<ServiceKind>,
}

impl OptimisticOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `client` the active identity. Flags belonging to a previous
    /// identity are purged so state never bleeds across accounts.
    pub fn activate(&mut self, client: &ClientId) {
        if self.active.as_ref() != Some(client) {
            self.flags.clear();
            self.active = Some(client.clone());
        }
    }

    /// Record a just-sent submission for the active identity.
    pub fn mark_submitted(&mut self, client: &ClientId, service: ServiceKind) {
        self.activate(client);
        self.flags.insert(service);
    }

    pub fn is_flagged(&self, client: &ClientId, service: ServiceKind) -> bool {
        self.active.as_ref() == Some(client) && self.flags.contains(&service)
    }

    /// Fold a freshly polled authoritative status into the overlay. The flag
    /// is cleared once the adjudication cycle it bridged has concluded, that
    /// is once the server reports validated or rejected. While the server
    /// still says pending the flag is redundant but harmless and stays.
    pub fn reconcile(
        &mut self,
        client: &ClientId,
        service: ServiceKind,
        authoritative: SubmissionStatus,
    ) {
        if self.active.as_ref() != Some(client) {
            return;
        }
        if matches!(
            authoritative,
            SubmissionStatus::Validated | SubmissionStatus::Rejected
        ) {
            self.flags.remove(&service);
        }
    }

    /// Status to show in the UI: the overlay lifts a stale not-submitted
    /// reading to pending, and never overrides anything the server has
    /// actually said about this cycle.
    pub fn displayed_status(
        &self,
        client: &ClientId,
        service: ServiceKind,
        authoritative: SubmissionStatus,
    ) -> SubmissionStatus {
        if authoritative == SubmissionStatus::NotSubmitted && self.is_flagged(client, service) {
            SubmissionStatus::Pending
        } else {
            authoritative
        }
    }
}
