use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::ClientId;

/// Identifier wrapper for staff reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

/// Authenticated identity attached to a request by the session boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Client(ClientId),
    Staff(StaffId),
}

/// Denial reasons are kept for logs and tests; every variant renders the
/// same opaque message so a response never reveals whether the target
/// resource exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    Unauthenticated,
    NotOwner,
    StaffRequired,
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not permitted")
    }
}

impl std::error::Error for AuthorizationError {}

/// Submitting is reserved to the client that owns the record.
pub fn ensure_owner(caller: &Caller, client_id: &ClientId) -> Result<(), AuthorizationError> {
    match caller {
        Caller::Client(id) if id == client_id => Ok(()),
        Caller::Client(_) | Caller::Staff(_) => Err(AuthorizationError::NotOwner),
    }
}

/// Validate/reject are reserved to staff identities.
pub fn ensure_staff(caller: &Caller) -> Result<(), AuthorizationError> {
    match caller {
        Caller::Staff(_) => Ok(()),
        Caller::Client(_) => Err(AuthorizationError::StaffRequired),
    }
}

/// A record may be read by its owner and by any staff identity.
pub fn ensure_read(caller: &Caller, client_id: &ClientId) -> Result<(), AuthorizationError> {
    match caller {
        Caller::Staff(_) => Ok(()),
        Caller::Client(id) if id == client_id => Ok(()),
        Caller::Client(_) => Err(AuthorizationError::NotOwner),
    }
}
