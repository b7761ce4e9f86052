use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{RentalRequest, RequestId, RequestStatus};
use super::lifecycle::Action;

/// Storage abstraction so the service module can be exercised in
/// isolation. Requests are never hard-deleted: terminal records stay
/// behind as history.
pub trait RentalRepository: Send + Sync {
    fn insert(&self, request: RentalRequest) -> Result<RentalRequest, RepositoryError>;

    /// Commit `request` only if the stored record is still in
    /// `expected` status. The losing side of a concurrent conflict
    /// gets [`RepositoryError::Stale`] and must re-fetch, never a
    /// silent merge.
    fn update_if(
        &self,
        expected: RequestStatus,
        request: RentalRequest,
    ) -> Result<(), RepositoryError>;

    fn fetch(&self, id: &RequestId) -> Result<Option<RentalRequest>, RepositoryError>;

    /// Non-terminal requests, for operational listings.
    fn active(&self, limit: usize) -> Result<Vec<RentalRequest>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("request already exists")]
    Conflict,
    #[error("request not found")]
    NotFound,
    #[error("stored status is '{found}', expected '{expected}'", found = .found.label(), expected = .expected.label())]
    Stale {
        expected: RequestStatus,
        found: RequestStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook. Delivery is fire-and-forget: a failure
/// is logged by the service and never affects committed state.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notice: TransitionNotice) -> Result<(), NotifyError>;
}

/// Payload describing one committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionNotice {
    pub request_id: RequestId,
    pub action: String,
    pub status: String,
    pub details: BTreeMap<String, String>,
}

impl TransitionNotice {
    pub(crate) fn for_commit(request: &RentalRequest, action: Action) -> Self {
        Self {
            request_id: request.id.clone(),
            action: action.id().to_string(),
            status: request.status.label().to_string(),
            details: BTreeMap::new(),
        }
    }
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Identity/document collaborator: attests that the renter's required
/// documents are on file. Consulted only as a submit precondition.
pub trait DocumentVerifier: Send + Sync {
    fn documents_present(&self, renter: &super::domain::PartyRef) -> bool;
}
