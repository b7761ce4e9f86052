use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::actions::{legal_actions, ActionMenu};
use super::domain::{ActorRole, RentalRequest, RentalSubmission, RequestId};
use super::lifecycle::{
    apply_transition, Action, PaymentAcknowledgment, TransitionError, TransitionOutcome,
    TransitionPayload,
};
use super::pricing::{PricingBreakdown, ValidationError, ViolationCollector};
use super::repository::{
    DocumentVerifier, NotificationPublisher, RentalRepository, RepositoryError, TransitionNotice,
};
use super::status::{project_status, StatusProjection};

/// Service composing the repository, notification, and document ports
/// around the lifecycle state machine. This is the single authoritative
/// mutation path for rental requests.
pub struct RentalService<R, N, D> {
    repository: Arc<R>,
    notifier: Arc<N>,
    documents: Arc<D>,
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

impl<R, N, D> RentalService<R, N, D>
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, documents: Arc<D>) -> Self {
        Self {
            repository,
            notifier,
            documents,
        }
    }

    /// Validate and store a new rental request.
    ///
    /// Validation reports every violated field in one pass, so a renter
    /// fixes the whole form once rather than one error at a time.
    pub fn submit(
        &self,
        submission: RentalSubmission,
    ) -> Result<RentalRequest, RentalServiceError> {
        self.validate_submission(&submission)?;

        let request =
            RentalRequest::from_submission(next_request_id(), submission, Utc::now());
        let stored = self.repository.insert(request)?;

        info!(request_id = %stored.id.0, "rental request submitted");
        self.notify(&stored, Action::Submit);
        Ok(stored)
    }

    fn validate_submission(&self, submission: &RentalSubmission) -> Result<(), ValidationError> {
        let mut violations = ViolationCollector::default();

        if submission.identity.full_name.trim().is_empty() {
            violations.push("identity.full_name", "must not be empty");
        }
        if submission.identity.address.trim().is_empty() {
            violations.push("identity.address", "must not be empty");
        }
        if submission.duration_days < 1 {
            violations.push("duration_days", "must be at least one day");
        }
        if !submission.id_collection_agreed {
            violations.push("id_collection_agreed", "ID collection must be agreed to");
        }
        if !self.documents.documents_present(&submission.renter) {
            violations.push("documents", "required documents are not on file");
        }
        if submission.base_daily_rate <= Decimal::ZERO {
            violations.push("base_daily_rate", "must be greater than zero");
        }
        if let Some(percent) = submission.deposit_percent {
            if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
                violations.push("deposit_percent", "must be between 0 and 100");
            }
        }

        violations.finish()
    }

    /// Apply one lifecycle action under optimistic concurrency.
    ///
    /// The transition commits only if the stored request is still in
    /// the status it was read at; a concurrent conflicting action turns
    /// into [`TransitionError::StaleState`] for the loser. Replays of
    /// already-applied transitions return the unchanged request and
    /// touch nothing.
    pub fn apply(
        &self,
        id: &RequestId,
        action: Action,
        actor: ActorRole,
        payload: &TransitionPayload,
    ) -> Result<RentalRequest, RentalServiceError> {
        let current = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let expected = current.status;

        let updated = match apply_transition(&current, action, actor, payload, Utc::now())? {
            TransitionOutcome::Replayed => return Ok(current),
            TransitionOutcome::Applied(updated) => updated,
        };

        match self.repository.update_if(expected, updated.clone()) {
            Ok(()) => {}
            Err(RepositoryError::Stale { expected, found }) => {
                return Err(TransitionError::StaleState { expected, found }.into());
            }
            Err(other) => return Err(other.into()),
        }

        info!(
            request_id = %updated.id.0,
            action = action.id(),
            status = updated.status.label(),
            "rental transition committed"
        );
        self.notify(&updated, action);
        Ok(updated)
    }

    /// Callback for the payment collaborator; the only path that
    /// invokes `pay`.
    pub fn record_payment(
        &self,
        id: &RequestId,
        acknowledgment: PaymentAcknowledgment,
    ) -> Result<RentalRequest, RentalServiceError> {
        self.apply(
            id,
            Action::Pay,
            ActorRole::PaymentGateway,
            &TransitionPayload::PaymentAck(acknowledgment),
        )
    }

    pub fn get(&self, id: &RequestId) -> Result<RentalRequest, RentalServiceError> {
        let request = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(request)
    }

    /// Non-terminal requests, for operational listings.
    pub fn active(&self, limit: usize) -> Result<Vec<RentalRequest>, RentalServiceError> {
        Ok(self.repository.active(limit)?)
    }

    /// Action menu for one viewer, straight from the transition table.
    pub fn menu(&self, id: &RequestId, viewer: ActorRole) -> Result<ActionMenu, RentalServiceError> {
        let request = self.get(id)?;
        Ok(legal_actions(request.status, request.flags, viewer))
    }

    pub fn projection(&self, id: &RequestId) -> Result<StatusProjection, RentalServiceError> {
        let request = self.get(id)?;
        Ok(project_status(&request))
    }

    /// Deterministic quote for the stored request (frozen snapshot once
    /// paid).
    pub fn quote(&self, id: &RequestId) -> Result<PricingBreakdown, RentalServiceError> {
        let request = self.get(id)?;
        Ok(request.quote().map_err(RentalServiceError::Validation)?)
    }

    fn notify(&self, request: &RentalRequest, action: Action) {
        let notice = TransitionNotice::for_commit(request, action);
        if let Err(err) = self.notifier.publish(notice) {
            // Delivery failure never affects committed state.
            warn!(request_id = %request.id.0, error = %err, "transition notice dropped");
        }
    }
}

/// Error raised by the rental service. Tags only; presentation layers
/// own the user-facing copy.
#[derive(Debug, thiserror::Error)]
pub enum RentalServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
