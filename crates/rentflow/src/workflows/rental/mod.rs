//! Rental lifecycle workflow: deterministic pricing, the status state
//! machine, and the shared action/status views built on top of them.
//!
//! The transition table in [`lifecycle`] is the single source of truth
//! for legality; [`actions`] and [`status`] are pure projections of it,
//! so every surface that shows a button or a status label agrees with
//! the machine by construction.

pub mod actions;
pub mod domain;
pub mod lifecycle;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;

pub use actions::{legal_actions, ActionMenu, ActionOption};
pub use domain::{
    ActorRole, ItemRef, PartyRef, RentalRequest, RentalSubmission, RenterIdentity, RequestId,
    RequestStatus, SideFlag, SideFlags, TransitionTimestamps,
};
pub use lifecycle::{
    apply_transition, Action, PaymentAcknowledgment, TransitionError, TransitionOutcome,
    TransitionPayload, TRANSITION_TABLE,
};
pub use pricing::{
    derive_breakdown, display_breakdown, FieldViolation, PricingBreakdown, ValidationError,
    DEFAULT_DEPOSIT_PERCENT, SERVICE_FEE_RATE, TAX_RATE,
};
pub use repository::{
    DocumentVerifier, NotificationPublisher, NotifyError, RentalRepository, RepositoryError,
    TransitionNotice,
};
pub use router::rental_router;
pub use service::{RentalService, RentalServiceError};
pub use status::{project_status, StatusCategory, StatusProjection};
