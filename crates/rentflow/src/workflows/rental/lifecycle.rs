//! Lifecycle state machine for rental requests.
//!
//! Every status change in the product goes through the single
//! data-driven table in this module. Per-screen conditionals never
//! re-derive legality: the action resolver reads the same table, so a
//! surface cannot offer an action the machine would reject.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{ActorRole, RentalRequest, RequestStatus, SideFlag};
use super::pricing::{PricingBreakdown, ValidationError};

/// Actions defined by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Submit,
    Approve,
    Reject,
    Cancel,
    Pay,
    Ship,
    Receive,
    InitiateReturn,
    ShipReturn,
    ConfirmReturn,
    FlagLate,
    FlagDispute,
}

impl Action {
    pub const fn id(self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Cancel => "cancel",
            Action::Pay => "pay",
            Action::Ship => "ship",
            Action::Receive => "receive",
            Action::InitiateReturn => "initiate_return",
            Action::ShipReturn => "ship_return",
            Action::ConfirmReturn => "confirm_return",
            Action::FlagLate => "flag_late",
            Action::FlagDispute => "flag_dispute",
        }
    }
}

/// What a committed transition does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
    Status(RequestStatus),
    Flag(SideFlag),
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub action: Action,
    pub label: &'static str,
    pub sources: &'static [RequestStatus],
    pub target: TransitionTarget,
    pub actors: &'static [ActorRole],
    pub requires_input: bool,
}

use ActorRole::{Owner, PaymentGateway, Renter, Scheduler};
use RequestStatus::{
    Approved, Paid, Pending, PendingReturn, Received, ReturnedToOwner, Shipped, ShippingForReturn,
};

/// The single source of truth for lifecycle legality.
///
/// `submit` has no source status: it creates the request and is listed
/// here so the table stays complete, but it is only reachable through
/// [`super::service::RentalService::submit`].
pub static TRANSITION_TABLE: &[TransitionRule] = &[
    TransitionRule {
        action: Action::Submit,
        label: "Submit Request",
        sources: &[],
        target: TransitionTarget::Status(Pending),
        actors: &[Renter],
        requires_input: true,
    },
    TransitionRule {
        action: Action::Approve,
        label: "Approve Request",
        sources: &[Pending],
        target: TransitionTarget::Status(Approved),
        actors: &[Owner],
        requires_input: false,
    },
    TransitionRule {
        action: Action::Reject,
        label: "Reject Request",
        sources: &[Pending],
        target: TransitionTarget::Status(RequestStatus::Rejected),
        actors: &[Owner],
        requires_input: true,
    },
    TransitionRule {
        action: Action::Cancel,
        label: "Cancel Request",
        sources: &[Pending, Approved],
        target: TransitionTarget::Status(RequestStatus::Cancelled),
        actors: &[Renter],
        requires_input: false,
    },
    TransitionRule {
        action: Action::Pay,
        label: "Pay Now",
        sources: &[Approved],
        target: TransitionTarget::Status(Paid),
        actors: &[Renter, PaymentGateway],
        requires_input: true,
    },
    TransitionRule {
        action: Action::Ship,
        label: "Mark Item Shipped",
        sources: &[Paid],
        target: TransitionTarget::Status(Shipped),
        actors: &[Owner],
        requires_input: false,
    },
    TransitionRule {
        action: Action::Receive,
        label: "Confirm Item Received",
        sources: &[Shipped],
        target: TransitionTarget::Status(Received),
        actors: &[Renter],
        requires_input: false,
    },
    TransitionRule {
        action: Action::InitiateReturn,
        label: "Start Return",
        sources: &[Received],
        target: TransitionTarget::Status(PendingReturn),
        actors: &[Renter, Scheduler],
        requires_input: false,
    },
    TransitionRule {
        action: Action::ShipReturn,
        label: "Ship Item Back",
        sources: &[PendingReturn],
        target: TransitionTarget::Status(ShippingForReturn),
        actors: &[Renter],
        requires_input: false,
    },
    TransitionRule {
        action: Action::ConfirmReturn,
        label: "Confirm Return Received",
        sources: &[ShippingForReturn],
        target: TransitionTarget::Status(ReturnedToOwner),
        actors: &[Owner],
        requires_input: false,
    },
    TransitionRule {
        action: Action::FlagLate,
        label: "Flag Late Return",
        sources: &[Shipped, Received],
        target: TransitionTarget::Flag(SideFlag::LateReturn),
        actors: &[Renter, Owner, Scheduler],
        requires_input: false,
    },
    TransitionRule {
        action: Action::FlagDispute,
        label: "Open Dispute",
        sources: &[Shipped, Received],
        target: TransitionTarget::Flag(SideFlag::Disputed),
        actors: &[Renter, Owner, Scheduler],
        requires_input: false,
    },
];

pub fn rule_for(action: Action) -> &'static TransitionRule {
    TRANSITION_TABLE
        .iter()
        .find(|rule| rule.action == action)
        .expect("every action has a table row")
}

/// Successful-payment acknowledgment from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAcknowledgment {
    pub amount: Decimal,
    /// Gateway-side reference, kept for reconciliation trails.
    pub reference: String,
}

/// Input accompanying a transition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionPayload {
    None,
    Reject { reason: String },
    PaymentAck(PaymentAcknowledgment),
}

impl Default for TransitionPayload {
    fn default() -> Self {
        TransitionPayload::None
    }
}

/// Typed transition failures. The core only classifies; presentation
/// layers map these tags to user-facing copy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("action '{action}' by {actor} is not legal while the request is '{status}'", action = .action.id(), actor = .actor.label(), status = .status.label())]
    Illegal {
        status: RequestStatus,
        action: Action,
        actor: ActorRole,
    },
    #[error("request changed underneath this action (expected '{expected}', found '{found}'); re-fetch and retry", expected = .expected.label(), found = .found.label())]
    StaleState {
        expected: RequestStatus,
        found: RequestStatus,
    },
    #[error("payment acknowledgment of {received} does not match the amount due {expected}; manual reconciliation required")]
    AcknowledgmentMismatch {
        expected: Decimal,
        received: Decimal,
    },
    #[error("rejection requires a non-empty reason")]
    MissingReason,
    #[error("pay is only invocable through a payment-gateway acknowledgment")]
    MissingAcknowledgment,
    #[error(transparent)]
    Pricing(#[from] ValidationError),
}

/// Result of evaluating a transition against the current request.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// A state change to persist (only if the stored request is still
    /// in the expected source status).
    Applied(RentalRequest),
    /// The transition had already been applied; retries from
    /// unreliable external signals return the unchanged request and
    /// must not corrupt state.
    Replayed,
}

/// Evaluate one transition. Pure: the caller samples the clock once
/// and persists the outcome under optimistic concurrency.
pub fn apply_transition(
    request: &RentalRequest,
    action: Action,
    actor: ActorRole,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionError> {
    let rule = rule_for(action);

    if !rule.actors.contains(&actor) {
        return Err(TransitionError::Illegal {
            status: request.status,
            action,
            actor,
        });
    }

    if already_applied(request, rule) {
        // Replay success is reserved for genuine retries of the
        // original signal: a duplicate payment acknowledgment must
        // still name the frozen amount.
        if action == Action::Pay {
            let ack = match payload {
                TransitionPayload::PaymentAck(ack) => ack,
                _ => return Err(TransitionError::MissingAcknowledgment),
            };
            let breakdown = request.quote()?;
            if ack.amount != breakdown.total_amount_due {
                return Err(TransitionError::AcknowledgmentMismatch {
                    expected: breakdown.total_amount_due,
                    received: ack.amount,
                });
            }
        }
        return Ok(TransitionOutcome::Replayed);
    }

    if !rule.sources.contains(&request.status) {
        return Err(TransitionError::Illegal {
            status: request.status,
            action,
            actor,
        });
    }

    let mut updated = request.clone();
    match rule.target {
        TransitionTarget::Flag(flag) => {
            updated.flags.set(flag);
        }
        TransitionTarget::Status(target) => {
            match action {
                Action::Reject => {
                    let reason = match payload {
                        TransitionPayload::Reject { reason } => reason.trim(),
                        _ => "",
                    };
                    if reason.is_empty() {
                        return Err(TransitionError::MissingReason);
                    }
                    updated.rejection_reason = Some(reason.to_string());
                }
                Action::Pay => {
                    let ack = match payload {
                        TransitionPayload::PaymentAck(ack) => ack,
                        _ => return Err(TransitionError::MissingAcknowledgment),
                    };
                    let breakdown = request.quote()?;
                    if ack.amount != breakdown.total_amount_due {
                        return Err(TransitionError::AcknowledgmentMismatch {
                            expected: breakdown.total_amount_due,
                            received: ack.amount,
                        });
                    }
                    // Written exactly once; immutable from here on.
                    updated.frozen_breakdown = Some(breakdown);
                }
                _ => {}
            }
            updated.status = target;
            stamp(&mut updated, target, now);
        }
    }

    Ok(TransitionOutcome::Applied(updated))
}

/// A transition whose effect is already present on the request is a
/// replay, not an error.
fn already_applied(request: &RentalRequest, rule: &TransitionRule) -> bool {
    match rule.target {
        TransitionTarget::Status(target) => request.status == target,
        TransitionTarget::Flag(flag) => request.flags.is_set(flag),
    }
}

fn stamp(request: &mut RentalRequest, status: RequestStatus, now: DateTime<Utc>) {
    let slot = match status {
        RequestStatus::Pending => &mut request.timestamps.requested_at,
        RequestStatus::Approved => &mut request.timestamps.approved_at,
        RequestStatus::Paid => &mut request.timestamps.paid_at,
        RequestStatus::Shipped => &mut request.timestamps.shipped_at,
        RequestStatus::Received => &mut request.timestamps.received_at,
        RequestStatus::PendingReturn => &mut request.timestamps.return_requested_at,
        RequestStatus::ShippingForReturn => &mut request.timestamps.return_shipped_at,
        RequestStatus::ReturnedToOwner => &mut request.timestamps.returned_at,
        RequestStatus::Cancelled => &mut request.timestamps.cancelled_at,
        RequestStatus::Rejected => &mut request.timestamps.rejected_at,
    };
    *slot = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rental::domain::{
        ItemRef, PartyRef, RenterIdentity, RentalSubmission, RequestId,
    };
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 2, 12, 0, 0).unwrap()
    }

    fn pending_request() -> RentalRequest {
        let submission = RentalSubmission {
            renter: PartyRef("renter-1".into()),
            owner: PartyRef("owner-1".into()),
            item: ItemRef("item-1".into()),
            base_daily_rate: dec!(500),
            duration_days: 3,
            start_date: NaiveDate::from_ymd_opt(2026, 9, 10).expect("valid date"),
            deposit_percent: Some(dec!(50)),
            identity: RenterIdentity {
                full_name: "Sam Doe".into(),
                address: "12 Hill Road".into(),
            },
            id_collection_agreed: true,
        };
        RentalRequest::from_submission(RequestId("req-1".into()), submission, now())
    }

    fn advance(request: &RentalRequest, action: Action, actor: ActorRole) -> RentalRequest {
        match apply_transition(request, action, actor, &TransitionPayload::None, now()) {
            Ok(TransitionOutcome::Applied(updated)) => updated,
            other => panic!("expected applied transition, got {other:?}"),
        }
    }

    fn paid_request() -> RentalRequest {
        let approved = advance(&pending_request(), Action::Approve, Owner);
        let ack = TransitionPayload::PaymentAck(PaymentAcknowledgment {
            amount: dec!(2604.00),
            reference: "gw-001".into(),
        });
        match apply_transition(&approved, Action::Pay, PaymentGateway, &ack, now()) {
            Ok(TransitionOutcome::Applied(paid)) => paid,
            other => panic!("expected payment to apply, got {other:?}"),
        }
    }

    #[test]
    fn happy_path_reaches_returned_to_owner() {
        let mut request = paid_request();
        for (action, actor) in [
            (Action::Ship, Owner),
            (Action::Receive, Renter),
            (Action::InitiateReturn, Renter),
            (Action::ShipReturn, Renter),
            (Action::ConfirmReturn, Owner),
        ] {
            request = advance(&request, action, actor);
        }
        assert_eq!(request.status, ReturnedToOwner);
        assert!(request.timestamps.returned_at.is_some());
        assert!(request.timestamps.shipped_at.is_some());
    }

    #[test]
    fn reject_is_only_legal_from_pending() {
        let approved = advance(&pending_request(), Action::Approve, Owner);
        let payload = TransitionPayload::Reject {
            reason: "no longer available".into(),
        };
        let error = apply_transition(&approved, Action::Reject, Owner, &payload, now())
            .expect_err("reject after approve must fail");
        assert_eq!(
            error,
            TransitionError::Illegal {
                status: Approved,
                action: Action::Reject,
                actor: Owner,
            }
        );
    }

    #[test]
    fn reject_requires_a_reason() {
        let payload = TransitionPayload::Reject {
            reason: "   ".into(),
        };
        let error = apply_transition(&pending_request(), Action::Reject, Owner, &payload, now())
            .expect_err("blank reason must fail");
        assert_eq!(error, TransitionError::MissingReason);
    }

    #[test]
    fn cancel_is_illegal_once_paid() {
        let paid = paid_request();
        let error =
            apply_transition(&paid, Action::Cancel, Renter, &TransitionPayload::None, now())
                .expect_err("post-payment cancel must fail");
        assert!(matches!(error, TransitionError::Illegal { status: Paid, .. }));
    }

    #[test]
    fn pay_freezes_the_breakdown() {
        let paid = paid_request();
        let frozen = paid.frozen_breakdown.expect("breakdown frozen at pay");
        assert_eq!(frozen.total_amount_due, dec!(2604.00));
        assert!(paid.timestamps.paid_at.is_some());
    }

    #[test]
    fn pay_rejects_mismatched_acknowledgment() {
        let approved = advance(&pending_request(), Action::Approve, Owner);
        let ack = TransitionPayload::PaymentAck(PaymentAcknowledgment {
            amount: dec!(2604.01),
            reference: "gw-002".into(),
        });
        let error = apply_transition(&approved, Action::Pay, PaymentGateway, &ack, now())
            .expect_err("mismatched amount must fail");
        assert_eq!(
            error,
            TransitionError::AcknowledgmentMismatch {
                expected: dec!(2604.00),
                received: dec!(2604.01),
            }
        );
    }

    #[test]
    fn pay_without_acknowledgment_is_rejected() {
        let approved = advance(&pending_request(), Action::Approve, Owner);
        let error = apply_transition(
            &approved,
            Action::Pay,
            Renter,
            &TransitionPayload::None,
            now(),
        )
        .expect_err("direct pay without ack must fail");
        assert_eq!(error, TransitionError::MissingAcknowledgment);
    }

    #[test]
    fn replaying_an_applied_transition_is_a_no_op() {
        let approved = advance(&pending_request(), Action::Approve, Owner);
        let outcome = apply_transition(
            &approved,
            Action::Approve,
            Owner,
            &TransitionPayload::None,
            now(),
        )
        .expect("replay is not an error");
        assert_eq!(outcome, TransitionOutcome::Replayed);
    }

    #[test]
    fn wrong_actor_is_named_in_the_error() {
        let error = apply_transition(
            &pending_request(),
            Action::Approve,
            Renter,
            &TransitionPayload::None,
            now(),
        )
        .expect_err("renter cannot approve");
        let message = error.to_string();
        assert!(message.contains("approve"));
        assert!(message.contains("renter"));
        assert!(message.contains("pending"));
    }

    #[test]
    fn flags_layer_on_top_of_the_main_path() {
        let shipped = advance(&paid_request(), Action::Ship, Owner);
        let flagged = match apply_transition(
            &shipped,
            Action::FlagDispute,
            Owner,
            &TransitionPayload::None,
            now(),
        ) {
            Ok(TransitionOutcome::Applied(updated)) => updated,
            other => panic!("expected dispute flag to apply, got {other:?}"),
        };
        assert!(flagged.flags.disputed);
        assert_eq!(flagged.status, Shipped);

        // Main-path progress continues with the flag in place.
        let received = advance(&flagged, Action::Receive, Renter);
        assert_eq!(received.status, Received);
        assert!(received.flags.disputed);

        // Re-flagging is a replay.
        let outcome = apply_transition(
            &received,
            Action::FlagDispute,
            Renter,
            &TransitionPayload::None,
            now(),
        )
        .expect("replay");
        assert_eq!(outcome, TransitionOutcome::Replayed);
    }

    #[test]
    fn replay_is_reserved_for_the_original_actor() {
        let cancelled = advance(&pending_request(), Action::Cancel, Renter);
        let error = apply_transition(
            &cancelled,
            Action::Cancel,
            Owner,
            &TransitionPayload::None,
            now(),
        )
        .expect_err("owner cannot replay the renter's cancel");
        assert_eq!(
            error,
            TransitionError::Illegal {
                status: RequestStatus::Cancelled,
                action: Action::Cancel,
                actor: Owner,
            }
        );
    }

    #[test]
    fn duplicate_acknowledgment_must_carry_the_frozen_amount() {
        let paid = paid_request();
        let ack = TransitionPayload::PaymentAck(PaymentAcknowledgment {
            amount: dec!(2000.00),
            reference: "gw-dup".into(),
        });
        let error = apply_transition(&paid, Action::Pay, PaymentGateway, &ack, now())
            .expect_err("mismatched retry must fail");
        assert_eq!(
            error,
            TransitionError::AcknowledgmentMismatch {
                expected: dec!(2604.00),
                received: dec!(2000.00),
            }
        );
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        let cancelled = advance(&pending_request(), Action::Cancel, Renter);
        let error = apply_transition(
            &cancelled,
            Action::Ship,
            Owner,
            &TransitionPayload::None,
            now(),
        )
        .expect_err("ship after cancel must fail");
        assert!(matches!(
            error,
            TransitionError::Illegal {
                status: RequestStatus::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn submit_never_advances_an_existing_request() {
        // Re-submitting a still-pending request is a retry of an
        // already-applied transition.
        let outcome = apply_transition(
            &pending_request(),
            Action::Submit,
            Renter,
            &TransitionPayload::None,
            now(),
        )
        .expect("replay");
        assert_eq!(outcome, TransitionOutcome::Replayed);

        // Once past pending, submit has no source status in the table.
        let approved = advance(&pending_request(), Action::Approve, Owner);
        let error = apply_transition(
            &approved,
            Action::Submit,
            Renter,
            &TransitionPayload::None,
            now(),
        )
        .expect_err("submit never applies to a progressed request");
        assert!(matches!(error, TransitionError::Illegal { .. }));
    }
}
