use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::pricing::{self, PricingBreakdown, ValidationError, DEFAULT_DEPOSIT_PERCENT};

/// Identifier wrapper for rental requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Reference to a platform account (renter or owner).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyRef(pub String);

/// Reference to the listed item being rented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef(pub String);

/// Role of the party attempting an action. The scheduler is the
/// external clock collaborator, which calls in as an ordinary actor;
/// the gateway is the payment collaborator delivering acknowledgments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Renter,
    Owner,
    Scheduler,
    PaymentGateway,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Renter => "renter",
            ActorRole::Owner => "owner",
            ActorRole::Scheduler => "scheduler",
            ActorRole::PaymentGateway => "payment_gateway",
        }
    }
}

/// Main lifecycle status of a rental request. Progress is monotonic:
/// the return leg is a forward phase of its own, never a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Paid,
    Shipped,
    Received,
    PendingReturn,
    ShippingForReturn,
    ReturnedToOwner,
    Cancelled,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Paid => "paid",
            RequestStatus::Shipped => "shipped",
            RequestStatus::Received => "received",
            RequestStatus::PendingReturn => "pending_return",
            RequestStatus::ShippingForReturn => "shipping_for_return",
            RequestStatus::ReturnedToOwner => "returned_to_owner",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Terminal statuses have no outgoing transitions; the records are
    /// retained as history, never deleted.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::ReturnedToOwner | RequestStatus::Cancelled | RequestStatus::Rejected
        )
    }
}

/// Side conditions layered on top of the main status; they never
/// discard main-path progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideFlag {
    Disputed,
    LateReturn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideFlags {
    pub disputed: bool,
    pub late_return: bool,
}

impl SideFlags {
    pub const fn is_set(self, flag: SideFlag) -> bool {
        match flag {
            SideFlag::Disputed => self.disputed,
            SideFlag::LateReturn => self.late_return,
        }
    }

    pub fn set(&mut self, flag: SideFlag) {
        match flag {
            SideFlag::Disputed => self.disputed = true,
            SideFlag::LateReturn => self.late_return = true,
        }
    }
}

/// Renter identity captured at submission; the document collaborator
/// separately attests that the required documents are on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenterIdentity {
    pub full_name: String,
    pub address: String,
}

/// Inbound payload for a new rental request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalSubmission {
    pub renter: PartyRef,
    pub owner: PartyRef,
    pub item: ItemRef,
    pub base_daily_rate: Decimal,
    pub duration_days: u32,
    pub start_date: NaiveDate,
    /// Owner-configured deposit percentage; defaults to 50 when unset.
    pub deposit_percent: Option<Decimal>,
    pub identity: RenterIdentity,
    pub id_collection_agreed: bool,
}

/// Per-transition timestamps, written once by the transition that
/// reaches the corresponding status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTimestamps {
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub return_shipped_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl TransitionTimestamps {
    /// Most recent transition timestamp, used by status surfaces.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        [
            self.requested_at,
            self.approved_at,
            self.paid_at,
            self.shipped_at,
            self.received_at,
            self.return_requested_at,
            self.return_shipped_at,
            self.returned_at,
            self.cancelled_at,
            self.rejected_at,
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

/// The reservation: one renter's request to rent one item for a
/// bounded period. Mutated only through the lifecycle transition
/// table; never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRequest {
    pub id: RequestId,
    pub renter: PartyRef,
    pub owner: PartyRef,
    pub item: ItemRef,
    pub base_daily_rate: Decimal,
    pub duration_days: u32,
    pub start_date: NaiveDate,
    /// Frozen onto the request at submission; later edits to the item
    /// listing never change it.
    pub deposit_percent: Decimal,
    pub status: RequestStatus,
    pub flags: SideFlags,
    pub timestamps: TransitionTimestamps,
    /// Required iff status is `Rejected`.
    pub rejection_reason: Option<String>,
    /// Pricing snapshot written exactly once, when payment is
    /// acknowledged; immutable afterwards.
    pub frozen_breakdown: Option<PricingBreakdown>,
}

impl RentalRequest {
    /// Build a pending request from a validated submission.
    pub(crate) fn from_submission(
        id: RequestId,
        submission: RentalSubmission,
        now: DateTime<Utc>,
    ) -> Self {
        let deposit_percent = submission
            .deposit_percent
            .unwrap_or(DEFAULT_DEPOSIT_PERCENT);
        Self {
            id,
            renter: submission.renter,
            owner: submission.owner,
            item: submission.item,
            base_daily_rate: submission.base_daily_rate,
            duration_days: submission.duration_days,
            start_date: submission.start_date,
            deposit_percent,
            status: RequestStatus::Pending,
            flags: SideFlags::default(),
            timestamps: TransitionTimestamps {
                requested_at: Some(now),
                ..TransitionTimestamps::default()
            },
            rejection_reason: None,
            frozen_breakdown: None,
        }
    }

    /// Deterministic quote from the frozen request inputs. Once paid,
    /// the stored snapshot wins so later rate edits cannot leak in.
    pub fn quote(&self) -> Result<PricingBreakdown, ValidationError> {
        if let Some(frozen) = &self.frozen_breakdown {
            return Ok(frozen.clone());
        }
        pricing::derive_breakdown(
            self.base_daily_rate,
            self.duration_days,
            Some(self.deposit_percent),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn submission() -> RentalSubmission {
        RentalSubmission {
            renter: PartyRef("renter-7".to_string()),
            owner: PartyRef("owner-3".to_string()),
            item: ItemRef("item-stand-mixer".to_string()),
            base_daily_rate: dec!(500),
            duration_days: 3,
            start_date: NaiveDate::from_ymd_opt(2026, 9, 14).expect("valid date"),
            deposit_percent: None,
            identity: RenterIdentity {
                full_name: "Sam Doe".to_string(),
                address: "12 Hill Road".to_string(),
            },
            id_collection_agreed: true,
        }
    }

    #[test]
    fn submission_freezes_default_deposit_percent() {
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
        let request = RentalRequest::from_submission(RequestId("req-1".into()), submission(), now);
        assert_eq!(request.deposit_percent, dec!(50));
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.timestamps.requested_at, Some(now));
        assert!(request.frozen_breakdown.is_none());
    }

    #[test]
    fn quote_prefers_frozen_breakdown_over_live_inputs() {
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
        let mut request =
            RentalRequest::from_submission(RequestId("req-1".into()), submission(), now);
        let original = request.quote().expect("quote derives");
        request.frozen_breakdown = Some(original.clone());

        // A later rate edit must not alter an already-frozen quote.
        request.base_daily_rate = dec!(900);
        assert_eq!(request.quote().expect("frozen quote"), original);
    }

    #[test]
    fn latest_timestamp_tracks_lifecycle_progress() {
        let early = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 9, 2, 9, 0, 0).unwrap();
        let timestamps = TransitionTimestamps {
            requested_at: Some(early),
            approved_at: Some(late),
            ..TransitionTimestamps::default()
        };
        assert_eq!(timestamps.latest(), Some(late));
    }

    #[test]
    fn terminal_statuses_are_marked() {
        assert!(RequestStatus::ReturnedToOwner.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::ShippingForReturn.is_terminal());
    }
}
