//! Status projector: the one authoritative mapping from a request to
//! the human-facing category and label shared by every list, detail,
//! and receipt surface.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{RentalRequest, RequestStatus};

/// Fixed display categories. Surfaces render these and nothing else,
/// so two screens can never disagree about what a status means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    PendingApproval,
    PaymentConfirmed,
    ItemShipped,
    ItemReceived,
    ReturnedCompleted,
    Cancelled,
    Rejected,
    Disputed,
    LateReturn,
}

impl StatusCategory {
    pub const fn display_name(self) -> &'static str {
        match self {
            StatusCategory::PendingApproval => "Pending Approval",
            StatusCategory::PaymentConfirmed => "Payment Confirmed",
            StatusCategory::ItemShipped => "Item Shipped",
            StatusCategory::ItemReceived => "Item Received",
            StatusCategory::ReturnedCompleted => "Returned/Completed",
            StatusCategory::Cancelled => "Cancelled",
            StatusCategory::Rejected => "Rejected",
            StatusCategory::Disputed => "Disputed",
            StatusCategory::LateReturn => "Late Return",
        }
    }
}

/// Projection consumed by every surface that redisplays a status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusProjection {
    pub category: StatusCategory,
    pub label: &'static str,
    /// Most recent transition timestamp, shown as "as of".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    /// Amount due, present only once the quote is display-ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_due: Option<Decimal>,
}

/// Project a request into its display category and label.
///
/// Side flags take precedence over the main status, disputes over late
/// returns. Statuses without a category of their own reuse the nearest
/// fixed category with a refined label, so the category set stays
/// closed.
pub fn project_status(request: &RentalRequest) -> StatusProjection {
    let (category, label) = if request.flags.disputed {
        (StatusCategory::Disputed, "Disputed")
    } else if request.flags.late_return {
        (StatusCategory::LateReturn, "Late Return")
    } else {
        match request.status {
            RequestStatus::Pending => (StatusCategory::PendingApproval, "Pending Approval"),
            RequestStatus::Approved => {
                (StatusCategory::PendingApproval, "Approved, Awaiting Payment")
            }
            RequestStatus::Paid => (StatusCategory::PaymentConfirmed, "Payment Confirmed"),
            RequestStatus::Shipped => (StatusCategory::ItemShipped, "Item Shipped"),
            RequestStatus::Received => (StatusCategory::ItemReceived, "Item Received"),
            RequestStatus::PendingReturn => (StatusCategory::ItemReceived, "Return Requested"),
            RequestStatus::ShippingForReturn => (StatusCategory::ItemShipped, "Return Shipped"),
            RequestStatus::ReturnedToOwner => {
                (StatusCategory::ReturnedCompleted, "Returned/Completed")
            }
            RequestStatus::Cancelled => (StatusCategory::Cancelled, "Cancelled"),
            RequestStatus::Rejected => (StatusCategory::Rejected, "Rejected"),
        }
    };

    let amount_due = request
        .quote()
        .ok()
        .filter(|breakdown| breakdown.display_ready)
        .map(|breakdown| breakdown.total_amount_due);

    StatusProjection {
        category,
        label,
        as_of: request.timestamps.latest(),
        amount_due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rental::domain::{
        ItemRef, PartyRef, RenterIdentity, RentalRequest, RentalSubmission, RequestId,
    };
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn request_with_status(status: RequestStatus) -> RentalRequest {
        let now = Utc.with_ymd_and_hms(2026, 9, 2, 12, 0, 0).unwrap();
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
        let mut request =
            RentalRequest::from_submission(RequestId("req-1".into()), submission, now);
        request.status = status;
        request
    }

    #[test]
    fn every_status_has_a_projection() {
        for (status, expected_label) in [
            (RequestStatus::Pending, "Pending Approval"),
            (RequestStatus::Approved, "Approved, Awaiting Payment"),
            (RequestStatus::Paid, "Payment Confirmed"),
            (RequestStatus::Shipped, "Item Shipped"),
            (RequestStatus::Received, "Item Received"),
            (RequestStatus::PendingReturn, "Return Requested"),
            (RequestStatus::ShippingForReturn, "Return Shipped"),
            (RequestStatus::ReturnedToOwner, "Returned/Completed"),
            (RequestStatus::Cancelled, "Cancelled"),
            (RequestStatus::Rejected, "Rejected"),
        ] {
            let projection = project_status(&request_with_status(status));
            assert_eq!(projection.label, expected_label, "{status:?}");
        }
    }

    #[test]
    fn flags_override_the_main_status() {
        let mut request = request_with_status(RequestStatus::Shipped);
        request.flags.late_return = true;
        assert_eq!(
            project_status(&request).category,
            StatusCategory::LateReturn
        );

        // A dispute wins over a late-return flag when both are set.
        request.flags.disputed = true;
        assert_eq!(project_status(&request).category, StatusCategory::Disputed);
    }

    #[test]
    fn amount_due_comes_from_the_authoritative_quote() {
        let request = request_with_status(RequestStatus::Approved);
        let projection = project_status(&request);
        assert_eq!(projection.amount_due, Some(dec!(2604.00)));
    }

    #[test]
    fn unpriced_listings_project_without_an_amount() {
        let mut request = request_with_status(RequestStatus::Pending);
        request.base_daily_rate = dec!(0);
        let projection = project_status(&request);
        assert_eq!(projection.amount_due, None);
        assert_eq!(projection.category, StatusCategory::PendingApproval);
    }
}
