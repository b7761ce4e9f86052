//! Deterministic pricing engine for rental quotes.
//!
//! Every money figure shown anywhere in the product comes out of
//! [`derive_breakdown`]. The derivation is pure: renter-facing and
//! owner-facing surfaces recompute it independently and must agree to
//! the last cent, which is why every amount is a [`Decimal`] and every
//! field is rounded exactly once, as the final step of its own
//! derivation.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// VAT applied to the owner's base daily rate.
pub const TAX_RATE: Decimal = dec!(0.12);

/// Platform cut, charged as a share of the taxed rental cost.
pub const SERVICE_FEE_RATE: Decimal = dec!(0.05);

/// Deposit percentage used when the owner has not set one.
pub const DEFAULT_DEPOSIT_PERCENT: Decimal = dec!(50);

const ZERO: Decimal = dec!(0);
const ONE_HUNDRED: Decimal = dec!(100);

/// Full money breakdown for one rental quote.
///
/// `total_amount_due = total_rental_cost + deposit_amount + service_fee`
/// holds exactly for every breakdown this module produces, as does
/// `owner_receivable + platform_earnings = total_rental_cost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub final_daily_rate: Decimal,
    pub total_rental_cost: Decimal,
    pub deposit_amount: Decimal,
    pub service_fee: Decimal,
    pub total_amount_due: Decimal,
    pub platform_earnings: Decimal,
    pub owner_receivable: Decimal,
    pub refundable_deposit: Decimal,
    /// False only for the all-zero placeholder used when a listing has
    /// no rate yet; such a breakdown renders as "price pending" instead
    /// of crashing a summary view.
    pub display_ready: bool,
}

impl PricingBreakdown {
    /// All-zero placeholder for listings without a usable rate.
    pub fn draft() -> Self {
        Self {
            final_daily_rate: ZERO,
            total_rental_cost: ZERO,
            deposit_amount: ZERO,
            service_fee: ZERO,
            total_amount_due: ZERO,
            platform_earnings: ZERO,
            owner_receivable: ZERO,
            refundable_deposit: ZERO,
            display_ready: false,
        }
    }
}

/// One invalid input field, reported alongside every other violation
/// found in the same pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Input validation failure listing the complete set of violations,
/// never just the first one found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("invalid input: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{}: {}", violation.field, violation.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects field violations across a whole validation pass.
#[derive(Debug, Default)]
pub(crate) struct ViolationCollector {
    violations: Vec<FieldViolation>,
}

impl ViolationCollector {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub(crate) fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }
}

/// Round a monetary amount to two decimal places, half away from zero.
pub(crate) fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Derive the full breakdown for a quote.
///
/// Tax is applied once, to the daily rate; every later multiplication
/// uses the taxed `final_daily_rate`. Deposit and service fee are both
/// percentages of `total_rental_cost`, not of the amount due.
pub fn derive_breakdown(
    base_daily_rate: Decimal,
    duration_days: u32,
    deposit_percent: Option<Decimal>,
) -> Result<PricingBreakdown, ValidationError> {
    let deposit_percent = deposit_percent.unwrap_or(DEFAULT_DEPOSIT_PERCENT);

    let mut violations = ViolationCollector::default();
    if base_daily_rate <= ZERO {
        violations.push("base_daily_rate", "must be greater than zero");
    }
    if duration_days < 1 {
        violations.push("duration_days", "must be at least one day");
    }
    if deposit_percent < ZERO || deposit_percent > ONE_HUNDRED {
        violations.push("deposit_percent", "must be between 0 and 100");
    }
    violations.finish()?;

    let final_daily_rate = round2(base_daily_rate * (Decimal::ONE + TAX_RATE));
    let total_rental_cost = round2(final_daily_rate * Decimal::from(duration_days));
    let deposit_amount = round2(total_rental_cost * deposit_percent / ONE_HUNDRED);
    let service_fee = round2(total_rental_cost * SERVICE_FEE_RATE);
    let total_amount_due = round2(total_rental_cost + deposit_amount + service_fee);
    let platform_earnings = service_fee;
    let owner_receivable = round2(total_rental_cost - service_fee);

    Ok(PricingBreakdown {
        final_daily_rate,
        total_rental_cost,
        deposit_amount,
        service_fee,
        total_amount_due,
        platform_earnings,
        owner_receivable,
        refundable_deposit: deposit_amount,
        display_ready: true,
    })
}

/// Breakdown for display surfaces that must tolerate incomplete
/// listings: a missing or zero rate yields the draft placeholder rather
/// than an error, while any other invalid input still fails loudly.
pub fn display_breakdown(
    base_daily_rate: Option<Decimal>,
    duration_days: u32,
    deposit_percent: Option<Decimal>,
) -> Result<PricingBreakdown, ValidationError> {
    match base_daily_rate {
        Some(rate) if rate > ZERO => derive_breakdown(rate, duration_days, deposit_percent),
        _ => Ok(PricingBreakdown::draft()),
    }
}
