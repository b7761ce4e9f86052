use crate::infra::{
    InMemoryDocumentDirectory, InMemoryNotificationPublisher, InMemoryRentalRepository,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use rentflow::error::AppError;
use rentflow::workflows::rental::{
    derive_breakdown, Action, ActorRole, PaymentAcknowledgment, PricingBreakdown, RentalService,
    RentalServiceError, RentalSubmission, RenterIdentity, RequestId, ItemRef, PartyRef,
    TransitionPayload,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Owner's base daily rate before tax
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) base_daily_rate: Decimal,
    /// Rental duration in days
    #[arg(long)]
    pub(crate) duration_days: u32,
    /// Deposit percentage of the total rental cost (defaults to 50)
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) deposit_percent: Option<Decimal>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Rental start date (YYYY-MM-DD). Defaults to a week from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Base daily rate for the demo listing (defaults to 500)
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) base_daily_rate: Option<Decimal>,
    /// Rental duration in days (defaults to 3)
    #[arg(long)]
    pub(crate) duration_days: Option<u32>,
    /// Deposit percentage (defaults to the platform's 50)
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) deposit_percent: Option<Decimal>,
    /// Print the outbound notification feed at the end
    #[arg(long)]
    pub(crate) show_notices: bool,
    /// Skip the blocked-intake portion of the demo
    #[arg(long)]
    pub(crate) skip_blocked_intake: bool,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let QuoteArgs {
        base_daily_rate,
        duration_days,
        deposit_percent,
    } = args;

    let breakdown = derive_breakdown(base_daily_rate, duration_days, deposit_percent)
        .map_err(RentalServiceError::Validation)?;

    println!(
        "Quote for {duration_days} day(s) at a base rate of {base_daily_rate}"
    );
    render_breakdown(&breakdown);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start_date,
        base_daily_rate,
        duration_days,
        deposit_percent,
        show_notices,
        skip_blocked_intake,
    } = args;

    let start_date =
        start_date.unwrap_or_else(|| Local::now().date_naive() + chrono::Duration::days(7));
    let base_daily_rate = base_daily_rate.unwrap_or(dec!(500));
    let duration_days = duration_days.unwrap_or(3);

    println!("Rental lifecycle demo");
    println!(
        "Listing: {base_daily_rate}/day for {duration_days} day(s), starting {start_date}"
    );

    let repository = Arc::new(InMemoryRentalRepository::default());
    let notifier = Arc::new(InMemoryNotificationPublisher::default());
    let documents = Arc::new(InMemoryDocumentDirectory::default());
    let service = Arc::new(RentalService::new(
        repository,
        notifier.clone(),
        documents.clone(),
    ));

    let submission = demo_submission(
        "renter-demo",
        start_date,
        base_daily_rate,
        duration_days,
        deposit_percent,
    );

    let request = match service.submit(submission) {
        Ok(request) => request,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!("\nSubmitted request {}", request.id.0);
    render_state(&service, &request.id);

    match service.quote(&request.id) {
        Ok(breakdown) => {
            println!("\nRenter-facing quote");
            render_breakdown(&breakdown);
        }
        Err(err) => println!("  Quote unavailable: {err}"),
    }

    render_menu(&service, &request.id, ActorRole::Owner);
    render_menu(&service, &request.id, ActorRole::Renter);

    println!("\nOwner approves the request");
    apply_step(&service, &request.id, Action::Approve, ActorRole::Owner);

    println!("\nGateway acknowledges the wrong amount (simulated partial charge)");
    let short = PaymentAcknowledgment {
        amount: dec!(1.00),
        reference: "demo-short".to_string(),
    };
    match service.record_payment(&request.id, short) {
        Ok(_) => println!("  Unexpectedly accepted"),
        Err(err) => println!("  Declined as expected: {err}"),
    }

    println!("\nGateway acknowledges the exact amount due");
    match service.quote(&request.id) {
        Ok(breakdown) => {
            let exact = PaymentAcknowledgment {
                amount: breakdown.total_amount_due,
                reference: "demo-ok".to_string(),
            };
            match service.record_payment(&request.id, exact) {
                Ok(paid) => {
                    println!("  Payment recorded; breakdown frozen");
                    render_state(&service, &paid.id);
                }
                Err(err) => println!("  Payment failed: {err}"),
            }
        }
        Err(err) => println!("  Quote unavailable: {err}"),
    }

    for (line, action, actor) in [
        ("Owner ships the item", Action::Ship, ActorRole::Owner),
        ("Renter confirms receipt", Action::Receive, ActorRole::Renter),
        (
            "Scheduler starts the return window",
            Action::InitiateReturn,
            ActorRole::Scheduler,
        ),
        (
            "Renter ships the item back",
            Action::ShipReturn,
            ActorRole::Renter,
        ),
        (
            "Owner confirms the return",
            Action::ConfirmReturn,
            ActorRole::Owner,
        ),
    ] {
        println!("\n{line}");
        apply_step(&service, &request.id, action, actor);
    }

    if !skip_blocked_intake {
        println!("\nBlocked intake demo (renter without documents on file)");
        documents.mark_missing("renter-demo-2");
        let blocked = demo_submission(
            "renter-demo-2",
            start_date,
            base_daily_rate,
            duration_days,
            deposit_percent,
        );
        match service.submit(blocked) {
            Ok(_) => println!("  Unexpectedly accepted"),
            Err(err) => println!("  Rejected as expected: {err}"),
        }
    }

    if show_notices {
        println!("\nOutbound notification feed");
        for notice in notifier.events() {
            println!(
                "  - {} -> {} ({})",
                notice.action, notice.status, notice.request_id.0
            );
        }
    }

    Ok(())
}

fn demo_submission(
    renter: &str,
    start_date: NaiveDate,
    base_daily_rate: Decimal,
    duration_days: u32,
    deposit_percent: Option<Decimal>,
) -> RentalSubmission {
    RentalSubmission {
        renter: PartyRef(renter.to_string()),
        owner: PartyRef("owner-demo".to_string()),
        item: ItemRef("item-camera-kit".to_string()),
        base_daily_rate,
        duration_days,
        start_date,
        deposit_percent,
        identity: RenterIdentity {
            full_name: "Demo Renter".to_string(),
            address: "1 Example Street".to_string(),
        },
        id_collection_agreed: true,
    }
}

fn apply_step(
    service: &RentalService<
        InMemoryRentalRepository,
        InMemoryNotificationPublisher,
        InMemoryDocumentDirectory,
    >,
    id: &RequestId,
    action: Action,
    actor: ActorRole,
) {
    match service.apply(id, action, actor, &TransitionPayload::None) {
        Ok(_) => render_state(service, id),
        Err(err) => println!("  Action failed: {err}"),
    }
}

fn render_state(
    service: &RentalService<
        InMemoryRentalRepository,
        InMemoryNotificationPublisher,
        InMemoryDocumentDirectory,
    >,
    id: &RequestId,
) {
    match service.projection(id) {
        Ok(projection) => {
            let amount = projection
                .amount_due
                .map(|due| format!(" | amount due {due}"))
                .unwrap_or_default();
            println!("  Status: {}{}", projection.label, amount);
        }
        Err(err) => println!("  Status unavailable: {err}"),
    }
}

fn render_menu(
    service: &RentalService<
        InMemoryRentalRepository,
        InMemoryNotificationPublisher,
        InMemoryDocumentDirectory,
    >,
    id: &RequestId,
    viewer: ActorRole,
) {
    match service.menu(id, viewer) {
        Ok(menu) => {
            println!("\nActions available to the {}", viewer.label());
            if menu.actions.is_empty() {
                println!("  (view details only)");
            }
            for option in menu.actions {
                let input_note = if option.requires_input {
                    " (requires input)"
                } else {
                    ""
                };
                println!("  - {}{}", option.label, input_note);
            }
        }
        Err(err) => println!("  Menu unavailable: {err}"),
    }
}

fn render_breakdown(breakdown: &PricingBreakdown) {
    println!("  Final daily rate:   {}", breakdown.final_daily_rate);
    println!("  Total rental cost:  {}", breakdown.total_rental_cost);
    println!("  Deposit (refunded): {}", breakdown.deposit_amount);
    println!("  Service fee:        {}", breakdown.service_fee);
    println!("  Total amount due:   {}", breakdown.total_amount_due);
    println!("  Owner receives:     {}", breakdown.owner_receivable);
    println!("  Platform earns:     {}", breakdown.platform_earnings);
}
