use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use client_core::{ClientError, MarketplaceApi, MarketplaceClient};
use flows::{
    feedback::{Notice, NoticeContext},
    wizard::{
        booking::{BookingUpdate, ContactPatch, SchedulePatch},
        SubmissionSink, WizardController, WizardError, WizardSchema,
    },
    BookingFlow, ClientRegistration, DashboardStats, FilterField, Filterable,
    HousekeeperRegistration, ListController, PaymentForm, PaymentOutcome, RateRange,
    StepTransition,
};
use shared::{
    domain::{Amount, EmployeeId, MobileOperator, PaymentMethod, ReservationId, ReviewId, TicketId},
    protocol::PaymentLinkRequest,
};
use tracing::info;

use crate::{
    BookArgs, Command, EmployeeFilters, RegistrationKind, ReservationCommand, ReviewCommand,
    TicketCommand,
};

pub async fn run(client: &MarketplaceClient, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = client
                .login(&email, &password)
                .await
                .map_err(|err| surface(NoticeContext::Login, err))?;
            println!(
                "signed in as {} ({:?})",
                session.user.display_name(),
                session.role
            );
        }
        Command::Logout => {
            client.logout().await;
            println!("signed out");
        }
        Command::Whoami => match client.session().current().await {
            Some(session) => println!(
                "{} <{}> role={:?}",
                session.user.display_name(),
                session.user.email,
                session.role
            ),
            None => println!("not signed in"),
        },
        Command::Employees(filters) => list_employees(client, filters).await?,
        Command::Services { category, search } => {
            let services = fetch(client.list_services()).await?;
            let mut list = ListController::new(services);
            apply(&mut list, category.map(FilterField::Service));
            apply(&mut list, search.map(FilterField::Search));
            for service in list.visible() {
                let state = if service.active { "" } else { " (inactive)" };
                println!(
                    "{:<10} {:<28} {:<16} {}{state}",
                    service.id, service.name, service.category, service.price
                );
            }
        }
        Command::Reviews(ReviewCommand::List { search, status }) => {
            let reviews = fetch(client.list_reviews()).await?;
            let mut list = ListController::new(reviews);
            apply(&mut list, status.map(FilterField::Status));
            apply(&mut list, search.map(FilterField::Search));
            for review in list.visible() {
                println!(
                    "{:<10} {}/5 {:<20} {}",
                    review.id, review.rating, review.author_name, review.comment
                );
            }
        }
        Command::Reviews(ReviewCommand::Archive { id }) => {
            let review = fetch(client.archive_review(&ReviewId::new(id))).await?;
            println!("review {} archived", review.id);
        }
        Command::Reservations(ReservationCommand::List { status, search }) => {
            let reservations = fetch(client.list_reservations()).await?;
            let mut list = ListController::new(reservations);
            apply(&mut list, status.map(FilterField::Status));
            apply(&mut list, search.map(FilterField::Search));
            for reservation in list.visible() {
                println!(
                    "{:<10} {:<12} {} {:<20} {}",
                    reservation.id,
                    reservation.status.as_str(),
                    reservation.start_date.format("%Y-%m-%d %H:%M"),
                    reservation.client.name,
                    reservation.amount
                );
            }
        }
        Command::Reservations(ReservationCommand::SetStatus { id, status }) => {
            let reservation = fetch(
                client.update_reservation_status(&ReservationId::new(id), status),
            )
            .await?;
            println!(
                "reservation {} is now {}",
                reservation.id,
                reservation.status.as_str()
            );
        }
        Command::Transactions { status, search } => {
            let transactions = fetch(client.list_transactions()).await?;
            let mut list = ListController::new(transactions);
            apply(&mut list, status.map(FilterField::Status));
            apply(&mut list, search.map(FilterField::Search));
            for tx in list.visible() {
                println!(
                    "{:<10} {:<14} {:<9} {}",
                    tx.id,
                    tx.method.as_str(),
                    tx.status.as_str(),
                    tx.amount
                );
            }
        }
        Command::Tickets(TicketCommand::List { status, search }) => {
            let tickets = fetch(client.list_tickets()).await?;
            let mut list = ListController::new(tickets);
            apply(&mut list, status.map(FilterField::Status));
            apply(&mut list, search.map(FilterField::Search));
            for ticket in list.visible() {
                println!(
                    "{:<10} {:<12} {:<28} {}",
                    ticket.id,
                    ticket.status.as_str(),
                    ticket.requester_email,
                    ticket.subject
                );
            }
        }
        Command::Tickets(TicketCommand::SetStatus { id, status }) => {
            let ticket = fetch(client.update_ticket_status(&TicketId::new(id), status)).await?;
            println!("ticket {} is now {}", ticket.id, ticket.status.as_str());
        }
        Command::Dashboard => {
            let (reservations, transactions, tickets, reviews) = tokio::try_join!(
                client.list_reservations(),
                client.list_transactions(),
                client.list_tickets(),
                client.list_reviews(),
            )
            .map_err(|err| surface(NoticeContext::Listing, err))?;
            let stats = DashboardStats::summarize(&reservations, &transactions, &tickets, &reviews);
            println!("revenue:             {}", stats.revenue);
            println!("failed transactions: {}", stats.failed_transactions);
            println!("open tickets:        {}", stats.open_tickets);
            match stats.average_rating {
                Some(avg) => println!(
                    "reviews:             {} published, {avg:.1}/5",
                    stats.published_reviews
                ),
                None => println!("reviews:             none published"),
            }
            for (status, count) in &stats.reservations_by_status {
                println!("reservations {status:<12} {count}");
            }
        }
        Command::Book(args) => book(client, args).await?,
        Command::PayLink { reservation_id } => {
            let reservation =
                fetch(client.get_reservation(&ReservationId::new(reservation_id))).await?;
            let link = client
                .create_payment_link(&PaymentLinkRequest {
                    reservation_id: reservation.id.clone(),
                    amount: reservation.amount,
                })
                .await
                .map_err(|err| surface(NoticeContext::Payment, err))?;
            println!("pay {} at {}", reservation.amount, link.url);
        }
        Command::Register { kind, file } => {
            let updates = read_updates(&file)?;
            match kind {
                RegistrationKind::Client => {
                    let receipt =
                        run_wizard(WizardController::<ClientRegistration>::new(), updates, client)
                            .await?;
                    println!("client account {} created", receipt.id);
                }
                RegistrationKind::Housekeeper => {
                    let employee = run_wizard(
                        WizardController::<HousekeeperRegistration>::new(),
                        updates,
                        client,
                    )
                    .await?;
                    println!(
                        "housekeeper {} registered as {}",
                        employee.full_name(),
                        employee.id
                    );
                }
            }
        }
    }
    Ok(())
}

/// Turns an API failure into the message a user should see.
fn surface(context: NoticeContext, err: ClientError) -> anyhow::Error {
    let notice = Notice::from_client_error(context, &err);
    if notice.requires_reauth() {
        anyhow::anyhow!("{} (run `marketplace login`)", notice.message())
    } else {
        anyhow::Error::new(err).context(notice.message().to_string())
    }
}

async fn fetch<T>(call: impl std::future::Future<Output = Result<T, ClientError>>) -> Result<T> {
    call.await.map_err(|err| surface(NoticeContext::Listing, err))
}

fn apply<T: Filterable>(list: &mut ListController<T>, field: Option<FilterField>) {
    if let Some(field) = field {
        list.set_filter(field);
    }
}

async fn list_employees(client: &MarketplaceClient, filters: EmployeeFilters) -> Result<()> {
    let employees = fetch(client.list_employees()).await?;
    let mut list = ListController::new(employees);
    apply(&mut list, filters.service.map(FilterField::Service));
    apply(&mut list, filters.location.map(FilterField::Location));
    apply(&mut list, filters.search.map(FilterField::Search));
    apply(&mut list, filters.status.map(FilterField::Status));
    list.set_filter(FilterField::Rate(RateRange {
        min: filters.min_rate.map(Amount),
        max: filters.max_rate.map(Amount),
    }));

    let visible = list.visible();
    for employee in &visible {
        println!(
            "{:<10} {:<24} {:<14} {:<12} {}/h {}",
            employee.id,
            employee.full_name(),
            employee.service,
            employee.location,
            employee.hourly_rate,
            employee.status.as_str()
        );
    }
    println!("{} of {} employees", visible.len(), list.source().len());
    Ok(())
}

fn read_updates(path: &Path) -> Result<Vec<serde_json::Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("'{}' must hold a JSON array of section updates", path.display()))
}

async fn run_wizard<S, K>(
    mut wizard: WizardController<S>,
    updates: Vec<serde_json::Value>,
    sink: &K,
) -> Result<S::Receipt>
where
    S: WizardSchema,
    K: SubmissionSink<S>,
{
    for update in updates {
        wizard.update_section_json(update)?;
    }
    while !wizard.is_on_submit_step() {
        match wizard.next() {
            StepTransition::Moved { to, .. } => info!(wizard = S::NAME, step = to, "step complete"),
            StepTransition::Blocked { missing } => bail!(
                "step {} of {} is missing: {}",
                wizard.current_step() + 1,
                wizard.total_steps(),
                missing.join(", ")
            ),
            StepTransition::Unchanged { .. } | StepTransition::Locked => break,
        }
    }
    match wizard.submit(sink).await {
        Ok(receipt) => Ok(receipt),
        Err(WizardError::Submission(err)) => Err(surface(NoticeContext::Registration, err)),
        Err(err) => Err(err.into()),
    }
}

fn parse_operator(raw: &str) -> Result<MobileOperator> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "wave" => Ok(MobileOperator::Wave),
        "orange_money" | "orange" => Ok(MobileOperator::OrangeMoney),
        "free_money" | "free" => Ok(MobileOperator::FreeMoney),
        other => bail!("unknown mobile money operator '{other}'"),
    }
}

fn payment_form(args: &BookArgs) -> Result<PaymentForm> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    Ok(match args.method {
        PaymentMethod::MobileMoney => PaymentForm::mobile_money(
            args.pay_phone.clone().unwrap_or_else(|| args.phone.clone()),
            parse_operator(&args.operator)?,
        ),
        PaymentMethod::Card => PaymentForm {
            card_holder: args.name.clone(),
            ..PaymentForm::card(
                text(&args.card_number),
                text(&args.card_expiry),
                text(&args.card_cvc),
            )
        },
        PaymentMethod::BankTransfer => PaymentForm::bank_transfer(
            args.account_holder.clone().unwrap_or_else(|| args.name.clone()),
        ),
    })
}

async fn book(client: &MarketplaceClient, args: BookArgs) -> Result<()> {
    let form = payment_form(&args)?;
    let employee = fetch(client.get_employee(&EmployeeId::new(args.employee_id.clone()))).await?;
    let mut flow = BookingFlow::new(&employee).on_complete(|done| {
        println!(
            "reservation {} paid ({}), payment {}",
            done.reservation_id, done.amount, done.payment_id
        );
    });

    let wizard = flow.wizard_mut();
    wizard.update_section(BookingUpdate::Schedule(SchedulePatch {
        service_id: Some(args.service),
        start_date: Some(args.start),
        duration_hours: args.hours.map(|hours| hours.to_string()),
        notes: args.notes,
    }));
    if let StepTransition::Blocked { missing } = wizard.next() {
        bail!("booking is missing: {}", missing.join(", "));
    }
    wizard.update_section(BookingUpdate::Contact(ContactPatch {
        address: Some(args.address),
        name: Some(args.name),
        phone: Some(args.phone),
        email: args.email,
    }));

    let reservation = match flow.submit_booking(client).await {
        Ok(reservation) => reservation.clone(),
        Err(flows::HandoffError::Wizard(WizardError::Submission(err))) => {
            return Err(surface(NoticeContext::Booking, err))
        }
        Err(err) => return Err(err.into()),
    };
    println!(
        "reservation {} created with {} for {}",
        reservation.id,
        employee.full_name(),
        reservation.amount
    );

    match flow.pay(client, &form).await? {
        PaymentOutcome::Paid { .. } => {}
        PaymentOutcome::Redirect { url } => println!("finish the payment at {url}"),
        PaymentOutcome::Failed { notice } => {
            println!("payment failed: {}", notice.message());
            println!(
                "reservation {} is kept; run `marketplace pay-link {}` to pay later",
                reservation.id, reservation.id
            );
        }
    }
    Ok(())
}
