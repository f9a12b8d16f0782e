use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use shared::{
    domain::{Amount, EmployeeId, ReservationId, ReservationStatus, UserId},
    error::ApiError,
    protocol::{ClientRegistrationRequest, RegistrationReceipt, Reservation, ReservationRequest},
};

use super::*;
use crate::{
    events::WizardEvent,
    wizard::{
        booking::{
            Booking, BookingContext, BookingSections, BookingUpdate, ContactPatch, SchedulePatch,
        },
        client_registration::{
            ClientRegistration, ClientRegistrationUpdate, ClientSections, PreferencesPatch,
        },
        housekeeper_registration::{
            DocumentsPatch, ExperiencePatch, HousekeeperRegistration,
            HousekeeperRegistrationUpdate,
        },
    },
};

struct RegistrationSink {
    fail_with: Option<u16>,
    calls: AtomicUsize,
}

impl RegistrationSink {
    fn accepting() -> Self {
        Self {
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SubmissionSink<ClientRegistration> for RegistrationSink {
    async fn deliver(
        &self,
        submission: &ClientRegistrationRequest,
    ) -> Result<RegistrationReceipt, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(submission.first_name, "Awa");
        match self.fail_with {
            Some(status) => Err(ClientError::Api(ApiError::from_status(
                status,
                Some("Adresse e-mail déjà utilisée".to_string()),
            ))),
            None => Ok(RegistrationReceipt {
                id: UserId::new("u-42"),
            }),
        }
    }
}

struct ReservationSink;

#[async_trait]
impl SubmissionSink<Booking> for ReservationSink {
    async fn deliver(&self, submission: &ReservationRequest) -> Result<Reservation, ClientError> {
        Ok(Reservation {
            id: ReservationId::new("r-1"),
            employee: submission.employee.clone(),
            service: submission.service.clone(),
            start_date: submission.start_date,
            address: submission.address.clone(),
            client: submission.client.clone(),
            status: ReservationStatus::Pending,
            amount: submission.amount,
            notes: submission.notes.clone(),
        })
    }
}

fn personal_patch() -> PersonalInfoPatch {
    PersonalInfoPatch {
        first_name: Some("Awa".to_string()),
        last_name: Some("Diop".to_string()),
        email: Some("awa@example.sn".to_string()),
        phone: Some("+221771234567".to_string()),
        address: Some("Sacré-Coeur 3, Dakar".to_string()),
    }
}

fn client_wizard_at_submit_step() -> WizardController<ClientRegistration> {
    let mut wizard = WizardController::<ClientRegistration>::new();
    wizard.update_section(ClientRegistrationUpdate::PersonalInfo(personal_patch()));
    assert!(wizard.next().is_moved());
    wizard.update_section(ClientRegistrationUpdate::Preferences(PreferencesPatch {
        service_type: Some("housekeeping".to_string()),
        frequency: Some("weekly".to_string()),
        ..PreferencesPatch::default()
    }));
    assert!(wizard.next().is_moved());
    assert_eq!(wizard.current_step(), 2);
    wizard
}

fn drain(rx: &crossbeam_channel::Receiver<WizardEvent>) -> Vec<WizardEvent> {
    rx.try_iter().collect()
}

#[test]
fn next_is_blocked_until_required_fields_are_filled() {
    let mut wizard = WizardController::<ClientRegistration>::new();
    wizard.update_section(ClientRegistrationUpdate::PersonalInfo(PersonalInfoPatch {
        first_name: Some("Awa".to_string()),
        email: Some("   ".to_string()),
        ..PersonalInfoPatch::default()
    }));
    let before = wizard.sections().clone();

    let transition = wizard.next();

    assert_eq!(
        transition,
        StepTransition::Blocked {
            missing: vec!["lastName", "email", "phone", "address"]
        }
    );
    assert_eq!(wizard.current_step(), 0);
    assert_eq!(wizard.sections(), &before);
    assert!(!wizard.can_advance());
}

#[test]
fn partial_updates_only_touch_provided_fields() {
    let mut wizard = WizardController::<ClientRegistration>::new();
    wizard.update_section(ClientRegistrationUpdate::PersonalInfo(personal_patch()));
    wizard.update_section(ClientRegistrationUpdate::PersonalInfo(PersonalInfoPatch {
        phone: Some("+221780000000".to_string()),
        ..PersonalInfoPatch::default()
    }));

    let personal = &wizard.sections().personal_info;
    assert_eq!(personal.first_name, "Awa");
    assert_eq!(personal.phone, "+221780000000");
}

#[test]
fn next_stops_at_the_submit_step_and_previous_clamps_at_zero() {
    let mut wizard = client_wizard_at_submit_step();

    assert_eq!(wizard.next(), StepTransition::Unchanged { step: 2 });
    assert_eq!(wizard.current_step(), 2);

    assert_eq!(wizard.previous(), StepTransition::Moved { from: 2, to: 1 });
    assert_eq!(wizard.previous(), StepTransition::Moved { from: 1, to: 0 });
    assert_eq!(wizard.previous(), StepTransition::Unchanged { step: 0 });
    assert_eq!(wizard.current_step(), 0);
}

#[tokio::test]
async fn successful_submit_moves_to_confirmation() {
    let mut wizard = client_wizard_at_submit_step();
    let events = wizard.subscribe();
    let sink = RegistrationSink::accepting();

    let receipt = wizard.submit(&sink).await.expect("submit");

    assert_eq!(receipt.id, UserId::new("u-42"));
    assert_eq!(wizard.current_step(), 3);
    assert!(wizard.is_completed());
    assert!(!wizard.is_submitting());
    assert_eq!(
        drain(&events),
        vec![
            WizardEvent::SubmitStarted { step: 2 },
            WizardEvent::SubmitSucceeded { step: 2 },
            WizardEvent::StepAdvanced { from: 2, to: 3 },
        ]
    );
    assert_eq!(wizard.previous(), StepTransition::Locked);
}

#[tokio::test]
async fn failed_submit_stays_on_step_and_surfaces_the_server_message() {
    let mut wizard = client_wizard_at_submit_step();
    let events = wizard.subscribe();
    let sink = RegistrationSink::failing(409);

    let err = wizard.submit(&sink).await.expect_err("should fail");

    assert!(matches!(err, WizardError::Submission(_)));
    assert_eq!(wizard.current_step(), 2);
    assert!(!wizard.is_submitting());
    assert!(!wizard.is_completed());
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

    let received = drain(&events);
    match received.last() {
        Some(WizardEvent::SubmitFailed { step, notice }) => {
            assert_eq!(*step, 2);
            assert_eq!(notice.message(), "Adresse e-mail déjà utilisée");
        }
        other => panic!("unexpected last event: {other:?}"),
    }

    let retry = RegistrationSink::accepting();
    wizard.submit(&retry).await.expect("second submit");
    assert_eq!(wizard.current_step(), 3);
}

#[test]
fn submit_is_exclusive_while_in_flight() {
    let mut wizard = client_wizard_at_submit_step();

    let submission = wizard.begin_submit().expect("begin");
    assert_eq!(submission.service_type, "housekeeping");
    assert!(wizard.is_submitting());

    assert!(matches!(
        wizard.begin_submit(),
        Err(WizardError::AlreadySubmitting)
    ));
    assert_eq!(wizard.previous(), StepTransition::Locked);
    assert_eq!(wizard.next(), StepTransition::Locked);

    let result: Result<RegistrationReceipt, ClientError> = Err(ClientError::Timeout {
        endpoint: "clients/register".to_string(),
    });
    assert!(wizard.complete_submit(result).is_err());
    assert!(!wizard.is_submitting());
    assert!(matches!(
        wizard.complete_submit::<()>(Ok(())),
        Err(WizardError::NotSubmitting)
    ));
}

#[test]
fn submit_is_rejected_away_from_the_submit_step() {
    let mut wizard = WizardController::<ClientRegistration>::new();
    assert!(matches!(
        wizard.begin_submit(),
        Err(WizardError::NotAtSubmitStep {
            current: 0,
            expected: 2
        })
    ));
    assert!(!wizard.is_submitting());
}

#[test]
fn json_updates_reject_unknown_sections_and_fields() {
    let mut wizard = WizardController::<ClientRegistration>::new();

    wizard
        .update_section_json(json!({
            "section": "preferences",
            "data": { "serviceType": "cooking", "household": ["2 adultes"] }
        }))
        .expect("known fields");
    assert_eq!(wizard.sections().preferences.service_type, "cooking");
    assert_eq!(wizard.sections().preferences.household, vec!["2 adultes"]);

    let unknown_field = wizard.update_section_json(json!({
        "section": "preferences",
        "data": { "favouriteColour": "blue" }
    }));
    assert!(matches!(unknown_field, Err(WizardError::InvalidUpdate(_))));

    let unknown_section = wizard.update_section_json(json!({
        "section": "payment",
        "data": {}
    }));
    assert!(matches!(unknown_section, Err(WizardError::InvalidUpdate(_))));
    assert_eq!(wizard.sections().preferences.service_type, "cooking");
}

#[test]
fn housekeeper_documents_step_requires_an_id_document() {
    let mut wizard = WizardController::<HousekeeperRegistration>::new();
    wizard.update_section(HousekeeperRegistrationUpdate::PersonalInfo(personal_patch()));
    assert!(wizard.next().is_moved());

    assert_eq!(
        wizard.next(),
        StepTransition::Blocked {
            missing: vec!["serviceCategory", "yearsOfExperience"]
        }
    );
    wizard.update_section(HousekeeperRegistrationUpdate::Experience(ExperiencePatch {
        service_category: Some("nanny".to_string()),
        years_of_experience: Some("trois".to_string()),
        ..ExperiencePatch::default()
    }));
    assert!(wizard.next().is_moved());
    assert_eq!(
        wizard.next(),
        StepTransition::Blocked {
            missing: vec!["idDocument"]
        }
    );

    wizard.update_section(HousekeeperRegistrationUpdate::Documents(DocumentsPatch {
        id_document: Some("CNI 1 234 5678 90123".to_string()),
        ..DocumentsPatch::default()
    }));
    assert!(matches!(
        wizard.begin_submit(),
        Err(WizardError::InvalidField {
            field: "yearsOfExperience",
            ..
        })
    ));
    assert!(!wizard.is_submitting());

    wizard.update_section(HousekeeperRegistrationUpdate::Experience(ExperiencePatch {
        years_of_experience: Some(" 3 ".to_string()),
        ..ExperiencePatch::default()
    }));
    let request = wizard.begin_submit().expect("begin");
    assert_eq!(request.years_of_experience, 3);
    assert_eq!(request.id_document, "CNI 1 234 5678 90123");
}

#[tokio::test]
async fn booking_submits_on_its_last_step_and_completes_in_place() {
    let mut wizard = WizardController::<Booking>::with_sections(BookingSections {
        context: BookingContext {
            employee: Some(EmployeeId::new("e-7")),
            unit_price: Amount(3_000),
        },
        ..BookingSections::default()
    });
    let events = wizard.subscribe();

    wizard.update_section(BookingUpdate::Schedule(SchedulePatch {
        service_id: Some("svc-menage".to_string()),
        start_date: Some("2026-11-02T09:00".to_string()),
        duration_hours: Some("3".to_string()),
        ..SchedulePatch::default()
    }));
    assert!(wizard.next().is_moved());
    assert_eq!(
        wizard.next(),
        StepTransition::Blocked {
            missing: vec!["address", "name", "phone"]
        }
    );
    wizard.update_section(BookingUpdate::Contact(ContactPatch {
        address: Some("Mermoz, Dakar".to_string()),
        name: Some("Awa Diop".to_string()),
        phone: Some("+221771234567".to_string()),
        email: None,
    }));

    let reservation = wizard.submit(&ReservationSink).await.expect("booked");

    assert_eq!(reservation.amount, Amount(9_000));
    assert_eq!(reservation.employee, Some(EmployeeId::new("e-7")));
    assert_eq!(wizard.current_step(), 1);
    assert!(wizard.is_completed());
    assert!(!drain(&events)
        .iter()
        .any(|event| matches!(event, WizardEvent::StepAdvanced { from: 1, .. })));
}

#[test]
fn reset_restores_initial_sections() {
    let mut wizard = client_wizard_at_submit_step();
    let events = wizard.subscribe();

    wizard.reset();

    assert_eq!(wizard.current_step(), 0);
    assert_eq!(wizard.sections(), &ClientSections::default());
    assert!(!wizard.is_completed());
    assert_eq!(drain(&events), vec![WizardEvent::Reset]);
}
