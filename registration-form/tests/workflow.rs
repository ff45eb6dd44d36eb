//! End-to-end workflow tests against the in-memory stores, which reproduce
//! the backend's conflict and validation behavior.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use registration_common::event::Event;
use registration_common::memory::{MemoryEventStore, MemoryParticipantStore};
use registration_common::participant::{Participant, ParticipantType, PaymentMethod};
use registration_common::store::EventStore;
use registration_form::errors::{ErrorKind, FieldError};
use registration_form::policy::Field;
use registration_form::{RegistrationForm, SubmitResult};

const DEBOUNCE: Duration = Duration::from_millis(10);

/// Passes the Estonian personal-code checksum the participant store enforces.
const VALID_PERSONAL_CODE: &str = "37605030299";
const OTHER_VALID_PERSONAL_CODE: &str = "49003112349";

struct Fixture {
    participants: Arc<MemoryParticipantStore>,
    events: Arc<MemoryEventStore>,
    event_id: i64,
}

fn fixture() -> Fixture {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let participants = Arc::new(MemoryParticipantStore::new());
    let events = Arc::new(MemoryEventStore::new(Arc::clone(&participants)));
    let event_id = events.insert_event(Event {
        id: None,
        name: "Suvepäevad".to_owned(),
        date_time: Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap(),
        location: Some("Tallinn".to_owned()),
        status: "UPCOMING".to_owned(),
        additional_info: None,
    });

    Fixture {
        participants,
        events,
        event_id,
    }
}

impl Fixture {
    fn form(&self) -> RegistrationForm {
        RegistrationForm::new(
            self.participants.clone(),
            self.events.clone(),
            self.event_id,
            DEBOUNCE,
        )
    }

    fn fill_individual(&self, form: &RegistrationForm, personal_code: &str) {
        form.set_field(Field::FirstName, "Jane");
        form.set_field(Field::LastName, "Smith");
        form.set_field(Field::PersonalCode, personal_code);
        form.set_field(Field::PaymentMethod, "CARD");
    }
}

#[tokio::test]
async fn fresh_individual_registers_with_one_create_and_one_associate() {
    let fixture = fixture();
    let form = fixture.form();
    form.load().await;
    fixture.fill_individual(&form, VALID_PERSONAL_CODE);

    let result = form.submit().await;
    let SubmitResult::Completed(participant) = result else {
        panic!("expected completion, got {result:?}");
    };

    assert_eq!(fixture.participants.create_calls(), 1);
    assert_eq!(fixture.participants.search_calls(), 0);
    assert_eq!(fixture.events.associate_calls(), 1);
    assert_eq!(
        participant.personal_code.as_deref(),
        Some(VALID_PERSONAL_CODE)
    );

    let snapshot = form.snapshot();
    assert_eq!(snapshot.participants.len(), 1);
    // The form itself is back to its defaults.
    assert_eq!(snapshot.participant_type, Some(ParticipantType::Individual));
    assert_eq!(snapshot.values[&Field::PersonalCode], "");
    assert!(snapshot.touched.is_empty());
}

#[tokio::test]
async fn existing_participant_is_recovered_instead_of_duplicated() {
    let fixture = fixture();
    let existing_id = fixture.participants.insert(Participant::individual(
        "Jane",
        "Smith",
        VALID_PERSONAL_CODE,
        PaymentMethod::Card,
    ));

    let form = fixture.form();
    form.load().await;
    fixture.fill_individual(&form, VALID_PERSONAL_CODE);

    let result = form.submit().await;
    let SubmitResult::Completed(participant) = result else {
        panic!("expected recovery to complete, got {result:?}");
    };

    assert_eq!(participant.id, Some(existing_id));
    assert_eq!(fixture.participants.create_calls(), 1);
    assert_eq!(fixture.participants.search_calls(), 1);
    assert_eq!(fixture.events.associate_calls(), 1);
    // No duplicate record was created.
    assert_eq!(fixture.participants.len(), 1);
}

#[tokio::test]
async fn already_associated_participant_fails_with_identity_field_error() {
    let fixture = fixture();
    let existing_id = fixture.participants.insert(Participant::individual(
        "Jane",
        "Smith",
        VALID_PERSONAL_CODE,
        PaymentMethod::Card,
    ));
    fixture
        .events
        .associate(fixture.event_id, existing_id, ParticipantType::Individual)
        .await
        .expect("seeded association");

    let form = fixture.form();
    form.load().await;
    fixture.fill_individual(&form, VALID_PERSONAL_CODE);

    let result = form.submit().await;
    assert_eq!(
        result,
        SubmitResult::Failed(ErrorKind::ParticipantAlreadyAdded)
    );

    let snapshot = form.snapshot();
    assert_eq!(
        snapshot.form_error,
        Some(ErrorKind::ParticipantAlreadyAdded)
    );
    assert_eq!(
        snapshot.field_errors.get(&Field::PersonalCode),
        Some(&FieldError::Server(ErrorKind::DuplicatePersonalCode))
    );
    // The visible list still holds just the seeded association.
    assert_eq!(snapshot.participants.len(), 1);
}

#[tokio::test]
async fn server_rejected_personal_code_targets_the_field() {
    let fixture = fixture();
    let form = fixture.form();
    form.load().await;
    // Valid shape, wrong checksum: only the server catches this.
    fixture.fill_individual(&form, "38712345678");

    let result = form.submit().await;
    assert_eq!(result, SubmitResult::Failed(ErrorKind::InvalidPersonalCode));

    let snapshot = form.snapshot();
    assert_eq!(
        snapshot.field_errors.get(&Field::PersonalCode),
        Some(&FieldError::Server(ErrorKind::InvalidPersonalCode))
    );
    assert_eq!(fixture.events.associate_calls(), 0);
}

#[tokio::test]
async fn organization_registration_roundtrip() {
    let fixture = fixture();
    let form = fixture.form();
    form.load().await;

    form.set_participant_type(Some(ParticipantType::Organization));
    form.set_field(Field::CompanyName, "Acme OÜ");
    form.set_field(Field::RegistrationCode, "12345678");
    form.set_field(Field::ParticipantCount, "4");
    form.set_field(Field::PaymentMethod, "BANK_TRANSFER");

    let result = form.submit().await;
    let SubmitResult::Completed(participant) = result else {
        panic!("expected completion, got {result:?}");
    };
    assert_eq!(participant.participant_type, ParticipantType::Organization);
    assert_eq!(participant.participant_count, Some(4));
    assert!(participant.personal_code.is_none());
}

#[tokio::test]
async fn suggestions_exclude_participants_already_on_the_event() {
    let fixture = fixture();
    let jane_id = fixture.participants.insert(Participant::individual(
        "Jane",
        "Smith",
        VALID_PERSONAL_CODE,
        PaymentMethod::Card,
    ));
    let janet_id = fixture.participants.insert(Participant::individual(
        "Janet",
        "Jones",
        OTHER_VALID_PERSONAL_CODE,
        PaymentMethod::Cash,
    ));
    fixture
        .events
        .associate(fixture.event_id, jane_id, ParticipantType::Individual)
        .await
        .expect("seeded association");

    let form = fixture.form();
    form.load().await;

    let results = form.observe(Field::FirstName).expect("tracked field");
    form.set_field(Field::FirstName, "Jan");
    tokio::time::sleep(DEBOUNCE * 10).await;

    let published = results.borrow().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, Some(janet_id));
}

#[tokio::test]
async fn selecting_a_suggestion_then_submitting_uses_the_existing_record() {
    let fixture = fixture();
    let existing_id = fixture.participants.insert(Participant::individual(
        "Mari",
        "Maasikas",
        OTHER_VALID_PERSONAL_CODE,
        PaymentMethod::Cash,
    ));

    let form = fixture.form();
    form.load().await;

    let candidate = fixture
        .participants
        .get(existing_id)
        .expect("seeded participant");
    form.select_suggestion(&candidate);

    let snapshot = form.snapshot();
    assert_eq!(snapshot.values[&Field::FirstName], "Mari");
    assert_eq!(
        snapshot.values[&Field::PersonalCode],
        OTHER_VALID_PERSONAL_CODE
    );

    let result = form.submit().await;
    let SubmitResult::Completed(participant) = result else {
        panic!("expected completion, got {result:?}");
    };
    assert_eq!(participant.id, Some(existing_id));
    assert_eq!(fixture.participants.len(), 1);
}

#[tokio::test]
async fn delete_association_frees_the_participant_for_resubmission() {
    let fixture = fixture();
    let form = fixture.form();
    form.load().await;
    fixture.fill_individual(&form, VALID_PERSONAL_CODE);

    let SubmitResult::Completed(participant) = form.submit().await else {
        panic!("expected completion");
    };
    let participant_id = participant.id.expect("assigned id");

    form.delete_association(participant_id)
        .await
        .expect("removes");
    assert!(form.snapshot().participants.is_empty());

    // The same participant can be added again afterwards.
    fixture.fill_individual(&form, VALID_PERSONAL_CODE);
    let result = form.submit().await;
    let SubmitResult::Completed(again) = result else {
        panic!("expected resubmission to complete, got {result:?}");
    };
    assert_eq!(again.id, Some(participant_id));
}

#[tokio::test]
async fn unknown_event_surfaces_a_load_error() {
    let fixture = fixture();
    let form = RegistrationForm::new(
        fixture.participants.clone(),
        fixture.events.clone(),
        fixture.event_id + 100,
        DEBOUNCE,
    );

    form.load().await;
    assert_eq!(form.snapshot().form_error, Some(ErrorKind::EventLoadFailed));
}
