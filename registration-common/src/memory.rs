use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::StoreError;
use crate::event::Event;
use crate::participant::{Participant, ParticipantType};
use crate::store::{EventStore, ParticipantStore, SearchField};

static PERSONAL_CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-6]\d{10}$").expect("personal code regex compiles"));
static REGISTRATION_CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("registration code regex compiles"));

/// Checksum of an Estonian personal code: a weighted sum of the first ten
/// digits modulo 11, with a second weight row when the first yields 10.
fn personal_code_checksum_ok(code: &str) -> bool {
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }

    let weights1 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 1];
    let weights2 = [3, 4, 5, 6, 7, 8, 9, 1, 2, 3];

    let sum: u32 = digits[..10].iter().zip(weights1).map(|(d, w)| d * w).sum();
    let mut checksum = sum % 11;
    if checksum == 10 {
        let sum: u32 = digits[..10].iter().zip(weights2).map(|(d, w)| d * w).sum();
        checksum = sum % 11;
        if checksum == 10 {
            checksum = 0;
        }
    }

    checksum == digits[10]
}

fn validate_personal_code(personal_code: Option<&str>) -> Result<(), StoreError> {
    let code = personal_code.unwrap_or_default();
    if !PERSONAL_CODE_FORMAT.is_match(code) {
        return Err(StoreError::response(
            StatusCode::BAD_REQUEST,
            "Invalid Estonian personal code format",
        ));
    }
    if !personal_code_checksum_ok(code) {
        return Err(StoreError::response(
            StatusCode::BAD_REQUEST,
            "Invalid Estonian personal code checksum",
        ));
    }
    Ok(())
}

fn validate_registration_code(registration_code: Option<&str>) -> Result<(), StoreError> {
    if !REGISTRATION_CODE_FORMAT.is_match(registration_code.unwrap_or_default()) {
        return Err(StoreError::response(
            StatusCode::BAD_REQUEST,
            "Invalid registration code format: must be 8 digits",
        ));
    }
    Ok(())
}

fn field_value<'p>(participant: &'p Participant, field: SearchField) -> Option<&'p str> {
    match field {
        SearchField::FirstName => participant.first_name.as_deref(),
        SearchField::LastName => participant.last_name.as_deref(),
        SearchField::CompanyName => participant.company_name.as_deref(),
        SearchField::PersonalCode => participant.personal_code.as_deref(),
        SearchField::RegistrationCode => participant.registration_code.as_deref(),
    }
}

/// In-memory `ParticipantStore` reproducing the registration backend's
/// observable conflict and validation behavior. Used by tests across the
/// workspace.
#[derive(Default)]
pub struct MemoryParticipantStore {
    participants: Mutex<Vec<Participant>>,
    next_id: AtomicI64,
    create_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MemoryParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a participant without going through creation-time validation.
    /// Returns the assigned id.
    pub fn insert(&self, mut participant: Participant) -> i64 {
        let id = participant
            .id
            .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        participant.id = Some(id);
        self.participants
            .lock()
            .expect("participant store lock poisoned")
            .push(participant);
        id
    }

    pub fn get(&self, id: i64) -> Option<Participant> {
        self.participants
            .lock()
            .expect("participant store lock poisoned")
            .iter()
            .find(|p| p.id == Some(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.participants
            .lock()
            .expect("participant store lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ParticipantStore for MemoryParticipantStore {
    async fn create(&self, participant: &Participant) -> Result<Participant, StoreError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        let mut stored = participant.clone();
        match stored.participant_type {
            ParticipantType::Individual => {
                validate_personal_code(stored.personal_code.as_deref())?;
                let taken = {
                    let participants = self
                        .participants
                        .lock()
                        .expect("participant store lock poisoned");
                    participants
                        .iter()
                        .any(|p| p.personal_code == stored.personal_code)
                };
                if taken {
                    return Err(StoreError::response(
                        StatusCode::CONFLICT,
                        "Participant with this personal code already exists",
                    ));
                }
            }
            ParticipantType::Organization => {
                validate_registration_code(stored.registration_code.as_deref())?;
                let taken = {
                    let participants = self
                        .participants
                        .lock()
                        .expect("participant store lock poisoned");
                    participants
                        .iter()
                        .any(|p| p.registration_code == stored.registration_code)
                };
                if taken {
                    return Err(StoreError::response(
                        StatusCode::CONFLICT,
                        "Participant with this registration code already exists",
                    ));
                }
                // The backend quietly floors a missing or non-positive count.
                if stored.participant_count.is_none_or(|count| count < 1) {
                    stored.participant_count = Some(1);
                }
            }
        }

        let limit = stored.participant_type.additional_info_max_length();
        if stored
            .additional_info
            .as_deref()
            .is_some_and(|info| info.chars().count() > limit)
        {
            return Err(StoreError::response(
                StatusCode::BAD_REQUEST,
                "additional info exceeds maximum length",
            ));
        }

        stored.id = Some(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.participants
            .lock()
            .expect("participant store lock poisoned")
            .push(stored.clone());

        Ok(stored)
    }

    async fn search(
        &self,
        query: &str,
        participant_type: Option<ParticipantType>,
        field: Option<SearchField>,
    ) -> Vec<Participant> {
        self.search_calls.fetch_add(1, Ordering::Relaxed);

        let needle = query.to_lowercase();
        self.participants
            .lock()
            .expect("participant store lock poisoned")
            .iter()
            .filter(|p| participant_type.is_none_or(|t| p.participant_type == t))
            .filter(|p| match field {
                Some(field) => field_value(p, field)
                    .is_some_and(|value| value.to_lowercase().contains(&needle)),
                None => [
                    p.first_name.as_deref(),
                    p.last_name.as_deref(),
                    p.company_name.as_deref(),
                    p.personal_code.as_deref(),
                    p.registration_code.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|value| value.to_lowercase().contains(&needle)),
            })
            .cloned()
            .collect()
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let mut participants = self
            .participants
            .lock()
            .expect("participant store lock poisoned");
        let before = participants.len();
        participants.retain(|p| p.id != Some(id));
        if participants.len() == before {
            return Err(StoreError::response(
                StatusCode::NOT_FOUND,
                format!("Participant not found with id: {id}"),
            ));
        }
        Ok(())
    }
}

/// In-memory `EventStore`. Associations resolve their participants through a
/// shared `MemoryParticipantStore`, the way the backend joins the two tables.
pub struct MemoryEventStore {
    participant_store: Arc<MemoryParticipantStore>,
    events: Mutex<HashMap<i64, Event>>,
    associations: Mutex<HashSet<(i64, i64)>>,
    next_event_id: AtomicI64,
    associate_calls: AtomicUsize,
}

impl MemoryEventStore {
    pub fn new(participant_store: Arc<MemoryParticipantStore>) -> Self {
        MemoryEventStore {
            participant_store,
            events: Mutex::new(HashMap::new()),
            associations: Mutex::new(HashSet::new()),
            next_event_id: AtomicI64::new(0),
            associate_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert_event(&self, mut event: Event) -> i64 {
        let id = event
            .id
            .unwrap_or_else(|| self.next_event_id.fetch_add(1, Ordering::Relaxed) + 1);
        event.id = Some(id);
        self.events
            .lock()
            .expect("event store lock poisoned")
            .insert(id, event);
        id
    }

    pub fn associate_calls(&self) -> usize {
        self.associate_calls.load(Ordering::Relaxed)
    }

    fn require_event(&self, event_id: i64) -> Result<Event, StoreError> {
        self.events
            .lock()
            .expect("event store lock poisoned")
            .get(&event_id)
            .cloned()
            .ok_or_else(|| StoreError::response(StatusCode::NOT_FOUND, "Event not found"))
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn event(&self, event_id: i64) -> Result<Event, StoreError> {
        self.require_event(event_id)
    }

    async fn participants(&self, event_id: i64) -> Result<Vec<Participant>, StoreError> {
        self.require_event(event_id)?;
        let associations = self
            .associations
            .lock()
            .expect("event store lock poisoned");
        Ok(associations
            .iter()
            .filter(|(event, _)| *event == event_id)
            .filter_map(|(_, participant)| self.participant_store.get(*participant))
            .collect())
    }

    async fn associate(
        &self,
        event_id: i64,
        participant_id: i64,
        _participant_type: ParticipantType,
    ) -> Result<(), StoreError> {
        self.associate_calls.fetch_add(1, Ordering::Relaxed);

        self.require_event(event_id)?;
        if self.participant_store.get(participant_id).is_none() {
            return Err(StoreError::response(
                StatusCode::NOT_FOUND,
                "Participant not found",
            ));
        }

        let mut associations = self
            .associations
            .lock()
            .expect("event store lock poisoned");
        if !associations.insert((event_id, participant_id)) {
            return Err(StoreError::response(
                StatusCode::CONFLICT,
                "Participant already registered to event",
            ));
        }
        Ok(())
    }

    async fn disassociate(&self, event_id: i64, participant_id: i64) -> Result<(), StoreError> {
        self.require_event(event_id)?;
        self.associations
            .lock()
            .expect("event store lock poisoned")
            .remove(&(event_id, participant_id));
        Ok(())
    }
}
