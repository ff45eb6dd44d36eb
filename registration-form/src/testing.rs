//! Scripted store doubles for workflow tests.
//!
//! Unscripted calls answer with sensible defaults: `create` echoes the record
//! back with a fresh id, `search` returns the preloaded result set, and
//! `associate` succeeds. Tests preload failures where a scenario needs them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use registration_common::error::StoreError;
use registration_common::event::Event;
use registration_common::participant::{Participant, ParticipantType, PaymentMethod};
use registration_common::store::{EventStore, ParticipantStore, SearchField};

#[derive(Default)]
pub struct ScriptedParticipantStore {
    create_results: Mutex<VecDeque<Result<Participant, StoreError>>>,
    search_results: Mutex<Vec<Participant>>,
    echo_queries: AtomicBool,
    search_delay: Mutex<Option<Duration>>,
    next_id: AtomicI64,
    create_calls: AtomicUsize,
    search_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl ScriptedParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one create outcome; later calls fall back to the echo default.
    pub fn create_err(self, error: StoreError) -> Self {
        self.create_results
            .lock()
            .expect("scripted store lock poisoned")
            .push_back(Err(error));
        self
    }

    pub fn create_ok(self, participant: Participant) -> Self {
        self.create_results
            .lock()
            .expect("scripted store lock poisoned")
            .push_back(Ok(participant));
        self
    }

    /// Result set returned by every search call.
    pub fn search_ret(self, results: Vec<Participant>) -> Self {
        *self
            .search_results
            .lock()
            .expect("scripted store lock poisoned") = results;
        self
    }

    /// Answer each search with a single participant named after the query,
    /// which lets tests tell result sets apart.
    pub fn echo_queries(self) -> Self {
        self.echo_queries.store(true, Ordering::Relaxed);
        self
    }

    pub fn search_delay(self, delay: Duration) -> Self {
        *self
            .search_delay
            .lock()
            .expect("scripted store lock poisoned") = Some(delay);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::Relaxed)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Relaxed)
    }

    /// Queries seen by `search`, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .expect("scripted store lock poisoned")
            .clone()
    }
}

#[async_trait]
impl ParticipantStore for ScriptedParticipantStore {
    async fn create(&self, participant: &Participant) -> Result<Participant, StoreError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        let scripted = self
            .create_results
            .lock()
            .expect("scripted store lock poisoned")
            .pop_front();
        match scripted {
            Some(result) => result,
            None => {
                let mut created = participant.clone();
                created.id = Some(self.next_id.fetch_add(1, Ordering::Relaxed) + 1000);
                Ok(created)
            }
        }
    }

    async fn search(
        &self,
        query: &str,
        _participant_type: Option<ParticipantType>,
        _field: Option<SearchField>,
    ) -> Vec<Participant> {
        self.search_calls.fetch_add(1, Ordering::Relaxed);
        self.queries
            .lock()
            .expect("scripted store lock poisoned")
            .push(query.to_owned());

        let delay = *self
            .search_delay
            .lock()
            .expect("scripted store lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.echo_queries.load(Ordering::Relaxed) {
            return vec![Participant::individual(
                query,
                "Echo",
                "38712345673",
                PaymentMethod::Card,
            )];
        }

        self.search_results
            .lock()
            .expect("scripted store lock poisoned")
            .clone()
    }

    async fn delete_by_id(&self, _id: i64) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedEventStore {
    associate_results: Mutex<VecDeque<Result<(), StoreError>>>,
    disassociate_results: Mutex<VecDeque<Result<(), StoreError>>>,
    event_error: Mutex<Option<StoreError>>,
    participants: Mutex<Vec<Participant>>,
    associate_calls: AtomicUsize,
    associated: Mutex<Vec<i64>>,
}

impl ScriptedEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one associate outcome; later calls fall back to success.
    pub fn associate_err(self, error: StoreError) -> Self {
        self.associate_results
            .lock()
            .expect("scripted store lock poisoned")
            .push_back(Err(error));
        self
    }

    pub fn disassociate_err(self, error: StoreError) -> Self {
        self.disassociate_results
            .lock()
            .expect("scripted store lock poisoned")
            .push_back(Err(error));
        self
    }

    pub fn event_err(self, error: StoreError) -> Self {
        *self.event_error.lock().expect("scripted store lock poisoned") = Some(error);
        self
    }

    pub fn participants_ret(self, participants: Vec<Participant>) -> Self {
        *self
            .participants
            .lock()
            .expect("scripted store lock poisoned") = participants;
        self
    }

    pub fn associate_calls(&self) -> usize {
        self.associate_calls.load(Ordering::Relaxed)
    }

    /// Participant ids passed to `associate`, in call order.
    pub fn associated(&self) -> Vec<i64> {
        self.associated
            .lock()
            .expect("scripted store lock poisoned")
            .clone()
    }
}

#[async_trait]
impl EventStore for ScriptedEventStore {
    async fn event(&self, event_id: i64) -> Result<Event, StoreError> {
        if let Some(error) = self
            .event_error
            .lock()
            .expect("scripted store lock poisoned")
            .take()
        {
            return Err(error);
        }
        Ok(Event {
            id: Some(event_id),
            name: "Suvepäevad".to_owned(),
            date_time: Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap(),
            location: Some("Tallinn".to_owned()),
            status: "UPCOMING".to_owned(),
            additional_info: None,
        })
    }

    async fn participants(&self, _event_id: i64) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .participants
            .lock()
            .expect("scripted store lock poisoned")
            .clone())
    }

    async fn associate(
        &self,
        _event_id: i64,
        participant_id: i64,
        _participant_type: ParticipantType,
    ) -> Result<(), StoreError> {
        self.associate_calls.fetch_add(1, Ordering::Relaxed);
        self.associated
            .lock()
            .expect("scripted store lock poisoned")
            .push(participant_id);

        let scripted = self
            .associate_results
            .lock()
            .expect("scripted store lock poisoned")
            .pop_front();
        scripted.unwrap_or(Ok(()))
    }

    async fn disassociate(&self, _event_id: i64, _participant_id: i64) -> Result<(), StoreError> {
        let scripted = self
            .disassociate_results
            .lock()
            .expect("scripted store lock poisoned")
            .pop_front();
        scripted.unwrap_or(Ok(()))
    }
}
