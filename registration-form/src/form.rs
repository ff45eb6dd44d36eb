use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::instrument;

use registration_common::event::Event;
use registration_common::participant::{Participant, ParticipantType};
use registration_common::store::{EventStore, ParticipantStore, SearchField};

use crate::draft::Draft;
use crate::errors::{ErrorKind, FieldError};
use crate::policy::Field;
use crate::submit::{run_attempt, Attempt};
use crate::suggest::SuggestionPipeline;
use crate::validate::{apply_policy, ValidityMap};

/// Fields with an autocomplete dropdown, and the search context each one
/// queries.
const TRACKED_FIELDS: [(Field, ParticipantType, SearchField); 3] = [
    (
        Field::FirstName,
        ParticipantType::Individual,
        SearchField::FirstName,
    ),
    (
        Field::LastName,
        ParticipantType::Individual,
        SearchField::LastName,
    ),
    (
        Field::CompanyName,
        ParticipantType::Organization,
        SearchField::CompanyName,
    ),
];

struct FormState {
    draft: Draft,
    validity: ValidityMap,
    server_errors: HashMap<Field, ErrorKind>,
    touched: HashSet<Field>,
    form_error: Option<ErrorKind>,
    pending: bool,
    event: Option<Event>,
    participants: Vec<Participant>,
}

impl FormState {
    fn fresh() -> Self {
        let draft = Draft::default();
        let validity = apply_policy(draft.participant_type, &draft);
        FormState {
            draft,
            validity,
            server_errors: HashMap::new(),
            touched: HashSet::new(),
            form_error: None,
            pending: false,
            event: None,
            participants: Vec::new(),
        }
    }

    /// Restore the individual defaults; the loaded event and participant list
    /// survive the reset.
    fn reset(&mut self) {
        self.draft = Draft::default();
        self.validity = apply_policy(self.draft.participant_type, &self.draft);
        self.server_errors.clear();
        self.touched.clear();
        self.form_error = None;
        self.pending = false;
    }
}

/// Immutable view of the form handed to the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub participant_type: Option<ParticipantType>,
    pub values: HashMap<Field, String>,
    /// Per-field errors, server-reported ones winning over validity failures.
    pub field_errors: HashMap<Field, FieldError>,
    pub touched: HashSet<Field>,
    pub form_error: Option<ErrorKind>,
    pub pending: bool,
    pub event: Option<Event>,
    pub participants: Vec<Participant>,
}

/// What a submission attempt came to.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// The participant is linked to the event; the form was reset and the
    /// caller should navigate back to the event view.
    Completed(Participant),
    /// Client-side validation rejected the draft; every field is now marked
    /// touched so its error shows.
    Invalid,
    /// Terminal failure, recorded in the form state.
    Failed(ErrorKind),
    /// The workflow was cancelled while the attempt was in flight; the late
    /// outcome was dropped without touching the form.
    Cancelled,
}

/// Owns the registration form state for one event.
///
/// All mutation goes through this type; the lock is never held across an
/// await. Suggestion lookups and submissions capture the current epoch or
/// generation and become no-ops once `cancel` (or drop) bumps it.
pub struct RegistrationForm {
    participant_store: Arc<dyn ParticipantStore + Send + Sync>,
    event_store: Arc<dyn EventStore + Send + Sync>,
    event_id: i64,
    state: Mutex<FormState>,
    associated_ids: Arc<Mutex<HashSet<i64>>>,
    epoch: AtomicU64,
    pipelines: Mutex<HashMap<Field, SuggestionPipeline>>,
}

impl RegistrationForm {
    pub fn new(
        participant_store: Arc<dyn ParticipantStore + Send + Sync>,
        event_store: Arc<dyn EventStore + Send + Sync>,
        event_id: i64,
        suggestion_debounce: Duration,
    ) -> Self {
        let associated_ids = Arc::new(Mutex::new(HashSet::new()));

        let mut pipelines = HashMap::new();
        for (field, participant_type, search_field) in TRACKED_FIELDS {
            pipelines.insert(
                field,
                SuggestionPipeline::new(
                    Arc::clone(&participant_store),
                    participant_type,
                    search_field,
                    suggestion_debounce,
                    Arc::clone(&associated_ids),
                ),
            );
        }

        RegistrationForm {
            participant_store,
            event_store,
            event_id,
            state: Mutex::new(FormState::fresh()),
            associated_ids,
            epoch: AtomicU64::new(0),
            pipelines: Mutex::new(pipelines),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().expect("form state lock poisoned")
    }

    fn set_associated_ids(&self, participants: &[Participant]) {
        let mut ids = self
            .associated_ids
            .lock()
            .expect("association set lock poisoned");
        ids.clear();
        ids.extend(participants.iter().filter_map(|p| p.id));
    }

    /// Fetch the event and its current participants. Failures land in the
    /// form-level error; a cancellation during the fetch drops the responses.
    #[instrument(skip_all, fields(event_id = self.event_id))]
    pub async fn load(&self) {
        let epoch = self.epoch.load(Ordering::Relaxed);

        let event = self.event_store.event(self.event_id).await;
        let participants = match &event {
            Ok(_) => Some(self.event_store.participants(self.event_id).await),
            Err(_) => None,
        };

        if self.epoch.load(Ordering::Relaxed) != epoch {
            return; // torn down while loading
        }

        let mut state = self.lock_state();
        match event {
            Ok(event) => state.event = Some(event),
            Err(error) => {
                tracing::warn!("failed to load event {}: {}", self.event_id, error);
                state.form_error = Some(ErrorKind::EventLoadFailed);
                return;
            }
        }
        match participants {
            Some(Ok(participants)) => {
                self.set_associated_ids(&participants);
                state.participants = participants;
            }
            Some(Err(error)) => {
                tracing::warn!(
                    "failed to load participants of event {}: {}",
                    self.event_id,
                    error
                );
                state.form_error = Some(ErrorKind::ParticipantsLoadFailed);
                state.participants = Vec::new();
            }
            None => {}
        }
    }

    /// Record one keystroke's worth of field value: re-validate, clear the
    /// field's server error and the form-level error, and feed the field's
    /// suggestion pipeline if it has one.
    pub fn set_field(&self, field: Field, value: &str) {
        {
            let mut state = self.lock_state();
            state.draft.set(field, value);
            state.touched.insert(field);
            state.server_errors.remove(&field);
            state.form_error = None;
            let validity = apply_policy(state.draft.participant_type, &state.draft);
            state.validity = validity;
        }

        let mut pipelines = self.lock_pipelines();
        if let Some(pipeline) = pipelines.get_mut(&field) {
            pipeline.input(value);
        }
    }

    /// Switch the participant type and re-validate under the new policy; the
    /// additional-info bound may change.
    pub fn set_participant_type(&self, participant_type: Option<ParticipantType>) {
        let mut state = self.lock_state();
        state.draft.participant_type = participant_type;
        state.touched.insert(Field::ParticipantType);
        state.form_error = None;
        let validity = apply_policy(participant_type, &state.draft);
        state.validity = validity;
    }

    /// Copy a selected suggestion into the draft. The patch is not a
    /// keystroke: pipelines are synced to the new values so no lookup fires.
    pub fn select_suggestion(&self, candidate: &Participant) {
        let values: Vec<(Field, String)> = {
            let mut state = self.lock_state();
            state.draft.patch_from(candidate);
            state.server_errors.clear();
            state.form_error = None;
            let validity = apply_policy(state.draft.participant_type, &state.draft);
            state.validity = validity;
            TRACKED_FIELDS
                .iter()
                .map(|(field, _, _)| (*field, state.draft.value(*field)))
                .collect()
        };

        let mut pipelines = self.lock_pipelines();
        for (field, value) in values {
            if let Some(pipeline) = pipelines.get_mut(&field) {
                pipeline.sync_value(&value);
            }
        }
    }

    /// Latest suggestion set for a tracked field; `None` for fields without
    /// an autocomplete.
    pub fn observe(&self, field: Field) -> Option<watch::Receiver<Vec<Participant>>> {
        self.lock_pipelines().get(&field).map(SuggestionPipeline::observe)
    }

    /// Run one submission attempt.
    #[instrument(skip_all, fields(event_id = self.event_id))]
    pub async fn submit(&self) -> SubmitResult {
        let (record, epoch) = {
            let mut state = self.lock_state();
            let validity = apply_policy(state.draft.participant_type, &state.draft);
            state.validity = validity;

            let record = if state.validity.is_empty() {
                state.draft.to_participant()
            } else {
                None
            };
            let Some(record) = record else {
                // Make every field error visible before giving up.
                state.touched.extend(Field::ALL);
                state.form_error = Some(ErrorKind::InvalidForm);
                return SubmitResult::Invalid;
            };

            state.pending = true;
            state.form_error = None;
            (record, self.epoch.load(Ordering::Relaxed))
        };

        let attempt = run_attempt(
            self.participant_store.as_ref(),
            self.event_store.as_ref(),
            self.event_id,
            &record,
        )
        .await;

        let mut state = self.lock_state();
        if self.epoch.load(Ordering::Relaxed) != epoch {
            return SubmitResult::Cancelled;
        }
        state.pending = false;

        match attempt {
            Attempt::Succeeded { participant } => {
                if let Some(id) = participant.id {
                    self.associated_ids
                        .lock()
                        .expect("association set lock poisoned")
                        .insert(id);
                }
                state.participants.push(participant.clone());
                state.reset();
                drop(state);
                self.reset_pipelines();
                SubmitResult::Completed(participant)
            }
            Attempt::Failed { error } => {
                state.form_error = Some(error.kind);
                if let Some((field, kind)) = error.field_error {
                    state.server_errors.insert(field, kind);
                    state.touched.insert(field);
                }
                SubmitResult::Failed(error.kind)
            }
        }
    }

    /// Remove a participant from the event and from the visible list.
    pub async fn delete_association(&self, participant_id: i64) -> Result<(), ErrorKind> {
        let epoch = self.epoch.load(Ordering::Relaxed);

        match self
            .event_store
            .disassociate(self.event_id, participant_id)
            .await
        {
            Ok(()) => {
                if self.epoch.load(Ordering::Relaxed) != epoch {
                    return Ok(());
                }
                let mut state = self.lock_state();
                state.participants.retain(|p| p.id != Some(participant_id));
                state.form_error = None;
                self.associated_ids
                    .lock()
                    .expect("association set lock poisoned")
                    .remove(&participant_id);
                Ok(())
            }
            Err(error) => {
                tracing::warn!("failed to remove participant {}: {}", participant_id, error);
                if self.epoch.load(Ordering::Relaxed) == epoch {
                    self.lock_state().form_error = Some(ErrorKind::ParticipantDeleteFailed);
                }
                Err(ErrorKind::ParticipantDeleteFailed)
            }
        }
    }

    /// Cancel the workflow: pending lookups and any in-flight submission
    /// become stale, and the form returns to its defaults.
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::Relaxed);
        self.lock_state().reset();
        self.reset_pipelines();
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let state = self.lock_state();

        let mut field_errors: HashMap<Field, FieldError> = state
            .server_errors
            .iter()
            .map(|(field, kind)| (*field, FieldError::Server(*kind)))
            .collect();
        for (field, error) in &state.validity {
            field_errors
                .entry(*field)
                .or_insert(FieldError::Invalid(*error));
        }

        FormSnapshot {
            participant_type: state.draft.participant_type,
            values: Field::ALL
                .iter()
                .map(|field| (*field, state.draft.value(*field)))
                .collect(),
            field_errors,
            touched: state.touched.clone(),
            form_error: state.form_error,
            pending: state.pending,
            event: state.event.clone(),
            participants: state.participants.clone(),
        }
    }

    fn lock_pipelines(&self) -> MutexGuard<'_, HashMap<Field, SuggestionPipeline>> {
        self.pipelines.lock().expect("pipeline map lock poisoned")
    }

    fn reset_pipelines(&self) {
        for pipeline in self.lock_pipelines().values_mut() {
            pipeline.reset();
        }
    }
}

/// Teardown marks everything in flight stale; late completions are dropped.
impl Drop for RegistrationForm {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::Relaxed);
        for pipeline in self.lock_pipelines().values() {
            pipeline.invalidate();
        }
    }
}
