use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;

use registration_common::participant::{Participant, ParticipantType};
use registration_common::store::{ParticipantStore, SearchField};

/// Turns keystrokes on one tracked field into debounced participant lookups.
///
/// Every keystroke bumps a generation counter; a lookup task re-checks its
/// captured generation after the debounce sleep and again after the search,
/// so only the newest value's results are ever published. Must be driven from
/// within a Tokio runtime.
pub struct SuggestionPipeline {
    store: Arc<dyn ParticipantStore + Send + Sync>,
    participant_type: ParticipantType,
    field: SearchField,
    debounce: Duration,
    /// Ids already associated with the event; hits on these are dropped.
    excluded: Arc<Mutex<HashSet<i64>>>,
    generation: Arc<AtomicU64>,
    last_value: String,
    results: Arc<watch::Sender<Vec<Participant>>>,
}

impl SuggestionPipeline {
    pub fn new(
        store: Arc<dyn ParticipantStore + Send + Sync>,
        participant_type: ParticipantType,
        field: SearchField,
        debounce: Duration,
        excluded: Arc<Mutex<HashSet<i64>>>,
    ) -> Self {
        let (results, _) = watch::channel(Vec::new());
        SuggestionPipeline {
            store,
            participant_type,
            field,
            debounce,
            excluded,
            generation: Arc::new(AtomicU64::new(0)),
            last_value: String::new(),
            results: Arc::new(results),
        }
    }

    /// Latest published suggestion set; new subscribers start from the
    /// current value.
    pub fn observe(&self) -> watch::Receiver<Vec<Participant>> {
        self.results.subscribe()
    }

    /// Feed one keystroke's worth of field value.
    pub fn input(&mut self, value: &str) {
        if value == self.last_value {
            return; // nothing actually changed
        }
        self.last_value = value.to_owned();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        if value.is_empty() {
            // A cleared input empties the dropdown without a lookup.
            self.results.send_replace(Vec::new());
            return;
        }

        let store = Arc::clone(&self.store);
        let excluded = Arc::clone(&self.excluded);
        let generations = Arc::clone(&self.generation);
        let results = Arc::clone(&self.results);
        let (participant_type, field, debounce) = (self.participant_type, self.field, self.debounce);
        let query = value.to_owned();

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generations.load(Ordering::Relaxed) != generation {
                return; // a newer keystroke owns the window now
            }

            let found = store
                .search(&query, Some(participant_type), Some(field))
                .await;

            if generations.load(Ordering::Relaxed) != generation {
                counter!("suggestion_stale_responses_total").increment(1);
                return; // stale response, never surfaced
            }

            let suggestions = {
                let excluded = excluded.lock().expect("association set lock poisoned");
                found
                    .into_iter()
                    .filter(|candidate| candidate.id.is_none_or(|id| !excluded.contains(&id)))
                    .filter(|candidate| {
                        field != SearchField::CompanyName
                            || candidate
                                .company_name
                                .as_deref()
                                .is_some_and(|name| !name.trim().is_empty())
                    })
                    .collect::<Vec<_>>()
            };

            counter!("suggestion_lookups_total").increment(1);
            results.send_replace(suggestions);
        });
    }

    /// Align the remembered value after a programmatic patch so it does not
    /// count as a keystroke.
    pub fn sync_value(&mut self, value: &str) {
        self.last_value = value.to_owned();
        self.invalidate();
    }

    /// Mark every pending lookup stale.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Back to the initial state: pending lookups stale, dropdown cleared.
    pub fn reset(&mut self) {
        self.invalidate();
        self.last_value.clear();
        self.results.send_replace(Vec::new());
    }
}
