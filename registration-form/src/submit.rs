use metrics::counter;
use tracing::instrument;

use registration_common::participant::{Participant, ParticipantType};
use registration_common::store::{EventStore, ParticipantStore, SearchField};

use crate::errors::{classify, Classified, ErrorKind, Stage};

/// Terminal outcome of one submission attempt.
#[derive(Debug)]
pub enum Attempt {
    /// The participant (newly created or recovered from the store) is linked
    /// to the event.
    Succeeded { participant: Participant },
    Failed { error: Classified },
}

fn identity_search(record: &Participant) -> Option<(&str, SearchField)> {
    let field = match record.participant_type {
        ParticipantType::Individual => SearchField::PersonalCode,
        ParticipantType::Organization => SearchField::RegistrationCode,
    };
    record.identity_value().map(|value| (value, field))
}

/// Run one submission attempt: create the participant, link it to the event,
/// and on a duplicate-identity conflict recover by searching for the existing
/// record and linking that one instead.
///
/// The steps run strictly one after another; per attempt there is exactly one
/// create call, at most one search call and at most one associate call.
#[instrument(skip_all, fields(event_id))]
pub async fn run_attempt(
    participant_store: &(dyn ParticipantStore + Send + Sync),
    event_store: &(dyn EventStore + Send + Sync),
    event_id: i64,
    record: &Participant,
) -> Attempt {
    counter!("registration_attempts_total").increment(1);

    let participant = match participant_store.create(record).await {
        Ok(created) => created,
        Err(error) => {
            let classified = classify(Stage::Create, Some(record.participant_type), &error);
            if classified.kind != ErrorKind::DuplicateIdentity {
                tracing::warn!("participant creation rejected: {}", error);
                return fail(classified);
            }

            tracing::debug!("identity key already taken, searching for the existing record");
            match find_existing(participant_store, record).await {
                Some(existing) => existing,
                None => {
                    // The store signalled a duplicate the search cannot see;
                    // linking a guess could attach the wrong record.
                    counter!("registration_conflict_recovery_failed_total").increment(1);
                    return fail(Classified::plain(ErrorKind::ParticipantAddFailed));
                }
            }
        }
    };

    let Some(participant_id) = participant.id else {
        tracing::error!("participant store returned a record without an id");
        return fail(Classified::plain(ErrorKind::ParticipantAddFailed));
    };

    match event_store
        .associate(event_id, participant_id, participant.participant_type)
        .await
    {
        Ok(()) => {
            counter!("registration_attempts_succeeded_total").increment(1);
            Attempt::Succeeded { participant }
        }
        Err(error) => {
            tracing::warn!("event association rejected: {}", error);
            fail(classify(
                Stage::Associate,
                Some(participant.participant_type),
                &error,
            ))
        }
    }
}

/// Resolve the record the duplicate-identity conflict pointed at. Exactly one
/// candidate may hold the submitted identity value; zero or several mean the
/// search index and the conflict signal disagree.
async fn find_existing(
    participant_store: &(dyn ParticipantStore + Send + Sync),
    record: &Participant,
) -> Option<Participant> {
    let (value, field) = identity_search(record)?;
    let candidates = participant_store
        .search(value, Some(record.participant_type), Some(field))
        .await;

    let mut matching = candidates
        .into_iter()
        .filter(|candidate| candidate.id.is_some() && candidate.identity_value() == Some(value));

    match (matching.next(), matching.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

fn fail(error: Classified) -> Attempt {
    counter!("registration_attempts_failed_total", "kind" => error.kind.message_key())
        .increment(1);
    Attempt::Failed { error }
}
