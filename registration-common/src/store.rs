use std::fmt;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::Event;
use crate::participant::{Participant, ParticipantType};

/// Server-side fields a participant search can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    FirstName,
    LastName,
    CompanyName,
    PersonalCode,
    RegistrationCode,
}

impl SearchField {
    /// Query-parameter value the search endpoint expects.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchField::FirstName => "firstName",
            SearchField::LastName => "lastName",
            SearchField::CompanyName => "companyName",
            SearchField::PersonalCode => "personalCode",
            SearchField::RegistrationCode => "registrationCode",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The participant collection.
#[async_trait]
pub trait ParticipantStore {
    /// Create a new participant, returning the stored copy with its id
    /// assigned. Fails with a 409 response when the identity key is already
    /// taken, or a 400 response for input the server rejects.
    async fn create(&self, participant: &Participant) -> Result<Participant, StoreError>;

    /// Look up participants matching `query` on `field`. Lookups never fail
    /// to the caller: implementations degrade to an empty result set and
    /// report the cause out of band.
    async fn search(
        &self,
        query: &str,
        participant_type: Option<ParticipantType>,
        field: Option<SearchField>,
    ) -> Vec<Participant>;

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError>;
}

/// The event collection and its participant associations.
#[async_trait]
pub trait EventStore {
    async fn event(&self, event_id: i64) -> Result<Event, StoreError>;

    /// Participants currently associated with the event.
    async fn participants(&self, event_id: i64) -> Result<Vec<Participant>, StoreError>;

    /// Link a participant to an event. A participant may be linked to a given
    /// event at most once; a second attempt fails with a 409 response.
    async fn associate(
        &self,
        event_id: i64,
        participant_id: i64,
        participant_type: ParticipantType,
    ) -> Result<(), StoreError>;

    async fn disassociate(&self, event_id: i64, participant_id: i64) -> Result<(), StoreError>;
}
