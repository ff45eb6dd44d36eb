use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use registration_common::error::StoreError;
use registration_common::participant::ParticipantType;

use crate::policy::Field;
use crate::validate::ValidationError;

/// Closed set of failures the form surfaces. Each kind carries a fixed
/// localized message (the `Display` impl) and a stable message key for the
/// rendering layer's catalog.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("Palun täitke kohustuslikud väljad korrektselt")]
    InvalidForm,
    #[error("Osaleja lisamine ebaõnnestus")]
    ParticipantAddFailed,
    #[error("Osaleja on juba üritusele lisatud")]
    ParticipantAlreadyAdded,
    #[error("Lisainfo on liiga pikk")]
    AdditionalInfoTooLong,
    #[error("See isikukood on juba registreeritud")]
    DuplicatePersonalCode,
    #[error("See registrikood on juba registreeritud")]
    DuplicateRegistrationCode,
    #[error("Isikukood on vigane")]
    InvalidPersonalCode,
    #[error("Registrikood peab olema 8-kohaline number")]
    InvalidRegistrationCode,
    #[error("Osaleja tüüp ei sobi")]
    ParticipantTypeMismatch,
    /// Recovery trigger for the conflict-search path; never shown to the user.
    #[error("Osaleja on juba olemas")]
    DuplicateIdentity,
    #[error("Ürituse andmete laadimine ebaõnnestus")]
    EventLoadFailed,
    #[error("Osalejate nimekirja laadimine ebaõnnestus")]
    ParticipantsLoadFailed,
    #[error("Osaleja kustutamine ebaõnnestus")]
    ParticipantDeleteFailed,
}

impl ErrorKind {
    /// Stable key the rendering layer maps to its message catalog.
    pub fn message_key(self) -> &'static str {
        match self {
            ErrorKind::InvalidForm => "invalid_form",
            ErrorKind::ParticipantAddFailed => "participant_add_failed",
            ErrorKind::ParticipantAlreadyAdded => "participant_already_added",
            ErrorKind::AdditionalInfoTooLong => "additional_info_too_long",
            ErrorKind::DuplicatePersonalCode => "duplicate_personal_code",
            ErrorKind::DuplicateRegistrationCode => "duplicate_registration_code",
            ErrorKind::InvalidPersonalCode => "invalid_personal_code",
            ErrorKind::InvalidRegistrationCode => "invalid_registration_code",
            ErrorKind::ParticipantTypeMismatch => "participant_type_mismatch",
            ErrorKind::DuplicateIdentity => "duplicate_identity",
            ErrorKind::EventLoadFailed => "event_load_failed",
            ErrorKind::ParticipantsLoadFailed => "participants_load_failed",
            ErrorKind::ParticipantDeleteFailed => "participant_delete_failed",
        }
    }
}

/// What is wrong with a single field: a client-side validity failure or a
/// server-reported error. Server errors win when both apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldError {
    Invalid(ValidationError),
    Server(ErrorKind),
}

impl FieldError {
    pub fn message_key(self) -> &'static str {
        match self {
            FieldError::Invalid(error) => error.as_str(),
            FieldError::Server(kind) => kind.message_key(),
        }
    }
}

/// Which submission step produced a failure. A 409 means a taken identity
/// key at the create stage but an existing association at the associate
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Create,
    Associate,
}

/// A collaborator failure mapped into the closed error set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub kind: ErrorKind,
    /// Field-scoped error to show next to a specific input, when one applies.
    pub field_error: Option<(Field, ErrorKind)>,
}

impl Classified {
    pub fn plain(kind: ErrorKind) -> Self {
        Classified {
            kind,
            field_error: None,
        }
    }
}

/// Map a store failure to an error kind and an optional field to decorate.
pub fn classify(
    stage: Stage,
    participant_type: Option<ParticipantType>,
    error: &StoreError,
) -> Classified {
    let (status, message) = match error {
        StoreError::Response { status, message } => (*status, message.as_str()),
        StoreError::Connection(_) => return Classified::plain(ErrorKind::ParticipantAddFailed),
    };

    match status {
        StatusCode::CONFLICT => match stage {
            Stage::Create => Classified::plain(ErrorKind::DuplicateIdentity),
            Stage::Associate => match participant_type {
                Some(ParticipantType::Individual) => Classified {
                    kind: ErrorKind::ParticipantAlreadyAdded,
                    field_error: Some((Field::PersonalCode, ErrorKind::DuplicatePersonalCode)),
                },
                Some(ParticipantType::Organization) => Classified {
                    kind: ErrorKind::ParticipantAlreadyAdded,
                    field_error: Some((
                        Field::RegistrationCode,
                        ErrorKind::DuplicateRegistrationCode,
                    )),
                },
                None => Classified::plain(ErrorKind::ParticipantAlreadyAdded),
            },
        },
        StatusCode::BAD_REQUEST => {
            if message.contains("additional info exceeds maximum length") {
                Classified {
                    kind: ErrorKind::AdditionalInfoTooLong,
                    field_error: Some((Field::AdditionalInfo, ErrorKind::AdditionalInfoTooLong)),
                }
            } else if message.contains("personal code") {
                Classified {
                    kind: ErrorKind::InvalidPersonalCode,
                    field_error: Some((Field::PersonalCode, ErrorKind::InvalidPersonalCode)),
                }
            } else if message.contains("registration code") {
                Classified {
                    kind: ErrorKind::InvalidRegistrationCode,
                    field_error: Some((
                        Field::RegistrationCode,
                        ErrorKind::InvalidRegistrationCode,
                    )),
                }
            } else if message.contains("Participant type mismatch") {
                Classified::plain(ErrorKind::ParticipantTypeMismatch)
            } else {
                Classified::plain(ErrorKind::ParticipantAddFailed)
            }
        }
        _ => Classified::plain(ErrorKind::ParticipantAddFailed),
    }
}
