use registration_common::participant::{Participant, ParticipantType, PaymentMethod};

use crate::policy::Field;

/// The registration form's editable field set.
///
/// Text fields hold whatever was typed; `to_participant` maps the
/// type-appropriate subset onto a wire record.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub participant_type: Option<ParticipantType>,
    pub first_name: String,
    pub last_name: String,
    pub personal_code: String,
    pub company_name: String,
    pub registration_code: String,
    pub participant_count: String,
    pub contact_person: String,
    pub payment_method: Option<PaymentMethod>,
    pub email: String,
    pub phone: String,
    pub additional_info: String,
}

/// A fresh form starts in the individual shape.
impl Default for Draft {
    fn default() -> Self {
        Draft {
            participant_type: Some(ParticipantType::Individual),
            first_name: String::new(),
            last_name: String::new(),
            personal_code: String::new(),
            company_name: String::new(),
            registration_code: String::new(),
            participant_count: String::new(),
            contact_person: String::new(),
            payment_method: None,
            email: String::new(),
            phone: String::new(),
            additional_info: String::new(),
        }
    }
}

fn text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

impl Draft {
    /// Overwrite one field with a typed-in value. Enumerated fields parse
    /// their wire names; anything else clears them.
    pub fn set(&mut self, field: Field, value: &str) {
        match field {
            Field::ParticipantType => {
                self.participant_type = match value {
                    "INDIVIDUAL" => Some(ParticipantType::Individual),
                    "ORGANIZATION" => Some(ParticipantType::Organization),
                    _ => None,
                };
            }
            Field::PaymentMethod => self.payment_method = value.parse::<PaymentMethod>().ok(),
            Field::FirstName => self.first_name = value.to_owned(),
            Field::LastName => self.last_name = value.to_owned(),
            Field::PersonalCode => self.personal_code = value.to_owned(),
            Field::CompanyName => self.company_name = value.to_owned(),
            Field::RegistrationCode => self.registration_code = value.to_owned(),
            Field::ParticipantCount => self.participant_count = value.to_owned(),
            Field::ContactPerson => self.contact_person = value.to_owned(),
            Field::Email => self.email = value.to_owned(),
            Field::Phone => self.phone = value.to_owned(),
            Field::AdditionalInfo => self.additional_info = value.to_owned(),
        }
    }

    pub fn value(&self, field: Field) -> String {
        match field {
            Field::ParticipantType => self
                .participant_type
                .map(|t| t.to_string())
                .unwrap_or_default(),
            Field::PaymentMethod => self
                .payment_method
                .map(|m| m.to_string())
                .unwrap_or_default(),
            Field::FirstName => self.first_name.clone(),
            Field::LastName => self.last_name.clone(),
            Field::PersonalCode => self.personal_code.clone(),
            Field::CompanyName => self.company_name.clone(),
            Field::RegistrationCode => self.registration_code.clone(),
            Field::ParticipantCount => self.participant_count.clone(),
            Field::ContactPerson => self.contact_person.clone(),
            Field::Email => self.email.clone(),
            Field::Phone => self.phone.clone(),
            Field::AdditionalInfo => self.additional_info.clone(),
        }
    }

    pub fn is_blank(&self, field: Field) -> bool {
        self.value(field).trim().is_empty()
    }

    /// Map the draft onto a wire record, keeping only the identity and
    /// display fields that belong to the selected type. `None` until both a
    /// type and a payment method are picked.
    pub fn to_participant(&self) -> Option<Participant> {
        let participant_type = self.participant_type?;
        let payment_method = self.payment_method?;
        let individual = participant_type == ParticipantType::Individual;

        Some(Participant {
            id: None,
            participant_type,
            first_name: if individual { text(&self.first_name) } else { None },
            last_name: if individual { text(&self.last_name) } else { None },
            personal_code: if individual { text(&self.personal_code) } else { None },
            company_name: if individual { None } else { text(&self.company_name) },
            registration_code: if individual { None } else { text(&self.registration_code) },
            participant_count: self.participant_count.trim().parse::<u32>().ok(),
            contact_person: text(&self.contact_person),
            payment_method,
            email: text(&self.email),
            phone: text(&self.phone),
            additional_info: text(&self.additional_info),
        })
    }

    /// Copy every transferable field from a selected suggestion and re-derive
    /// the type from the candidate's populated identity key.
    pub fn patch_from(&mut self, candidate: &Participant) {
        self.first_name = candidate.first_name.clone().unwrap_or_default();
        self.last_name = candidate.last_name.clone().unwrap_or_default();
        self.personal_code = candidate.personal_code.clone().unwrap_or_default();
        self.company_name = candidate.company_name.clone().unwrap_or_default();
        self.registration_code = candidate.registration_code.clone().unwrap_or_default();
        self.participant_count = candidate
            .participant_count
            .map(|count| count.to_string())
            .unwrap_or_default();
        self.contact_person = candidate.contact_person.clone().unwrap_or_default();
        self.payment_method = Some(candidate.payment_method);
        self.email = candidate.email.clone().unwrap_or_default();
        self.phone = candidate.phone.clone().unwrap_or_default();
        self.additional_info = candidate.additional_info.clone().unwrap_or_default();
        self.participant_type = candidate.inferred_type().or(self.participant_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_participant_keeps_only_type_appropriate_fields() {
        let mut draft = Draft::default();
        draft.set(Field::FirstName, "Jane");
        draft.set(Field::LastName, "Smith");
        draft.set(Field::PersonalCode, "38712345673");
        // Leftovers from an earlier organization draft must not leak out.
        draft.set(Field::CompanyName, "Acme");
        draft.set(Field::RegistrationCode, "12345678");
        draft.set(Field::PaymentMethod, "CARD");

        let participant = draft.to_participant().expect("complete draft");
        assert_eq!(participant.participant_type, ParticipantType::Individual);
        assert_eq!(participant.first_name.as_deref(), Some("Jane"));
        assert_eq!(participant.personal_code.as_deref(), Some("38712345673"));
        assert!(participant.company_name.is_none());
        assert!(participant.registration_code.is_none());
    }

    #[test]
    fn to_participant_requires_type_and_payment_method() {
        let mut draft = Draft::default();
        draft.set(Field::FirstName, "Jane");
        assert!(draft.to_participant().is_none());

        draft.set(Field::PaymentMethod, "CASH");
        assert!(draft.to_participant().is_some());

        draft.participant_type = None;
        assert!(draft.to_participant().is_none());
    }

    #[test]
    fn patch_from_re_derives_type() {
        let mut draft = Draft::default();
        let candidate =
            Participant::organization("Acme OÜ", "12345678", PaymentMethod::BankTransfer);

        draft.patch_from(&candidate);
        assert_eq!(draft.participant_type, Some(ParticipantType::Organization));
        assert_eq!(draft.company_name, "Acme OÜ");
        assert_eq!(draft.registration_code, "12345678");
        assert_eq!(draft.payment_method, Some(PaymentMethod::BankTransfer));
        // Counterpart fields are emptied by the patch.
        assert!(draft.first_name.is_empty());
    }

    #[test]
    fn set_parses_enumerated_fields() {
        let mut draft = Draft::default();
        draft.set(Field::ParticipantType, "ORGANIZATION");
        assert_eq!(draft.participant_type, Some(ParticipantType::Organization));

        draft.set(Field::ParticipantType, "");
        assert_eq!(draft.participant_type, None);

        draft.set(Field::PaymentMethod, "BANK_TRANSFER");
        assert_eq!(draft.payment_method, Some(PaymentMethod::BankTransfer));
    }
}
