use std::collections::HashMap;

use serde::Serialize;

use registration_common::participant::ParticipantType;

use crate::draft::Draft;
use crate::policy::{policy_for, Field, REGISTRATION_CODE_PATTERN};

/// Why a field value is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationError {
    Required,
    Pattern,
    Min,
    MaxLength,
}

impl ValidationError {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationError::Required => "required",
            ValidationError::Pattern => "pattern",
            ValidationError::Min => "min",
            ValidationError::MaxLength => "maxlength",
        }
    }
}

/// Invalid fields only; a field missing from the map is valid.
pub type ValidityMap = HashMap<Field, ValidationError>;

/// Apply the field policy for `participant_type` to the draft.
///
/// Pure — no I/O. Re-run on every keystroke and on every type change; the
/// additional-info bound always uses the current type's limit, so text that
/// fit an organization may become invalid when the type switches back to
/// individual.
pub fn apply_policy(participant_type: Option<ParticipantType>, draft: &Draft) -> ValidityMap {
    let policy = policy_for(participant_type);
    let mut invalid = ValidityMap::new();

    for field in policy.required {
        if draft.is_blank(*field) {
            invalid.insert(*field, ValidationError::Required);
        }
    }

    // Shape checks apply to whatever is typed in, required or not.
    if !draft.registration_code.is_empty()
        && !REGISTRATION_CODE_PATTERN.is_match(&draft.registration_code)
    {
        invalid.insert(Field::RegistrationCode, ValidationError::Pattern);
    }

    if !draft.participant_count.is_empty()
        && !draft
            .participant_count
            .trim()
            .parse::<i64>()
            .is_ok_and(|count| count >= 1)
    {
        invalid.insert(Field::ParticipantCount, ValidationError::Min);
    }

    if draft.additional_info.chars().count() > policy.additional_info_max_length {
        invalid.insert(Field::AdditionalInfo, ValidationError::MaxLength);
    }

    invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_individual() -> Draft {
        let mut draft = Draft::default();
        draft.set(Field::FirstName, "Jane");
        draft.set(Field::LastName, "Smith");
        draft.set(Field::PersonalCode, "38712345673");
        draft.set(Field::PaymentMethod, "CARD");
        draft
    }

    fn complete_organization() -> Draft {
        let mut draft = Draft::default();
        draft.set(Field::ParticipantType, "ORGANIZATION");
        draft.set(Field::CompanyName, "Acme OÜ");
        draft.set(Field::RegistrationCode, "12345678");
        draft.set(Field::ParticipantCount, "3");
        draft.set(Field::PaymentMethod, "BANK_TRANSFER");
        draft
    }

    #[test]
    fn fresh_draft_misses_exactly_the_individual_required_fields() {
        let draft = Draft::default();
        let invalid = apply_policy(draft.participant_type, &draft);

        let mut fields: Vec<Field> = invalid.keys().copied().collect();
        fields.sort_by_key(|f| f.name());
        assert_eq!(
            fields,
            vec![
                Field::FirstName,
                Field::LastName,
                Field::PaymentMethod,
                Field::PersonalCode,
            ]
        );
        assert!(invalid.values().all(|e| *e == ValidationError::Required));
    }

    #[test]
    fn complete_drafts_are_valid() {
        let draft = complete_individual();
        assert!(apply_policy(draft.participant_type, &draft).is_empty());

        let draft = complete_organization();
        assert!(apply_policy(draft.participant_type, &draft).is_empty());
    }

    #[test]
    fn organization_requires_its_own_fields() {
        let mut draft = complete_organization();
        draft.set(Field::CompanyName, "");
        draft.set(Field::ParticipantCount, "");

        let invalid = apply_policy(draft.participant_type, &draft);
        assert_eq!(invalid.get(&Field::CompanyName), Some(&ValidationError::Required));
        assert_eq!(
            invalid.get(&Field::ParticipantCount),
            Some(&ValidationError::Required)
        );
        // Individual identity fields are not required for an organization.
        assert!(!invalid.contains_key(&Field::FirstName));
        assert!(!invalid.contains_key(&Field::PersonalCode));
    }

    #[test]
    fn registration_code_shape_is_checked_even_when_not_required() {
        let mut draft = complete_individual();
        draft.set(Field::RegistrationCode, "12AB");

        let invalid = apply_policy(draft.participant_type, &draft);
        assert_eq!(
            invalid.get(&Field::RegistrationCode),
            Some(&ValidationError::Pattern)
        );
    }

    #[test]
    fn participant_count_must_be_a_positive_integer() {
        let mut draft = complete_organization();

        for bad in ["0", "-2", "many", "1.5"] {
            draft.set(Field::ParticipantCount, bad);
            let invalid = apply_policy(draft.participant_type, &draft);
            assert_eq!(
                invalid.get(&Field::ParticipantCount),
                Some(&ValidationError::Min),
                "{bad}"
            );
        }
    }

    #[test]
    fn additional_info_limit_follows_the_type() {
        let mut draft = complete_organization();
        draft.set(Field::AdditionalInfo, &"x".repeat(4000));
        assert!(apply_policy(draft.participant_type, &draft).is_empty());

        // The same note stops fitting when the type changes to individual.
        draft.set(Field::ParticipantType, "INDIVIDUAL");
        let invalid = apply_policy(draft.participant_type, &draft);
        assert_eq!(
            invalid.get(&Field::AdditionalInfo),
            Some(&ValidationError::MaxLength)
        );
    }

    #[test]
    fn unset_type_only_requires_payment_method() {
        let mut draft = Draft::default();
        draft.set(Field::ParticipantType, "");

        let invalid = apply_policy(draft.participant_type, &draft);
        assert_eq!(invalid.len(), 1);
        assert_eq!(
            invalid.get(&Field::PaymentMethod),
            Some(&ValidationError::Required)
        );
    }
}
